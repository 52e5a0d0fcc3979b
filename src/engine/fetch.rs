//! Per-call fetch arguments and the request path shared by every engine.

use crate::base::engineerror::EngineError;
use crate::http::headerset::HeaderSet;
use crate::http::webpage::Webpage;
use reqwest::StatusCode;
use url::Url;

/// Arguments for a single fetch.
///
/// Query `params` are appended to the URL form-encoded, `headers` override
/// the engine's base headers for this call only, and `refresh_ip` asks a
/// [`TorEngine`](crate::tor::TorEngine) to rotate its identity first (plain
/// engines ignore it).
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    params: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    refresh_ip: bool,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Add several query parameters.
    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Add a per-call header. Validated when the fetch runs.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Request a new Tor identity before fetching.
    pub fn refresh_ip(mut self, refresh: bool) -> Self {
        self.refresh_ip = refresh;
        self
    }

    pub fn wants_refresh(&self) -> bool {
        self.refresh_ip
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.params
    }
}

/// Whether `status` means "the resource is not there" rather than a failure.
pub fn is_not_found(status: StatusCode) -> bool {
    status == StatusCode::NOT_FOUND || status == StatusCode::GONE
}

pub(crate) fn validate_url(url: &str) -> Result<Url, EngineError> {
    if url.trim().is_empty() {
        return Err(EngineError::invalid_argument("url must not be empty"));
    }
    Url::parse(url).map_err(|e| EngineError::invalid_argument(format!("{}: {}", url, e)))
}

/// Issue one GET through `session` with `base` headers overlaid by the
/// call's own headers.
pub(crate) async fn fetch_page(
    session: &reqwest::Client,
    base: &HeaderSet,
    url: &str,
    options: &FetchOptions,
) -> Result<Option<Webpage>, EngineError> {
    let target = validate_url(url)?;
    let call_headers = HeaderSet::from_pairs(
        options
            .headers
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str())),
    )?;
    let headers = base.merged(&call_headers);

    tracing::debug!(url = %target, headers = headers.len(), params = options.params.len(), "fetching");

    let mut request = session.get(target).headers(headers.to_header_map());
    if !options.params.is_empty() {
        request = request.query(&options.params);
    }

    let resp = request.send().await?;
    let status = resp.status();

    if is_not_found(status) {
        tracing::debug!(url = %resp.url(), status = status.as_u16(), "resource not found");
        return Ok(None);
    }
    if !status.is_success() {
        return Err(EngineError::HttpStatus {
            status: status.as_u16(),
            url: resp.url().to_string(),
        });
    }

    let page = Webpage::from_response(resp).await?;
    tracing::debug!(url = %page.url(), status = page.status(), bytes = page.source().len(), "fetch complete");
    Ok(Some(page))
}
