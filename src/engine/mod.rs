//! Base fetching engine with builder pattern.
//!
//! An [`Engine`] owns one transport session for its whole life and a set of
//! base headers that callers may adjust between fetches.
//!
//! # Example
//!
//! ```rust,ignore
//! use rasp::engine::{Engine, FetchOptions};
//!
//! let mut engine = Engine::builder()
//!     .header("Content-Type", "text/json")
//!     .build()?;
//!
//! let get_source = engine.curry();
//! engine.set_header("Content-Type", "text/xml")?;
//!
//! // Still sends `Content-Type: text/json`.
//! let page = get_source.get("http://127.0.0.1:5000/echo-headers/").await?;
//! ```

pub mod curry;
pub mod fetch;

pub use curry::CurriedFetch;
pub use fetch::FetchOptions;

use crate::base::engineerror::EngineError;
use crate::http::headerset::HeaderSet;
use crate::http::webpage::Webpage;
use crate::proxy::ProxySettings;
use std::time::Duration;

/// Transport settings an engine was built with; reused by
/// [`Engine::duplicate`] to build an equivalent, independent session.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub proxy: Option<ProxySettings>,
    pub timeout: Option<Duration>,
    pub user_agent: Option<String>,
}

impl SessionOptions {
    /// Open a new session: cookie store on, proxies only when configured.
    pub fn open(&self) -> Result<reqwest::Client, EngineError> {
        let mut builder = reqwest::Client::builder().cookie_store(true);

        builder = match &self.proxy {
            Some(proxy) => builder.proxy(proxy.to_reqwest()?),
            None => builder.no_proxy(),
        };
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(ua) = &self.user_agent {
            builder = builder.user_agent(ua.as_str());
        }

        Ok(builder.build()?)
    }
}

/// Fetching engine.
///
/// Use [`Engine::new`] or [`Engine::builder()`] to create one.
#[derive(Debug)]
pub struct Engine {
    session: reqwest::Client,
    headers: HeaderSet,
    options: SessionOptions,
}

impl Engine {
    /// Create an engine with `headers` as its base headers.
    pub fn new(headers: HeaderSet) -> Result<Self, EngineError> {
        Self::with_options(headers, SessionOptions::default())
    }

    /// An engine with no base headers.
    pub fn default_engine() -> Result<Self, EngineError> {
        Self::new(HeaderSet::new())
    }

    /// Create an engine with explicit session settings.
    pub fn with_options(headers: HeaderSet, options: SessionOptions) -> Result<Self, EngineError> {
        let session = options.open()?;
        tracing::debug!(
            headers = headers.len(),
            proxied = options.proxy.is_some(),
            "engine session opened"
        );
        Ok(Self {
            session,
            headers,
            options,
        })
    }

    /// Create a new engine builder.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Base headers sent with every fetch.
    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderSet {
        &mut self.headers
    }

    /// Set one base header, replacing any previous value.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<(), EngineError> {
        self.headers.insert(name, value)
    }

    pub fn session_options(&self) -> &SessionOptions {
        &self.options
    }

    /// Fetch `url`.
    ///
    /// Returns `Ok(None)` when the server reports the resource as not found.
    /// Any other non-success status or transport failure is an error.
    pub async fn fetch(
        &self,
        url: &str,
        options: FetchOptions,
    ) -> Result<Option<Webpage>, EngineError> {
        fetch::fetch_page(&self.session, &self.headers, url, &options).await
    }

    /// Fetch `url` with no extra params or headers.
    pub async fn get(&self, url: &str) -> Result<Option<Webpage>, EngineError> {
        self.fetch(url, FetchOptions::default()).await
    }

    /// Freeze the current headers into a reusable fetch function.
    pub fn curry(&self) -> CurriedFetch {
        CurriedFetch::new(self.session.clone(), self.headers.clone())
    }

    /// A new engine with the same headers and settings but its own session.
    pub fn duplicate(&self) -> Result<Self, EngineError> {
        Self::with_options(self.headers.clone(), self.options.clone())
    }
}

/// Builder for creating an [`Engine`].
#[derive(Default)]
pub struct EngineBuilder {
    headers: Vec<(String, String)>,
    base: Option<HeaderSet>,
    options: SessionOptions,
}

impl EngineBuilder {
    /// Start from an existing header set.
    pub fn headers(mut self, headers: HeaderSet) -> Self {
        self.base = Some(headers);
        self
    }

    /// Add a base header. Validated in [`build`](Self::build).
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Route the session through a proxy.
    pub fn proxy(mut self, proxy: ProxySettings) -> Self {
        self.options.proxy = Some(proxy);
        self
    }

    /// Set request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.options.user_agent = Some(ua.into());
        self
    }

    /// Build the engine.
    pub fn build(self) -> Result<Engine, EngineError> {
        let mut headers = self.base.unwrap_or_default();
        for (name, value) in &self.headers {
            headers.insert(name, value)?;
        }
        Engine::with_options(headers, self.options)
    }
}
