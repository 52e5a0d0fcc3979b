//! Fetched page with decoded source and response headers.

use crate::base::engineerror::EngineError;

/// Result of a successful fetch.
///
/// Owns the decoded body text and every response header the transport
/// reported, in the order it reported them. Nothing on it can be changed
/// after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Webpage {
    url: String,
    status: u16,
    source: String,
    headers: Vec<(String, String)>,
}

impl Webpage {
    pub fn new(
        url: impl Into<String>,
        status: u16,
        source: impl Into<String>,
        headers: Vec<(String, String)>,
    ) -> Self {
        Self {
            url: url.into(),
            status,
            source: source.into(),
            headers,
        }
    }

    /// Consume a transport response, decoding its body as text.
    pub async fn from_response(resp: reqwest::Response) -> Result<Self, EngineError> {
        let url = resp.url().to_string();
        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let source = resp.text().await?;

        Ok(Self {
            url,
            status,
            source,
            headers,
        })
    }

    /// Final URL, after any redirects the transport followed.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Decoded page source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Response headers as `(name, value)` pairs.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First value of `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Take the source, dropping the rest.
    pub fn into_source(self) -> String {
        self.source
    }

    /// Deserialize the source as JSON.
    #[cfg(feature = "json")]
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, EngineError> {
        serde_json::from_str(&self.source).map_err(|e| EngineError::BodyDecode {
            reason: e.to_string(),
        })
    }
}

impl<'a> IntoIterator for &'a Webpage {
    type Item = &'a (String, String);
    type IntoIter = std::slice::Iter<'a, (String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.headers.iter()
    }
}
