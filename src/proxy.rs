//! Outbound proxy settings for an engine's session.

use crate::base::engineerror::EngineError;
use url::Url;
use zeroize::Zeroizing;

/// Proxy configuration applied to all HTTP and HTTPS traffic of a session.
///
/// Accepted schemes are `http`, `https`, `socks5` and `socks5h`. With
/// `socks5h` the proxy resolves target hostnames.
#[derive(Clone)]
pub struct ProxySettings {
    /// Proxy URL (e.g., `socks5h://127.0.0.1:9050`)
    pub url: Url,
    /// Proxy username for authentication
    pub username: Option<String>,
    /// Proxy password (zeroized on drop)
    pub password: Option<Zeroizing<String>>,
}

impl ProxySettings {
    /// Create proxy settings from URL string.
    pub fn new(url_str: &str) -> Result<Self, EngineError> {
        let url = Url::parse(url_str)
            .map_err(|_| EngineError::invalid_config("proxy url", url_str))?;
        if !matches!(url.scheme(), "http" | "https" | "socks5" | "socks5h") {
            return Err(EngineError::invalid_config("proxy scheme", url.scheme()));
        }
        Ok(Self {
            url,
            username: None,
            password: None,
        })
    }

    /// SOCKS5 proxy at `address:port` that resolves hostnames itself.
    pub fn socks5h(address: &str, port: u16) -> Result<Self, EngineError> {
        Self::new(&format!("socks5h://{}:{}", address, port))
    }

    /// Create proxy from environment variables.
    ///
    /// Checks `HTTPS_PROXY`/`https_proxy` and `HTTP_PROXY`/`http_proxy`.
    /// Engines never call this on their own.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url_str = ["HTTPS_PROXY", "https_proxy", "HTTP_PROXY", "http_proxy"]
            .into_iter()
            .find_map(|key| lookup(key).filter(|v| !v.is_empty()))?;

        match Self::new(&url_str) {
            Ok(proxy) => Some(proxy),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring proxy from environment");
                None
            }
        }
    }

    /// Add authentication credentials.
    pub fn with_auth(mut self, user: &str, pass: &str) -> Self {
        self.username = Some(user.to_string());
        self.password = Some(Zeroizing::new(pass.to_string()));
        self
    }

    pub fn is_socks(&self) -> bool {
        self.url.scheme().starts_with("socks5")
    }

    /// Convert into the transport's proxy type, routing every scheme.
    ///
    /// SOCKS credentials travel in the URL userinfo; HTTP proxies get a
    /// `Proxy-Authorization` header instead.
    pub fn to_reqwest(&self) -> Result<reqwest::Proxy, EngineError> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) if self.is_socks() => {
                let mut url = self.url.clone();
                url.set_username(user)
                    .and_then(|_| url.set_password(Some(pass.as_str())))
                    .map_err(|_| EngineError::invalid_config("proxy url", self.url.as_str()))?;
                Ok(reqwest::Proxy::all(url.as_str())?)
            }
            (Some(user), Some(pass)) => {
                Ok(reqwest::Proxy::all(self.url.as_str())?.basic_auth(user, pass.as_str()))
            }
            _ => Ok(reqwest::Proxy::all(self.url.as_str())?),
        }
    }
}

impl std::fmt::Debug for ProxySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxySettings")
            .field("url", &self.url.as_str())
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
