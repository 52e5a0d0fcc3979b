//! Tor proxy and control-port settings.
//!
//! Each value resolves in order: explicit option, then environment
//! variable, then built-in default. The control password has no default;
//! when neither option nor environment supplies it, it stays
//! [`ControlPassword::Unset`] until the caller provides one.

use crate::base::engineerror::EngineError;
use std::fmt;
use std::net::Ipv6Addr;
use zeroize::Zeroizing;

pub const ENV_ADDRESS: &str = "RASP_TOR_ADDRESS";
pub const ENV_PORT: &str = "RASP_TOR_PORT";
pub const ENV_CONTROL_PORT: &str = "RASP_TOR_CONTROL_PORT";
pub const ENV_CONTROL_PASSWORD: &str = "RASP_TOR_CONTROL_PASSWORD";

pub const DEFAULT_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 9050;
pub const DEFAULT_CONTROL_PORT: u16 = 9051;

/// Control-port password.
#[derive(Clone, Default)]
pub enum ControlPassword {
    /// Not configured; must be supplied before opening the controller.
    #[default]
    Unset,
    Provided(Zeroizing<String>),
}

impl ControlPassword {
    pub fn new(password: impl Into<String>) -> Self {
        ControlPassword::Provided(Zeroizing::new(password.into()))
    }

    pub fn is_set(&self) -> bool {
        matches!(self, ControlPassword::Provided(_))
    }

    /// The password, or [`EngineError::MissingControlPassword`].
    pub fn require(&self) -> Result<&Zeroizing<String>, EngineError> {
        match self {
            ControlPassword::Provided(password) => Ok(password),
            ControlPassword::Unset => Err(EngineError::MissingControlPassword),
        }
    }
}

impl fmt::Debug for ControlPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlPassword::Unset => f.write_str("Unset"),
            ControlPassword::Provided(_) => f.write_str("Provided(<redacted>)"),
        }
    }
}

/// Explicit settings; `None` falls through to environment and defaults.
#[derive(Debug, Clone, Default)]
pub struct TorOptions {
    pub address: Option<String>,
    pub port: Option<u16>,
    pub control_port: Option<u16>,
    pub control_password: Option<String>,
}

impl TorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn control_port(mut self, port: u16) -> Self {
        self.control_port = Some(port);
        self
    }

    pub fn control_password(mut self, password: impl Into<String>) -> Self {
        self.control_password = Some(password.into());
        self
    }
}

/// Fully resolved Tor settings.
#[derive(Debug, Clone)]
pub struct TorConfig {
    pub address: String,
    pub port: u16,
    pub control_port: u16,
    pub control_password: ControlPassword,
}

impl Default for TorConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            control_port: DEFAULT_CONTROL_PORT,
            control_password: ControlPassword::Unset,
        }
    }
}

impl TorConfig {
    /// Resolve against the process environment.
    pub fn resolve(options: TorOptions) -> Result<Self, EngineError> {
        Self::resolve_with(options, |key| std::env::var(key).ok())
    }

    /// Resolve against `lookup` instead of the process environment.
    pub fn resolve_with<F>(options: TorOptions, lookup: F) -> Result<Self, EngineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let address = options
            .address
            .filter(|a| !a.is_empty())
            .or_else(|| env(ENV_ADDRESS))
            .unwrap_or_else(|| DEFAULT_ADDRESS.to_string());

        let port = match options.port {
            Some(port) => port,
            None => env_port(&env, ENV_PORT)?.unwrap_or(DEFAULT_PORT),
        };

        let control_port = match options.control_port {
            Some(port) => port,
            None => env_port(&env, ENV_CONTROL_PORT)?.unwrap_or(DEFAULT_CONTROL_PORT),
        };

        let control_password = options
            .control_password
            .filter(|p| !p.is_empty())
            .or_else(|| env(ENV_CONTROL_PASSWORD))
            .map(ControlPassword::new)
            .unwrap_or_default();

        Ok(Self {
            address,
            port,
            control_port,
            control_password,
        })
    }

    /// `socks5h://address:port`, the URI all engine traffic is routed
    /// through. Hostnames are resolved by Tor, never locally.
    pub fn proxy_uri(&self) -> String {
        if self.address.parse::<Ipv6Addr>().is_ok() {
            format!("socks5h://[{}]:{}", self.address, self.port)
        } else {
            format!("socks5h://{}:{}", self.address, self.port)
        }
    }
}

fn env_port<F>(env: &F, key: &str) -> Result<Option<u16>, EngineError>
where
    F: Fn(&str) -> Option<String>,
{
    match env(key) {
        Some(raw) => raw
            .trim()
            .parse::<u16>()
            .map(Some)
            .map_err(|_| EngineError::invalid_config(key, raw)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = TorConfig::resolve_with(TorOptions::new(), lookup(&[])).unwrap();
        assert_eq!(config.address, "127.0.0.1");
        assert_eq!(config.port, 9050);
        assert_eq!(config.control_port, 9051);
        assert!(!config.control_password.is_set());
        assert_eq!(config.proxy_uri(), "socks5h://127.0.0.1:9050");
    }

    #[test]
    fn test_environment_overrides_defaults() {
        let env = lookup(&[
            (ENV_ADDRESS, "10.0.0.2"),
            (ENV_PORT, "9150"),
            (ENV_CONTROL_PORT, "9151"),
            (ENV_CONTROL_PASSWORD, "from-env"),
        ]);
        let config = TorConfig::resolve_with(TorOptions::new(), env).unwrap();
        assert_eq!(config.address, "10.0.0.2");
        assert_eq!(config.port, 9150);
        assert_eq!(config.control_port, 9151);
        assert_eq!(
            config.control_password.require().unwrap().as_str(),
            "from-env"
        );
    }

    #[test]
    fn test_explicit_overrides_environment() {
        let env = lookup(&[
            (ENV_ADDRESS, "10.0.0.2"),
            (ENV_PORT, "9150"),
            (ENV_CONTROL_PASSWORD, "from-env"),
        ]);
        let options = TorOptions::new()
            .address("192.168.1.5")
            .port(1080)
            .control_port(1081)
            .control_password("explicit");
        let config = TorConfig::resolve_with(options, env).unwrap();
        assert_eq!(config.address, "192.168.1.5");
        assert_eq!(config.port, 1080);
        assert_eq!(config.control_port, 1081);
        assert_eq!(
            config.control_password.require().unwrap().as_str(),
            "explicit"
        );
    }

    #[test]
    fn test_each_setting_resolves_independently() {
        let env = lookup(&[(ENV_CONTROL_PORT, "9999")]);
        let config = TorConfig::resolve_with(TorOptions::new().port(9150), env).unwrap();
        assert_eq!(config.address, DEFAULT_ADDRESS);
        assert_eq!(config.port, 9150);
        assert_eq!(config.control_port, 9999);
    }

    #[test]
    fn test_empty_values_fall_through() {
        let env = lookup(&[(ENV_ADDRESS, ""), (ENV_CONTROL_PASSWORD, "")]);
        let config =
            TorConfig::resolve_with(TorOptions::new().control_password(""), env).unwrap();
        assert_eq!(config.address, DEFAULT_ADDRESS);
        assert!(!config.control_password.is_set());
    }

    #[test]
    fn test_proxy_uri_brackets_ipv6() {
        let env = lookup(&[(ENV_ADDRESS, "::1")]);
        let config = TorConfig::resolve_with(TorOptions::new(), env).unwrap();
        assert_eq!(config.proxy_uri(), "socks5h://[::1]:9050");

        let named = TorConfig::resolve_with(TorOptions::new().address("tor.internal"), lookup(&[]))
            .unwrap();
        assert_eq!(named.proxy_uri(), "socks5h://tor.internal:9050");
    }

    #[test]
    fn test_invalid_env_port() {
        let env = lookup(&[(ENV_PORT, "ninety-fifty")]);
        let err = TorConfig::resolve_with(TorOptions::new(), env).unwrap_err();
        match err {
            EngineError::InvalidConfig { key, value } => {
                assert_eq!(key, ENV_PORT);
                assert_eq!(value, "ninety-fifty");
            }
            other => panic!("Expected InvalidConfig, got {:?}", other),
        }
    }

    #[test]
    fn test_unset_password_is_required() {
        let err = ControlPassword::Unset.require().unwrap_err();
        assert!(matches!(err, EngineError::MissingControlPassword));
        assert_eq!(format!("{:?}", ControlPassword::new("x")), "Provided(<redacted>)");
    }
}
