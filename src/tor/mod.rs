//! Tor-backed engine.
//!
//! [`TorEngine`] routes every request through Tor's SOCKS port and keeps a
//! control channel it can open on demand to ask the daemon for a new
//! identity (`SIGNAL NEWNYM`), so later requests exit from a different
//! address.
//!
//! # Example
//!
//! ```rust,ignore
//! use rasp::engine::FetchOptions;
//! use rasp::http::headerset::HeaderSet;
//! use rasp::tor::{config::TorOptions, TorEngine};
//!
//! let mut engine = TorEngine::new(
//!     HeaderSet::new(),
//!     TorOptions::new().control_password("raspdefaulttorpass"),
//! )?;
//!
//! // One open/NEWNYM/close cycle, then the GET.
//! let page = engine
//!     .fetch("https://check.torproject.org/", FetchOptions::new().refresh_ip(true))
//!     .await?;
//!
//! // Several rotations on one control connection.
//! engine
//!     .with_refreshable_identity(|tor| Box::pin(async move {
//!         tor.refresh_ip().await?;
//!         tor.get("https://example.com/").await
//!     }))
//!     .await?;
//! ```

pub mod config;
pub mod connection;
pub mod control;
pub mod reply;

use crate::base::engineerror::EngineError;
use crate::engine::fetch::{validate_url, FetchOptions};
use crate::engine::{CurriedFetch, Engine, SessionOptions};
use crate::http::headerset::HeaderSet;
use crate::http::webpage::Webpage;
use crate::proxy::ProxySettings;
use config::{ControlPassword, TorConfig, TorOptions};
use connection::TorControlConnector;
use control::{ControlConnector, ControlTarget, Controller, ControllerState, Signal};
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Engine whose traffic goes through Tor, with identity refresh.
#[derive(Debug)]
pub struct TorEngine {
    engine: Engine,
    config: TorConfig,
    controller: Controller,
    /// Liveness flag of the running scoped identity, if any.
    scope: Option<Arc<AtomicBool>>,
}

/// Marks a scoped identity as finished when its future completes or is
/// dropped.
struct ScopeGuard(Arc<AtomicBool>);

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl TorEngine {
    /// Resolve `options` against the environment and build the engine.
    pub fn new(headers: HeaderSet, options: TorOptions) -> Result<Self, EngineError> {
        Self::from_config(headers, TorConfig::resolve(options)?)
    }

    /// Build from already resolved settings.
    pub fn from_config(headers: HeaderSet, config: TorConfig) -> Result<Self, EngineError> {
        Self::with_connector(headers, config, Arc::new(TorControlConnector::new()))
    }

    /// Build with a custom control-channel implementation.
    pub fn with_connector(
        headers: HeaderSet,
        config: TorConfig,
        connector: Arc<dyn ControlConnector>,
    ) -> Result<Self, EngineError> {
        let options = SessionOptions {
            proxy: Some(ProxySettings::new(&config.proxy_uri())?),
            ..SessionOptions::default()
        };
        Self::assemble(headers, options, config, connector)
    }

    fn assemble(
        headers: HeaderSet,
        options: SessionOptions,
        config: TorConfig,
        connector: Arc<dyn ControlConnector>,
    ) -> Result<Self, EngineError> {
        let engine = Engine::with_options(headers, options)?;
        tracing::debug!(
            proxy = %config.proxy_uri(),
            control_port = config.control_port,
            password_set = config.control_password.is_set(),
            "tor engine ready"
        );
        Ok(Self {
            engine,
            config,
            controller: Controller::new(connector),
            scope: None,
        })
    }

    pub fn config(&self) -> &TorConfig {
        &self.config
    }

    pub fn address(&self) -> &str {
        &self.config.address
    }

    pub fn port(&self) -> u16 {
        self.config.port
    }

    pub fn control_port(&self) -> u16 {
        self.config.control_port
    }

    /// Supply the control password after construction.
    pub fn set_control_password(&mut self, password: impl Into<String>) {
        self.config.control_password = ControlPassword::new(password);
    }

    /// The underlying proxied engine.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn headers(&self) -> &HeaderSet {
        self.engine.headers()
    }

    pub fn headers_mut(&mut self) -> &mut HeaderSet {
        self.engine.headers_mut()
    }

    pub fn set_header(&mut self, name: &str, value: &str) -> Result<(), EngineError> {
        self.engine.set_header(name, value)
    }

    pub fn controller_state(&self) -> &ControllerState {
        self.controller.state()
    }

    pub fn is_controller_open(&self) -> bool {
        self.controller.is_open()
    }

    fn control_target(&self) -> Result<ControlTarget, EngineError> {
        Ok(ControlTarget {
            host: self.config.address.clone(),
            port: self.config.control_port,
            password: self.config.control_password.require()?.clone(),
        })
    }

    /// A scoped identity whose future was dropped mid-run leaves its
    /// connection open and possibly mid-reply. Drop it so the next user
    /// starts from Closed.
    fn reclaim_abandoned_scope(&mut self) {
        let abandoned = self
            .scope
            .as_ref()
            .is_some_and(|alive| !alive.load(Ordering::Acquire));
        if abandoned {
            self.scope = None;
            if self.controller.abandon() {
                tracing::warn!("dropped control connection left open by a cancelled scope");
            }
        }
    }

    /// Open an authenticated control connection.
    pub async fn open_controller(&mut self) -> Result<(), EngineError> {
        self.reclaim_abandoned_scope();
        let target = self.control_target()?;
        self.controller.open(&target).await
    }

    /// Close the control connection. A no-op when it is not open.
    pub async fn close_controller(&mut self) -> Result<(), EngineError> {
        self.reclaim_abandoned_scope();
        self.controller.close().await
    }

    /// Send `signal` over the open control connection.
    pub async fn signal(&mut self, signal: Signal) -> Result<(), EngineError> {
        self.reclaim_abandoned_scope();
        self.controller.signal(signal).await
    }

    /// Ask Tor for new circuits so subsequent traffic exits elsewhere.
    ///
    /// Requires an open controller; see [`open_controller`](Self::open_controller)
    /// and [`with_refreshable_identity`](Self::with_refreshable_identity).
    pub async fn refresh_ip(&mut self) -> Result<(), EngineError> {
        self.signal(Signal::NewNym).await?;
        tracing::info!(address = %self.config.address, port = self.config.control_port, "requested new tor identity");
        Ok(())
    }

    /// Run `op` with the controller open, closing it on every exit path.
    ///
    /// When both `op` and the close fail, `op`'s error is returned. If the
    /// returned future is dropped before it finishes, the close is skipped;
    /// the next control operation on this engine discards the leftover
    /// connection instead of reusing it.
    pub async fn with_refreshable_identity<T, F>(&mut self, op: F) -> Result<T, EngineError>
    where
        F: for<'a> FnOnce(&'a mut TorEngine) -> BoxFuture<'a, Result<T, EngineError>>,
    {
        self.open_controller().await?;
        let alive = Arc::new(AtomicBool::new(true));
        let _guard = ScopeGuard(alive.clone());
        self.scope = Some(alive);

        let result = op(self).await;
        let closed = self.close_controller().await;
        self.scope = None;

        match (result, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                tracing::warn!(error = %close_err, "control channel close failed after error");
                Err(e)
            }
        }
    }

    /// Fetch `url` through Tor.
    ///
    /// With `options.refresh_ip` set, a new identity is requested first and
    /// a failed refresh aborts the fetch. An already open controller is
    /// reused; otherwise one open/signal/close cycle runs.
    pub async fn fetch(
        &mut self,
        url: &str,
        options: FetchOptions,
    ) -> Result<Option<Webpage>, EngineError> {
        validate_url(url)?;
        self.reclaim_abandoned_scope();
        if options.wants_refresh() {
            if self.controller.is_open() {
                self.refresh_ip().await?;
            } else {
                self.with_refreshable_identity(|tor| Box::pin(tor.refresh_ip()))
                    .await?;
            }
        }
        self.engine.fetch(url, options).await
    }

    /// Fetch `url` with no extra params or headers.
    pub async fn get(&mut self, url: &str) -> Result<Option<Webpage>, EngineError> {
        self.fetch(url, FetchOptions::default()).await
    }

    /// Freeze the current headers; the curried fetch still goes through Tor
    /// but never refreshes the identity.
    pub fn curry(&self) -> CurriedFetch {
        self.engine.curry()
    }

    /// Same headers and Tor settings, new session, controller closed.
    pub fn duplicate(&self) -> Result<Self, EngineError> {
        Self::assemble(
            self.engine.headers().clone(),
            self.engine.session_options().clone(),
            self.config.clone(),
            self.controller.connector(),
        )
    }
}
