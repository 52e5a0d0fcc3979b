//! Control channel abstraction and its open/closed state machine.
//!
//! The channel is a side connection to the Tor daemon used only to send
//! signals such as `NEWNYM`. [`ControlConnector`] and [`ControlConnection`]
//! are the seam between the engine and the protocol client; the default
//! implementation is [`TorControlConnector`](crate::tor::connection::TorControlConnector).

use crate::base::engineerror::EngineError;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use zeroize::Zeroizing;

/// Signals understood by the Tor daemon that this crate can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Switch to clean circuits so new traffic exits elsewhere.
    NewNym,
    /// Forget cached DNS answers.
    ClearDnsCache,
    /// Log a heartbeat message.
    Heartbeat,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::NewNym => "NEWNYM",
            Signal::ClearDnsCache => "CLEARDNSCACHE",
            Signal::Heartbeat => "HEARTBEAT",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where and how to authenticate a control connection.
#[derive(Clone)]
pub struct ControlTarget {
    pub host: String,
    pub port: u16,
    pub password: Zeroizing<String>,
}

impl fmt::Debug for ControlTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Future returned by [`ControlConnector::connect`].
pub type Connecting<'a> = BoxFuture<'a, Result<Box<dyn ControlConnection>, EngineError>>;

/// Opens authenticated control connections.
///
/// Returns boxed futures so connectors can be stored as trait objects.
pub trait ControlConnector: Send + Sync {
    /// Connect to `target` and authenticate. A rejected password must
    /// surface as [`EngineError::Authentication`].
    fn connect<'a>(&'a self, target: &'a ControlTarget) -> Connecting<'a>;
}

impl<C: ControlConnector + ?Sized> ControlConnector for Arc<C> {
    fn connect<'a>(&'a self, target: &'a ControlTarget) -> Connecting<'a> {
        (**self).connect(target)
    }
}

/// An open, authenticated control connection.
pub trait ControlConnection: Send + Sync {
    fn signal(&mut self, signal: Signal) -> BoxFuture<'_, Result<(), EngineError>>;

    /// End the session and release the connection.
    fn close(self: Box<Self>) -> BoxFuture<'static, Result<(), EngineError>>;
}

/// Whether a control connection is held.
#[derive(Default)]
pub enum ControllerState {
    #[default]
    Closed,
    Open(Box<dyn ControlConnection>),
}

impl ControllerState {
    pub fn is_open(&self) -> bool {
        matches!(self, ControllerState::Open(_))
    }
}

impl fmt::Debug for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerState::Closed => f.write_str("Closed"),
            ControllerState::Open(_) => f.write_str("Open"),
        }
    }
}

/// Drives one control channel through its Closed/Open transitions.
pub struct Controller {
    connector: Arc<dyn ControlConnector>,
    state: ControllerState,
}

impl Controller {
    pub fn new(connector: Arc<dyn ControlConnector>) -> Self {
        Self {
            connector,
            state: ControllerState::Closed,
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    pub fn connector(&self) -> Arc<dyn ControlConnector> {
        self.connector.clone()
    }

    /// Closed → Open. Opening an open channel is rejected.
    pub async fn open(&mut self, target: &ControlTarget) -> Result<(), EngineError> {
        if self.state.is_open() {
            return Err(EngineError::ControllerAlreadyActive);
        }
        let conn = self.connector.connect(target).await?;
        self.state = ControllerState::Open(conn);
        tracing::debug!(host = %target.host, port = target.port, "control channel opened");
        Ok(())
    }

    /// Open → Closed. Closing a closed channel does nothing.
    ///
    /// The state is Closed afterwards even when the goodbye exchange fails.
    pub async fn close(&mut self) -> Result<(), EngineError> {
        match std::mem::take(&mut self.state) {
            ControllerState::Closed => {
                tracing::debug!("control channel already closed");
                Ok(())
            }
            ControllerState::Open(conn) => {
                let result = conn.close().await;
                tracing::debug!(ok = result.is_ok(), "control channel closed");
                result
            }
        }
    }

    /// Drop an open connection without the goodbye exchange. Returns whether
    /// one was held.
    pub fn abandon(&mut self) -> bool {
        let was_open = self.state.is_open();
        self.state = ControllerState::Closed;
        was_open
    }

    /// Send `signal`; fails without I/O when the channel is closed.
    pub async fn signal(&mut self, signal: Signal) -> Result<(), EngineError> {
        match &mut self.state {
            ControllerState::Closed => Err(EngineError::ControllerNotActive),
            ControllerState::Open(conn) => conn.signal(signal).await,
        }
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("state", &self.state)
            .finish()
    }
}
