use thiserror::Error;

/// Broad classification of an [`EngineError`].
///
/// Callers that only care about *what kind* of failure happened (for example
/// to decide whether to rotate the Tor identity and try again themselves)
/// match on this instead of the full error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Empty or malformed fetch target, or an unusable header.
    InvalidArgument,
    /// The HTTP transport failed, or the server answered with a
    /// non-success status other than not-found.
    TransportFailure,
    /// The Tor daemon rejected the control password.
    AuthenticationError,
    /// A control operation needed an open controller and there was none.
    ControllerNotActive,
    /// Settings could not be resolved into a usable configuration.
    Configuration,
    /// The control connection failed or replied with something unexpected.
    ControlProtocol,
}

#[derive(Debug, Error)]
pub enum EngineError {
    // Argument Errors
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },
    #[error("Invalid header {name:?}")]
    InvalidHeader { name: String },

    // Transport Errors
    #[error("Transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP status {status} for {url}")]
    HttpStatus { status: u16, url: String },
    #[error("Failed to decode response body: {reason}")]
    BodyDecode { reason: String },

    // Control Channel Errors
    #[error("Control authentication failed: {message}")]
    Authentication { message: String },
    #[error("Signal controller has not been activated")]
    ControllerNotActive,
    #[error("Signal controller is already active")]
    ControllerAlreadyActive,
    #[error("Control connection to {host}:{port} failed: {source}")]
    ControlConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("Control connection I/O failed: {source}")]
    ControlIo {
        #[source]
        source: std::io::Error,
    },
    #[error("Control protocol error {code}: {message}")]
    ControlProtocol { code: u16, message: String },
    #[error("Malformed control reply: {line:?}")]
    MalformedReply { line: String },

    // Configuration Errors
    #[error("No control password configured")]
    MissingControlPassword,
    #[error("Invalid value {value:?} for {key}")]
    InvalidConfig { key: String, value: String },
}

impl EngineError {
    /// Create an invalid argument error.
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        EngineError::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Create an authentication error from the daemon's reply text.
    pub fn authentication(message: impl Into<String>) -> Self {
        EngineError::Authentication {
            message: message.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(key: impl Into<String>, value: impl Into<String>) -> Self {
        EngineError::InvalidConfig {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InvalidArgument { .. } | EngineError::InvalidHeader { .. } => {
                ErrorKind::InvalidArgument
            }
            EngineError::Transport(_)
            | EngineError::HttpStatus { .. }
            | EngineError::BodyDecode { .. } => ErrorKind::TransportFailure,
            EngineError::Authentication { .. } => ErrorKind::AuthenticationError,
            EngineError::ControllerNotActive => ErrorKind::ControllerNotActive,
            EngineError::MissingControlPassword | EngineError::InvalidConfig { .. } => {
                ErrorKind::Configuration
            }
            EngineError::ControllerAlreadyActive
            | EngineError::ControlConnectionFailed { .. }
            | EngineError::ControlIo { .. }
            | EngineError::ControlProtocol { .. }
            | EngineError::MalformedReply { .. } => ErrorKind::ControlProtocol,
        }
    }

    /// Status code for [`EngineError::HttpStatus`], or the transport's own
    /// status if it carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            EngineError::HttpStatus { status, .. } => Some(*status),
            EngineError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
