//! Ergonomic error context helpers.
//!
//! Provides extension traits for adding context to `Result` types,
//! converting IO errors into context-rich `EngineError` variants.

use crate::base::engineerror::EngineError;
use std::io;

/// Extension trait for adding context to IO Results.
pub trait IoResultExt<T> {
    /// Add control-port connection context to an IO error.
    ///
    /// # Example
    /// ```ignore
    /// use rasp::base::context::IoResultExt;
    ///
    /// let stream = TcpStream::connect(("127.0.0.1", 9051)).await
    ///     .control_context("127.0.0.1", 9051)?;
    /// // Error: "Control connection to 127.0.0.1:9051 failed: connection refused"
    /// ```
    fn control_context(self, host: &str, port: u16) -> Result<T, EngineError>;

    /// Wrap an IO error raised on an already established control connection.
    fn control_io(self) -> Result<T, EngineError>;
}

impl<T> IoResultExt<T> for Result<T, io::Error> {
    fn control_context(self, host: &str, port: u16) -> Result<T, EngineError> {
        self.map_err(|source| EngineError::ControlConnectionFailed {
            host: host.to_string(),
            port,
            source,
        })
    }

    fn control_io(self) -> Result<T, EngineError> {
        self.map_err(|source| EngineError::ControlIo { source })
    }
}
