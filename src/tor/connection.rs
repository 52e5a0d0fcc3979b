//! Tor control protocol client over TCP.
//!
//! Speaks the small subset the engine needs: `AUTHENTICATE`, `SIGNAL` and
//! `QUIT`. Commands are CRLF-terminated lines; replies are parsed by
//! [`ReplyParser`].

use crate::base::context::IoResultExt;
use crate::base::engineerror::EngineError;
use crate::tor::control::{Connecting, ControlConnection, ControlConnector, ControlTarget, Signal};
use crate::tor::reply::{Reply, ReplyParser, AUTH_FAILED, AUTH_REQUIRED};
use futures::future::BoxFuture;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Longest reply line accepted, terminator included.
pub const MAX_LINE_LEN: usize = 8 * 1024;

/// Connects to a Tor control port and authenticates with a password.
#[derive(Debug, Clone, Copy, Default)]
pub struct TorControlConnector;

impl TorControlConnector {
    pub fn new() -> Self {
        Self
    }
}

impl ControlConnector for TorControlConnector {
    fn connect<'a>(&'a self, target: &'a ControlTarget) -> Connecting<'a> {
        Box::pin(async move {
            let stream = TcpStream::connect((target.host.as_str(), target.port))
                .await
                .control_context(&target.host, target.port)?;
            let mut conn = TorControlConnection::new(stream);
            conn.authenticate(target.password.as_str()).await?;
            tracing::debug!(host = %target.host, port = target.port, "control port authenticated");
            Ok(Box::new(conn) as Box<dyn ControlConnection>)
        })
    }
}

/// One authenticated control-port session.
pub struct TorControlConnection {
    stream: BufReader<TcpStream>,
}

impl TorControlConnection {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream: BufReader::new(stream),
        }
    }

    /// Send one command line and wait for its complete reply.
    pub async fn command(&mut self, line: &str) -> Result<Reply, EngineError> {
        let writer = self.stream.get_mut();
        writer.write_all(line.as_bytes()).await.control_io()?;
        writer.write_all(b"\r\n").await.control_io()?;
        writer.flush().await.control_io()?;
        self.read_reply().await
    }

    async fn read_reply(&mut self) -> Result<Reply, EngineError> {
        let mut parser = ReplyParser::new();
        let mut line = String::new();
        loop {
            line.clear();
            let n = (&mut self.stream)
                .take(MAX_LINE_LEN as u64)
                .read_line(&mut line)
                .await
                .control_io()?;
            if n == MAX_LINE_LEN && !line.ends_with('\n') {
                let head: String = line.chars().take(32).collect();
                return Err(EngineError::MalformedReply {
                    line: format!("{}... ({} bytes without newline)", head, n),
                });
            }
            if n == 0 {
                return Err(EngineError::ControlIo {
                    source: std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "control connection closed mid-reply",
                    ),
                });
            }
            if let Some(reply) = parser.push_line(&line)? {
                return Ok(reply);
            }
        }
    }

    /// `AUTHENTICATE "<password>"`. A 514/515 reply is an authentication
    /// failure; anything else besides 250 is a protocol error.
    pub async fn authenticate(&mut self, password: &str) -> Result<(), EngineError> {
        let reply = self
            .command(&format!("AUTHENTICATE {}", quote(password)))
            .await?;
        match reply.code {
            AUTH_FAILED | AUTH_REQUIRED => Err(EngineError::authentication(reply.message())),
            _ => reply.into_result().map(|_| ()),
        }
    }

    pub async fn send_signal(&mut self, signal: Signal) -> Result<(), EngineError> {
        self.command(&format!("SIGNAL {}", signal.as_str()))
            .await?
            .into_result()
            .map(|_| ())
    }

    /// `QUIT`, then shut the socket down.
    pub async fn quit(mut self) -> Result<(), EngineError> {
        let reply = self.command("QUIT").await;
        let shutdown = self.stream.get_mut().shutdown().await.control_io();
        reply?.into_result()?;
        shutdown
    }
}

impl ControlConnection for TorControlConnection {
    fn signal(&mut self, signal: Signal) -> BoxFuture<'_, Result<(), EngineError>> {
        Box::pin(self.send_signal(signal))
    }

    fn close(self: Box<Self>) -> BoxFuture<'static, Result<(), EngineError>> {
        Box::pin((*self).quit())
    }
}

/// Encode `value` as a control-protocol quoted string.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_plain() {
        assert_eq!(quote("raspdefaulttorpass"), "\"raspdefaulttorpass\"");
        assert_eq!(quote(""), "\"\"");
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("a\"b"), "\"a\\\"b\"");
        assert_eq!(quote("back\\slash"), "\"back\\\\slash\"");
        assert_eq!(quote("line\r\nbreak"), "\"line\\r\\nbreak\"");
    }
}
