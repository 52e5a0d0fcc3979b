//! Control-port reply parsing.
//!
//! A reply is one or more lines of `NNN<sep>text`. `-` continues the reply,
//! `+` starts a data block that runs until a lone `.`, and a space marks
//! the final line. Every line of one reply carries the same status code.

use crate::base::engineerror::EngineError;

/// Status code for a successful command.
pub const OK: u16 = 250;
/// Authentication required.
pub const AUTH_REQUIRED: u16 = 514;
/// Authentication failed.
pub const AUTH_FAILED: u16 = 515;

/// A complete control-port reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl Reply {
    pub fn is_ok(&self) -> bool {
        self.code == OK
    }

    /// The reply text, lines joined with `\n`.
    pub fn message(&self) -> String {
        self.lines.join("\n")
    }

    /// Turn a non-250 reply into a protocol error.
    pub fn into_result(self) -> Result<Reply, EngineError> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(EngineError::ControlProtocol {
                code: self.code,
                message: self.message(),
            })
        }
    }
}

/// Incremental parser fed one line at a time.
#[derive(Debug, Default)]
pub struct ReplyParser {
    code: Option<u16>,
    lines: Vec<String>,
    in_data: bool,
}

impl ReplyParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line (with or without its CRLF). Returns the reply once its
    /// final line has been seen.
    pub fn push_line(&mut self, raw: &str) -> Result<Option<Reply>, EngineError> {
        let line = raw.trim_end_matches(['\r', '\n']);

        if self.in_data {
            if line == "." {
                self.in_data = false;
            } else {
                // Leading dots are doubled inside data blocks.
                let unescaped = line.strip_prefix('.').filter(|l| l.starts_with('.'));
                self.lines.push(unescaped.unwrap_or(line).to_string());
            }
            return Ok(None);
        }

        let bytes = line.as_bytes();
        if bytes.len() < 4 || !bytes[..3].iter().all(u8::is_ascii_digit) {
            return Err(malformed(line));
        }
        let code: u16 = line[..3].parse().map_err(|_| malformed(line))?;
        if self.code.is_some_and(|expected| expected != code) {
            return Err(malformed(line));
        }
        self.code = Some(code);

        let last = match bytes[3] {
            b' ' => true,
            b'-' => false,
            b'+' => {
                self.in_data = true;
                false
            }
            _ => return Err(malformed(line)),
        };
        // Byte 3 is ASCII, so index 4 is a char boundary.
        self.lines.push(line[4..].to_string());
        if !last {
            return Ok(None);
        }
        self.code = None;
        Ok(Some(Reply {
            code,
            lines: std::mem::take(&mut self.lines),
        }))
    }
}

fn malformed(line: &str) -> EngineError {
    EngineError::MalformedReply {
        line: line.to_string(),
    }
}
