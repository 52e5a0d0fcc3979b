//! Base types and error handling.
//!
//! - [`EngineError`](engineerror::EngineError): the crate-wide error type
//! - [`ErrorKind`](engineerror::ErrorKind): coarse classification of failures
//! - [`IoResultExt`](context::IoResultExt): context helpers for control-port I/O

pub mod context;
pub mod engineerror;
