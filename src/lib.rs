//! # rasp
//!
//! A pluggable web-fetching engine.
//!
//! `rasp` wraps one long-lived HTTP session per engine and returns parsed
//! [`Webpage`](http::webpage::Webpage)s. The Tor-backed variant routes every
//! request through Tor's SOCKS port and can ask the daemon for a fresh exit
//! identity between requests.
//!
//! ## Features
//!
//! - **Session reuse**: cookies and pooled connections persist across fetches
//! - **Header snapshots**: [`Engine::curry`](engine::Engine::curry) freezes the
//!   current headers into a reusable fetch function
//! - **Not-found is not an error**: 404/410 come back as `Ok(None)`
//! - **Tor**: SOCKS5 routing plus `NEWNYM` over the control port
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rasp::engine::Engine;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), rasp::base::engineerror::EngineError> {
//!     let engine = Engine::builder()
//!         .header("Accept", "text/html")
//!         .build()?;
//!     if let Some(page) = engine.get("https://example.com").await? {
//!         println!("{}", page.source());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error type and classification
//! - [`engine`] - The base engine, fetch options and curried fetches
//! - [`http`] - Header sets and fetched pages
//! - [`proxy`] - Outbound proxy settings
//! - [`tor`] - Tor-backed engine and control-port client

pub mod base;
pub mod engine;
pub mod http;
pub mod proxy;
pub mod tor;
