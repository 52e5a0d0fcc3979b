//! Fetch functions bound to a frozen header snapshot.

use crate::base::engineerror::EngineError;
use crate::engine::fetch::{fetch_page, FetchOptions};
use crate::http::headerset::HeaderSet;
use crate::http::webpage::Webpage;

/// A fetch bound to the engine's headers as they were when
/// [`Engine::curry`](crate::engine::Engine::curry) ran.
///
/// The snapshot is an owned copy: editing the engine's headers afterwards
/// never changes what a curried fetch sends. The session is shared with the
/// engine, so cookies and pooled connections still carry over.
#[derive(Debug, Clone)]
pub struct CurriedFetch {
    session: reqwest::Client,
    headers: HeaderSet,
}

impl CurriedFetch {
    pub(crate) fn new(session: reqwest::Client, headers: HeaderSet) -> Self {
        Self { session, headers }
    }

    /// The frozen base headers.
    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    /// Fetch `url` with the snapshot headers; same contract as
    /// [`Engine::fetch`](crate::engine::Engine::fetch).
    pub async fn fetch(
        &self,
        url: &str,
        options: FetchOptions,
    ) -> Result<Option<Webpage>, EngineError> {
        fetch_page(&self.session, &self.headers, url, &options).await
    }

    /// Fetch `url` with no extra params or headers.
    pub async fn get(&self, url: &str) -> Result<Option<Webpage>, EngineError> {
        self.fetch(url, FetchOptions::default()).await
    }
}
