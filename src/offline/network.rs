//! The network behind the offline worker.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use super::http::{Request, Response};
use crate::utils::mime;
use crate::utils::path::{is_external_link, resolve_route};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("offline: {0}")]
    Offline(String),

    #[error("cannot fetch {url}: {source}")]
    Io {
        url: String,
        #[source]
        source: io::Error,
    },
}

/// Fetches a request from upstream. An `Ok` response may still be non-2xx;
/// `Err` means no response at all.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError>;
}

/// Serves a built site directory the way a static host would.
#[derive(Debug, Clone)]
pub struct DirOrigin {
    root: PathBuf,
}

impl DirOrigin {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl Network for DirOrigin {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        if is_external_link(&request.url) {
            return Err(FetchError::Offline(request.url.clone()));
        }
        let Some(path) = resolve_route(&self.root, &request.url) else {
            return Ok(Response::not_found());
        };

        let body = tokio::fs::read(&path).await.map_err(|source| FetchError::Io {
            url: request.url.clone(),
            source,
        })?;
        Ok(Response::new(200, mime::from_path(&path), body))
    }
}
