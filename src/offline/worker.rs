//! Cache-first request handling with install/activate lifecycle.

use std::sync::Arc;

use futures::future::{join_all, try_join};
use thiserror::Error;

use super::http::{Destination, Request, Response};
use super::network::{FetchError, Network};
use super::storage::{CacheStorage, StorageError};
use crate::debug;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("precache of {url} returned status {status}")]
    Rejected { url: String, status: u16 },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// The two stores a worker version owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreNames {
    /// `{name}-{version}`: pages and other non-image responses.
    pub general: String,
    /// `{name}-images-{version}`.
    pub images: String,
}

impl StoreNames {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            general: format!("{name}-{version}"),
            images: format!("{name}-images-{version}"),
        }
    }

    pub fn contains(&self, store: &str) -> bool {
        store == self.general || store == self.images
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub routes: usize,
    pub images: usize,
}

pub struct OfflineWorker {
    storage: CacheStorage,
    network: Arc<dyn Network>,
    names: StoreNames,
    routes: Vec<String>,
    critical_images: Vec<String>,
}

impl OfflineWorker {
    pub fn new(storage: CacheStorage, network: Arc<dyn Network>, names: StoreNames) -> Self {
        Self {
            storage,
            network,
            names,
            routes: Vec::new(),
            critical_images: Vec::new(),
        }
    }

    /// URLs fetched into the general and image stores on install.
    pub fn with_precache(mut self, routes: Vec<String>, critical_images: Vec<String>) -> Self {
        self.routes = routes;
        self.critical_images = critical_images;
        self
    }

    pub fn names(&self) -> &StoreNames {
        &self.names
    }

    pub fn storage(&self) -> &CacheStorage {
        &self.storage
    }

    /// Pre-populate both stores. Each store is filled all-or-nothing: if any
    /// of its URLs fails or is non-2xx, none of that store's URLs are written.
    pub async fn install(&self) -> Result<InstallReport, WorkerError> {
        let (routes, images) = try_join(
            self.add_all(&self.names.general, &self.routes, Destination::Document),
            self.add_all(&self.names.images, &self.critical_images, Destination::Image),
        )
        .await?;
        Ok(InstallReport { routes, images })
    }

    async fn add_all(
        &self,
        store: &str,
        urls: &[String],
        destination: Destination,
    ) -> Result<usize, WorkerError> {
        let store = self.storage.open(store)?;

        let fetched = join_all(urls.iter().map(|url| async move {
            let response = self
                .network
                .fetch(&Request::new(url.clone(), destination))
                .await?;
            if !response.ok() {
                return Err(WorkerError::Rejected {
                    url: url.clone(),
                    status: response.status,
                });
            }
            Ok::<_, WorkerError>((url, response))
        }))
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

        for (url, response) in &fetched {
            store.put(url, response)?;
        }
        debug!("cache"; "installed {} entries into {}", fetched.len(), store.name());
        Ok(fetched.len())
    }

    /// Delete every store that does not belong to this worker version.
    /// Returns the deleted names.
    pub fn activate(&self) -> Result<Vec<String>, StorageError> {
        let mut deleted = Vec::new();
        for name in self.storage.keys()? {
            if self.names.contains(&name) {
                continue;
            }
            if self.storage.delete(&name)? {
                deleted.push(name);
            }
        }
        Ok(deleted)
    }

    /// Answer one intercepted request.
    ///
    /// Images are cache-first with a placeholder when the network fails.
    /// Everything else is served from a current store when present and from
    /// the network otherwise; a network failure is returned as an error.
    /// An unreadable store or entry is treated as a miss.
    pub async fn handle(&self, request: &Request) -> Result<Response, WorkerError> {
        if request.destination == Destination::Image {
            return Ok(self.handle_image(request).await);
        }

        for name in [&self.names.general, &self.names.images] {
            if !self.storage.has(name) {
                continue;
            }
            if let Some(hit) = self.lookup(name, &request.url) {
                return Ok(hit);
            }
        }
        Ok(self.network.fetch(request).await?)
    }

    async fn handle_image(&self, request: &Request) -> Response {
        if let Some(hit) = self.lookup(&self.names.images, &request.url) {
            return hit;
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.ok() {
                    // Overwrites an unreadable entry, if that caused the miss.
                    let stored = self
                        .storage
                        .open(&self.names.images)
                        .and_then(|store| store.put(&request.url, &response));
                    if let Err(e) = stored {
                        debug!("cache"; "failed to store {}: {}", request.url, e);
                    }
                }
                response
            }
            Err(e) => {
                debug!("cache"; "serving placeholder for {}: {}", request.url, e);
                Response::placeholder()
            }
        }
    }

    fn lookup(&self, store: &str, url: &str) -> Option<Response> {
        let found = self
            .storage
            .open(store)
            .and_then(|store| store.match_url(url));
        match found {
            Ok(hit) => hit,
            Err(e) => {
                debug!("cache"; "{} lookup failed, treating as miss: {}", url, e);
                None
            }
        }
    }
}
