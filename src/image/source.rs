//! Image sources backed by the site directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use super::fallback::{ImageSource, LoadError};
use super::probe::Decoder;
use crate::utils::path::url_to_file;

/// Loads images from the built site and decodes them as a client would.
///
/// A load fails if the file is missing or the client's decoder rejects it,
/// which is exactly what drives a browser's `onerror`.
pub struct SiteSource {
    root: PathBuf,
    decoder: Arc<dyn Decoder>,
}

impl SiteSource {
    pub fn new(root: impl Into<PathBuf>, decoder: Arc<dyn Decoder>) -> Self {
        Self {
            root: root.into(),
            decoder,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ImageSource for SiteSource {
    async fn load(&self, src: &str) -> Result<(), LoadError> {
        let path = url_to_file(&self.root, src)
            .ok_or_else(|| LoadError::Fetch(format!("not a site path: {src}")))?;

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(LoadError::NotFound(src.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        self.decoder.decode(&bytes).await?;
        Ok(())
    }
}
