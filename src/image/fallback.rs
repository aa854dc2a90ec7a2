//! Progressive format fallback for a single image element.
//!
//! ```text
//!            load ok                           load ok
//!   Attempting(best) ──────► Succeeded    Attempting(original) ──► Succeeded
//!         │ load error                          │ load error
//!         ▼                                     ▼
//!   Attempting(next) ── ... ──────────────►  Exhausted
//! ```
//!
//! The candidate chain is fixed when the loader is created: the modern
//! formats the capability snapshot reports as supported, in preference
//! order, followed by the original. Every candidate is attempted at most
//! once and nothing is retried, so the chain doubles as the attempt budget.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use super::format::{ImageFormat, resolve};
use super::probe::{CapabilitySnapshot, DecodeError};
use super::request::ImageRequest;
use crate::debug;

// ============================================================================
// Loading
// ============================================================================

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("fetch failed: {0}")]
    Fetch(String),
}

/// Something that can load (fetch and decode) an image by URL path.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn load(&self, src: &str) -> Result<(), LoadError>;
}

// ============================================================================
// State machine
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// One load of this format is in flight.
    Attempting(ImageFormat),
    /// Terminal: the format's path stays the display source.
    Succeeded(ImageFormat),
    /// Terminal: every candidate failed; render a placeholder.
    Exhausted,
}

impl LoadState {
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Attempting(_))
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attempting(format) => write!(f, "attempting {format}"),
            Self::Succeeded(format) => write!(f, "loaded {format}"),
            Self::Exhausted => f.write_str("exhausted"),
        }
    }
}

type ExhaustedCallback = Box<dyn FnOnce(&ImageRequest) + Send>;

/// Per-element fallback controller.
pub struct FallbackLoader {
    request: ImageRequest,
    chain: Vec<ImageFormat>,
    /// Index into `chain` of the current (or last) attempt.
    cursor: usize,
    state: LoadState,
    attempts: Vec<ImageFormat>,
    on_exhausted: Option<ExhaustedCallback>,
}

impl FallbackLoader {
    /// Create a loader in `Attempting(best supported format)`.
    ///
    /// Modern candidates whose sibling path equals the canonical path
    /// (extensionless sources) are left out, so such sources go straight
    /// to the original.
    pub fn new(request: ImageRequest, caps: CapabilitySnapshot) -> Self {
        let path = request.canonical_path.as_str();
        let chain: Vec<_> = ImageFormat::MODERN
            .into_iter()
            .filter(|f| caps.supports(*f) && resolve(path, *f) != path)
            .chain(std::iter::once(ImageFormat::Original))
            .collect();

        let first = chain[0];
        Self {
            request,
            chain,
            cursor: 0,
            state: LoadState::Attempting(first),
            attempts: vec![first],
            on_exhausted: None,
        }
    }

    /// Invoke `callback` once if the loader reaches `Exhausted`.
    pub fn on_exhausted(mut self, callback: impl FnOnce(&ImageRequest) + Send + 'static) -> Self {
        self.on_exhausted = Some(Box::new(callback));
        self
    }

    pub fn request(&self) -> &ImageRequest {
        &self.request
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Formats attempted so far, in order.
    pub fn attempts(&self) -> &[ImageFormat] {
        &self.attempts
    }

    /// Source the element should currently request or display.
    ///
    /// `None` once exhausted.
    pub fn current_src(&self) -> Option<String> {
        match self.state {
            LoadState::Attempting(f) | LoadState::Succeeded(f) => {
                Some(resolve(&self.request.canonical_path, f))
            }
            LoadState::Exhausted => None,
        }
    }

    /// The in-flight attempt loaded.
    pub fn on_load(&mut self) -> LoadState {
        if let LoadState::Attempting(f) = self.state {
            self.state = LoadState::Succeeded(f);
        }
        self.state
    }

    /// The in-flight attempt failed; advance to the next candidate.
    pub fn on_error(&mut self) -> LoadState {
        if !matches!(self.state, LoadState::Attempting(_)) {
            return self.state;
        }

        self.cursor += 1;
        match self.chain.get(self.cursor) {
            Some(&next) => {
                self.state = LoadState::Attempting(next);
                self.attempts.push(next);
            }
            None => {
                self.state = LoadState::Exhausted;
                if let Some(callback) = self.on_exhausted.take() {
                    callback(&self.request);
                }
            }
        }
        self.state
    }

    /// Run the machine to a terminal state, one load per attempt.
    pub async fn drive(&mut self, source: &dyn ImageSource) -> LoadState {
        while let Some(src) = self.pending_src() {
            match source.load(&src).await {
                Ok(()) => {
                    self.on_load();
                }
                Err(e) => {
                    debug!("fallback"; "{}: {}", src, e);
                    self.on_error();
                }
            }
        }
        self.state
    }

    fn pending_src(&self) -> Option<String> {
        match self.state {
            LoadState::Attempting(_) => self.current_src(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use rustc_hash::FxHashSet;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Source that succeeds only for the listed paths and records every load.
    struct Scripted {
        available: FxHashSet<String>,
        loads: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn with(paths: &[&str]) -> Self {
            Self {
                available: paths.iter().map(|p| p.to_string()).collect(),
                loads: Mutex::new(Vec::new()),
            }
        }

        fn loads(&self) -> Vec<String> {
            self.loads.lock().clone()
        }
    }

    #[async_trait]
    impl ImageSource for Scripted {
        async fn load(&self, src: &str) -> Result<(), LoadError> {
            self.loads.lock().push(src.to_string());
            if self.available.contains(src) {
                Ok(())
            } else {
                Err(LoadError::NotFound(src.to_string()))
            }
        }
    }

    const WEBP_ONLY: CapabilitySnapshot = CapabilitySnapshot {
        avif_supported: false,
        webp_supported: true,
    };

    const AVIF_ONLY: CapabilitySnapshot = CapabilitySnapshot {
        avif_supported: true,
        webp_supported: false,
    };

    fn avatar() -> ImageRequest {
        ImageRequest::new("/images/avatar.jpg")
    }

    #[test]
    fn test_initial_state_follows_capabilities() {
        let loader = FallbackLoader::new(avatar(), CapabilitySnapshot::ALL);
        assert_eq!(loader.state(), LoadState::Attempting(ImageFormat::Avif));
        assert_eq!(loader.current_src().as_deref(), Some("/images/avatar.avif"));

        let loader = FallbackLoader::new(avatar(), WEBP_ONLY);
        assert_eq!(loader.state(), LoadState::Attempting(ImageFormat::Webp));

        let loader = FallbackLoader::new(avatar(), CapabilitySnapshot::default());
        assert_eq!(loader.state(), LoadState::Attempting(ImageFormat::Original));
    }

    #[tokio::test]
    async fn test_all_siblings_present_uses_best_format() {
        let source = Scripted::with(&[
            "/images/avatar.avif",
            "/images/avatar.webp",
            "/images/avatar.jpg",
        ]);

        let mut loader = FallbackLoader::new(avatar(), CapabilitySnapshot::ALL);
        assert_eq!(loader.drive(&source).await, LoadState::Succeeded(ImageFormat::Avif));
        assert_eq!(source.loads(), vec!["/images/avatar.avif"]);

        let mut loader = FallbackLoader::new(avatar(), WEBP_ONLY);
        assert_eq!(loader.drive(&source).await, LoadState::Succeeded(ImageFormat::Webp));
    }

    #[tokio::test]
    async fn test_missing_siblings_fall_back_to_original() {
        let source = Scripted::with(&["/images/avatar.jpg"]);
        let mut loader = FallbackLoader::new(avatar(), CapabilitySnapshot::ALL);

        assert_eq!(
            loader.drive(&source).await,
            LoadState::Succeeded(ImageFormat::Original)
        );
        assert_eq!(
            source.loads(),
            vec!["/images/avatar.avif", "/images/avatar.webp", "/images/avatar.jpg"]
        );
        assert_eq!(loader.attempts(), ImageFormat::PREFERENCE);
        assert_eq!(loader.current_src().as_deref(), Some("/images/avatar.jpg"));
    }

    #[tokio::test]
    async fn test_unsupported_format_is_never_attempted() {
        let source = Scripted::with(&["/images/avatar.jpg"]);
        let mut loader = FallbackLoader::new(avatar(), AVIF_ONLY);

        loader.drive(&source).await;
        assert_eq!(loader.attempts(), [ImageFormat::Avif, ImageFormat::Original]);
    }

    #[tokio::test]
    async fn test_exhaustion_invokes_callback_once() {
        let source = Scripted::with(&[]);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let mut loader = FallbackLoader::new(avatar(), CapabilitySnapshot::ALL).on_exhausted(
            move |req| {
                assert_eq!(req.canonical_path, "/images/avatar.jpg");
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );

        assert_eq!(loader.drive(&source).await, LoadState::Exhausted);
        assert_eq!(loader.current_src(), None);
        assert_eq!(source.loads().len(), 3);

        // Late events in a terminal state change nothing
        assert_eq!(loader.on_error(), LoadState::Exhausted);
        assert_eq!(loader.on_load(), LoadState::Exhausted);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_attempts_strictly_descending() {
        let mut loader = FallbackLoader::new(avatar(), CapabilitySnapshot::ALL);
        while !loader.state().is_terminal() {
            loader.on_error();
        }
        let attempts = loader.attempts();
        assert!(attempts.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_success_is_terminal() {
        let mut loader = FallbackLoader::new(avatar(), CapabilitySnapshot::ALL);
        assert_eq!(loader.on_load(), LoadState::Succeeded(ImageFormat::Avif));
        assert_eq!(loader.on_error(), LoadState::Succeeded(ImageFormat::Avif));
        assert_eq!(loader.attempts(), [ImageFormat::Avif]);
    }

    #[tokio::test]
    async fn test_extensionless_source_goes_straight_to_original() {
        let source = Scripted::with(&[]);
        let mut loader =
            FallbackLoader::new(ImageRequest::new("https://cdn.example.com/abc"), CapabilitySnapshot::ALL);

        assert_eq!(loader.state(), LoadState::Attempting(ImageFormat::Original));
        assert_eq!(loader.drive(&source).await, LoadState::Exhausted);
        assert_eq!(source.loads(), vec!["https://cdn.example.com/abc"]);
    }
}
