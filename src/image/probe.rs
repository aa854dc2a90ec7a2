//! Format capability probing.
//!
//! A runtime's AVIF/WebP support is detected by decoding two tiny embedded
//! samples through a [`Decoder`]. The result is a [`CapabilitySnapshot`] that
//! is computed once and then shared: concurrent callers join the in-flight
//! probe instead of starting their own.
//!
//! Two decoder families exist:
//!
//! - [`ClientProfile`]: emulates a client's codec table by sniffing the
//!   container (used by `check` and `rewrite` to answer "what would a
//!   browser of this generation see").
//! - [`NativeDecoder`]: really decodes with the `image` crate.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::OnceCell;

use super::format::ImageFormat;
use crate::debug;

/// 1x1 AVIF probe sample.
const AVIF_SAMPLE: &str = "AAAAIGZ0eXBhdmlmAAAAAGF2aWZtaWYxbWlhZk1BMUIAAADybWV0YQAAAAAAAAAoaGRscgAAAAAAAAAAcGljdAAAAAAAAAAAAAAAAGxpYmF2aWYAAAAADnBpdG0AAAAAAAEAAAAeaWxvYwAAAABEAAABAAEAAAABAAABGgAAAB0AAAAoaWluZgAAAAAAAQAAABppbmZlAgAAAAABAABhdjAxQ29sb3IAAAAAamlwcnAAAABLaXBjbwAAABRpc3BlAAAAAAAAAAIAAAACAAAAEHBpeGkAAAAAAwgICAAAAAxhdjFDgQ0MAAAAABNjb2xybmNseAACAAIAAYAAAAAXaXBtYQAAAAAAAAABAAEEAQKDBAAAACVtZGF0EgAKCBgABogQEAwgMg8f8D///8WfhwB8+ErK42A=";

/// 2x2 lossy WebP probe sample.
const WEBP_SAMPLE: &str =
    "UklGRjoAAABXRUJQVlA4IC4AAACyAgCdASoCAAIALmk0mk0iIiIiIgBoSygABc6WWgAA/veff/0PP8bA//LwYAAA";

// ============================================================================
// Decoding
// ============================================================================

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unrecognized image data")]
    Unrecognized,

    #[error("{0} is not supported by this client")]
    Unsupported(&'static str),

    #[error("decode failed: {0}")]
    Image(String),
}

/// A runtime's image decode path.
#[async_trait]
pub trait Decoder: Send + Sync {
    /// Decode `bytes`, succeeding only if the runtime could display them.
    async fn decode(&self, bytes: &[u8]) -> Result<(), DecodeError>;
}

/// Container detected from leading magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Avif,
    Webp,
    /// JPEG, PNG, GIF and the other classic raster formats.
    Raster,
    Svg,
}

/// Identify the container of `bytes`.
pub fn sniff(bytes: &[u8]) -> Option<Container> {
    // ISO-BMFF: [size:4]["ftyp"][brand:4]
    if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" && matches!(&bytes[8..12], b"avif" | b"avis")
    {
        return Some(Container::Avif);
    }
    if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some(Container::Webp);
    }
    if image::guess_format(bytes).is_ok() {
        return Some(Container::Raster);
    }

    let head = &bytes[..bytes.len().min(256)];
    let head = String::from_utf8_lossy(head);
    let head = head.trim_start();
    if head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg")) {
        return Some(Container::Svg);
    }
    None
}

/// Emulated client codec support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientProfile {
    /// Decodes AVIF and WebP.
    #[default]
    Modern,
    /// Decodes WebP but not AVIF.
    Webp,
    /// Decodes neither modern format.
    Legacy,
}

impl ClientProfile {
    pub const fn supports(self, format: ImageFormat) -> bool {
        match (self, format) {
            (_, ImageFormat::Original) => true,
            (Self::Modern, _) => true,
            (Self::Webp, ImageFormat::Webp) => true,
            _ => false,
        }
    }
}

#[async_trait]
impl Decoder for ClientProfile {
    async fn decode(&self, bytes: &[u8]) -> Result<(), DecodeError> {
        match sniff(bytes).ok_or(DecodeError::Unrecognized)? {
            Container::Avif if !self.supports(ImageFormat::Avif) => {
                Err(DecodeError::Unsupported("avif"))
            }
            Container::Webp if !self.supports(ImageFormat::Webp) => {
                Err(DecodeError::Unsupported("webp"))
            }
            _ => Ok(()),
        }
    }
}

/// Decoder backed by the `image` crate's codecs.
///
/// Only formats compiled into `image` decode; AVIF needs a native dav1d
/// build and is reported unsupported otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeDecoder;

#[async_trait]
impl Decoder for NativeDecoder {
    async fn decode(&self, bytes: &[u8]) -> Result<(), DecodeError> {
        if sniff(bytes) == Some(Container::Svg) {
            return Ok(());
        }

        let owned = bytes.to_vec();
        tokio::task::spawn_blocking(move || image::load_from_memory(&owned).map(|_| ()))
            .await
            .map_err(|e| DecodeError::Image(e.to_string()))?
            .map_err(|e| DecodeError::Image(e.to_string()))
    }
}

// ============================================================================
// Capability snapshot
// ============================================================================

/// Modern format support of one runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CapabilitySnapshot {
    pub avif_supported: bool,
    pub webp_supported: bool,
}

impl CapabilitySnapshot {
    /// Snapshot of a runtime that decodes every format.
    pub const ALL: Self = Self {
        avif_supported: true,
        webp_supported: true,
    };

    pub const fn supports(&self, format: ImageFormat) -> bool {
        match format {
            ImageFormat::Avif => self.avif_supported,
            ImageFormat::Webp => self.webp_supported,
            ImageFormat::Original => true,
        }
    }

    /// Most preferred format this runtime can display.
    pub fn best(&self) -> ImageFormat {
        ImageFormat::PREFERENCE
            .into_iter()
            .find(|f| self.supports(*f))
            .unwrap_or(ImageFormat::Original)
    }
}

/// Probe `decoder` once. Never fails: a decode error means "unsupported".
pub async fn detect(decoder: &dyn Decoder) -> CapabilitySnapshot {
    let (avif_supported, webp_supported) = tokio::join!(
        decode_sample(decoder, ImageFormat::Avif, AVIF_SAMPLE),
        decode_sample(decoder, ImageFormat::Webp, WEBP_SAMPLE),
    );

    let snapshot = CapabilitySnapshot {
        avif_supported,
        webp_supported,
    };
    debug!("probe"; "avif: {}, webp: {}", avif_supported, webp_supported);
    snapshot
}

async fn decode_sample(decoder: &dyn Decoder, format: ImageFormat, sample: &str) -> bool {
    let Ok(bytes) = STANDARD.decode(sample) else {
        return false;
    };
    match decoder.decode(&bytes).await {
        Ok(()) => true,
        Err(e) => {
            debug!("probe"; "{} sample: {}", format, e);
            false
        }
    }
}

/// Single-flight capability prober bound to one decoder.
pub struct CapabilityProber {
    decoder: Arc<dyn Decoder>,
    snapshot: OnceCell<CapabilitySnapshot>,
}

impl CapabilityProber {
    pub fn new(decoder: Arc<dyn Decoder>) -> Self {
        Self {
            decoder,
            snapshot: OnceCell::new(),
        }
    }

    /// Probe once; every later or concurrent call shares the first result.
    pub async fn probe(&self) -> CapabilitySnapshot {
        *self
            .snapshot
            .get_or_init(|| detect(self.decoder.as_ref()))
            .await
    }
}

/// The session prober, bound to the first caller's decoder.
static SESSION: OnceLock<CapabilityProber> = OnceLock::new();

/// Capabilities of this session's runtime.
///
/// The first call probes `decoder`; all later calls, whatever decoder they
/// pass, get the memoized snapshot.
pub async fn session_capabilities(decoder: Arc<dyn Decoder>) -> CapabilitySnapshot {
    SESSION
        .get_or_init(|| CapabilityProber::new(decoder))
        .probe()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Decoder that counts calls and takes a while to answer.
    struct SlowCounting {
        calls: AtomicUsize,
        profile: ClientProfile,
    }

    #[async_trait]
    impl Decoder for SlowCounting {
        async fn decode(&self, bytes: &[u8]) -> Result<(), DecodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.profile.decode(bytes).await
        }
    }

    /// Decoder that rejects everything.
    struct Broken;

    #[async_trait]
    impl Decoder for Broken {
        async fn decode(&self, _: &[u8]) -> Result<(), DecodeError> {
            Err(DecodeError::Image("corrupt".into()))
        }
    }

    #[test]
    fn test_samples_sniff_as_their_containers() {
        let avif = STANDARD.decode(AVIF_SAMPLE).unwrap();
        let webp = STANDARD.decode(WEBP_SAMPLE).unwrap();
        assert_eq!(sniff(&avif), Some(Container::Avif));
        assert_eq!(sniff(&webp), Some(Container::Webp));
    }

    #[test]
    fn test_sniff_raster_and_svg() {
        assert_eq!(sniff(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0]), Some(Container::Raster));
        assert_eq!(sniff(b"\x89PNG\r\n\x1a\n\0\0\0\0"), Some(Container::Raster));
        assert_eq!(sniff(b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>"), Some(Container::Svg));
        assert_eq!(sniff(b"hello"), None);
    }

    #[tokio::test]
    async fn test_profiles() {
        assert_eq!(detect(&ClientProfile::Modern).await, CapabilitySnapshot::ALL);
        assert_eq!(
            detect(&ClientProfile::Webp).await,
            CapabilitySnapshot {
                avif_supported: false,
                webp_supported: true
            }
        );
        assert_eq!(detect(&ClientProfile::Legacy).await, CapabilitySnapshot::default());
    }

    #[tokio::test]
    async fn test_decode_failure_resolves_false() {
        assert_eq!(detect(&Broken).await, CapabilitySnapshot::default());
    }

    #[tokio::test]
    async fn test_probe_is_single_flight() {
        let decoder = Arc::new(SlowCounting {
            calls: AtomicUsize::new(0),
            profile: ClientProfile::Modern,
        });
        let prober = CapabilityProber::new(decoder.clone());

        let probes = (0..8).map(|_| prober.probe());
        let results = futures::future::join_all(probes).await;

        assert!(results.iter().all(|s| *s == CapabilitySnapshot::ALL));
        // One decode per sample, shared by all eight callers
        assert_eq!(decoder.calls.load(Ordering::SeqCst), 2);

        prober.probe().await;
        assert_eq!(decoder.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_session_snapshot_is_memoized() {
        let first = session_capabilities(Arc::new(ClientProfile::Webp)).await;
        let second = session_capabilities(Arc::new(ClientProfile::Modern)).await;
        assert_eq!(first, second);
    }

    #[test]
    fn test_best_format() {
        assert_eq!(CapabilitySnapshot::ALL.best(), ImageFormat::Avif);
        let webp_only = CapabilitySnapshot {
            avif_supported: false,
            webp_supported: true,
        };
        assert_eq!(webp_only.best(), ImageFormat::Webp);
        assert_eq!(CapabilitySnapshot::default().best(), ImageFormat::Original);
    }
}
