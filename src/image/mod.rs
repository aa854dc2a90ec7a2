//! Adaptive image delivery.
//!
//! # Modules
//!
//! - [`format`]: format candidates and sibling path resolution
//! - [`probe`]: once-per-session AVIF/WebP capability detection
//! - [`fallback`]: per-element AVIF → WebP → original state machine
//! - [`source`]: image loading from the built site
//! - [`picture`]: `<picture>` markup for plain elements
//! - [`placeholder`]: placeholder box and offline SVG
//! - [`encode`]: AVIF/WebP sibling generation

pub mod encode;
pub mod fallback;
pub mod format;
pub mod picture;
pub mod placeholder;
pub mod probe;
mod request;
pub mod source;

pub use fallback::{FallbackLoader, ImageSource, LoadError, LoadState};
pub use format::{ImageFormat, resolve};
pub use probe::{CapabilitySnapshot, ClientProfile, Decoder, NativeDecoder};
pub use request::ImageRequest;
