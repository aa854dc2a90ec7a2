//! Image format candidates and sibling path resolution.
//!
//! Every logical image `name.ext` is expected to ship with `name.avif` and
//! `name.webp` siblings. [`resolve`] derives those sibling paths by swapping
//! the final extension; paths without an extension pass through untouched
//! (extensionless CDN URLs, for example).

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::utils::mime::types;

/// Encodings an image can be requested in.
///
/// Declaration order is preference order: `Avif > Webp > Original`.
/// `Ord` compares by *preference*, so `Avif` is the greatest value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Avif,
    Webp,
    Original,
}

impl ImageFormat {
    /// All candidates, most preferred first.
    pub const PREFERENCE: [ImageFormat; 3] = [Self::Avif, Self::Webp, Self::Original];

    /// Modern encodings that have sibling files.
    pub const MODERN: [ImageFormat; 2] = [Self::Avif, Self::Webp];

    /// Position in the preference order (0 = most preferred).
    #[inline]
    const fn rank(self) -> u8 {
        match self {
            Self::Avif => 0,
            Self::Webp => 1,
            Self::Original => 2,
        }
    }

    /// File extension of the sibling, `None` for the original.
    pub const fn extension(self) -> Option<&'static str> {
        match self {
            Self::Avif => Some("avif"),
            Self::Webp => Some("webp"),
            Self::Original => None,
        }
    }

    /// MIME type used in `<source type=...>`, `None` for the original.
    pub const fn mime(self) -> Option<&'static str> {
        match self {
            Self::Avif => Some(types::AVIF),
            Self::Webp => Some(types::WEBP),
            Self::Original => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Avif => "avif",
            Self::Webp => "webp",
            Self::Original => "original",
        }
    }

    /// Parse a modern format from a file extension (`avif`, `webp`).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "avif" => Some(Self::Avif),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }
}

impl PartialOrd for ImageFormat {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ImageFormat {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Lower rank = more preferred = greater
        other.rank().cmp(&self.rank())
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the sibling URL path of `path` for `format`.
///
/// Only the final segment's extension is replaced; a `?query` or `#fragment`
/// suffix is carried over unchanged.
///
/// ```ignore
/// assert_eq!(resolve("/images/avatar.jpg", ImageFormat::Webp), "/images/avatar.webp");
/// assert_eq!(resolve("noext", ImageFormat::Avif), "noext");
/// ```
pub fn resolve(path: &str, format: ImageFormat) -> String {
    let Some(ext) = format.extension() else {
        return path.to_string();
    };

    let split = path.find(&['?', '#'][..]).unwrap_or(path.len());
    let (base, suffix) = path.split_at(split);

    let segment_start = base.rfind('/').map_or(0, |i| i + 1);
    match base[segment_start..].rfind('.') {
        // Dotfiles (`.hidden`) have no extension
        Some(0) | None => path.to_string(),
        Some(dot) => format!("{}.{ext}{suffix}", &base[..segment_start + dot]),
    }
}

/// Filesystem counterpart of [`resolve`].
pub fn resolve_file(path: &Path, format: ImageFormat) -> PathBuf {
    match format.extension() {
        Some(ext) if path.extension().is_some() => path.with_extension(ext),
        _ => path.to_path_buf(),
    }
}
