//! `[images]` section configuration.
//!
//! ```toml
//! [images]
//! dir = "images"                       # Image tree, relative to [site] root
//! extensions = ["jpg", "jpeg", "png"]  # Originals that get siblings
//! formats = ["avif", "webp"]           # Siblings to produce
//! quality = 80                         # AVIF quality (1-100)
//! alpha_quality = 80                   # AVIF alpha quality (1-100)
//! speed = 6                            # AVIF encoder speed (1-10)
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::image::ImageFormat;
use crate::image::encode::EncodeOptions;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    pub dir: PathBuf,
    pub extensions: Vec<String>,
    pub formats: Vec<ImageFormat>,
    pub quality: u8,
    pub alpha_quality: u8,
    pub speed: u8,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("images"),
            extensions: vec!["jpg".into(), "jpeg".into(), "png".into()],
            formats: ImageFormat::MODERN.to_vec(),
            quality: 80,
            alpha_quality: 80,
            speed: 6,
        }
    }
}

impl ImagesConfig {
    pub const DIR: FieldPath = FieldPath::new("images.dir");
    pub const EXTENSIONS: FieldPath = FieldPath::new("images.extensions");
    pub const FORMATS: FieldPath = FieldPath::new("images.formats");
    pub const QUALITY: FieldPath = FieldPath::new("images.quality");
    pub const ALPHA_QUALITY: FieldPath = FieldPath::new("images.alpha_quality");
    pub const SPEED: FieldPath = FieldPath::new("images.speed");

    pub fn encode_options(&self) -> EncodeOptions {
        EncodeOptions {
            quality: f32::from(self.quality),
            alpha_quality: f32::from(self.alpha_quality),
            speed: self.speed,
        }
    }

    /// Sibling formats to produce, most preferred first, deduplicated.
    pub fn variant_formats(&self) -> Vec<ImageFormat> {
        let mut formats: Vec<_> = self
            .formats
            .iter()
            .copied()
            .filter(|f| *f != ImageFormat::Original)
            .collect();
        formats.sort_by(|a, b| b.cmp(a));
        formats.dedup();
        formats
    }

    /// Whether `path` is an original this config produces siblings for.
    pub fn is_original(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.dir.is_absolute() {
            diag.error_with_hint(
                Self::DIR,
                format!("must be relative, got `{}`", self.dir.display()),
                "paths are resolved against [site] root",
            );
        }

        if self.extensions.is_empty() {
            diag.error(Self::EXTENSIONS, "at least one extension is required");
        }
        for ext in &self.extensions {
            let lower = ext.to_ascii_lowercase();
            if lower.starts_with('.') {
                diag.error_with_hint(
                    Self::EXTENSIONS,
                    format!("`{ext}` has a leading dot"),
                    format!("write \"{}\"", lower.trim_start_matches('.')),
                );
            } else if ImageFormat::from_extension(&lower).is_some() {
                diag.error(
                    Self::EXTENSIONS,
                    format!("`{ext}` is a variant format and cannot be an original"),
                );
            }
        }

        if self.formats.contains(&ImageFormat::Original) {
            diag.error_with_hint(
                Self::FORMATS,
                "`original` is not a variant format",
                "list only \"avif\" and/or \"webp\"",
            );
        }

        if !(1..=100).contains(&self.quality) {
            diag.error(Self::QUALITY, format!("must be 1-100, got {}", self.quality));
        }
        if !(1..=100).contains(&self.alpha_quality) {
            diag.error(
                Self::ALPHA_QUALITY,
                format!("must be 1-100, got {}", self.alpha_quality),
            );
        }
        if !(1..=10).contains(&self.speed) {
            diag.error(Self::SPEED, format!("must be 1-10, got {}", self.speed));
        }
    }
}
