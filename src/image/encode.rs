//! Sibling variant encoding (`name.ext` → `name.avif`, `name.webp`).
//!
//! AVIF goes through `ravif` (rav1e); WebP uses the `image` crate's encoder,
//! which only writes lossless WebP, so `quality` applies to AVIF alone.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::DynamicImage;
use image::codecs::webp::WebPEncoder;
use thiserror::Error;

use super::format::{ImageFormat, resolve_file};

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("avif encoding failed: {0}")]
    Avif(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Encoder settings, see `[images]` in the config.
#[derive(Debug, Clone, Copy)]
pub struct EncodeOptions {
    /// AVIF color quality, 1-100.
    pub quality: f32,
    /// AVIF alpha quality, 1-100.
    pub alpha_quality: f32,
    /// rav1e speed, 1 (slow, small) - 10 (fast, large).
    pub speed: u8,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            quality: 80.0,
            alpha_quality: 80.0,
            speed: 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantStatus {
    Written,
    /// Sibling is at least as new as its source.
    Fresh,
}

/// Encode `img` as `format`. `Original` is not an encodable variant.
pub fn encode(
    img: &DynamicImage,
    format: ImageFormat,
    opts: &EncodeOptions,
) -> Result<Vec<u8>, EncodeError> {
    match format {
        ImageFormat::Avif => encode_avif(img, opts),
        ImageFormat::Webp => encode_webp(img),
        ImageFormat::Original => Err(EncodeError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "original is not a variant format",
        ))),
    }
}

fn encode_avif(img: &DynamicImage, opts: &EncodeOptions) -> Result<Vec<u8>, EncodeError> {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let pixels: Vec<ravif::RGBA8> = rgba
        .pixels()
        .map(|p| ravif::RGBA8::new(p[0], p[1], p[2], p[3]))
        .collect();

    let encoded = ravif::Encoder::new()
        .with_quality(opts.quality)
        .with_alpha_quality(opts.alpha_quality)
        .with_speed(opts.speed)
        .encode_rgba(ravif::Img::new(
            pixels.as_slice(),
            width as usize,
            height as usize,
        ))
        .map_err(|e| EncodeError::Avif(e.to_string()))?;

    Ok(encoded.avif_file)
}

fn encode_webp(img: &DynamicImage) -> Result<Vec<u8>, EncodeError> {
    let mut buffer = Vec::new();
    let encoder = WebPEncoder::new_lossless(Cursor::new(&mut buffer));
    DynamicImage::ImageRgba8(img.to_rgba8()).write_with_encoder(encoder)?;
    Ok(buffer)
}

/// Whether `variant` is missing or older than `source`.
pub fn is_stale(source: &Path, variant: &Path) -> bool {
    let modified = |p: &Path| fs::metadata(p).and_then(|m| m.modified()).ok();
    match (modified(source), modified(variant)) {
        (Some(src), Some(var)) => var < src,
        _ => true,
    }
}

/// Write the requested sibling variants of `source`.
///
/// The source is decoded at most once, and only if some variant is stale
/// (or `force` is set).
pub fn write_variants(
    source: &Path,
    formats: &[ImageFormat],
    opts: &EncodeOptions,
    force: bool,
) -> Result<Vec<(ImageFormat, VariantStatus)>, EncodeError> {
    let mut decoded: Option<DynamicImage> = None;
    let mut results = Vec::with_capacity(formats.len());

    for &format in formats {
        if format == ImageFormat::Original {
            continue;
        }

        let target = resolve_file(source, format);
        if target == source {
            continue;
        }
        if !force && !is_stale(source, &target) {
            results.push((format, VariantStatus::Fresh));
            continue;
        }

        let img = match decoded.take() {
            Some(img) => img,
            None => image::open(source)?,
        };
        let bytes = encode(&img, format, opts)?;
        fs::write(&target, bytes)?;
        decoded = Some(img);

        results.push((format, VariantStatus::Written));
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::probe::{Container, sniff};
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn write_png(dir: &Path) -> std::path::PathBuf {
        let mut img = RgbaImage::new(4, 4);
        for (x, y, px) in img.enumerate_pixels_mut() {
            *px = Rgba([(x * 60) as u8, (y * 60) as u8, 128, 255]);
        }
        let path = dir.join("photo.png");
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_webp_variant_is_decodable() {
        let dir = TempDir::new().unwrap();
        let source = write_png(dir.path());

        let results =
            write_variants(&source, &[ImageFormat::Webp], &EncodeOptions::default(), false)
                .unwrap();
        assert_eq!(results, vec![(ImageFormat::Webp, VariantStatus::Written)]);

        let webp = dir.path().join("photo.webp");
        let bytes = fs::read(&webp).unwrap();
        assert_eq!(sniff(&bytes), Some(Container::Webp));
        assert_eq!(image::open(&webp).unwrap().width(), 4);
    }

    #[test]
    fn test_avif_variant_has_avif_container() {
        let dir = TempDir::new().unwrap();
        let source = write_png(dir.path());
        let opts = EncodeOptions {
            speed: 10,
            ..EncodeOptions::default()
        };

        write_variants(&source, &[ImageFormat::Avif], &opts, false).unwrap();
        let bytes = fs::read(dir.path().join("photo.avif")).unwrap();
        assert_eq!(sniff(&bytes), Some(Container::Avif));
    }

    #[test]
    fn test_fresh_variants_are_skipped() {
        let dir = TempDir::new().unwrap();
        let source = write_png(dir.path());
        let opts = EncodeOptions::default();

        write_variants(&source, &[ImageFormat::Webp], &opts, false).unwrap();
        let again = write_variants(&source, &[ImageFormat::Webp], &opts, false).unwrap();
        assert_eq!(again, vec![(ImageFormat::Webp, VariantStatus::Fresh)]);

        let forced = write_variants(&source, &[ImageFormat::Webp], &opts, true).unwrap();
        assert_eq!(forced, vec![(ImageFormat::Webp, VariantStatus::Written)]);
    }

    #[test]
    fn test_original_is_ignored() {
        let dir = TempDir::new().unwrap();
        let source = write_png(dir.path());
        let results =
            write_variants(&source, &[ImageFormat::Original], &EncodeOptions::default(), false)
                .unwrap();
        assert!(results.is_empty());
    }
}
