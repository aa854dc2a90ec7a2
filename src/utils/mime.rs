//! Content types for the files a built site serves.

use std::path::Path;

pub mod types {
    pub const HTML: &str = "text/html; charset=utf-8";
    pub const PLAIN: &str = "text/plain; charset=utf-8";
    pub const OCTET_STREAM: &str = "application/octet-stream";

    pub const AVIF: &str = "image/avif";
    pub const WEBP: &str = "image/webp";
    pub const SVG: &str = "image/svg+xml";
}

/// Lowercase extension to content type.
const BY_EXTENSION: &[(&str, &str)] = &[
    ("html", types::HTML),
    ("htm", types::HTML),
    ("txt", types::PLAIN),
    ("css", "text/css; charset=utf-8"),
    ("js", "text/javascript; charset=utf-8"),
    ("mjs", "text/javascript; charset=utf-8"),
    ("json", "application/json"),
    ("webmanifest", "application/manifest+json"),
    ("xml", "application/xml"),
    ("pdf", "application/pdf"),
    ("avif", types::AVIF),
    ("webp", types::WEBP),
    ("svg", types::SVG),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("ico", "image/x-icon"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
];

/// Content type by extension, case-insensitive; `application/octet-stream`
/// when unknown.
pub fn from_path(path: &Path) -> &'static str {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(|ext| {
            BY_EXTENSION
                .iter()
                .find(|(known, _)| known.eq_ignore_ascii_case(ext))
        })
        .map_or(types::OCTET_STREAM, |&(_, mime)| mime)
}

pub fn is_image(mime: &str) -> bool {
    mime.starts_with("image/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        assert_eq!(from_path(Path::new("work/index.html")), types::HTML);
        assert_eq!(from_path(Path::new("logo.PNG")), "image/png");
        assert_eq!(from_path(Path::new("hero.avif")), types::AVIF);
        assert_eq!(from_path(Path::new("site.webmanifest")), "application/manifest+json");
        assert_eq!(from_path(Path::new("archive.xyz")), types::OCTET_STREAM);
        assert_eq!(from_path(Path::new("LICENSE")), types::OCTET_STREAM);
    }

    #[test]
    fn test_is_image() {
        assert!(is_image(types::WEBP));
        assert!(is_image(from_path(Path::new("a.jpeg"))));
        assert!(!is_image(types::HTML));
    }
}
