//! `<picture>` markup: the plain-element form of format fallback.
//!
//! The browser walks `<source>` elements in order and takes the first type
//! it can decode, so listing AVIF before WebP before the `<img>` original
//! gives the same preference order as [`super::fallback::FallbackLoader`].

use super::format::{ImageFormat, resolve};
use crate::utils::html::escape_attr;

/// Wrap an existing `<img>` tag in a `<picture>` with one `<source>` per
/// available modern format (most preferred first).
pub fn render_picture(src: &str, formats: &[ImageFormat], img_tag: &str) -> String {
    let mut ordered: Vec<_> = formats
        .iter()
        .copied()
        .filter(|f| f.mime().is_some())
        .collect();
    ordered.sort_by(|a, b| b.cmp(a));
    ordered.dedup();

    let mut html = String::from("<picture>");
    for format in ordered {
        let sibling = resolve(src, format);
        if sibling == src {
            continue;
        }
        if let Some(mime) = format.mime() {
            html.push_str(&format!(
                r#"<source srcset="{}" type="{}">"#,
                escape_attr(&sibling),
                mime
            ));
        }
    }
    html.push_str(img_tag);
    html.push_str("</picture>");
    html
}

/// Loading hints for a plain `<img>`: eager + sync decode for priority images.
pub fn loading_attrs(is_priority: bool) -> [(&'static str, &'static str); 2] {
    if is_priority {
        [("loading", "eager"), ("decoding", "sync")]
    } else {
        [("loading", "lazy"), ("decoding", "async")]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_picture_orders_sources_by_preference() {
        let html = render_picture(
            "/images/a.jpg",
            &[ImageFormat::Webp, ImageFormat::Avif],
            r#"<img src="/images/a.jpg" alt="a">"#,
        );
        assert_eq!(
            html,
            concat!(
                r#"<picture><source srcset="/images/a.avif" type="image/avif">"#,
                r#"<source srcset="/images/a.webp" type="image/webp">"#,
                r#"<img src="/images/a.jpg" alt="a"></picture>"#
            )
        );
    }

    #[test]
    fn test_picture_without_extension_has_no_sources() {
        let html = render_picture("/raw", &[ImageFormat::Avif], "<img src=\"/raw\">");
        assert_eq!(html, "<picture><img src=\"/raw\"></picture>");
    }

    #[test]
    fn test_loading_attrs() {
        assert_eq!(loading_attrs(true)[0], ("loading", "eager"));
        assert_eq!(loading_attrs(false)[1], ("decoding", "async"));
    }
}
