//! Placeholders shown instead of a broken image.

use super::request::ImageRequest;
use crate::utils::html::{escape, escape_attr};

/// Size used when a request carries no dimensions.
pub const DEFAULT_SIZE: (u32, u32) = (800, 600);

/// Text rendered inside every placeholder.
pub const UNAVAILABLE: &str = "Image unavailable";

/// Inline SVG served by the offline cache when an image cannot be fetched.
pub const OFFLINE_SVG: &str = concat!(
    r##"<svg width="400" height="300" xmlns="http://www.w3.org/2000/svg">"##,
    r##"<rect width="100%" height="100%" fill="#f0f0f0"/>"##,
    r##"<text x="50%" y="50%" text-anchor="middle" dy="0.3em">Image unavailable</text>"##,
    "</svg>",
);

/// Fixed-size neutral box with alt text, rendered for exhausted images.
pub fn render_box(request: &ImageRequest, alt: &str, class: Option<&str>) -> String {
    let width = request.width.unwrap_or(DEFAULT_SIZE.0);
    let height = request.height.unwrap_or(DEFAULT_SIZE.1);

    let class_attr = class
        .map(|c| format!(r#" class="{}""#, escape_attr(c)))
        .unwrap_or_default();

    format!(
        concat!(
            r#"<div{class} role="img" aria-label="{label}" style="width:{w}px;height:{h}px;"#,
            r#"background-color:#f3f4f6;display:flex;align-items:center;justify-content:center;"#,
            r#"border:1px solid #e5e7eb;border-radius:8px">"#,
            r#"<span style="color:#6b7280;font-size:12px;text-align:center">"#,
            "{text}<br/><small>{alt}</small></span></div>",
        ),
        class = class_attr,
        label = escape_attr(alt),
        w = width,
        h = height,
        text = UNAVAILABLE,
        alt = escape(alt),
    )
}
