//! `<img>` discovery in built HTML.
//!
//! Parsing goes through `tl`; byte ranges are recovered from the raw slice
//! each tag borrows from the input, so edits can be spliced back into the
//! untouched source text.

use std::ops::Range;

use crate::image::ImageRequest;
use crate::utils::html::unescape;

/// An `<img>` element found in a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImgTag {
    /// Byte range of the start tag in the page source.
    pub range: Range<usize>,
    pub src: String,
    pub alt: String,
    pub class: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// `fetchpriority="high"` or `loading="eager"`.
    pub priority: bool,
    /// Already inside a `<picture>`.
    pub in_picture: bool,
}

impl ImgTag {
    /// The fallback request for this element, with `src` resolved against
    /// the page URL.
    pub fn request(&self, src: impl Into<String>, critical: bool) -> ImageRequest {
        ImageRequest::new(src)
            .with_size(self.width, self.height)
            .priority(self.priority || critical)
    }

    /// Source text of the start tag.
    pub fn source<'a>(&self, html: &'a str) -> &'a str {
        &html[self.range.clone()]
    }
}

/// Every `<img>` with a usable `src`, in document order.
///
/// Inline `data:` images and elements without `src` are skipped.
pub fn scan_images(html: &str) -> Vec<ImgTag> {
    let Ok(dom) = tl::parse(html, tl::ParserOptions::default()) else {
        return Vec::new();
    };
    let parser = dom.parser();
    let Some(iter) = dom.query_selector("img") else {
        return Vec::new();
    };

    let lowered = html.to_ascii_lowercase();
    let mut tags: Vec<ImgTag> = iter
        .filter_map(|handle| handle.get(parser)?.as_tag())
        .filter_map(|tag| {
            let start = offset_in(html, tag.raw().as_bytes())?;
            let end = tag_end(html, start)?;

            let attrs = tag.attributes();
            let get = |name: &str| {
                attrs
                    .get(name)
                    .flatten()
                    .map(|v| unescape(v.as_utf8_str().trim()).into_owned())
            };

            let src = get("src").filter(|s| !s.is_empty() && !is_data_uri(s))?;
            let priority = get("fetchpriority").is_some_and(|v| v.eq_ignore_ascii_case("high"))
                || get("loading").is_some_and(|v| v.eq_ignore_ascii_case("eager"));

            Some(ImgTag {
                range: start..end,
                src,
                alt: get("alt").unwrap_or_default(),
                class: get("class").filter(|c| !c.is_empty()),
                width: get("width").as_deref().and_then(parse_dimension),
                height: get("height").as_deref().and_then(parse_dimension),
                priority,
                in_picture: inside_picture(&lowered, start),
            })
        })
        .collect();

    tags.sort_by_key(|t| t.range.start);
    tags.dedup_by_key(|t| t.range.start);
    tags
}

/// Byte offset of the `<` opening `slice` within `html`, if it borrows
/// from it.
fn offset_in(html: &str, slice: &[u8]) -> Option<usize> {
    let base = html.as_ptr() as usize;
    let ptr = slice.as_ptr() as usize;
    let offset = ptr.checked_sub(base)?;
    if offset >= html.len() || !html.is_char_boundary(offset) {
        return None;
    }
    html[..=offset].rfind('<')
}

/// End of the start tag beginning at `start` (one past its `>`), skipping
/// `>` inside quoted attribute values.
fn tag_end(html: &str, start: usize) -> Option<usize> {
    let mut quote = None;
    for (i, b) in html.as_bytes()[start..].iter().enumerate() {
        match (quote, b) {
            (Some(q), _) if *b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(*b),
            (None, b'>') => return Some(start + i + 1),
            _ => {}
        }
    }
    None
}

fn inside_picture(lowered: &str, pos: usize) -> bool {
    let before = &lowered[..pos];
    match (before.rfind("<picture"), before.rfind("</picture")) {
        (Some(open), Some(close)) => open > close,
        (Some(_), None) => true,
        _ => false,
    }
}

fn is_data_uri(src: &str) -> bool {
    src.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("data:"))
}

/// `"640"` or `"640px"`. Percentages and other units are ignored.
fn parse_dimension(value: &str) -> Option<u32> {
    let value = value.trim();
    let digits = value.strip_suffix("px").unwrap_or(value).trim();
    digits.parse().ok().filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_finds_images_in_order() {
        let html = r#"<html><body>
<img src="/images/a.jpg" alt="A" width="640" height="480px">
<p>text</p>
<img src="/images/b.png" class="hero" fetchpriority="high">
</body></html>"#;
        let tags = scan_images(html);

        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].src, "/images/a.jpg");
        assert_eq!(tags[0].alt, "A");
        assert_eq!((tags[0].width, tags[0].height), (Some(640), Some(480)));
        assert!(!tags[0].priority);
        assert_eq!(
            tags[0].source(html),
            r#"<img src="/images/a.jpg" alt="A" width="640" height="480px">"#
        );
        assert_eq!(tags[1].class.as_deref(), Some("hero"));
        assert!(tags[1].priority);
    }

    #[test]
    fn test_scan_ranges_survive_quoted_gt() {
        let html = r#"<p>x</p><img alt="a > b" src="/a.jpg"><span></span>"#;
        let tags = scan_images(html);

        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].source(html), r#"<img alt="a > b" src="/a.jpg">"#);
    }

    #[test]
    fn test_scan_skips_data_and_empty_src() {
        let html = r#"<img src="data:image/png;base64,AAAA"><img src=""><img alt="x"><img src="/ok.jpg">"#;
        let tags = scan_images(html);

        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].src, "/ok.jpg");
    }

    #[test]
    fn test_scan_detects_picture_parent() {
        let html = r#"<picture><source srcset="/a.avif" type="image/avif"><img src="/a.jpg"></picture><img src="/b.jpg">"#;
        let tags = scan_images(html);

        assert!(tags[0].in_picture);
        assert!(!tags[1].in_picture);
    }

    #[test]
    fn test_eager_loading_is_priority() {
        let tags = scan_images(r#"<img src="/a.jpg" loading="eager">"#);
        assert!(tags[0].priority);
    }

    #[test]
    fn test_request_carries_size_and_priority() {
        let tags = scan_images(r#"<img src="a.jpg" width="10" height="20">"#);
        let request = tags[0].request("/blog/a.jpg", true);

        assert_eq!(request.canonical_path, "/blog/a.jpg");
        assert_eq!((request.width, request.height), (Some(10), Some(20)));
        assert!(request.is_priority);
    }

    #[test]
    fn test_attribute_entities_are_decoded() {
        let tags = scan_images(r#"<img src="/a.jpg?w=1&amp;h=2" alt="Tom &amp; Jerry">"#);
        assert_eq!(tags[0].src, "/a.jpg?w=1&h=2");
        assert_eq!(tags[0].alt, "Tom & Jerry");
    }

    #[test]
    fn test_parse_dimension() {
        assert_eq!(parse_dimension("300"), Some(300));
        assert_eq!(parse_dimension(" 300px "), Some(300));
        assert_eq!(parse_dimension("50%"), None);
        assert_eq!(parse_dimension("0"), None);
    }
}
