//! Source-preserving edits to a page.

use std::ops::Range;

use crate::utils::html::escape_attr;

/// Non-overlapping replacements over one page's source.
#[derive(Debug, Default)]
pub struct Edits {
    edits: Vec<(Range<usize>, String)>,
}

impl Edits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, range: Range<usize>, with: String) {
        self.edits.push((range, with));
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Apply every edit. Overlapping edits after the first are dropped.
    pub fn apply(mut self, html: &str) -> String {
        self.edits.sort_by_key(|(r, _)| r.start);

        let mut out = String::with_capacity(html.len());
        let mut cursor = 0;
        for (range, with) in self.edits {
            if range.start < cursor || range.end > html.len() {
                continue;
            }
            out.push_str(&html[cursor..range.start]);
            out.push_str(&with);
            cursor = range.end;
        }
        out.push_str(&html[cursor..]);
        out
    }
}

/// Add attributes to a start tag, leaving any already present untouched.
pub fn with_attrs(tag: &str, attrs: &[(&str, &str)]) -> String {
    let lowered = tag.to_ascii_lowercase();
    let missing: Vec<_> = attrs
        .iter()
        .filter(|(name, _)| !has_attr(&lowered, name))
        .collect();
    if missing.is_empty() {
        return tag.to_string();
    }

    let body = tag.trim_end_matches('>');
    let (body, close) = match body.strip_suffix('/') {
        Some(b) => (b.trim_end(), " />"),
        None => (body.trim_end(), ">"),
    };

    let mut out = String::from(body);
    for (name, value) in missing {
        out.push_str(&format!(r#" {}="{}""#, name, escape_attr(value)));
    }
    out.push_str(close);
    out
}

/// Whether `name` appears as an attribute of the (lowercased) start tag.
fn has_attr(lowered_tag: &str, name: &str) -> bool {
    let bytes = lowered_tag.as_bytes();
    lowered_tag.match_indices(name).any(|(i, _)| {
        let before = i.checked_sub(1).map(|j| bytes[j]);
        let after = bytes.get(i + name.len()).copied();
        before.is_some_and(|b| b.is_ascii_whitespace())
            && after.is_none_or(|b| matches!(b, b'=' | b' ' | b'>' | b'/' | b'\t' | b'\n'))
    })
}
