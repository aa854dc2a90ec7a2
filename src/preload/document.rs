//! The page a scheduler writes hints into.

use rustc_hash::FxHashSet;
use tl::ParserOptions;

use super::hint::{HintRel, ResourceHint, inject_into_head};

/// Surface the preload scheduler works against.
pub trait Document: Send {
    /// Whether `src` is already present and loaded, so preloading it is a
    /// no-op.
    fn is_loaded(&self, src: &str) -> bool;

    fn mark_loaded(&mut self, src: &str);

    /// Add `hint` unless an identical one exists. Returns `true` if added.
    fn insert_hint(&mut self, hint: ResourceHint) -> bool;
}

/// An HTML page held in memory.
///
/// Image hints that already exist in the markup count as loaded, so
/// rewriting a page twice leaves it unchanged.
#[derive(Debug, Default)]
pub struct HtmlDocument {
    existing: FxHashSet<(HintRel, String)>,
    added: Vec<ResourceHint>,
    loaded: FxHashSet<String>,
}

impl HtmlDocument {
    pub fn parse(html: &str) -> Self {
        let mut doc = Self::default();

        let Ok(dom) = tl::parse(html, ParserOptions::default()) else {
            return doc;
        };
        let parser = dom.parser();
        let Some(links) = dom.query_selector("link") else {
            return doc;
        };

        for handle in links {
            let Some(tag) = handle.get(parser).and_then(|n| n.as_tag()) else {
                continue;
            };
            let attrs = tag.attributes();
            let attr = |name: &str| {
                attrs
                    .get(name)
                    .flatten()
                    .map(|v| v.as_utf8_str().into_owned())
            };

            let (Some(rel), Some(href)) = (attr("rel"), attr("href")) else {
                continue;
            };
            let Some(rel) = HintRel::parse(&rel) else {
                continue;
            };
            if rel != HintRel::Preconnect && attr("as").as_deref() == Some("image") {
                doc.loaded.insert(href.clone());
            }
            doc.existing.insert((rel, href));
        }
        doc
    }

    /// Hints inserted since parsing, in insertion order.
    pub fn added(&self) -> &[ResourceHint] {
        &self.added
    }

    /// `html` with every added hint placed before `</head>`.
    pub fn render_into(&self, html: &str) -> String {
        let tags: String = self.added.iter().map(ToString::to_string).collect();
        inject_into_head(html, &tags)
    }
}

impl Document for HtmlDocument {
    fn is_loaded(&self, src: &str) -> bool {
        self.loaded.contains(src)
    }

    fn mark_loaded(&mut self, src: &str) {
        self.loaded.insert(src.to_string());
    }

    fn insert_hint(&mut self, hint: ResourceHint) -> bool {
        if !self.existing.insert((hint.rel, hint.href.clone())) {
            return false;
        }
        self.added.push(hint);
        true
    }
}
