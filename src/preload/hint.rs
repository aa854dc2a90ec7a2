//! Resource hints (`<link rel=preload|prefetch|preconnect>`).

use std::fmt;

use url::Url;

use crate::utils::html::escape_attr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HintRel {
    Preload,
    Prefetch,
    Preconnect,
}

impl HintRel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Preload => "preload",
            Self::Prefetch => "prefetch",
            Self::Preconnect => "preconnect",
        }
    }

    pub fn parse(rel: &str) -> Option<Self> {
        match rel.trim().to_ascii_lowercase().as_str() {
            "preload" => Some(Self::Preload),
            "prefetch" => Some(Self::Prefetch),
            "preconnect" => Some(Self::Preconnect),
            _ => None,
        }
    }
}

/// One `<link>` resource hint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceHint {
    pub rel: HintRel,
    pub href: String,
    /// Adds `as="image"`.
    pub as_image: bool,
    /// Adds `fetchpriority="high"`.
    pub high_priority: bool,
}

impl ResourceHint {
    pub fn preload(href: impl Into<String>) -> Self {
        Self {
            rel: HintRel::Preload,
            href: href.into(),
            as_image: true,
            high_priority: true,
        }
    }

    pub fn prefetch(href: impl Into<String>) -> Self {
        Self {
            rel: HintRel::Prefetch,
            href: href.into(),
            as_image: true,
            high_priority: false,
        }
    }

    pub fn preconnect(origin: impl Into<String>) -> Self {
        Self {
            rel: HintRel::Preconnect,
            href: origin.into(),
            as_image: false,
            high_priority: false,
        }
    }
}

impl fmt::Display for ResourceHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            r#"<link rel="{}" href="{}""#,
            self.rel.as_str(),
            escape_attr(&self.href)
        )?;
        if self.as_image {
            f.write_str(r#" as="image""#)?;
        }
        if self.high_priority {
            f.write_str(r#" fetchpriority="high""#)?;
        }
        if self.rel == HintRel::Preconnect {
            f.write_str(" crossorigin")?;
        }
        f.write_str(">")
    }
}

/// Origin (`scheme://host[:port]`) of `src` if it lives on another host
/// than `site`. Relative sources are same-origin.
pub fn external_origin(src: &str, site: Option<&Url>) -> Option<String> {
    let absolute = if src.starts_with("//") {
        Url::parse(&format!("https:{src}")).ok()?
    } else {
        Url::parse(src).ok()?
    };

    if !matches!(absolute.scheme(), "http" | "https") {
        return None;
    }

    let origin = absolute.origin();
    if site.is_some_and(|site| site.origin() == origin) {
        return None;
    }
    Some(origin.ascii_serialization())
}

/// Insert `tags` right before `</head>`, or at the very start when the
/// document has no head.
pub fn inject_into_head(html: &str, tags: &str) -> String {
    if tags.is_empty() {
        return html.to_string();
    }

    const PATTERN: &[u8] = b"</head>";
    let pos = html
        .as_bytes()
        .windows(PATTERN.len())
        .position(|w| w.eq_ignore_ascii_case(PATTERN))
        .unwrap_or(0);

    let mut result = String::with_capacity(html.len() + tags.len());
    result.push_str(&html[..pos]);
    result.push_str(tags);
    result.push_str(&html[pos..]);
    result
}
