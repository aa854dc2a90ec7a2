//! `[site]` section configuration.
//!
//! ```toml
//! [site]
//! root = "public"                 # Built site directory (relative to config)
//! url = "https://example.com"     # Origin; images on other hosts get preconnect hints
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{ConfigDiagnostics, FieldPath};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Built site directory.
    pub root: PathBuf,

    /// Public origin of the site.
    pub url: Option<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("public"),
            url: None,
        }
    }
}

impl SiteConfig {
    pub const URL: FieldPath = FieldPath::new("site.url");

    /// Parsed `url`, if set and valid.
    pub fn origin(&self) -> Option<Url> {
        self.url.as_deref().and_then(|url| Url::parse(url).ok())
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        let Some(url) = &self.url else {
            return;
        };
        match Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            Ok(parsed) => diag.error(
                Self::URL,
                format!("unsupported scheme `{}`", parsed.scheme()),
            ),
            Err(e) => diag.error_with_hint(
                Self::URL,
                format!("invalid URL `{url}`: {e}"),
                "use an absolute URL like \"https://example.com\"",
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{ConfigDiagnostics, test_parse_config};
    use std::path::PathBuf;

    #[test]
    fn test_site_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.site.root, PathBuf::from("public"));
        assert!(config.site.origin().is_none());
    }

    #[test]
    fn test_site_url() {
        let config = test_parse_config("[site]\nurl = \"https://me.dev/\"");
        assert_eq!(config.site.origin().unwrap().host_str(), Some("me.dev"));

        let mut diag = ConfigDiagnostics::new();
        config.site.validate(&mut diag);
        assert!(diag.is_empty());
    }

    #[test]
    fn test_site_url_invalid() {
        for url in ["me.dev", "ftp://me.dev"] {
            let config = test_parse_config(&format!("[site]\nurl = \"{url}\""));
            let mut diag = ConfigDiagnostics::new();
            config.site.validate(&mut diag);
            assert_eq!(diag.len(), 1, "{url}");
        }
    }
}
