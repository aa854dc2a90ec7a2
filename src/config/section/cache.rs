//! `[cache]` section configuration.
//!
//! ```toml
//! [cache]
//! name = "pixfall"                 # Store prefix
//! version = "v1"                   # Bump to drop old stores on next activation
//! dir = ".pixfall/cache"           # Store directory (relative to config)
//! routes = ["/", "/about"]         # Pages cached on install
//! critical = ["/images/a.avif"]    # Images cached on install
//! ```
//!
//! When `critical` is omitted, every variant of `[preload] critical` is
//! cached, most preferred format first.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::image::{ImageFormat, resolve};
use crate::offline::StoreNames;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub name: String,
    pub version: String,
    pub dir: PathBuf,
    pub routes: Vec<String>,
    pub critical: Option<Vec<String>>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: "pixfall".into(),
            version: "v1".into(),
            dir: PathBuf::from(".pixfall/cache"),
            routes: ["/", "/about", "/work", "/blog"]
                .into_iter()
                .map(String::from)
                .collect(),
            critical: None,
        }
    }
}

impl CacheConfig {
    pub const NAME: FieldPath = FieldPath::new("cache.name");
    pub const VERSION: FieldPath = FieldPath::new("cache.version");
    pub const ROUTES: FieldPath = FieldPath::new("cache.routes");

    pub fn store_names(&self) -> StoreNames {
        StoreNames::new(&self.name, &self.version)
    }

    /// Image URLs to cache on install.
    pub fn critical_images(&self, preload_critical: &[String], formats: &[ImageFormat]) -> Vec<String> {
        if let Some(critical) = &self.critical {
            return critical.clone();
        }

        let mut urls = Vec::new();
        for src in preload_critical {
            for &format in formats {
                let variant = resolve(src, format);
                if variant != *src && !urls.contains(&variant) {
                    urls.push(variant);
                }
            }
            if !urls.contains(src) {
                urls.push(src.clone());
            }
        }
        urls
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        for (field, value) in [(Self::NAME, &self.name), (Self::VERSION, &self.version)] {
            if value.is_empty() {
                diag.error(field, "must not be empty");
            } else if value.contains(['/', '\\']) || value.starts_with('.') {
                diag.error_with_hint(
                    field,
                    format!("`{value}` cannot be used in a store name"),
                    "use letters, digits, `-` or `_`",
                );
            }
        }
        for route in &self.routes {
            if !route.starts_with('/') {
                diag.error_with_hint(
                    Self::ROUTES,
                    format!("`{route}` is not a site path"),
                    format!("write \"/{route}\""),
                );
            }
        }
    }
}
