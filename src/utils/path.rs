//! Mapping between site URLs and files under the site root.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

/// Absolute form of `path`, canonical when it exists.
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// `scheme:...` or protocol-relative `//host/...`.
pub fn is_external_link(link: &str) -> bool {
    link.starts_with("//")
        || link.find(':').is_some_and(|pos| {
            pos > 0
                && link[..pos]
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        })
}

/// Percent-decoded path without query, fragment or surrounding slashes.
fn normalize_url(url: &str) -> String {
    let path = url.split(&['?', '#'][..]).next().unwrap_or(url);
    percent_decode_str(path)
        .decode_utf8()
        .map(Cow::into_owned)
        .unwrap_or_default()
        .trim_matches('/')
        .to_string()
}

/// Map a site URL path to the file it names under `root`.
///
/// Does not touch the file system. Returns `None` for external URLs and
/// for paths that try to climb out of `root`.
pub fn url_to_file(root: &Path, url: &str) -> Option<PathBuf> {
    if is_external_link(url) {
        return None;
    }

    let clean = normalize_url(url);
    if clean.split('/').any(|segment| segment == "..") {
        return None;
    }

    Some(root.join(clean))
}

/// Resolve a request URL to an existing file, the way a static host does:
/// exact file, then `dir/index.html`, then `name.html` for clean URLs.
pub fn resolve_route(root: &Path, url: &str) -> Option<PathBuf> {
    let local = url_to_file(root, url)?;

    // Symlinks must not lead outside the root.
    let root_canonical = root.canonicalize().ok()?;
    let within = |p: &Path| {
        p.canonicalize()
            .ok()
            .filter(|c| c.starts_with(&root_canonical) && c.is_file())
    };

    if local.is_dir() {
        return within(&local.join("index.html"));
    }
    within(&local).or_else(|| within(&local.with_extension("html")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_is_external_link() {
        assert!(is_external_link("https://example.com/a.png"));
        assert!(is_external_link("//cdn.example.com/a.png"));
        assert!(is_external_link("data:image/png;base64,AAAA"));
        assert!(!is_external_link("/images/a.png"));
        assert!(!is_external_link("images/a.png"));
    }

    #[test]
    fn test_url_to_file() {
        let root = Path::new("/site");
        assert_eq!(
            url_to_file(root, "/images/a%20b.png?v=1"),
            Some(PathBuf::from("/site/images/a b.png"))
        );
        assert_eq!(url_to_file(root, "/"), Some(PathBuf::from("/site")));
        assert_eq!(url_to_file(root, "/../etc/passwd"), None);
        assert_eq!(url_to_file(root, "https://x.com/a.png"), None);
    }

    #[test]
    fn test_resolve_route() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("index.html"), "home").unwrap();
        fs::write(root.join("about.html"), "about").unwrap();
        fs::create_dir_all(root.join("blog")).unwrap();
        fs::write(root.join("blog/index.html"), "blog").unwrap();

        let resolve = |url| resolve_route(root, url).map(|p| fs::read_to_string(p).unwrap());
        assert_eq!(resolve("/").as_deref(), Some("home"));
        assert_eq!(resolve("/about").as_deref(), Some("about"));
        assert_eq!(resolve("/blog/").as_deref(), Some("blog"));
        assert_eq!(resolve("/work"), None);
    }
}
