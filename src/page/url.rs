//! Page and image URL paths.

use std::path::Path;

use url::Url;

use crate::utils::path::is_external_link;

/// URL path a built page is served at.
///
/// `public/index.html` → `/`, `public/about/index.html` → `/about/`,
/// `public/404.html` → `/404.html`. `None` if `file` is outside `root`.
pub fn page_url(root: &Path, file: &Path) -> Option<String> {
    let rel = file.strip_prefix(root).ok()?;
    let mut url = String::from("/");
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();

    for (i, part) in parts.iter().enumerate() {
        let last = i + 1 == parts.len();
        if last && part == "index.html" {
            break;
        }
        url.push_str(part);
        if !last {
            url.push('/');
        }
    }
    Some(url)
}

/// Resolve an image `src` against the page it appears on.
///
/// Returns the site-absolute path (query and fragment dropped), or `None`
/// for external sources, which are left untouched.
pub fn resolve_src(page_url: &str, src: &str) -> Option<String> {
    if is_external_link(src) {
        return None;
    }
    let base = Url::parse("http://site.invalid").ok()?.join(page_url).ok()?;
    let resolved = base.join(src).ok()?;
    Some(resolved.path().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_page_url() {
        let root = PathBuf::from("/site/public");
        assert_eq!(page_url(&root, &root.join("index.html")).as_deref(), Some("/"));
        assert_eq!(
            page_url(&root, &root.join("about/index.html")).as_deref(),
            Some("/about/")
        );
        assert_eq!(page_url(&root, &root.join("404.html")).as_deref(), Some("/404.html"));
        assert_eq!(page_url(&root, Path::new("/elsewhere/a.html")), None);
    }

    #[test]
    fn test_resolve_src() {
        assert_eq!(resolve_src("/blog/", "cover.jpg").as_deref(), Some("/blog/cover.jpg"));
        assert_eq!(
            resolve_src("/blog/post.html", "../images/a.png?v=1").as_deref(),
            Some("/images/a.png")
        );
        assert_eq!(resolve_src("/work/", "/images/b.jpg").as_deref(), Some("/images/b.jpg"));
        assert_eq!(resolve_src("/", "https://cdn.example.com/a.jpg"), None);
        assert_eq!(resolve_src("/", "//cdn.example.com/a.jpg"), None);
    }
}
