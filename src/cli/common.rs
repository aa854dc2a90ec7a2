//! Common utilities shared across CLI commands.

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use jwalk::WalkDir;

/// Collect files based on CLI paths.
///
/// With no paths, walks `base`. A single `-` reads paths from stdin.
/// Relative paths are tried as given first, then under `base`. Explicit
/// files must pass `accept`; files found by walking are filtered by it.
pub fn collect_files(
    paths: &[PathBuf],
    base: &Path,
    what: &str,
    accept: impl Fn(&Path) -> bool,
) -> Result<Vec<PathBuf>> {
    let paths: Vec<PathBuf> = if paths.len() == 1 && paths[0].as_os_str() == "-" {
        read_paths_from_stdin()?
    } else {
        paths.to_vec()
    };

    if paths.is_empty() {
        return Ok(walk_files(base).into_iter().filter(|p| accept(p)).collect());
    }

    let mut files = Vec::new();
    for path in &paths {
        let resolved = if path.exists() {
            path.clone()
        } else {
            base.join(path)
        };

        if resolved.is_file() {
            if !accept(&resolved) {
                bail!("Not {}: {}", what, path.display());
            }
            files.push(resolved);
        } else if resolved.is_dir() {
            files.extend(walk_files(&resolved).into_iter().filter(|p| accept(p)));
        } else {
            bail!(
                "Path not found: {}\n  Tried:\n    - {}\n    - {}",
                path.display(),
                path.display(),
                base.join(path).display()
            );
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

/// Every regular file under `dir`, sorted.
pub fn walk_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<_> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path())
        .collect();
    files.sort();
    files
}

/// Read file paths from stdin, one per line
pub fn read_paths_from_stdin() -> Result<Vec<PathBuf>> {
    let stdin = io::stdin();
    let mut paths = Vec::new();

    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            paths.push(PathBuf::from(trimmed));
        }
    }

    Ok(paths)
}

/// `.html` / `.htm` page.
pub fn is_html(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn site() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("blog")).unwrap();
        fs::write(dir.path().join("index.html"), "").unwrap();
        fs::write(dir.path().join("blog/index.html"), "").unwrap();
        fs::write(dir.path().join("blog/cover.jpg"), "").unwrap();
        dir
    }

    #[test]
    fn test_collect_walks_base_when_empty() {
        let dir = site();
        let files = collect_files(&[], dir.path(), "a page", is_html).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("blog/index.html"), dir.path().join("index.html")]
        );
    }

    #[test]
    fn test_collect_resolves_under_base() {
        let dir = site();
        let files =
            collect_files(&[PathBuf::from("blog")], dir.path(), "a page", is_html).unwrap();
        assert_eq!(files, vec![dir.path().join("blog/index.html")]);
    }

    #[test]
    fn test_collect_rejects_unaccepted_file() {
        let dir = site();
        let err = collect_files(&[PathBuf::from("blog/cover.jpg")], dir.path(), "a page", is_html)
            .unwrap_err();
        assert!(err.to_string().contains("Not a page"));
    }

    #[test]
    fn test_collect_missing_path() {
        let dir = site();
        let err = collect_files(&[PathBuf::from("nope")], dir.path(), "a page", is_html)
            .unwrap_err();
        assert!(err.to_string().contains("Path not found"));
    }

    #[test]
    fn test_is_html() {
        assert!(is_html(Path::new("a/index.HTML")));
        assert!(!is_html(Path::new("a/cover.jpg")));
    }
}
