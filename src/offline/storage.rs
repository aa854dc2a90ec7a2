//! Named, disk-persisted response stores.
//!
//! ```text
//! <root>/
//! ├── pixfall-v1/
//! │   ├── <blake3(url)>.json   # url, status, headers
//! │   └── <blake3(url)>.body
//! └── pixfall-images-v1/
//! ```
//!
//! Both files are staged under a unique name and renamed into place, body
//! first. A reader therefore never sees a truncated body, and a crash
//! mid-write leaves an entry that simply does not match.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::http::{Response, ResponseSource};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid store name `{0}`")]
    InvalidName(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corrupt cache entry {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

trait IoContext<T> {
    fn at(self, path: &Path) -> Result<T, StorageError>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn at(self, path: &Path) -> Result<T, StorageError> {
        self.map_err(|source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Metadata persisted next to each cached body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryMeta {
    pub url: String,
    pub status: u16,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    /// Body size in bytes.
    #[serde(default)]
    pub size: u64,
    /// Unix timestamp (seconds).
    #[serde(default)]
    pub stored_at: u64,
}

/// All stores under one root directory.
#[derive(Debug, Clone)]
pub struct CacheStorage {
    root: PathBuf,
}

impl CacheStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Names of every existing store, sorted.
    pub fn keys(&self) -> Result<Vec<String>, StorageError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).at(&self.root),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.at(&self.root)?;
            if entry.file_type().at(&entry.path())?.is_dir()
                && let Some(name) = entry.file_name().to_str()
            {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn has(&self, name: &str) -> bool {
        valid_name(name).is_ok() && self.root.join(name).is_dir()
    }

    /// Open `name`, creating it if needed.
    pub fn open(&self, name: &str) -> Result<Store, StorageError> {
        valid_name(name)?;
        let dir = self.root.join(name);
        fs::create_dir_all(&dir).at(&dir)?;
        Ok(Store {
            name: name.to_string(),
            dir,
        })
    }

    /// Delete `name` and everything in it. Returns `false` if it did not exist.
    pub fn delete(&self, name: &str) -> Result<bool, StorageError> {
        valid_name(name)?;
        let dir = self.root.join(name);
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).at(&dir),
        }
    }
}

fn valid_name(name: &str) -> Result<(), StorageError> {
    let ok = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.starts_with('.');
    if ok {
        Ok(())
    } else {
        Err(StorageError::InvalidName(name.to_string()))
    }
}

/// One named store. Keys are exact request URLs.
#[derive(Debug, Clone)]
pub struct Store {
    name: String,
    dir: PathBuf,
}

impl Store {
    pub fn name(&self) -> &str {
        &self.name
    }

    fn paths(&self, url: &str) -> (PathBuf, PathBuf) {
        let key = hex::encode(blake3::hash(url.as_bytes()).as_bytes());
        (
            self.dir.join(format!("{key}.json")),
            self.dir.join(format!("{key}.body")),
        )
    }

    /// Cached response for `url`, if any.
    pub fn match_url(&self, url: &str) -> Result<Option<Response>, StorageError> {
        let (meta_path, body_path) = self.paths(url);

        let raw = match fs::read(&meta_path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).at(&meta_path),
        };
        let meta: EntryMeta = serde_json::from_slice(&raw).map_err(|source| {
            StorageError::Corrupt {
                path: meta_path.clone(),
                source,
            }
        })?;
        // Hash collision or a stale entry from another URL.
        if meta.url != url {
            return Ok(None);
        }

        let body = match fs::read(&body_path) {
            Ok(body) => body,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).at(&body_path),
        };

        Ok(Some(Response {
            status: meta.status,
            headers: meta.headers,
            body,
            source: ResponseSource::Cache,
        }))
    }

    pub fn put(&self, url: &str, response: &Response) -> Result<(), StorageError> {
        let (meta_path, body_path) = self.paths(url);
        write_atomic(&body_path, &response.body)?;

        let meta = EntryMeta {
            url: url.to_string(),
            status: response.status,
            headers: response.headers.clone(),
            size: response.body.len() as u64,
            stored_at: now(),
        };
        let json = serde_json::to_vec_pretty(&meta).map_err(|source| StorageError::Corrupt {
            path: meta_path.clone(),
            source,
        })?;

        write_atomic(&meta_path, &json)
    }

    /// Metadata of every complete entry, sorted by URL.
    pub fn entries(&self) -> Result<Vec<EntryMeta>, StorageError> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.dir).at(&self.dir)? {
            let path = entry.at(&self.dir)?.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let raw = fs::read(&path).at(&path)?;
            match serde_json::from_slice::<EntryMeta>(&raw) {
                Ok(meta) => entries.push(meta),
                Err(source) => return Err(StorageError::Corrupt { path, source }),
            }
        }
        entries.sort_by(|a, b| a.url.cmp(&b.url));
        Ok(entries)
    }
}

/// Write `bytes` to a private staging file, then rename it over `path`.
///
/// Staging names are unique per process and call, so concurrent writers of
/// the same entry never share a half-written file.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    static SEQ: AtomicU64 = AtomicU64::new(0);
    let seq = SEQ.fetch_add(1, Ordering::Relaxed);
    let staging = path.with_extension(format!("{}-{seq}.tmp", std::process::id()));

    if let Err(e) = fs::write(&staging, bytes) {
        let _ = fs::remove_file(&staging);
        return Err(e).at(&staging);
    }
    fs::rename(&staging, path).at(path)
}

fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_put_then_match() {
        let dir = TempDir::new().unwrap();
        let storage = CacheStorage::new(dir.path());
        let store = storage.open("pixfall-images-v1").unwrap();

        assert!(store.match_url("/images/a.webp").unwrap().is_none());

        let res = Response::new(200, "image/webp", b"RIFF".to_vec());
        store.put("/images/a.webp", &res).unwrap();

        let hit = store.match_url("/images/a.webp").unwrap().unwrap();
        assert_eq!(hit.body, b"RIFF");
        assert_eq!(hit.content_type(), Some("image/webp"));
        assert_eq!(hit.source, ResponseSource::Cache);

        // Exact URL match only.
        assert!(store.match_url("/images/a.webp?v=2").unwrap().is_none());
    }

    #[test]
    fn test_concurrent_puts_never_expose_partial_body() {
        let dir = TempDir::new().unwrap();
        let store = CacheStorage::new(dir.path()).open("pixfall-images-v1").unwrap();
        let body = vec![7u8; 256 * 1024];
        let res = Response::new(200, "image/jpeg", body.clone());
        store.put("/images/a.jpg", &res).unwrap();

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..20 {
                        store.put("/images/a.jpg", &res).unwrap();
                    }
                });
            }
            s.spawn(|| {
                for _ in 0..200 {
                    let hit = store.match_url("/images/a.jpg").unwrap().unwrap();
                    assert_eq!(hit.body.len(), body.len());
                }
            });
        });

        let leftovers: Vec<_> = fs::read_dir(dir.path().join("pixfall-images-v1"))
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_entries_survive_reopen() {
        let dir = TempDir::new().unwrap();
        CacheStorage::new(dir.path())
            .open("pixfall-v1")
            .unwrap()
            .put("/", &Response::new(200, "text/html", "<p>home</p>"))
            .unwrap();

        let store = CacheStorage::new(dir.path()).open("pixfall-v1").unwrap();
        let entries = store.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].url, "/");
        assert_eq!(entries[0].size, 11);
    }

    #[test]
    fn test_keys_and_delete() {
        let dir = TempDir::new().unwrap();
        let storage = CacheStorage::new(dir.path().join("cache"));
        assert!(storage.keys().unwrap().is_empty());

        storage.open("b-v1").unwrap();
        storage.open("a-v1").unwrap();
        assert_eq!(storage.keys().unwrap(), vec!["a-v1", "b-v1"]);

        assert!(storage.delete("a-v1").unwrap());
        assert!(!storage.delete("a-v1").unwrap());
        assert!(!storage.has("a-v1"));
        assert!(storage.has("b-v1"));
    }

    #[test]
    fn test_invalid_names() {
        let storage = CacheStorage::new("/nonexistent");
        for name in ["", "..", "a/b", ".hidden"] {
            assert!(matches!(
                storage.open(name),
                Err(StorageError::InvalidName(_))
            ));
        }
    }
}
