//! Content-addressed file store.
//!
//! # Responsibilities
//! - Hash payloads with SHA-256 in fixed-size chunks
//! - Derive the stored name as `{hash}{extension}`
//! - Write each distinct hash+extension pair at most once
//!
//! # Design Decisions
//! - Writes land in a unique temporary file and are renamed into place, so a
//!   reader never observes a truncated file
//! - Losing a race against an identical upload is success, not an error
//! - Dedup is keyed on hash+extension, not on content alone

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

/// Chunk size used when feeding payloads to the hasher.
pub const HASH_CHUNK_SIZE: usize = 8192;

/// URL mount under which stored files are served; recorded paths use it
/// instead of the on-disk root.
pub const SERVED_PREFIX: &str = "uploads";

/// Longest extension kept from a client-supplied name, dot included.
const MAX_EXTENSION_LEN: usize = 16;

/// Error type for content store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to create uploads directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Bytes persisted under a content-derived path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Hex-encoded SHA-256 of the payload.
    pub content_hash: String,
    /// Extension including the leading dot, or empty.
    pub extension: String,
    pub path: PathBuf,
    /// False when an existing file was reused.
    pub newly_written: bool,
}

impl StoredFile {
    /// Path as recorded in log records, e.g. `uploads/<hash>.txt`.
    ///
    /// Independent of where the store lives on disk.
    pub fn display_path(&self) -> String {
        format!("{}/{}{}", SERVED_PREFIX, self.content_hash, self.extension)
    }
}

/// Flat directory of content-addressed files.
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    /// Open the store, creating its directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StoreError::CreateDir {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store `data` under `{root}/{sha256(data)}{extension}`.
    ///
    /// Returns the same path for repeated calls with identical bytes and
    /// extension, whether or not this call wrote the file.
    pub fn store(&self, data: &[u8], extension: &str) -> Result<StoredFile, StoreError> {
        let content_hash = content_hash(data);
        let path = self.root.join(format!("{}{}", content_hash, extension));

        let mut stored = StoredFile {
            content_hash,
            extension: extension.to_string(),
            path,
            newly_written: false,
        };

        if stored.path.exists() {
            tracing::debug!(path = %stored.path.display(), "Content already stored");
            return Ok(stored);
        }

        let tmp = self.root.join(format!(".{}.{}.tmp", stored.content_hash, Uuid::new_v4()));
        if let Err(source) = write_fully(&tmp, data) {
            let _ = fs::remove_file(&tmp);
            return Err(StoreError::Write { path: tmp, source });
        }

        if let Err(source) = fs::rename(&tmp, &stored.path) {
            let _ = fs::remove_file(&tmp);
            // Platforms that refuse to rename onto an existing file: a
            // concurrent identical upload got there first.
            if stored.path.exists() {
                return Ok(stored);
            }
            return Err(StoreError::Write {
                path: stored.path,
                source,
            });
        }

        stored.newly_written = true;
        tracing::debug!(
            path = %stored.path.display(),
            bytes = data.len(),
            "Content stored"
        );
        Ok(stored)
    }
}

fn write_fully(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.sync_all()
}

/// SHA-256 hex digest of `data`, fed in [`HASH_CHUNK_SIZE`] chunks.
pub fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    for chunk in data.chunks(HASH_CHUNK_SIZE) {
        hasher.update(chunk);
    }
    hex::encode(hasher.finalize())
}

/// Extension of the last segment of a filename or path, dot included.
///
/// Returns an empty string when there is none. Extensions with characters
/// outside `[A-Za-z0-9_-]` or longer than 16 bytes are dropped, since they
/// end up in an on-disk name.
pub fn extension_for(name: &str) -> String {
    let segment = last_segment(name);
    let ext = match Path::new(segment).extension().and_then(|e| e.to_str()) {
        Some(ext) => ext,
        None => return String::new(),
    };

    let acceptable = ext
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !acceptable || ext.len() + 1 > MAX_EXTENSION_LEN {
        return String::new();
    }
    format!(".{}", ext)
}

/// Last `/`- or `\`-separated segment of a name.
pub fn last_segment(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn hash_matches_sha256_of_bytes() {
        assert_eq!(content_hash(b"hello"), HELLO_SHA256);

        // Spans several hash chunks.
        let big = vec![7u8; HASH_CHUNK_SIZE * 3 + 11];
        assert_eq!(content_hash(&big), hex::encode(Sha256::digest(&big)));
    }

    #[test]
    fn extension_derivation() {
        assert_eq!(extension_for("report.txt"), ".txt");
        assert_eq!(extension_for("/upload/report.tar.gz"), ".gz");
        assert_eq!(extension_for("C:\\malware\\putty.exe"), ".exe");
        assert_eq!(extension_for("README"), "");
        assert_eq!(extension_for(".bashrc"), "");
        assert_eq!(extension_for(""), "");
        assert_eq!(extension_for("/dir.d/file"), "");
        assert_eq!(extension_for("x.p hp"), "");
    }

    #[test]
    fn store_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::open(dir.path().join("uploads")).unwrap();

        let first = store.store(b"hello", ".txt").unwrap();
        let second = store.store(b"hello", ".txt").unwrap();

        assert!(first.newly_written);
        assert!(!second.newly_written);
        assert_eq!(first.path, second.path);
        assert_eq!(first.content_hash, HELLO_SHA256);
        assert_eq!(first.display_path(), format!("uploads/{}.txt", HELLO_SHA256));
        assert_eq!(fs::read(&first.path).unwrap(), b"hello");

        let files: Vec<_> = fs::read_dir(store.root()).unwrap().collect();
        assert_eq!(files.len(), 1, "no temporary files left behind");
    }

    #[test]
    fn display_path_hides_store_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::open(dir.path().join("data").join("blobs")).unwrap();

        let stored = store.store(b"hello", ".txt").unwrap();

        let shown = stored.display_path();
        assert_eq!(shown, format!("uploads/{}.txt", HELLO_SHA256));
        assert!(!shown.contains(&*dir.path().to_string_lossy()));
        assert!(stored.path.starts_with(dir.path()));
    }

    #[test]
    fn same_bytes_different_extension_are_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::open(dir.path()).unwrap();

        let txt = store.store(b"same", ".txt").unwrap();
        let bin = store.store(b"same", "").unwrap();

        assert_ne!(txt.path, bin.path);
        assert_eq!(txt.content_hash, bin.content_hash);
    }

    #[test]
    fn binary_payload_is_stored_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::open(dir.path()).unwrap();
        let payload: Vec<u8> = (0..=255u8).cycle().take(20_000).collect();

        let stored = store.store(&payload, ".bin").unwrap();

        assert_eq!(fs::read(&stored.path).unwrap(), payload);
    }

    #[test]
    fn concurrent_identical_stores_converge() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::open(dir.path()).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.store(b"racing bytes", ".dat").unwrap())
            })
            .collect();
        let paths: Vec<_> = handles.into_iter().map(|h| h.join().unwrap().path).collect();

        assert!(paths.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(fs::read(&paths[0]).unwrap(), b"racing bytes");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
