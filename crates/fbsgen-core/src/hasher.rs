//! Schema Hasher - BLAKE3 content digests and source tree discovery
//!
//! Features:
//! - Whole-file BLAKE3 digests, hex encoded
//! - Walks the source root, skipping the generated output tree
//! - Parallel hashing with Rayon, results ordered by relative path

use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::config::BuildConfig;
use crate::error::{Error, Result};
use crate::includes::extract_includes;

/// Hex-encoded BLAKE3 digest of a file's bytes
pub type Digest = String;

/// A schema file discovered in one pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaFile {
    /// Path relative to the source root, `/`-separated. Used as the graph and cache key.
    pub rel_path: String,
    /// Filesystem path handed to the compiler.
    pub path: PathBuf,
    pub digest: Digest,
    /// Include targets exactly as written in the source.
    pub includes: Vec<String>,
}

/// Hash raw bytes
pub fn hash_bytes(bytes: &[u8]) -> Digest {
    blake3::hash(bytes).to_hex().to_string()
}

/// Hash a single file using BLAKE3
pub fn hash_file(path: impl AsRef<Path>) -> Result<Digest> {
    let path = path.as_ref();
    let content = fs::read(path).map_err(|e| Error::io(path, e))?;
    Ok(hash_bytes(&content))
}

/// Find every schema file under the source root, sorted
pub fn discover(config: &BuildConfig) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    let walker = WalkDir::new(&config.source_root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !e.path().starts_with(&config.output_root));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e == config.extension)
            .unwrap_or(false);
        if matches {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

/// Discover, hash and scan includes for every schema file
///
/// A file that cannot be hashed aborts the scan. Include extraction is best
/// effort and never fails.
pub fn scan(config: &BuildConfig) -> Result<Vec<SchemaFile>> {
    let paths = discover(config)?;

    let mut files: Vec<SchemaFile> = paths
        .par_iter()
        .map(|path| {
            let digest = hash_file(path)?;
            let includes = extract_includes(path);
            Ok(SchemaFile {
                rel_path: relative_key(&config.source_root, path),
                path: path.clone(),
                digest,
                includes,
            })
        })
        .collect::<Result<_>>()?;

    files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    debug!("Scanned {} schema files", files.len());
    Ok(files)
}

/// Relative cache key for `path` under `root`
pub fn relative_key(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
