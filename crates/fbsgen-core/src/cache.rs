//! Digest Cache - last compiled digest per schema file
//!
//! Stored as a flat JSON object keyed by relative path. Writes go to a
//! sibling temp file that is renamed over the cache, so readers only ever see
//! a complete snapshot.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::hasher::Digest;

/// Persisted relative path → digest mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigestCache {
    entries: BTreeMap<String, Digest>,
}

impl DigestCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the cache, treating a missing or corrupt file as empty
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!("No digest cache at {:?} ({}), starting empty", path, e);
                return Self::new();
            }
        };

        match serde_json::from_str::<BTreeMap<String, Digest>>(&content) {
            Ok(entries) => Self { entries },
            Err(e) => {
                warn!("Ignoring corrupt digest cache {:?}: {}", path, e);
                Self::new()
            }
        }
    }

    /// Atomically write the cache to `path`
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let content = serde_json::to_string_pretty(&self.entries)?;
        let tmp = temp_path(path);
        fs::write(&tmp, content).map_err(|e| Error::io(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| Error::io(path, e))?;
        Ok(())
    }

    /// Delete the cache file if present
    pub fn remove(path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::io(path, e)),
        }
    }

    pub fn get(&self, rel_path: &str) -> Option<&Digest> {
        self.entries.get(rel_path)
    }

    pub fn insert(&mut self, rel_path: impl Into<String>, digest: impl Into<Digest>) -> Option<Digest> {
        self.entries.insert(rel_path.into(), digest.into())
    }

    pub fn remove_entry(&mut self, rel_path: &str) -> Option<Digest> {
        self.entries.remove(rel_path)
    }

    /// Put `rel_path` back to `previous`, or drop it when there is none
    pub fn restore(&mut self, rel_path: &str, previous: Option<&Digest>) {
        match previous {
            Some(digest) => {
                self.entries.insert(rel_path.to_string(), digest.clone());
            }
            None => {
                self.entries.remove(rel_path);
            }
        }
    }

    /// Whether `rel_path` is cached with exactly `digest`
    pub fn is_current(&self, rel_path: &str, digest: &str) -> bool {
        self.get(rel_path).map(|d| d == digest).unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Digest)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Digest)> for DigestCache {
    fn from_iter<I: IntoIterator<Item = (String, Digest)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
