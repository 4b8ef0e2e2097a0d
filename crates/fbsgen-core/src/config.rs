//! Build configuration
//!
//! Loaded from an optional `fbsgen.json` next to the schema tree. Every field
//! is optional; relative paths are resolved against the directory the file was
//! loaded from.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::compiler::FieldStyle;
use crate::error::{Error, Result};

/// Name of the optional configuration file.
pub const CONFIG_FILE: &str = "fbsgen.json";

/// Paths and compiler settings for one schema tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Root of the schema tree, also passed to the compiler as `-I`.
    pub source_root: PathBuf,
    /// Generated code lands here, mirroring the source tree layout.
    pub output_root: PathBuf,
    /// Persisted digest cache.
    pub cache_file: PathBuf,
    /// Compiler executable, looked up on `PATH` when not absolute.
    pub compiler: PathBuf,
    /// Schema file extension, without the dot.
    pub extension: String,
    /// Field naming style handed to the compiler.
    pub field_style: FieldStyle,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("."),
            output_root: PathBuf::from("Generated"),
            cache_file: PathBuf::from(".fbs_cache.json"),
            compiler: PathBuf::from("flatc"),
            extension: "fbs".to_string(),
            field_style: FieldStyle::default(),
        }
    }
}

impl BuildConfig {
    /// Default layout rooted at `dir`
    pub fn with_root(dir: impl AsRef<Path>) -> Self {
        Self::default().resolved_against(dir.as_ref())
    }

    /// Load `fbsgen.json` from `dir`, falling back to defaults when absent
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::with_root(dir));
        }

        let content = std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        let config: BuildConfig = serde_json::from_str(&content).map_err(|e| Error::Config {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        tracing::debug!("Loaded config from {:?}", path);
        Ok(config.resolved_against(dir))
    }

    /// Override the field style, keeping everything else
    pub fn field_style(mut self, style: FieldStyle) -> Self {
        self.field_style = style;
        self
    }

    /// Relative paths are joined onto `dir`. A bare compiler name stays as-is
    /// so it resolves through `PATH`.
    fn resolved_against(mut self, dir: &Path) -> Self {
        self.source_root = join_relative(dir, &self.source_root);
        self.output_root = join_relative(dir, &self.output_root);
        self.cache_file = join_relative(dir, &self.cache_file);
        if self.compiler.components().count() > 1 {
            self.compiler = join_relative(dir, &self.compiler);
        }
        self
    }
}

fn join_relative(dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else if path == Path::new(".") {
        dir.to_path_buf()
    } else {
        dir.join(path)
    }
}
