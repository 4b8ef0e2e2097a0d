//! Build Dispatcher - compile each dirty schema and record the outcome
//!
//! Invocations are sequential. After every file the cache is flushed, so an
//! interrupted pass leaves behind exactly the files that finished.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::cache::DigestCache;
use crate::compiler::{CompileFailure, CompileJob, Compiler};
use crate::config::BuildConfig;
use crate::error::Result;
use crate::hasher::{Digest, SchemaFile};

/// Result of compiling one schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Compiled,
    Failed(CompileFailure),
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FileOutcome::Compiled)
    }
}

/// Per-file record of a dispatch
#[derive(Debug, Clone)]
pub struct FileReport {
    pub rel_path: String,
    pub outcome: FileOutcome,
    pub duration: Duration,
}

/// Everything a dispatch did, in dispatch order
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub files: Vec<FileReport>,
}

impl DispatchReport {
    pub fn compiled(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| f.outcome.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| !f.outcome.is_success())
    }

    pub fn invocations(&self) -> usize {
        self.files.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed().next().is_none()
    }
}

/// Output directory for `rel_path`: the output root plus the file's relative directory
pub fn output_dir_for(rel_path: &str, config: &BuildConfig) -> PathBuf {
    match Path::new(rel_path).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => config.output_root.join(dir),
        _ => config.output_root.clone(),
    }
}

/// Compiles dirty files and keeps the digest cache in step
pub struct Dispatcher<'a, C: Compiler> {
    config: &'a BuildConfig,
    compiler: &'a C,
}

impl<'a, C: Compiler> Dispatcher<'a, C> {
    pub fn new(config: &'a BuildConfig, compiler: &'a C) -> Self {
        Self { config, compiler }
    }

    /// Compile every path in `dirty`
    ///
    /// On success the file's current digest goes into `cache`. On failure the
    /// entry is put back to `fallback`, the state it had before dispatch.
    /// `cache` is saved to the configured cache file after each file.
    pub fn run(
        &self,
        dirty: &BTreeSet<String>,
        files: &BTreeMap<&str, &SchemaFile>,
        fallback: &BTreeMap<String, Option<Digest>>,
        cache: &mut DigestCache,
    ) -> Result<DispatchReport> {
        let mut report = DispatchReport::default();

        for rel_path in dirty {
            let Some(file) = files.get(rel_path.as_str()) else {
                debug!("Dirty path {} no longer on disk, skipping", rel_path);
                continue;
            };

            let start = Instant::now();
            let outcome = match self.compile_one(file) {
                Ok(()) => {
                    cache.insert(rel_path.clone(), file.digest.clone());
                    FileOutcome::Compiled
                }
                Err(failure) => {
                    warn!("Failed to compile {}: {}", rel_path, failure);
                    cache.restore(rel_path, fallback.get(rel_path).and_then(Option::as_ref));
                    FileOutcome::Failed(failure)
                }
            };
            cache.save(&self.config.cache_file)?;

            report.files.push(FileReport {
                rel_path: rel_path.clone(),
                outcome,
                duration: start.elapsed(),
            });
        }

        Ok(report)
    }

    fn compile_one(&self, file: &SchemaFile) -> std::result::Result<(), CompileFailure> {
        let out_dir = output_dir_for(&file.rel_path, self.config);
        fs::create_dir_all(&out_dir)
            .map_err(|e| CompileFailure::OutputDir(format!("{}: {}", out_dir.display(), e)))?;

        let job = CompileJob {
            rel_path: file.rel_path.clone(),
            schema: file.path.clone(),
            out_dir,
            include_dir: self.config.source_root.clone(),
            field_style: self.config.field_style,
        };
        debug!("Compiling {} into {:?}", job.rel_path, job.out_dir);
        self.compiler.compile(&job)
    }
}
