//! Builder - one incremental pass over a schema tree
//!
//! Scan → hash + includes → graph → seed → closure → dispatch → persist.
//! Nothing survives between passes except the digest cache file.

use std::collections::BTreeMap;
use std::fs;
use std::time::{Duration, Instant};
use tracing::info;

use crate::cache::DigestCache;
use crate::compiler::Compiler;
use crate::config::BuildConfig;
use crate::dispatch::{DispatchReport, Dispatcher};
use crate::error::{Error, Result};
use crate::graph::IncludeGraph;
use crate::hasher::{scan, Digest, SchemaFile};
use crate::invalidate::Invalidation;

/// Summary of one build pass
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub files_scanned: usize,
    pub invalidation: Invalidation,
    pub dispatch: DispatchReport,
    pub duration: Duration,
}

impl BuildReport {
    /// No file needed compiling
    pub fn up_to_date(&self) -> bool {
        self.invalidation.is_empty()
    }

    pub fn all_succeeded(&self) -> bool {
        self.dispatch.all_succeeded()
    }
}

/// What `clean` removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub removed_cache: bool,
    pub removed_output: bool,
}

/// Drives clean / build / rebuild for one configuration
pub struct Builder<C: Compiler> {
    config: BuildConfig,
    compiler: C,
}

impl<C: Compiler> Builder<C> {
    pub fn new(config: BuildConfig, compiler: C) -> Self {
        Self { config, compiler }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Remove the digest cache and the generated output tree
    pub fn clean(&self) -> Result<CleanReport> {
        let removed_cache = DigestCache::remove(&self.config.cache_file)?;

        let output = &self.config.output_root;
        let removed_output = match fs::remove_dir_all(output) {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(Error::io(output, e)),
        };

        info!(
            "Cleaned {:?} and {:?}",
            self.config.output_root, self.config.cache_file
        );
        Ok(CleanReport {
            removed_cache,
            removed_output,
        })
    }

    /// Run one incremental pass
    pub fn build(&self) -> Result<BuildReport> {
        let start = Instant::now();
        let config = &self.config;
        fs::create_dir_all(&config.output_root).map_err(|e| Error::io(&config.output_root, e))?;

        let previous = DigestCache::load(&config.cache_file);
        let files = scan(config)?;
        let graph = IncludeGraph::build(&files);
        let invalidation = Invalidation::compute(&files, &graph, &previous);

        info!(
            "Scanned {} schemas ({} includes): {} changed, {} to build",
            files.len(),
            graph.edge_count(),
            invalidation.seed.len(),
            invalidation.closure.len()
        );

        if invalidation.is_empty() {
            current_digests(&files).save(&config.cache_file)?;
            return Ok(BuildReport {
                files_scanned: files.len(),
                invalidation,
                dispatch: DispatchReport::default(),
                duration: start.elapsed(),
            });
        }

        let fallback = fallback_digests(&files, &invalidation, &previous);
        let mut cache = pending_cache(&files, &invalidation, &fallback);
        cache.save(&config.cache_file)?;

        let by_path: BTreeMap<&str, &SchemaFile> =
            files.iter().map(|f| (f.rel_path.as_str(), f)).collect();
        let dispatch = Dispatcher::new(config, &self.compiler).run(
            &invalidation.closure,
            &by_path,
            &fallback,
            &mut cache,
        )?;
        cache.save(&config.cache_file)?;

        info!(
            "Dispatched {} schemas, {} failed",
            dispatch.invocations(),
            dispatch.failed().count()
        );
        Ok(BuildReport {
            files_scanned: files.len(),
            invalidation,
            dispatch,
            duration: start.elapsed(),
        })
    }

    /// `clean` followed by `build`
    pub fn rebuild(&self) -> Result<BuildReport> {
        self.clean()?;
        self.build()
    }
}

fn current_digests(files: &[SchemaFile]) -> DigestCache {
    files
        .iter()
        .map(|f| (f.rel_path.clone(), f.digest.clone()))
        .collect()
}

/// Cache state each dirty file returns to if its compile fails
///
/// A changed file keeps its previous digest. A file dirty only through its
/// includes has a previous digest equal to the current one, which would look
/// up to date next pass, so it gets no entry instead.
fn fallback_digests(
    files: &[SchemaFile],
    invalidation: &Invalidation,
    previous: &DigestCache,
) -> BTreeMap<String, Option<Digest>> {
    files
        .iter()
        .filter(|f| invalidation.closure.contains(&f.rel_path))
        .map(|f| {
            let prior = previous
                .get(&f.rel_path)
                .filter(|digest| **digest != f.digest)
                .cloned();
            (f.rel_path.clone(), prior)
        })
        .collect()
}

/// Cache persisted before the first invocation: clean files current, dirty
/// files at their fallback, vanished files gone
fn pending_cache(
    files: &[SchemaFile],
    invalidation: &Invalidation,
    fallback: &BTreeMap<String, Option<Digest>>,
) -> DigestCache {
    files
        .iter()
        .filter_map(|f| {
            if invalidation.closure.contains(&f.rel_path) {
                fallback
                    .get(&f.rel_path)
                    .cloned()
                    .flatten()
                    .map(|digest| (f.rel_path.clone(), digest))
            } else {
                Some((f.rel_path.clone(), f.digest.clone()))
            }
        })
        .collect()
}
