//! fbsgen Core - Incremental FlatBuffers Schema Builds
//!
//! Features:
//! - BLAKE3 content digests per schema file
//! - Include graph with transitive invalidation (cycle safe)
//! - Persistent digest cache with per-file rollback on compile failure
//! - `flatc` dispatch mirroring the source layout under the output root

pub mod error;
pub mod config;
pub mod hasher;
pub mod includes;
pub mod graph;
pub mod cache;
pub mod invalidate;
pub mod compiler;
pub mod dispatch;
pub mod build;

pub use error::{Error, Result};
pub use config::BuildConfig;
pub use hasher::{hash_file, scan, Digest, SchemaFile};
pub use includes::{extract_includes, resolve_include};
pub use graph::IncludeGraph;
pub use cache::DigestCache;
pub use invalidate::{propagate, seed_dirty, Invalidation};
pub use compiler::{CompileFailure, CompileJob, Compiler, FieldStyle, Flatc};
pub use dispatch::{DispatchReport, Dispatcher, FileOutcome, FileReport};
pub use build::{BuildReport, Builder, CleanReport};
