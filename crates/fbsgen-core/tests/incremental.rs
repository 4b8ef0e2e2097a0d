//! End-to-end incremental pass behaviour against a scripted compiler.

use fbsgen_core::{
    hash_file, BuildConfig, Builder, CompileFailure, CompileJob, Compiler, DigestCache,
};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Records every job; fails the ones named in `failing`
#[derive(Default)]
struct FakeFlatc {
    calls: RefCell<Vec<String>>,
    failing: RefCell<HashSet<String>>,
    cache_snapshots: RefCell<Vec<DigestCache>>,
    cache_file: Option<std::path::PathBuf>,
}

impl FakeFlatc {
    fn watching(cache_file: &Path) -> Self {
        Self {
            cache_file: Some(cache_file.to_path_buf()),
            ..Self::default()
        }
    }

    fn fail(&self, rel: &str) {
        self.failing.borrow_mut().insert(rel.to_string());
    }

    fn heal(&self) {
        self.failing.borrow_mut().clear();
    }

    /// Calls since the last drain, sorted
    fn drain(&self) -> BTreeSet<String> {
        self.calls.borrow_mut().drain(..).collect()
    }
}

impl Compiler for FakeFlatc {
    fn compile(&self, job: &CompileJob) -> Result<(), CompileFailure> {
        if let Some(cache_file) = &self.cache_file {
            self.cache_snapshots
                .borrow_mut()
                .push(DigestCache::load(cache_file));
        }
        self.calls.borrow_mut().push(job.rel_path.clone());
        if self.failing.borrow().contains(&job.rel_path) {
            Err(CompileFailure::Exit(Some(1)))
        } else {
            Ok(())
        }
    }
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// a.fbs includes b.fbs includes shared/c.fbs; lone.fbs stands alone
fn chain_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.fbs", "include \"b.fbs\";\ntable A { b: B; }\n");
    write(dir.path(), "b.fbs", "include \"shared/c.fbs\";\ntable B { c: C; }\n");
    write(dir.path(), "shared/c.fbs", "table C { x: int; }\n");
    write(dir.path(), "lone.fbs", "table Lone {}\n");
    dir
}

#[test]
fn second_build_without_changes_invokes_nothing() {
    let dir = chain_tree();
    let builder = Builder::new(BuildConfig::with_root(dir.path()), FakeFlatc::default());

    let first = builder.build().unwrap();
    assert_eq!(first.dispatch.invocations(), 4);
    assert_eq!(first.files_scanned, 4);

    let second = builder.build().unwrap();
    assert!(second.up_to_date());
    assert_eq!(second.dispatch.invocations(), 0);
}

#[test]
fn changing_a_leaf_rebuilds_every_includer() {
    let dir = chain_tree();
    let compiler = FakeFlatc::default();
    let builder = Builder::new(BuildConfig::with_root(dir.path()), &compiler);
    builder.build().unwrap();
    compiler.drain();

    write(dir.path(), "shared/c.fbs", "table C { x: int; y: int; }\n");
    let report = builder.build().unwrap();

    assert_eq!(report.invalidation.seed, set(&["shared/c.fbs"]));
    assert_eq!(report.invalidation.closure, set(&["a.fbs", "b.fbs", "shared/c.fbs"]));
    assert_eq!(compiler.drain(), set(&["a.fbs", "b.fbs", "shared/c.fbs"]));
}

#[test]
fn changing_an_includer_leaves_included_alone() {
    let dir = chain_tree();
    let compiler = FakeFlatc::default();
    let builder = Builder::new(BuildConfig::with_root(dir.path()), &compiler);
    builder.build().unwrap();
    compiler.drain();

    write(dir.path(), "b.fbs", "include \"shared/c.fbs\";\ntable B { c: C; n: int; }\n");
    builder.build().unwrap();

    assert_eq!(compiler.drain(), set(&["a.fbs", "b.fbs"]));
}

#[test]
fn include_cycle_terminates_and_marks_both() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.fbs", "include \"b.fbs\";\ntable A {}\n");
    write(dir.path(), "b.fbs", "include \"a.fbs\";\ntable B {}\n");
    let compiler = FakeFlatc::default();
    let builder = Builder::new(BuildConfig::with_root(dir.path()), &compiler);

    builder.build().unwrap();
    compiler.drain();

    assert!(builder.build().unwrap().up_to_date());
    assert!(compiler.drain().is_empty());

    write(dir.path(), "b.fbs", "include \"a.fbs\";\ntable B { x: int; }\n");
    builder.build().unwrap();
    assert_eq!(compiler.drain(), set(&["a.fbs", "b.fbs"]));
}

#[test]
fn failed_file_is_retried_and_others_are_not() {
    let dir = chain_tree();
    let config = BuildConfig::with_root(dir.path());
    let cache_file = config.cache_file.clone();
    let compiler = FakeFlatc::default();
    let builder = Builder::new(config, &compiler);
    builder.build().unwrap();
    compiler.drain();

    write(dir.path(), "lone.fbs", "table Lone { broken: }\n");
    write(dir.path(), "shared/c.fbs", "table C { z: int; }\n");
    let before_lone = DigestCache::load(&cache_file).get("lone.fbs").cloned();
    compiler.fail("lone.fbs");

    let report = builder.build().unwrap();
    assert!(!report.all_succeeded());
    let failed: Vec<_> = report.dispatch.failed().map(|f| f.rel_path.as_str()).collect();
    assert_eq!(failed, vec!["lone.fbs"]);

    let cache = DigestCache::load(&cache_file);
    assert_eq!(cache.get("lone.fbs").cloned(), before_lone);
    let c_digest = hash_file(dir.path().join("shared/c.fbs")).unwrap();
    assert!(cache.is_current("shared/c.fbs", &c_digest));
    compiler.drain();

    compiler.heal();
    builder.build().unwrap();
    assert_eq!(compiler.drain(), set(&["lone.fbs"]));
}

#[test]
fn failed_new_file_is_left_out_of_cache() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "x.fbs", "table X {}\n");
    write(dir.path(), "y.fbs", "table Y {}\n");
    let config = BuildConfig::with_root(dir.path());
    let cache_file = config.cache_file.clone();
    let compiler = FakeFlatc::default();
    compiler.fail("x.fbs");
    let builder = Builder::new(config, &compiler);

    builder.build().unwrap();
    let cache = DigestCache::load(&cache_file);
    assert!(cache.get("x.fbs").is_none());
    assert!(cache.is_current("y.fbs", &hash_file(dir.path().join("y.fbs")).unwrap()));
    compiler.drain();

    builder.build().unwrap();
    assert_eq!(compiler.drain(), set(&["x.fbs"]));
}

#[test]
fn failed_includer_is_retried_even_though_its_bytes_did_not_change() {
    let dir = chain_tree();
    let compiler = FakeFlatc::default();
    let builder = Builder::new(BuildConfig::with_root(dir.path()), &compiler);
    builder.build().unwrap();
    compiler.drain();

    write(dir.path(), "shared/c.fbs", "table C { renamed: int; }\n");
    compiler.fail("a.fbs");
    builder.build().unwrap();
    compiler.drain();

    compiler.heal();
    builder.build().unwrap();
    assert_eq!(compiler.drain(), set(&["a.fbs"]));
}

#[test]
fn rebuild_dispatches_every_file() {
    let dir = chain_tree();
    let compiler = FakeFlatc::default();
    let builder = Builder::new(BuildConfig::with_root(dir.path()), &compiler);
    builder.build().unwrap();
    compiler.drain();

    let report = builder.rebuild().unwrap();
    assert_eq!(report.dispatch.invocations(), 4);
    assert_eq!(compiler.drain().len(), 4);
}

#[test]
fn clean_then_build_is_a_first_build() {
    let dir = chain_tree();
    let config = BuildConfig::with_root(dir.path());
    let compiler = FakeFlatc::default();
    let builder = Builder::new(config.clone(), &compiler);
    builder.build().unwrap();
    fs::write(config.output_root.join("a_generated.h"), "// generated").unwrap();
    compiler.drain();

    builder.clean().unwrap();
    assert!(!config.cache_file.exists());
    assert!(!config.output_root.exists());

    let report = builder.build().unwrap();
    assert_eq!(report.invalidation.seed.len(), 4);
    assert_eq!(compiler.drain().len(), 4);
}

#[test]
fn deleted_files_leave_the_cache() {
    let dir = chain_tree();
    let config = BuildConfig::with_root(dir.path());
    let builder = Builder::new(config.clone(), FakeFlatc::default());
    builder.build().unwrap();

    fs::remove_file(dir.path().join("lone.fbs")).unwrap();
    let report = builder.build().unwrap();

    assert!(report.up_to_date());
    let cache = DigestCache::load(&config.cache_file);
    assert!(cache.get("lone.fbs").is_none());
    assert_eq!(cache.len(), 3);
}

#[test]
fn corrupt_cache_means_full_build() {
    let dir = chain_tree();
    let config = BuildConfig::with_root(dir.path());
    let compiler = FakeFlatc::default();
    let builder = Builder::new(config.clone(), &compiler);
    builder.build().unwrap();
    compiler.drain();

    fs::write(&config.cache_file, "not json at all").unwrap();
    builder.build().unwrap();
    assert_eq!(compiler.drain().len(), 4);
}

#[test]
fn cache_on_disk_only_covers_finished_files_during_dispatch() {
    let dir = chain_tree();
    let config = BuildConfig::with_root(dir.path());
    let compiler = FakeFlatc::watching(&config.cache_file);
    let builder = Builder::new(config, &compiler);

    builder.build().unwrap();
    let snapshots = compiler.cache_snapshots.borrow();
    assert_eq!(snapshots.len(), 4);
    // Dispatch is in path order and each finished file is flushed before the next starts
    for (done, snapshot) in snapshots.iter().enumerate() {
        assert_eq!(snapshot.len(), done);
    }
}

#[test]
fn compiler_sees_mirrored_output_directories() {
    let dir = chain_tree();
    let config = BuildConfig::with_root(dir.path());

    struct CheckDirs;
    impl Compiler for CheckDirs {
        fn compile(&self, job: &CompileJob) -> Result<(), CompileFailure> {
            assert!(job.out_dir.is_dir());
            let expected_tail = Path::new(&job.rel_path).parent().unwrap();
            assert!(job.out_dir.ends_with(Path::new("Generated").join(expected_tail)));
            Ok(())
        }
    }

    let report = Builder::new(config.clone(), CheckDirs).build().unwrap();
    assert!(report.all_succeeded());
    assert!(config.output_root.join("shared").is_dir());
}
