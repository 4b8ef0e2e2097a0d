//! Include Extractor - `include "path";` declarations in schema text
//!
//! Matching is line oriented and deliberately shallow: no schema parsing,
//! just the declarations that create dependency edges.

use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

fn include_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"include\s+"([^"]+)"\s*;"#).expect("include pattern is a valid regex")
    })
}

/// Include targets declared in `text`, in source order
///
/// Only the first declaration on a line is taken.
pub fn parse_includes(text: &str) -> Vec<String> {
    let pattern = include_pattern();
    text.lines()
        .filter_map(|line| pattern.captures(line))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Include targets declared in the file at `path`
///
/// Unreadable files yield no includes; the file is still hashed and built, it
/// just has no outgoing edges.
pub fn extract_includes(path: impl AsRef<Path>) -> Vec<String> {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(text) => parse_includes(&text),
        Err(e) => {
            debug!("Skipping include scan of {:?}: {}", path, e);
            Vec::new()
        }
    }
}

/// Resolve `target` against the directory of `including`, both relative keys
///
/// Returns `None` when the result would climb above the source root.
pub fn resolve_include(including: &str, target: &str) -> Option<String> {
    let base = Path::new(including).parent().unwrap_or_else(|| Path::new(""));
    normalize(&base.join(target))
}

/// Lexically collapse `.` and `..`, rendering with `/`
pub fn normalize(path: &Path) -> Option<String> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            Component::Normal(part) => out.push(part),
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    let parts: Vec<_> = out
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
