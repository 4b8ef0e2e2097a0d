//! Schema Compiler - the external code generator behind a trait
//!
//! `Flatc` runs one blocking `flatc` process per schema. Tests swap in their
//! own [`Compiler`] to record or fail invocations.

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::process::Command;
use std::str::FromStr;

/// `--cpp-field-case-style` value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldStyle {
    Original,
    #[default]
    Lower,
    Upper,
}

impl FieldStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldStyle::Original => "original",
            FieldStyle::Lower => "lower",
            FieldStyle::Upper => "upper",
        }
    }
}

impl fmt::Display for FieldStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "original" => Ok(FieldStyle::Original),
            "lower" => Ok(FieldStyle::Lower),
            "upper" => Ok(FieldStyle::Upper),
            other => Err(format!(
                "unknown field style '{}' (expected original, lower or upper)",
                other
            )),
        }
    }
}

/// One compiler invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileJob {
    pub rel_path: String,
    /// Schema file to compile.
    pub schema: PathBuf,
    /// Mirrored output directory, already created.
    pub out_dir: PathBuf,
    /// Include search path.
    pub include_dir: PathBuf,
    pub field_style: FieldStyle,
}

/// Why a single schema did not compile
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileFailure {
    /// The compiler could not be started.
    Launch(String),
    /// The compiler ran and exited nonzero, or was killed (`None`).
    Exit(Option<i32>),
    /// The output directory could not be created.
    OutputDir(String),
}

impl fmt::Display for CompileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileFailure::Launch(reason) => write!(f, "failed to launch compiler: {}", reason),
            CompileFailure::Exit(Some(code)) => write!(f, "compiler exited with code {}", code),
            CompileFailure::Exit(None) => write!(f, "compiler terminated by signal"),
            CompileFailure::OutputDir(reason) => {
                write!(f, "cannot create output directory: {}", reason)
            }
        }
    }
}

/// Something that turns a schema into generated code
pub trait Compiler {
    fn compile(&self, job: &CompileJob) -> Result<(), CompileFailure>;
}

impl<C: Compiler + ?Sized> Compiler for &C {
    fn compile(&self, job: &CompileJob) -> Result<(), CompileFailure> {
        (**self).compile(job)
    }
}

/// The `flatc` executable, generating C++17
#[derive(Debug, Clone)]
pub struct Flatc {
    program: PathBuf,
}

impl Flatc {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Full argument list for `job`
    pub fn args(job: &CompileJob) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "--cpp",
            "--cpp-std",
            "c++17",
            "--cpp-static-reflection",
            "--cpp-str-flex-ctor",
            "--scoped-enums",
            "--cpp-field-case-style",
            job.field_style.as_str(),
            "--gen-object-api",
            "-o",
        ]
        .iter()
        .map(OsString::from)
        .collect();

        args.push(job.out_dir.clone().into_os_string());
        args.push("-I".into());
        args.push(job.include_dir.clone().into_os_string());
        args.push(job.schema.clone().into_os_string());
        args
    }
}

impl Default for Flatc {
    fn default() -> Self {
        Self::new("flatc")
    }
}

impl Compiler for Flatc {
    fn compile(&self, job: &CompileJob) -> Result<(), CompileFailure> {
        let status = Command::new(&self.program)
            .args(Self::args(job))
            .status()
            .map_err(|e| CompileFailure::Launch(format!("{}: {}", self.program.display(), e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(CompileFailure::Exit(status.code()))
        }
    }
}
