//! An injectable diagnostics sink (spec §9 "Global singletons"): passes are
//! logged pass-by-pass to a markdown report, with a null sink as the
//! default so no caller is forced to pay for diagnostics it doesn't want.
//! Shaped after `cranelift-codegen::context::Context`'s optional listener
//! hooks — a trait object held by reference, never a global.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("could not create markdown report directory `{path}`: {source}")]
    CreateDir { path: PathBuf, source: std::io::Error },
    #[error("could not write markdown report `{path}`: {source}")]
    Write { path: PathBuf, source: std::io::Error },
}

/// A destination for one pass's worth of human-readable diagnostics.
pub trait Sink {
    /// Appends one section (e.g. "scheduler: path #3 final order") to the
    /// report. `body` is markdown; the sink decides how sections combine.
    fn report(&self, section: &str, body: &str) -> Result<(), SinkError>;
}

/// Discards every report. The default for every CLI binary and every
/// library entry point that takes a `&dyn Sink`.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl Sink for NullSink {
    fn report(&self, _section: &str, _body: &str) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Appends every report as a `##`-headed section to a single markdown file
/// in `dir`, creating `dir` on first use.
#[derive(Clone, Debug)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl AsRef<Path>, report_name: &str) -> Result<Self, SinkError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|source| SinkError::CreateDir { path: dir.to_path_buf(), source })?;
        Ok(Self { path: dir.join(format!("{report_name}.md")) })
    }
}

impl Sink for FileSink {
    fn report(&self, section: &str, body: &str) -> Result<(), SinkError> {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| SinkError::Write { path: self.path.clone(), source })?;
        writeln!(f, "## {section}\n\n{body}\n").map_err(|source| SinkError::Write { path: self.path.clone(), source })
    }
}
