//! Resolved run configuration
//!
//! Everything configurable is resolved once, up front, from the CLI
//! arguments; the parsing and analysis code receives plain values and never
//! consults configuration on its own.

use anyhow::{Context, Result};
use clap::ValueEnum;
use std::path::PathBuf;

use crate::cli::Args;

/// Directory (relative to the project) the profiling artifacts live in.
pub const DEFAULT_OUTPUT_DIR: &str = ".perfscope";

/// Denominator used when expressing line hits as percentages.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProportionScope {
    /// Relative to all samples that landed in the annotated file/listing.
    #[default]
    File,
    /// Relative to all samples attributable to the profiled binary.
    Program,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the profiled project; used to auto-detect the executable.
    pub project_dir: PathBuf,
    /// Where `perf.data` and the dumps are written and read.
    pub output_dir: PathBuf,
    /// Extra flags for `perf record`.
    pub perf_flags: Vec<String>,
    /// Extra flags for `objdump`.
    pub objdump_flags: Vec<String>,
}

impl Config {
    /// Resolve the effective configuration from CLI arguments.
    ///
    /// # Errors
    /// Fails when no project directory was given and the working directory
    /// cannot be determined.
    pub fn resolve(args: &Args) -> Result<Self> {
        let project_dir = match &args.project_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().context("cannot determine working directory")?,
        };
        let output = args.output.as_deref().unwrap_or(DEFAULT_OUTPUT_DIR);
        let output_dir = project_dir.join(output);
        Ok(Self {
            project_dir,
            output_dir,
            perf_flags: split_flags(args.perf_flags.as_deref()),
            objdump_flags: split_flags(args.objdump_flags.as_deref()),
        })
    }
}

fn split_flags(flags: Option<&str>) -> Vec<String> {
    flags
        .map(|f| f.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_flags() {
        assert_eq!(split_flags(Some("-F 999  --no-inherit")), vec!["-F", "999", "--no-inherit"]);
        assert!(split_flags(None).is_empty());
        assert!(split_flags(Some("   ")).is_empty());
    }
}
