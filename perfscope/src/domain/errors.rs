//! Structured error types for perfscope
//!
//! Using thiserror for automatic Display implementation and error chaining.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("profile data not found: {} (run the profiling task first)", .0.display())]
    StreamUnavailable(PathBuf),

    #[error("no executable mapping found under {}", .0.display())]
    ExecutableNotFound(PathBuf),

    #[error("address resolver returned an unusable response: {0}")]
    Resolution(String),

    #[error("address resolver process is no longer running")]
    ResolverExited,

    #[error("no samples were attributable to {0}")]
    EmptyResult(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("failed to write profile export: {0}")]
    WriteFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_unavailable_display() {
        let err = AnalysisError::StreamUnavailable(PathBuf::from("/tmp/out/perf.data"));
        let msg = err.to_string();
        assert!(msg.contains("/tmp/out/perf.data"));
        assert!(msg.contains("profiling task"));
    }

    #[test]
    fn test_empty_result_display() {
        let err = AnalysisError::EmptyResult("/home/u/app/target/release/app".to_string());
        assert!(err.to_string().contains("no samples"));
    }
}
