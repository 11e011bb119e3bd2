//! Domain model for perfscope
//!
//! Core domain types and errors:
//! - Compile-time safety via newtype pattern for the two address spaces
//! - Structured error handling for the analysis pipeline

pub mod errors;
pub mod types;

pub use types::{FileOffset, VirtualAddr};

pub use errors::{AnalysisError, ExportError};
