//! Profile export
//!
//! Serializes a finalized session to JSON so the tree can be consumed by
//! external viewers or diffed between runs.

use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::analysis::CallNode;
use crate::domain::ExportError;
use crate::session::PerfSession;

#[derive(Debug, Serialize)]
pub struct ProfileExport {
    pub executable: String,
    pub total_samples: u64,
    pub total_samples_in_target: u64,
    pub low_sample_count: bool,
    pub roots: Vec<NodeExport>,
}

#[derive(Debug, Serialize)]
pub struct NodeExport {
    pub symbol: String,
    pub file: String,
    pub line: u32,
    pub samples: u64,
    /// Share of the immediate parent (of the target total for roots).
    pub proportion: String,
    pub children: Vec<NodeExport>,
}

impl ProfileExport {
    #[must_use]
    pub fn from_session(session: &PerfSession) -> Self {
        Self {
            executable: session.executable().to_string(),
            total_samples: session.total_samples(),
            total_samples_in_target: session.total_samples_in_target(),
            low_sample_count: session.has_low_sample_count(),
            roots: session.function_calls(None).into_iter().map(export_node).collect(),
        }
    }
}

fn export_node(node: &CallNode) -> NodeExport {
    NodeExport {
        symbol: node.frame().symbol.clone(),
        file: node.frame().source_file.display().to_string(),
        line: node.frame().line,
        samples: node.sample_count(),
        proportion: node.sample_proportion(),
        children: node.function_calls(None).into_iter().map(export_node).collect(),
    }
}

/// Write the session's tree as pretty-printed JSON.
///
/// # Errors
/// Fails when the file cannot be created or serialization fails.
pub fn write_json(session: &PerfSession, path: &Path) -> Result<(), ExportError> {
    let file = File::create(path)
        .map_err(|e| ExportError::WriteFailed(format!("{}: {e}", path.display())))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &ProfileExport::from_session(session))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_export_serializes_expected_shape() {
        let node = NodeExport {
            symbol: "main".to_string(),
            file: "/src/main.rs".to_string(),
            line: 3,
            samples: 5,
            proportion: "100.00%".to_string(),
            children: vec![],
        };
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["symbol"], "main");
        assert_eq!(json["samples"], 5);
        assert_eq!(json["proportion"], "100.00%");
        assert!(json["children"].as_array().unwrap().is_empty());
    }
}
