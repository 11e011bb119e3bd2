//! Disassembly listings via objdump
//!
//! Produces the text the offset annotations are rendered against. The raw
//! objdump output is trimmed to the `.text` section and interleaved
//! absolute source paths are condensed into short file rulers so the
//! listing stays readable in a terminal.

use anyhow::{bail, Context, Result};
use std::path::Path;
use tokio::process::Command;

const TEXT_SECTION_MARKER: &str = "Disassembly of section .text:";
const RULER_WIDTH: usize = 45;

/// Disassemble one symbol (`*` disassembles the whole binary).
///
/// # Errors
/// Fails when objdump cannot be run or exits unsuccessfully.
pub async fn disassemble(
    executable: &Path,
    symbol: &str,
    extra_flags: &[String],
) -> Result<String> {
    let mut cmd = Command::new("objdump");
    cmd.arg("-d").arg(executable);
    cmd.args(extra_flags);
    if symbol == "*" {
        cmd.arg("--disassemble");
    } else {
        cmd.arg(format!("--disassemble={symbol}"));
    }

    let output = cmd.output().await.context("failed to run objdump")?;
    if !output.status.success() {
        bail!("objdump exited with {}", output.status);
    }
    Ok(condense_listing(&String::from_utf8_lossy(&output.stdout)))
}

/// Trim the preamble and shrink absolute source-path lines (emitted by
/// `objdump -l`) to `-----file.ext-----…` rulers.
#[must_use]
pub fn condense_listing(raw: &str) -> String {
    let content = match raw.find(TEXT_SECTION_MARKER) {
        Some(start) => &raw[start..],
        None => raw,
    };
    let lines: Vec<String> = content
        .lines()
        .map(|line| {
            if line.starts_with('/') {
                let file = line.rsplit('/').next().unwrap_or(line);
                let pad = RULER_WIDTH.saturating_sub(file.len());
                format!("-----{file}{}", "-".repeat(pad))
            } else {
                line.to_string()
            }
        })
        .collect();
    lines.iter().skip(2).cloned().collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condense_listing_trims_and_rules() {
        let raw = "\
binary: file format elf64-x86-64

Disassembly of section .text:

0000000000001130 <main>:
/home/u/proj/src/main.rs
    1130:\t55\tpush   %rbp";
        let out = condense_listing(raw);
        assert!(!out.contains("file format"));
        assert!(out.starts_with("0000000000001130 <main>:"));
        assert!(out.contains("-----main.rs"));
        assert!(out.contains("    1130:"));
        assert!(!out.contains("/home/u/proj"));
    }

    #[test]
    fn test_condense_listing_without_marker_keeps_content() {
        let out = condense_listing("a\nb\nc\nd");
        assert_eq!(out, "c\nd");
    }
}
