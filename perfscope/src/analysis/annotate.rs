//! Per-line hotness annotations
//!
//! Turns the tree's merged hit maps into render-ready annotations for a
//! source file or an objdump listing. This module computes data only; the
//! report layer decides how to draw it.

// Percentage calculations intentionally convert u64 to f64
#![allow(clippy::cast_precision_loss)]

use std::collections::HashMap;

use crate::config::ProportionScope;
use crate::domain::FileOffset;

/// Sample share of one text line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineAnnotation {
    /// 1-based line number.
    pub line: u32,
    pub samples: u64,
    /// Percentage of the scope total (0.0 - 100.0).
    pub share: f64,
}

/// Convert a line-hit map into sorted annotations against the given
/// denominator.
#[must_use]
pub fn annotate_lines(line_hits: &HashMap<u32, u64>, scope_total: u64) -> Vec<LineAnnotation> {
    let mut annotations: Vec<LineAnnotation> = line_hits
        .iter()
        .map(|(&line, &samples)| {
            let share = if scope_total > 0 {
                (samples as f64 / scope_total as f64) * 100.0
            } else {
                0.0
            };
            LineAnnotation { line, samples, share }
        })
        .collect();
    annotations.sort_unstable_by_key(|a| a.line);
    annotations
}

/// Pick the percentage denominator: the annotated scope itself, or the
/// whole program.
#[must_use]
pub fn scope_total(
    line_hits: &HashMap<u32, u64>,
    scope: ProportionScope,
    program_total: u64,
) -> u64 {
    match scope {
        ProportionScope::File => line_hits.values().sum(),
        ProportionScope::Program => program_total,
    }
}

/// Match tree offsets against an objdump listing.
///
/// Instruction lines are indented and start with an `offset:` token; every
/// such line whose offset appears in the map collects that offset's hits
/// under its 1-based listing line number.
#[must_use]
pub fn listing_line_hits(
    listing: &str,
    offsets: &HashMap<FileOffset, u64>,
) -> HashMap<u32, u64> {
    let mut hits: HashMap<u32, u64> = HashMap::new();
    for (idx, text) in listing.lines().enumerate() {
        if !text.starts_with(char::is_whitespace) {
            continue;
        }
        let trimmed = text.trim_start();
        let Some(colon) = trimmed.find(':') else {
            continue;
        };
        let Ok(offset) = u64::from_str_radix(trimmed[..colon].trim(), 16) else {
            continue;
        };
        if let Some(&samples) = offsets.get(&FileOffset(offset)) {
            #[allow(clippy::cast_possible_truncation)]
            let line = (idx + 1) as u32;
            *hits.entry(line).or_insert(0) += samples;
        }
    }
    hits
}
