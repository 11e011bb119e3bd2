//! Plain-text rendering of analysis results
//!
//! Everything here writes to stdout or returns strings; no analysis logic.

use crate::analysis::{CallNode, LineAnnotation};
use crate::session::PerfSession;

/// Totals header for a finalized session.
pub fn print_summary(session: &PerfSession) {
    println!("executable: {}", session.executable());
    println!(
        "samples: {} total, {} in target",
        session.total_samples(),
        session.total_samples_in_target()
    );
    if session.has_low_sample_count() {
        println!("note: sample count is low; proportions are unreliable");
    }
    println!();
}

/// Print the call forest as an indented tree, most-sampled first.
///
/// `max_depth` of 0 means unlimited. An optional source-file basename
/// restricts the roots shown.
pub fn print_call_tree(session: &PerfSession, filter: Option<&str>, max_depth: usize) {
    for node in session.function_calls(filter) {
        print_node(node, 0, max_depth);
    }
}

fn print_node(node: &CallNode, depth: usize, max_depth: usize) {
    let frame = node.frame();
    println!(
        "{:indent$}{} {}  {}:{} ({} samples)",
        "",
        node.sample_proportion(),
        frame.symbol,
        frame.source_file.display(),
        frame.line,
        node.sample_count(),
        indent = depth * 2
    );
    if max_depth != 0 && depth + 1 >= max_depth {
        return;
    }
    for child in node.function_calls(None) {
        print_node(child, depth + 1, max_depth);
    }
}

/// Render text content with a sample-share gutter.
///
/// Lines without samples get an empty gutter so the content stays aligned.
#[must_use]
pub fn render_annotated_text(content: &str, annotations: &[LineAnnotation]) -> String {
    let mut rendered = String::new();
    for (idx, text) in content.lines().enumerate() {
        #[allow(clippy::cast_possible_truncation)]
        let line = (idx + 1) as u32;
        let gutter = annotations
            .iter()
            .find(|a| a.line == line)
            .map_or_else(|| " ".repeat(7), |a| format!("{:>6.2}%", a.share));
        rendered.push_str(&format!("{gutter} | {text}\n"));
    }
    rendered
}

/// List recorded event names.
pub fn print_events(events: &[String]) {
    if events.is_empty() {
        println!("no recorded events found");
        return;
    }
    for event in events {
        println!("{event}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_annotated_text_gutters() {
        let annotations = vec![LineAnnotation { line: 2, samples: 3, share: 75.0 }];
        let rendered = render_annotated_text("fn main() {\n    work();\n}\n", &annotations);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("        | fn main"));
        assert!(lines[1].starts_with(" 75.00% |     work();"));
        assert!(lines[2].ends_with("| }"));
    }
}
