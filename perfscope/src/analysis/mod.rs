//! Aggregation and post-processing of resolved samples
//!
//! [`call_tree`] is where every resolved frame chain ends up; [`annotate`]
//! reshapes the finalized tree's hit maps for line-level display.

pub mod annotate;
pub mod call_tree;

pub use annotate::{annotate_lines, listing_line_hits, scope_total, LineAnnotation};
pub use call_tree::{CallNode, CallTree};
