//! Call tree aggregation
//!
//! Every sample contributes one resolved frame chain (root of the stack
//! first). Chains are merged into a forest keyed by symbol: the first
//! occurrence of a symbol at a tree position creates a node, every further
//! occurrence at the same position merges into it — one more sample, one
//! more hit on the occurrence's source line and file offset. A frame whose
//! symbol matches the node it would hang under merges into that node
//! instead of becoming a child; that is how inline chains re-entering the
//! same function collapse instead of growing spurious depth.
//!
//! After ingestion a finalize pass fixes each node's share of its parent
//! and of the whole target, which is what the report and annotation layers
//! read.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::domain::FileOffset;
use crate::symbolization::ResolvedFrame;

/// A function at one position in the aggregated call forest.
#[derive(Debug, Clone)]
pub struct CallNode {
    /// Frame of the first occurrence; provides the display file/line.
    frame: ResolvedFrame,
    sample_count: u64,
    /// Sample count of the immediate parent (whole-target total for roots).
    /// Set by the finalize pass; 0 before it ran.
    parent_sample_count: u64,
    line_hits: HashMap<u32, u64>,
    offset_hits: HashMap<FileOffset, u64>,
    children: HashMap<String, CallNode>,
}

impl CallNode {
    fn new(frame: ResolvedFrame) -> Self {
        let mut line_hits = HashMap::new();
        line_hits.insert(frame.line, 1);
        let mut offset_hits = HashMap::new();
        offset_hits.insert(frame.offset, 1);
        Self {
            frame,
            sample_count: 1,
            parent_sample_count: 0,
            line_hits,
            offset_hits,
            children: HashMap::new(),
        }
    }

    /// Fold one more occurrence of this symbol at this position into the
    /// node: one sample, one line hit, one offset hit.
    fn merge_occurrence(&mut self, frame: &ResolvedFrame) {
        self.sample_count += 1;
        *self.line_hits.entry(frame.line).or_insert(0) += 1;
        *self.offset_hits.entry(frame.offset).or_insert(0) += 1;
    }

    fn record(&mut self, frame: &ResolvedFrame) {
        if frame.symbol == self.frame.symbol {
            self.merge_occurrence(frame);
        } else {
            record_in(&mut self.children, frame);
        }
    }

    fn propagate_parent_counts(&mut self) {
        for child in self.children.values_mut() {
            child.parent_sample_count = self.sample_count;
            child.propagate_parent_counts();
        }
    }

    fn for_each(&self, f: &mut impl FnMut(&CallNode)) {
        f(self);
        for child in self.children.values() {
            child.for_each(f);
        }
    }

    #[must_use]
    pub fn frame(&self) -> &ResolvedFrame {
        &self.frame
    }

    #[must_use]
    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    #[must_use]
    pub fn parent_sample_count(&self) -> u64 {
        self.parent_sample_count
    }

    #[must_use]
    pub fn line_hits(&self) -> &HashMap<u32, u64> {
        &self.line_hits
    }

    #[must_use]
    pub fn offset_hits(&self) -> &HashMap<FileOffset, u64> {
        &self.offset_hits
    }

    /// Share of the immediate parent's samples, e.g. `"42.10%"`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn sample_proportion(&self) -> String {
        if self.parent_sample_count == 0 {
            return "0.00%".to_string();
        }
        format!("{:.2}%", (self.sample_count as f64 / self.parent_sample_count as f64) * 100.0)
    }

    /// Callees of this node, most-sampled first, optionally restricted to
    /// one source file basename.
    #[must_use]
    pub fn function_calls(&self, filter: Option<&str>) -> Vec<&CallNode> {
        sorted_calls(&self.children, filter)
    }
}

/// The aggregation forest, keyed by symbol at the root level.
#[derive(Debug, Default)]
pub struct CallTree {
    roots: HashMap<String, CallNode>,
}

impl CallTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one resolved chain, root of the stack first.
    ///
    /// Only the terminal frame contributes an occurrence; the ancestors are
    /// the path to its position and normally already exist, since samples
    /// are ingested outermost-first. Consecutive chain entries carrying the
    /// same symbol stay on the same node (inline re-entry).
    pub fn insert(&mut self, chain: &[ResolvedFrame]) {
        let Some((terminal, ancestors)) = chain.split_last() else {
            return;
        };
        let mut frames = ancestors.iter();
        let Some(first) = frames.next() else {
            record_in(&mut self.roots, terminal);
            return;
        };

        let mut node = self
            .roots
            .entry(first.symbol.clone())
            .or_insert_with(|| CallNode::new(first.clone()));
        for frame in frames {
            if frame.symbol == node.frame.symbol {
                continue;
            }
            node = node
                .children
                .entry(frame.symbol.clone())
                .or_insert_with(|| CallNode::new(frame.clone()));
        }
        node.record(terminal);
    }

    /// Compute per-node parent sample counts and return the total number of
    /// samples attributable to the target (the sum over the roots).
    ///
    /// Returns `None` when the forest is empty — nothing was attributable,
    /// which callers surface as "no data" rather than a failure.
    pub fn finalize(&mut self) -> Option<u64> {
        if self.roots.is_empty() {
            return None;
        }
        let total: u64 = self.roots.values().map(CallNode::sample_count).sum();
        for root in self.roots.values_mut() {
            root.parent_sample_count = total;
            root.propagate_parent_counts();
        }
        Some(total)
    }

    /// Root-level functions, most-sampled first, optionally restricted to
    /// one source file basename.
    #[must_use]
    pub fn function_calls(&self, filter: Option<&str>) -> Vec<&CallNode> {
        sorted_calls(&self.roots, filter)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn for_each(&self, f: &mut impl FnMut(&CallNode)) {
        for root in self.roots.values() {
            root.for_each(f);
        }
    }

    /// Merge the line hits of every node whose representative frame lives in
    /// the named file (by basename). Recomputed on demand; callers ask
    /// rarely relative to insertion volume.
    #[must_use]
    pub fn lines_for(&self, file_name: &str) -> HashMap<u32, u64> {
        let mut merged = HashMap::new();
        self.for_each(&mut |node| {
            if node.frame.file_name == file_name {
                for (&line, &hits) in &node.line_hits {
                    *merged.entry(line).or_insert(0) += hits;
                }
            }
        });
        merged
    }

    /// Merge the offset hits of every node in the forest.
    #[must_use]
    pub fn offsets_across_tree(&self) -> HashMap<FileOffset, u64> {
        let mut merged = HashMap::new();
        self.for_each(&mut |node| {
            for (&offset, &hits) in &node.offset_hits {
                *merged.entry(offset).or_insert(0) += hits;
            }
        });
        merged
    }
}

fn record_in(nodes: &mut HashMap<String, CallNode>, frame: &ResolvedFrame) {
    match nodes.entry(frame.symbol.clone()) {
        Entry::Occupied(entry) => entry.into_mut().merge_occurrence(frame),
        Entry::Vacant(entry) => {
            entry.insert(CallNode::new(frame.clone()));
        }
    }
}

fn sorted_calls<'a>(
    nodes: &'a HashMap<String, CallNode>,
    filter: Option<&str>,
) -> Vec<&'a CallNode> {
    let mut calls: Vec<&CallNode> = match filter {
        Some(file_name) => {
            nodes.values().filter(|n| n.frame.file_name == file_name).collect()
        }
        None => nodes.values().collect(),
    };
    calls.sort_unstable_by_key(|n| std::cmp::Reverse(n.sample_count));
    calls
}
