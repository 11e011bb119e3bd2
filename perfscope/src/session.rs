//! Analysis session: the aggregate root of one profiling run
//!
//! A [`PerfSession`] owns everything one analysis needs — the module map
//! built from the load-event dump, the resolver process handle, the call
//! tree, and the sample totals. Sessions are never shared or reused: a new
//! run builds a fresh session, and dropping a session mid-stream discards
//! the partial tree and terminates the resolver.

use log::{debug, info, warn};
use std::collections::HashMap;
use std::path::Path;

use crate::analysis::call_tree::{CallNode, CallTree};
use crate::config::Config;
use crate::domain::{AnalysisError, FileOffset};
use crate::parsing::{frame_lines, ingest_sample_stream, parse_frame_record};
use crate::symbolization::{detect_executable, AddrResolver, ModuleMap, ResolvedFrame};

/// Below this many attributable samples, proportions are statistically
/// unreliable and a warning is raised (analysis still completes).
pub const MIN_SAMPLES_FOR_STATS: u64 = 10;

const PERF_DATA_FILE: &str = "perf.data";
const MMAP_EVENTS_FILE: &str = "mmap-events.dump";

pub struct PerfSession {
    executable: String,
    module_map: ModuleMap,
    resolver: AddrResolver,
    tree: CallTree,
    /// Raw sample blocks parsed, attributable or not.
    total_samples: u64,
    /// Samples that landed in the profiled binary; set by `finalize`.
    total_in_target: u64,
}

impl PerfSession {
    #[must_use]
    pub fn new(executable: String, module_map: ModuleMap, resolver: AddrResolver) -> Self {
        Self {
            executable,
            module_map,
            resolver,
            tree: CallTree::new(),
            total_samples: 0,
            total_in_target: 0,
        }
    }

    /// Ingest one sample block: resolve its frames outermost-first and feed
    /// the growing chain into the call tree.
    ///
    /// Frames outside the profiled binary, frames without a load mapping,
    /// and frames whose resolution fails are skipped; the rest of the block
    /// still counts.
    pub async fn add_sample_block(&mut self, block: &str) {
        self.total_samples += 1;

        let mut chain: Vec<ResolvedFrame> = Vec::new();
        for line in frame_lines(block) {
            let Some(record) = parse_frame_record(line) else {
                continue;
            };
            if !record.is_in(&self.executable) {
                continue;
            }
            let Some(offset) = self.module_map.to_file_offset(record.addr, &self.executable)
            else {
                debug!("no load mapping covers {}; skipping frame", record.addr);
                continue;
            };
            match self.resolver.resolve(offset).await {
                Ok(frames) => {
                    for frame in frames {
                        chain.push(frame);
                        self.tree.insert(&chain);
                    }
                }
                Err(err) => {
                    warn!("dropping frame at {} ({offset}): {err}", record.addr);
                }
            }
        }
    }

    /// Compute totals and per-node parent counts.
    ///
    /// # Errors
    /// `EmptyResult` when no sample was attributable to the binary.
    pub fn finalize(&mut self) -> Result<(), AnalysisError> {
        let Some(total) = self.tree.finalize() else {
            return Err(AnalysisError::EmptyResult(self.executable.clone()));
        };
        self.total_in_target = total;
        if total < MIN_SAMPLES_FOR_STATS {
            warn!(
                "only {total} samples landed in {} — proportions will be unreliable, \
                 consider a longer profiling run",
                self.executable
            );
        }
        Ok(())
    }

    #[must_use]
    pub fn executable(&self) -> &str {
        &self.executable
    }

    #[must_use]
    pub fn total_samples(&self) -> u64 {
        self.total_samples
    }

    #[must_use]
    pub fn total_samples_in_target(&self) -> u64 {
        self.total_in_target
    }

    /// Produced signal for collaborators: too few samples for meaningful
    /// proportions.
    #[must_use]
    pub fn has_low_sample_count(&self) -> bool {
        self.total_in_target < MIN_SAMPLES_FOR_STATS
    }

    #[must_use]
    pub fn tree(&self) -> &CallTree {
        &self.tree
    }

    /// Root-level functions, optionally filtered to one source file
    /// basename.
    #[must_use]
    pub fn function_calls(&self, filter: Option<&str>) -> Vec<&CallNode> {
        self.tree.function_calls(filter)
    }

    #[must_use]
    pub fn lines_for(&self, file_name: &str) -> HashMap<u32, u64> {
        self.tree.lines_for(file_name)
    }

    #[must_use]
    pub fn offsets_across_tree(&self) -> HashMap<FileOffset, u64> {
        self.tree.offsets_across_tree()
    }
}

/// Run a full analysis over one recorded profiling run.
///
/// Reads the load-event dump, auto-detects the profiled executable (the
/// first executable mapping under the project directory), spawns the
/// resolver, streams the per-event sample dump, and finalizes the tree.
///
/// # Errors
/// `StreamUnavailable` when the on-disk artifacts are missing,
/// `ExecutableNotFound` when no mapping points into the project directory,
/// `EmptyResult` when nothing was attributable.
pub async fn analyze_run(
    config: &Config,
    event: Option<&str>,
) -> Result<PerfSession, AnalysisError> {
    let perf_data = config.output_dir.join(PERF_DATA_FILE);
    if !perf_data.exists() {
        return Err(AnalysisError::StreamUnavailable(perf_data));
    }
    let mmap_path = config.output_dir.join(MMAP_EVENTS_FILE);
    if !mmap_path.exists() {
        return Err(AnalysisError::StreamUnavailable(mmap_path));
    }

    let event_name = match event {
        Some(e) => e.to_string(),
        None => discover_events(&config.output_dir)?
            .into_iter()
            .next()
            .ok_or_else(|| AnalysisError::StreamUnavailable(config.output_dir.clone()))?,
    };
    let samples_path = config.output_dir.join(format!("perf.data.{event_name}.dump"));
    if !samples_path.exists() {
        return Err(AnalysisError::StreamUnavailable(samples_path));
    }

    let load_events = tokio::fs::read_to_string(&mmap_path).await?;
    let mut module_map = ModuleMap::new();
    let mut executable: Option<String> = None;
    let project_dir = config.project_dir.to_string_lossy();
    for line in load_events.lines() {
        module_map.record_load(line);
        if executable.is_none() {
            if let Some(path) = detect_executable(line, &project_dir) {
                executable = Some(path.to_string());
            }
        }
    }
    let executable = executable
        .ok_or_else(|| AnalysisError::ExecutableNotFound(config.project_dir.clone()))?;
    info!(
        "analyzing {executable} (event {event_name}, {} module mappings)",
        module_map.len()
    );

    let resolver = AddrResolver::spawn(Path::new(&executable))?;
    let mut session = PerfSession::new(executable, module_map, resolver);

    let samples = tokio::fs::File::open(&samples_path).await?;
    ingest_sample_stream(samples, &mut session).await?;
    session.finalize()?;
    Ok(session)
}

/// Event names with a recorded per-event dump in the output directory.
///
/// # Errors
/// `StreamUnavailable` when the output directory cannot be read.
pub fn discover_events(output_dir: &Path) -> Result<Vec<String>, AnalysisError> {
    let entries = std::fs::read_dir(output_dir)
        .map_err(|_| AnalysisError::StreamUnavailable(output_dir.to_path_buf()))?;
    let mut events = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with("perf.data.") && name.ends_with(".dump") {
            if let Some(event) = name.split('.').nth(2) {
                events.push(event.to_string());
            }
        }
    }
    events.sort();
    Ok(events)
}
