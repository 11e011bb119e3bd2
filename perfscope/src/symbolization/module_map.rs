//! Module load tracking for virtual-address translation
//!
//! `perf script --show-mmap-events` emits one `PERF_RECORD_MMAP2` line per
//! memory mapping the profiled process established. The executable (`r-xp`)
//! mappings tell us where each module's text section landed in virtual
//! memory, which is what we need to translate sampled instruction pointers
//! back into file offsets that debug info understands.

use log::info;
use std::collections::HashMap;

use crate::domain::{FileOffset, VirtualAddr};

/// Base offsets of loaded modules, keyed by module path.
///
/// Populated once per session from the load-event dump; read-only afterwards.
#[derive(Debug, Default)]
pub struct ModuleMap {
    /// module path -> (virtual start - file offset) of its executable mapping
    modules: HashMap<String, u64>,
}

impl ModuleMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one load-event line.
    ///
    /// Lines that do not describe an executable (`r-xp`) `PERF_RECORD_MMAP2`
    /// mapping are ignored without error — the dump interleaves many other
    /// record types. A later mapping for the same module path overwrites the
    /// earlier one.
    pub fn record_load(&mut self, line: &str) {
        if !line.contains("PERF_RECORD_MMAP2") {
            return;
        }
        let Some(perms) = line.find("r-xp") else {
            return;
        };
        let module = line[perms + 4..].trim();
        if module.is_empty() {
            return;
        }

        // Mapping range token: [virtStart(len) @ fileOff maj:min ino gen]
        let (Some(open), Some(close)) = (line.find('['), line.rfind(']')) else {
            return;
        };
        if close <= open {
            return;
        }
        let mapping = &line[open + 1..close];
        let Some(paren) = mapping.find('(') else {
            return;
        };
        let Some(at) = mapping.find('@') else {
            return;
        };
        let Some(virt_start) = parse_hex(&mapping[..paren]) else {
            return;
        };
        let Some(file_off) =
            mapping[at + 1..].split_whitespace().next().and_then(parse_hex)
        else {
            return;
        };

        info!("module {module}: text mapped at {virt_start:#x} (file offset {file_off:#x})");
        self.modules.insert(module.to_string(), virt_start.wrapping_sub(file_off));
    }

    /// Translate a sampled virtual address into a file offset within the
    /// named module.
    ///
    /// Returns `None` when no executable mapping was recorded for the module;
    /// such frames cannot be attributed and callers skip them. Not every
    /// module referenced by a sample necessarily has a preceding load record.
    #[must_use]
    pub fn to_file_offset(&self, addr: VirtualAddr, module: &str) -> Option<FileOffset> {
        let base = self.modules.get(module)?;
        Some(FileOffset(addr.0.wrapping_sub(*base)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Pick the profiled executable out of a load-event line: the first `r-xp`
/// mapping whose module path lives under the project directory names the
/// binary the run was recorded against.
#[must_use]
pub fn detect_executable<'a>(line: &'a str, project_dir: &str) -> Option<&'a str> {
    if !line.contains("PERF_RECORD_MMAP2") {
        return None;
    }
    let perms = line.find("r-xp")?;
    let module = line[perms + 4..].trim();
    if !module.is_empty() && module.starts_with(project_dir) {
        Some(module)
    } else {
        None
    }
}

fn parse_hex(s: &str) -> Option<u64> {
    let s = s.trim();
    let s = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(s, 16).ok()
}
