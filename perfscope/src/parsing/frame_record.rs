//! Frame-record line parsing
//!
//! `perf script` prints one line per captured stack frame:
//!
//! ```text
//!     55d2f9401234 my_fn+0x24 (/home/u/proj/target/release/app)
//!     7f1fa2b81c0a (/usr/lib/libc.so.6)
//!     ffffffff9d8b3c5e [unknown] ([kernel.kallsyms])
//! ```
//!
//! Only the address and the owning module matter for attribution; the
//! symbol token, when present, has its `+offset` suffix stripped and is
//! carried along unused — resolution comes from the address alone.

use crate::domain::VirtualAddr;

/// One raw stack-frame record from a sample block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRecord {
    pub addr: VirtualAddr,
    /// Symbol token as printed by the profiler, offset suffix stripped.
    pub symbol: Option<String>,
    /// Module the address belongs to (binary path, library path, or a
    /// bracketed pseudo-module such as `[kernel.kallsyms]`).
    pub module: String,
}

impl FrameRecord {
    /// Whether this frame belongs to the profiled binary. Frames in shared
    /// libraries or the kernel are not attributed.
    #[must_use]
    pub fn is_in(&self, executable: &str) -> bool {
        self.module == executable
    }
}

/// Parse one frame-record line. Returns `None` for lines that do not start
/// with a hexadecimal address.
#[must_use]
pub fn parse_frame_record(line: &str) -> Option<FrameRecord> {
    let line = line.trim();
    let (addr_str, rest) = line.split_once(char::is_whitespace)?;
    let addr_str = addr_str.strip_prefix("0x").unwrap_or(addr_str);
    let addr = u64::from_str_radix(addr_str, 16).ok()?;

    let rest = rest.trim();
    let (symbol_part, module) = match rest.rfind('(') {
        Some(open) if rest.ends_with(')') => {
            (&rest[..open], rest[open + 1..rest.len() - 1].trim())
        }
        _ => ("", rest),
    };

    let symbol = strip_offset_suffix(symbol_part);
    let symbol = if symbol.is_empty() { None } else { Some(symbol.to_string()) };
    let module = strip_offset_suffix(module);
    if module.is_empty() {
        return None;
    }

    Some(FrameRecord { addr: VirtualAddr(addr), symbol, module: module.to_string() })
}

fn strip_offset_suffix(token: &str) -> &str {
    let token = token.trim();
    match token.rfind("+0x") {
        Some(plus) => token[..plus].trim_end(),
        None => token,
    }
}
