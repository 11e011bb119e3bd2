//! Address translation and symbol resolution
//!
//! Two steps turn a sampled instruction pointer into source coordinates:
//!
//! 1. **Virtual address → file offset.** Samples carry runtime addresses,
//!    but debug info is keyed by file offsets. The load-event dump records
//!    where each module's text section was mapped; subtracting that base
//!    recovers the offset ([`module_map`]).
//!
//! 2. **File offset → source/line/symbol.** A long-lived external
//!    `addr2line` process answers offset queries with demangled symbols and
//!    source locations, expanding compiler-inlined calls into chains of
//!    frames ([`addr2line_client`]).
//!
//! Both steps are per-session: a new analysis run builds a fresh module map
//! and spawns a fresh resolver, and nothing is shared across runs.

pub mod addr2line_client;
pub mod module_map;

pub use addr2line_client::{AddrResolver, ResolvedFrame};
pub use module_map::{detect_executable, ModuleMap};
