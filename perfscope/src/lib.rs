//! # perfscope - perf sampling profiles as annotated call trees
//!
//! perfscope records a program with `perf`, then turns the raw sample dump
//! into a call tree annotated with sample counts, per-line hit counts and
//! hotness proportions, resolved down to source files and lines — inline
//! frames included.
//!
//! ## Pipeline
//!
//! ```text
//! perf record / perf script
//!         │  mmap-events.dump + perf.data.<event>.dump
//!         ▼
//! ┌──────────────────┐   blocks   ┌──────────────────┐
//! │  Sample Stream   │──────────▶│   Module Map      │ virtual addr
//! │  (parsing)       │            │  (symbolization)  │──▶ file offset
//! └──────────────────┘            └──────────────────┘
//!         │ frame chains                  │
//!         ▼                               ▼
//! ┌──────────────────┐            ┌──────────────────┐
//! │   Call Tree      │◀───────────│  addr2line client │
//! │  (analysis)      │  resolved  │  (symbolization)  │
//! └──────────────────┘  frames    └──────────────────┘
//!         │ finalize
//!         ▼
//!   report / annotate / disasm / export
//! ```
//!
//! ## Module structure
//!
//! - [`session`]: the aggregate root of one analysis run and its
//!   orchestration (`analyze_run`)
//! - [`parsing`]: incremental sample-block framing with backpressure and
//!   frame-record decoding
//! - [`symbolization`]: module-map address translation and the pipelined
//!   external `addr2line` client
//! - [`analysis`]: call tree aggregation, finalize pass, line/offset
//!   annotations
//! - [`record`]: running `perf record`/`perf script`
//! - [`disasm`]: objdump listings for offset-level annotation
//! - [`export`]: JSON tree export
//! - [`report`]: plain-text rendering
//! - [`preflight`]: tool and permission checks
//! - [`cli`], [`config`], [`domain`]: the shell around it all
//!
//! Concurrency model: one analysis session is one cooperative task.
//! Ingestion awaits each block's resolution before reading further, which
//! both bounds buffering and guarantees the resolver pipe carries at most
//! one outstanding request.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod disasm;
pub mod domain;
pub mod export;
pub mod parsing;
pub mod preflight;
pub mod record;
pub mod report;
pub mod session;
pub mod symbolization;
