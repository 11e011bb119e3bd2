//! Sample stream parsing
//!
//! Splits the profiler's per-event dump into sample blocks as the bytes
//! arrive ([`sample_stream`]) and decodes the individual frame-record lines
//! within each block ([`frame_record`]). The stream pump applies
//! backpressure: a block's frames are resolved and inserted before more
//! input is read, which also guarantees the resolver only ever sees one
//! request at a time.

pub mod frame_record;
pub mod sample_stream;

pub use frame_record::{parse_frame_record, FrameRecord};
pub use sample_stream::{frame_lines, ingest_sample_stream, BlockSplitter};
