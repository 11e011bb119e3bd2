//! Incremental sample-block framing
//!
//! The per-event dump arrives as text blocks separated by a blank line, one
//! block per captured stack snapshot. The stream can be large, so it is
//! consumed chunk by chunk: bytes accumulate in a splitter until a complete
//! block is available, and every complete block is fully processed —
//! resolved and inserted — before the next chunk is read. That await in the
//! read loop IS the backpressure: the buffer cannot outrun address
//! resolution. Whatever remains at end of stream is one final, possibly
//! truncated, block.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::domain::AnalysisError;
use crate::session::PerfSession;

const READ_CHUNK: usize = 8 * 1024;

/// Accumulates stream chunks and yields complete blank-line-delimited
/// blocks.
#[derive(Debug, Default)]
pub struct BlockSplitter {
    buf: Vec<u8>,
}

impl BlockSplitter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Drain the next complete block, if a delimiter has arrived.
    pub fn next_block(&mut self) -> Option<String> {
        let end = self.buf.windows(2).position(|w| w == b"\n\n")?;
        let block = String::from_utf8_lossy(&self.buf[..end]).into_owned();
        self.buf.drain(..end + 2);
        Some(block)
    }

    /// Drain whatever is left as the final block. Returns `None` when only
    /// whitespace remains (trailing newline runs are not a sample).
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.iter().all(u8::is_ascii_whitespace) {
            self.buf.clear();
            return None;
        }
        let block = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        Some(block)
    }
}

/// Frame-record lines of one block, outermost frame first.
///
/// The block's first line is an opaque header; the remaining lines list
/// frames innermost first. They are reversed so that insertion into the
/// call tree always reaches a parent before its children.
#[must_use]
pub fn frame_lines(block: &str) -> Vec<&str> {
    let mut lines: Vec<&str> =
        block.lines().skip(1).map(str::trim).filter(|l| !l.is_empty()).collect();
    lines.reverse();
    lines
}

/// Feed a sample stream into the session, block by block.
///
/// # Errors
/// Fails only on stream I/O errors. Per-frame resolution problems are
/// handled inside the session (the frame is dropped, analysis continues).
pub async fn ingest_sample_stream<R: AsyncRead + Unpin>(
    mut reader: R,
    session: &mut PerfSession,
) -> Result<(), AnalysisError> {
    let mut splitter = BlockSplitter::new();
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        splitter.push(&chunk[..n]);
        while let Some(block) = splitter.next_block() {
            session.add_sample_block(&block).await;
        }
    }
    if let Some(block) = splitter.finish() {
        session.add_sample_block(&block).await;
    }
    Ok(())
}
