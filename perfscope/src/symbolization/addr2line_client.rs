//! Pipelined client for an external `addr2line` process
//!
//! One resolver process is spawned per analysis session
//! (`addr2line -f --inlines -C -e <executable>`) and fed file offsets on
//! stdin, one hex address per line. Because the process is a single
//! bidirectional pipe with no request ids in its output, requests MUST be
//! strictly serialized: a second request written while the first response is
//! pending would have its answer misattributed. The client therefore hands
//! all requests to one spawned task that owns both pipe ends and drains an
//! mpsc queue one request at a time, answering each caller through a oneshot
//! channel. FIFO correspondence is structural here, not a property callers
//! have to uphold.
//!
//! Responses carry no terminator either. Each request writes the target
//! offset followed by a probe offset (`u64::MAX`, past any text section);
//! the probe always resolves to the unresolved pair (`??` / `??:…`), which
//! delimits the target's inline chain.
//!
//! Resolved chains are cached per offset for the life of the session.

use log::debug;
use rustc_demangle::demangle;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};

use crate::domain::{AnalysisError, FileOffset};

/// Offset guaranteed to fall outside any mapped text section; its unresolved
/// response frames the end of each inline chain.
const PROBE_OFFSET: u64 = u64::MAX;

/// One resolved stack entry: where a sampled address lands in the source.
///
/// A single address expands to an ordered chain of these when the compiler
/// inlined calls at that site. The chain is returned outermost function
/// first; every entry carries the offset of the originating request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFrame {
    pub source_file: PathBuf,
    /// Basename of `source_file`, used for per-file filtering.
    pub file_name: String,
    /// 1-based source line; 0 when the tool reported none.
    pub line: u32,
    pub symbol: String,
    pub offset: FileOffset,
}

struct ResolveRequest {
    offset: FileOffset,
    reply: oneshot::Sender<Result<Vec<ResolvedFrame>, AnalysisError>>,
}

/// Handle to the session's resolver process.
///
/// Dropping the handle closes the request queue, which ends the serving task
/// and kills the child process — teardown needs no explicit call.
pub struct AddrResolver {
    requests: mpsc::Sender<ResolveRequest>,
    cache: HashMap<FileOffset, Vec<ResolvedFrame>>,
}

impl AddrResolver {
    /// Spawn `addr2line` against the given executable.
    ///
    /// # Errors
    /// Returns an error if the process cannot be started or its pipes are
    /// unavailable.
    pub fn spawn(executable: &Path) -> Result<Self, AnalysisError> {
        let mut child = Command::new("addr2line")
            .arg("-f")
            .arg("--inlines")
            .arg("-C")
            .arg("-e")
            .arg(executable)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        let stdin = child.stdin.take().ok_or(AnalysisError::ResolverExited)?;
        let stdout = child.stdout.take().ok_or(AnalysisError::ResolverExited)?;

        let (requests, queue) = mpsc::channel(16);
        tokio::spawn(async move {
            // The child lives exactly as long as the serving task; kill_on_drop
            // terminates it when the session's handle goes away.
            let _child = child;
            serve_requests(queue, stdin, BufReader::new(stdout)).await;
        });
        Ok(Self { requests, cache: HashMap::new() })
    }

    /// Wire the resolver over an arbitrary byte-stream pair instead of a
    /// spawned process. The peer must speak the same protocol: for each
    /// target-plus-probe request, symbol/source line pairs followed by the
    /// unresolved pair.
    pub fn with_streams<W, R>(writer: W, reader: R) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let (requests, queue) = mpsc::channel(16);
        tokio::spawn(serve_requests(queue, writer, reader));
        Self { requests, cache: HashMap::new() }
    }

    /// Resolve a file offset to its (possibly inlined) frame chain,
    /// outermost function first.
    ///
    /// An empty chain means the offset carries no debug info; callers skip
    /// the frame.
    ///
    /// # Errors
    /// Fails when the resolver process has exited or produced an unusable
    /// response. The failure applies to this offset only; the client stays
    /// usable for subsequent requests.
    pub async fn resolve(
        &mut self,
        offset: FileOffset,
    ) -> Result<Vec<ResolvedFrame>, AnalysisError> {
        if let Some(cached) = self.cache.get(&offset) {
            return Ok(cached.clone());
        }

        let (reply, response) = oneshot::channel();
        self.requests
            .send(ResolveRequest { offset, reply })
            .await
            .map_err(|_| AnalysisError::ResolverExited)?;
        let frames = response.await.map_err(|_| AnalysisError::ResolverExited)??;

        debug!("resolved {offset} to {} frame(s)", frames.len());
        self.cache.insert(offset, frames.clone());
        Ok(frames)
    }

    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

/// Drain the request queue one request at a time.
///
/// The single conversation over the pipe pair is the whole point: the next
/// request is not written until the previous response has been read in full.
async fn serve_requests<W, R>(
    mut queue: mpsc::Receiver<ResolveRequest>,
    mut writer: W,
    mut reader: R,
) where
    W: AsyncWrite + Unpin,
    R: AsyncBufRead + Unpin,
{
    while let Some(request) = queue.recv().await {
        let result = resolve_one(&mut writer, &mut reader, request.offset).await;
        // A dropped caller (cancelled session) is not an error here.
        let _ = request.reply.send(result);
    }
}

async fn resolve_one<W, R>(
    writer: &mut W,
    reader: &mut R,
    offset: FileOffset,
) -> Result<Vec<ResolvedFrame>, AnalysisError>
where
    W: AsyncWrite + Unpin,
    R: AsyncBufRead + Unpin,
{
    writer.write_all(format!("{offset}\n{PROBE_OFFSET:#x}\n").as_bytes()).await?;
    writer.flush().await?;

    let mut pairs: Vec<(String, String)> = Vec::new();
    loop {
        let symbol = next_line(reader).await?;
        let srcline = next_line(reader).await?;
        if is_unresolved_pair(&symbol, &srcline) {
            if pairs.is_empty() {
                // The pair just read belongs to the target itself (no debug
                // info there); the probe's pair is still in the pipe.
                next_line(reader).await?;
                next_line(reader).await?;
            }
            break;
        }
        pairs.push((symbol, srcline));
    }

    // The process emits the innermost inline frame first; the call tree
    // wants the chain outermost first.
    pairs.reverse();
    pairs
        .into_iter()
        .map(|(symbol, srcline)| build_frame(&symbol, &srcline, offset))
        .collect()
}

async fn next_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<String, AnalysisError> {
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Err(AnalysisError::ResolverExited);
    }
    Ok(line.trim_end().to_string())
}

fn is_unresolved_pair(symbol: &str, srcline: &str) -> bool {
    symbol == "??" && srcline.starts_with("??")
}

fn build_frame(
    symbol: &str,
    srcline: &str,
    offset: FileOffset,
) -> Result<ResolvedFrame, AnalysisError> {
    let (path_part, line_part) = srcline
        .rsplit_once(':')
        .ok_or_else(|| AnalysisError::Resolution(format!("malformed source line: {srcline}")))?;
    // Line part may carry a discriminator suffix; a bare "?" means no line.
    let line = line_part.split_whitespace().next().and_then(|n| n.parse().ok()).unwrap_or(0);
    let source_file = PathBuf::from(path_part.trim());
    let file_name = source_file
        .file_name()
        .map_or_else(|| path_part.trim().to_string(), |n| n.to_string_lossy().into_owned());
    let symbol = format!("{:#}", demangle(symbol.trim()));
    Ok(ResolvedFrame { source_file, file_name, line, symbol, offset })
}
