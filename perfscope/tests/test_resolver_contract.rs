//! Resolver protocol contract tests.
//!
//! The pipe to the resolver process carries no request ids, so correctness
//! rests on two properties: at most one request is outstanding at any
//! moment, and responses are matched to requests strictly first-in
//! first-out. These tests observe the wire from the peer's side.

use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use perfscope::domain::FileOffset;
use perfscope::symbolization::AddrResolver;

/// Peer that records every request it sees and answers from a closure.
fn observing_resolver(
    respond: impl Fn(u64) -> String + Send + 'static,
) -> (AddrResolver, mpsc::UnboundedReceiver<u64>) {
    let (client, server) = tokio::io::duplex(16 * 1024);
    let (seen_tx, seen_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let (read, mut write) = tokio::io::split(server);
        let mut lines = BufReader::new(read).lines();
        while let Ok(Some(target)) = lines.next_line().await {
            let _probe = lines.next_line().await;
            let offset =
                u64::from_str_radix(target.trim().trim_start_matches("0x"), 16).unwrap();
            let _ = seen_tx.send(offset);
            let response = format!("{}??\n??:0\n", respond(offset));
            if write.write_all(response.as_bytes()).await.is_err() {
                break;
            }
        }
    });
    let (read, write) = tokio::io::split(client);
    (AddrResolver::with_streams(write, BufReader::new(read)), seen_rx)
}

#[tokio::test]
async fn test_responses_match_their_requests_fifo() {
    let (mut resolver, _seen) =
        observing_resolver(|offset| format!("fn_{offset:x}\n/src/f{offset:x}.rs:{offset}\n"));

    // Distinct offsets, resolved back to back; a misrouted response would
    // hand one caller the other's frames.
    let first = resolver.resolve(FileOffset(0x10)).await.unwrap();
    let second = resolver.resolve(FileOffset(0x20)).await.unwrap();
    assert_eq!(first[0].symbol, "fn_10");
    assert_eq!(second[0].symbol, "fn_20");
    assert_eq!(first[0].line, 0x10);
    assert_eq!(second[0].line, 0x20);
}

#[tokio::test]
async fn test_at_most_one_request_outstanding() {
    // The peer delays its answers; the next request must still not hit the
    // wire until the previous response was read in full.
    let (client, server) = tokio::io::duplex(16 * 1024);
    let violation = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let seen = std::sync::Arc::clone(&violation);

    tokio::spawn(async move {
        let (read, mut write) = tokio::io::split(server);
        let mut lines = BufReader::new(read).lines();
        while let Ok(Some(_target)) = lines.next_line().await {
            let _probe = lines.next_line().await;
            // Before answering, the wire must stay silent: another request
            // arriving here would be a serialization violation.
            let early = tokio::time::timeout(Duration::from_millis(50), lines.next_line());
            if let Ok(Ok(Some(_))) = early.await {
                seen.store(true, std::sync::atomic::Ordering::SeqCst);
                break;
            }
            let response = "f\n/src/f.rs:1\n??\n??:0\n";
            if write.write_all(response.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    let (read, write) = tokio::io::split(client);
    let mut resolver = AddrResolver::with_streams(write, BufReader::new(read));
    resolver.resolve(FileOffset(0x1)).await.unwrap();
    resolver.resolve(FileOffset(0x2)).await.unwrap();

    assert!(
        !violation.load(std::sync::atomic::Ordering::SeqCst),
        "a second request was written while a response was pending"
    );
}

#[tokio::test]
async fn test_cache_serves_repeats_without_wire_traffic() {
    let (mut resolver, mut seen) = observing_resolver(|_| "f\n/src/f.rs:1\n".to_string());

    resolver.resolve(FileOffset(0x10)).await.unwrap();
    resolver.resolve(FileOffset(0x10)).await.unwrap();
    resolver.resolve(FileOffset(0x10)).await.unwrap();

    assert_eq!(seen.recv().await, Some(0x10));
    assert!(seen.try_recv().is_err(), "cached resolutions must not reach the peer");
}

#[tokio::test]
async fn test_peer_failure_fails_only_inflight_resolution() {
    // Peer closes the connection after the first (truncated) response:
    // the in-flight resolution errors, it is not silently wrong.
    let (client, server) = tokio::io::duplex(1024);
    tokio::spawn(async move {
        let (read, mut write) = tokio::io::split(server);
        let mut lines = BufReader::new(read).lines();
        if let Ok(Some(_)) = lines.next_line().await {
            let _probe = lines.next_line().await;
            // Odd line count, then EOF.
            let _ = write.write_all(b"half\n").await;
        }
        // Dropping both halves closes the pipe.
    });

    let (read, write) = tokio::io::split(client);
    let mut resolver = AddrResolver::with_streams(write, BufReader::new(read));
    assert!(resolver.resolve(FileOffset(0x10)).await.is_err());
}
