//! End-to-end pipeline tests over in-memory streams.
//!
//! A scripted peer stands in for the addr2line process: it answers each
//! offset request with canned symbol/source pairs followed by the
//! unresolved probe pair, exactly like the real tool does on the pipe.

use std::collections::HashMap;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use perfscope::domain::FileOffset;
use perfscope::export::ProfileExport;
use perfscope::parsing::ingest_sample_stream;
use perfscope::session::PerfSession;
use perfscope::symbolization::{AddrResolver, ModuleMap};

const EXECUTABLE: &str = "/proj/target/release/app";

/// Resolver backed by a scripted response table keyed by file offset.
fn scripted_resolver(script: HashMap<u64, &'static str>) -> AddrResolver {
    let (client, server) = tokio::io::duplex(16 * 1024);
    tokio::spawn(async move {
        let (read, mut write) = tokio::io::split(server);
        let mut lines = BufReader::new(read).lines();
        while let Ok(Some(target)) = lines.next_line().await {
            let _probe = lines.next_line().await;
            let offset =
                u64::from_str_radix(target.trim().trim_start_matches("0x"), 16).unwrap();
            // Unknown offsets get the unresolved pair, like the real tool.
            let body = script.get(&offset).copied().unwrap_or("??\n??:0\n");
            let response = format!("{body}??\n??:0\n");
            if write.write_all(response.as_bytes()).await.is_err() {
                break;
            }
        }
    });
    let (read, write) = tokio::io::split(client);
    AddrResolver::with_streams(write, BufReader::new(read))
}

fn module_map() -> ModuleMap {
    let mut map = ModuleMap::new();
    map.record_load(&format!(
        "app 100 1.0: PERF_RECORD_MMAP2 100/100: \
         [0x55d2f9400000(0x5000) @ 0 fd:01 1 0]: r-xp {EXECUTABLE}"
    ));
    map
}

fn basic_script() -> HashMap<u64, &'static str> {
    let mut script = HashMap::new();
    script.insert(0x10, "main\n/proj/src/main.rs:3\n");
    script.insert(0x20, "foo\n/proj/src/foo.rs:7\n");
    script.insert(0x24, "foo\n/proj/src/foo.rs:7\n");
    script.insert(0x30, "bar\n/proj/src/bar.rs:9\n");
    script
}

/// Four sample blocks: main->foo twice (different addresses, same source
/// line), main->bar once, and one sample entirely outside the binary.
/// Frames inside each block are listed innermost first, as perf prints
/// them.
fn sample_stream() -> String {
    format!(
        "app 100 250000 cycles:\n\
         \t    55d2f9400020 ({EXECUTABLE})\n\
         \t    55d2f9400010 ({EXECUTABLE})\n\
         \t    7f0012345678 (/usr/lib/libc.so.6)\n\
         \n\
         app 100 250000 cycles:\n\
         \t    55d2f9400024 ({EXECUTABLE})\n\
         \t    55d2f9400010 ({EXECUTABLE})\n\
         \n\
         app 100 250000 cycles:\n\
         \t    55d2f9400030 ({EXECUTABLE})\n\
         \t    55d2f9400010 ({EXECUTABLE})\n\
         \n\
         app 100 250000 cycles:\n\
         \t    7f00deadbeef (/usr/lib/libc.so.6)\n\
         \n"
    )
}

async fn analyzed_session() -> PerfSession {
    let mut session = PerfSession::new(
        EXECUTABLE.to_string(),
        module_map(),
        scripted_resolver(basic_script()),
    );
    ingest_sample_stream(sample_stream().as_bytes(), &mut session).await.unwrap();
    session.finalize().unwrap();
    session
}

#[tokio::test]
async fn test_end_to_end_tree_shape() {
    let session = analyzed_session().await;

    assert_eq!(session.total_samples(), 4);
    assert_eq!(session.total_samples_in_target(), 3);

    let roots = session.function_calls(None);
    assert_eq!(roots.len(), 1);
    let main = roots[0];
    assert_eq!(main.frame().symbol, "main");
    assert_eq!(main.sample_count(), 3);
    assert_eq!(main.parent_sample_count(), 3);

    let calls = main.function_calls(None);
    assert_eq!(calls.len(), 2);
    let foo = calls.iter().find(|n| n.frame().symbol == "foo").unwrap();
    let bar = calls.iter().find(|n| n.frame().symbol == "bar").unwrap();
    assert_eq!(foo.sample_count(), 2);
    assert_eq!(bar.sample_count(), 1);
    assert_eq!(foo.parent_sample_count(), 3);
    assert_eq!(bar.parent_sample_count(), 3);
    assert_eq!(foo.sample_proportion(), "66.67%");
    assert_eq!(bar.sample_proportion(), "33.33%");
}

#[tokio::test]
async fn test_end_to_end_invariants() {
    let session = analyzed_session().await;

    // Sum over the roots equals the target total.
    let root_sum: u64 = session.function_calls(None).iter().map(|n| n.sample_count()).sum();
    assert_eq!(root_sum, session.total_samples_in_target());
    assert!(session.total_samples_in_target() <= session.total_samples());

    // Every node's sample count equals the sum of its line hits and of its
    // offset hits; every non-root's parent count matches its parent.
    session.tree().for_each(&mut |node| {
        let line_sum: u64 = node.line_hits().values().sum();
        let offset_sum: u64 = node.offset_hits().values().sum();
        assert_eq!(node.sample_count(), line_sum);
        assert_eq!(node.sample_count(), offset_sum);
        for child in node.function_calls(None) {
            assert_eq!(child.parent_sample_count(), node.sample_count());
        }
    });
}

#[tokio::test]
async fn test_end_to_end_hit_maps() {
    let session = analyzed_session().await;

    let main_lines = session.lines_for("main.rs");
    assert_eq!(main_lines[&3], 3);

    let foo_lines = session.lines_for("foo.rs");
    assert_eq!(foo_lines[&7], 2);

    let offsets = session.offsets_across_tree();
    assert_eq!(offsets[&FileOffset(0x10)], 3);
    assert_eq!(offsets[&FileOffset(0x20)], 1);
    assert_eq!(offsets[&FileOffset(0x24)], 1);
    assert_eq!(offsets[&FileOffset(0x30)], 1);

    // 3 samples is far below the reliability threshold.
    assert!(session.has_low_sample_count());
}

#[tokio::test]
async fn test_inlined_frames_extend_the_chain() {
    let mut script = basic_script();
    // One address expands to two frames: wrapper inlined the leaf. The
    // tool prints the innermost frame first.
    script.insert(0x40, "inlined_leaf\n/proj/src/wrap.rs:12\nwrapper\n/proj/src/wrap.rs:2\n");

    let stream = format!(
        "app 100 250000 cycles:\n\
         \t    55d2f9400040 ({EXECUTABLE})\n\
         \t    55d2f9400010 ({EXECUTABLE})\n\
         \n"
    );
    let mut session =
        PerfSession::new(EXECUTABLE.to_string(), module_map(), scripted_resolver(script));
    ingest_sample_stream(stream.as_bytes(), &mut session).await.unwrap();
    session.finalize().unwrap();

    let main = session.function_calls(None)[0];
    let wrapper = main.function_calls(None)[0];
    let leaf = wrapper.function_calls(None)[0];
    assert_eq!(wrapper.frame().symbol, "wrapper");
    assert_eq!(wrapper.sample_count(), 1);
    assert_eq!(leaf.frame().symbol, "inlined_leaf");
    assert_eq!(leaf.frame().line, 12);
    assert_eq!(leaf.parent_sample_count(), 1);
    // Both inline frames carry the offset of the one real address.
    assert_eq!(leaf.frame().offset, FileOffset(0x40));
}

#[tokio::test]
async fn test_unresolvable_frames_are_dropped_not_fatal() {
    // 0x50 is not in the script: the peer answers with the unresolved pair
    // alone, which drops that frame but keeps the rest of the block.
    let stream = format!(
        "app 100 250000 cycles:\n\
         \t    55d2f9400050 ({EXECUTABLE})\n\
         \t    55d2f9400010 ({EXECUTABLE})\n\
         \n"
    );
    let mut session = PerfSession::new(
        EXECUTABLE.to_string(),
        module_map(),
        scripted_resolver(basic_script()),
    );
    ingest_sample_stream(stream.as_bytes(), &mut session).await.unwrap();
    session.finalize().unwrap();

    let roots = session.function_calls(None);
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].frame().symbol, "main");
    assert!(roots[0].function_calls(None).is_empty());
}

#[tokio::test]
async fn test_export_mirrors_the_tree() {
    let session = analyzed_session().await;
    let exported = ProfileExport::from_session(&session);

    assert_eq!(exported.executable, EXECUTABLE);
    assert_eq!(exported.total_samples, 4);
    assert_eq!(exported.total_samples_in_target, 3);
    assert!(exported.low_sample_count);
    assert_eq!(exported.roots.len(), 1);

    let main = &exported.roots[0];
    assert_eq!(main.symbol, "main");
    assert_eq!(main.samples, 3);
    assert_eq!(main.proportion, "100.00%");
    assert_eq!(main.children.len(), 2);
    // Children come most-sampled first.
    assert_eq!(main.children[0].symbol, "foo");

    let json = serde_json::to_string(&exported).unwrap();
    assert!(json.contains("\"foo\""));
}
