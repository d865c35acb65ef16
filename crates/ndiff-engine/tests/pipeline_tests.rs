//! End-to-end pipeline runs against in-memory stores.

use ndiff_core::logging_facility::test_capture::init_test_capture;
use ndiff_core::schema::{EVENT_WINDOW_EMPTY, EVENT_WINDOW_NO_DIFF};
use ndiff_core::{ExErrorKind, RangeConfig, Record, SourceSide};
use ndiff_engine::Pipeline;
use ndiff_store::memory::MemoryExecutor;
use ndiff_store::sink::{LogTarget, TargetOpener, NOT_IN_NEW_FILE, NOT_IN_OLD_FILE};
use ndiff_store::{QueryExecutor, ResultSink};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const HEADER_LINE: &str = "txid,nft_type,height,nft_idx";

fn read_lines(dir: &Path, name: &str) -> Vec<String> {
    fs::read_to_string(dir.join(name))
        .unwrap()
        .lines()
        .map(String::from)
        .collect()
}

fn pipeline(
    old: MemoryExecutor,
    new: MemoryExecutor,
    start: u64,
    end: u64,
    step: u64,
    out: &Path,
) -> Pipeline {
    Pipeline::new(
        Arc::new(old),
        Arc::new(new),
        RangeConfig::new(start, end, step).unwrap(),
        out,
    )
}

#[tokio::test]
async fn test_two_window_reconciliation() {
    // Given: window 100 where "b" is missing from new, window 200 where "c" is missing from old
    let out = TempDir::new().unwrap();
    let old = MemoryExecutor::new(
        SourceSide::Old,
        vec![Record::new("a", 100, 1, 3), Record::new("b", 100, 2, 3)],
    );
    let new = MemoryExecutor::new(
        SourceSide::New,
        vec![Record::new("a", 100, 1, 3), Record::new("c", 250, 5, 3)],
    );

    // When: the range [100, 300) is reconciled in steps of 100
    let summary = pipeline(old, new, 100, 300, 100, out.path())
        .run(CancellationToken::new())
        .await
        .unwrap();

    // Then: each log holds its header and one row
    assert_eq!(
        read_lines(out.path(), NOT_IN_NEW_FILE),
        vec![HEADER_LINE, "b,3,100,2"]
    );
    assert_eq!(
        read_lines(out.path(), NOT_IN_OLD_FILE),
        vec![HEADER_LINE, "c,3,250,5"]
    );

    assert!(!summary.cancelled());
    assert_eq!(summary.source.windows_fetched, 2);
    assert_eq!(summary.differ.results_forwarded, 2);
    assert_eq!(summary.sink.windows_written, 2);
    assert_eq!(summary.sink.progress_marker, Some(299));
}

#[tokio::test]
async fn test_type_filter_asymmetry_surfaces_as_diff() {
    // Type 5 records are kept by the old store's query only
    let out = TempDir::new().unwrap();
    let records = vec![Record::new("t3", 1_150, 0, 3), Record::new("t5", 1_160, 1, 5)];
    let old = MemoryExecutor::new(SourceSide::Old, records.clone());
    let new = MemoryExecutor::new(SourceSide::New, records);

    pipeline(old, new, 1_100, 1_200, 100, out.path())
        .run(CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        read_lines(out.path(), NOT_IN_NEW_FILE),
        vec![HEADER_LINE, "t5,5,1160,1"]
    );
    assert_eq!(read_lines(out.path(), NOT_IN_OLD_FILE), vec![HEADER_LINE]);
}

#[tokio::test]
async fn test_rows_sorted_by_height_then_index() {
    let out = TempDir::new().unwrap();
    let old = MemoryExecutor::new(
        SourceSide::Old,
        vec![
            Record::new("x", 2_090, 0, 3),
            Record::new("y", 2_010, 7, 3),
            Record::new("z", 2_010, 2, 3),
        ],
    );
    let new = MemoryExecutor::new(SourceSide::New, vec![]);

    pipeline(old, new, 2_000, 2_100, 100, out.path())
        .run(CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        read_lines(out.path(), NOT_IN_NEW_FILE),
        vec![HEADER_LINE, "z,3,2010,2", "y,3,2010,7", "x,3,2090,0"]
    );
}

#[tokio::test]
async fn test_empty_and_identical_windows_write_nothing() {
    let capture = init_test_capture();
    let out = TempDir::new().unwrap();
    // Window 770_000 is empty on both sides; window 770_100 holds the same key on both
    let old = MemoryExecutor::new(SourceSide::Old, vec![Record::new("k", 770_150, 0, 3)]);
    let new = MemoryExecutor::new(SourceSide::New, vec![Record::new("k", 770_199, 9, 3)]);

    let summary = pipeline(old, new, 770_000, 770_200, 100, out.path())
        .run(CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(read_lines(out.path(), NOT_IN_NEW_FILE), vec![HEADER_LINE]);
    assert_eq!(read_lines(out.path(), NOT_IN_OLD_FILE), vec![HEADER_LINE]);
    assert_eq!(summary.source.windows_forwarded, 1);
    assert_eq!(summary.sink.windows_written, 0);
    assert_eq!(summary.sink.progress_marker, None);

    assert_eq!(
        capture
            .events_where(EVENT_WINDOW_EMPTY, "boundary", "770000")
            .len(),
        1
    );
    assert_eq!(
        capture
            .events_where(EVENT_WINDOW_NO_DIFF, "boundary", "770100")
            .len(),
        1
    );
}

#[tokio::test]
async fn test_retrieval_failure_keeps_earlier_windows() {
    // Given: the old store fails on the second window
    let out = TempDir::new().unwrap();
    let old = MemoryExecutor::new(SourceSide::Old, vec![Record::new("b", 3_050, 2, 3)]).fail_at(3_100);
    let new = MemoryExecutor::new(SourceSide::New, vec![Record::new("c", 3_150, 5, 3)]);

    // When: the run reaches it
    let err = pipeline(old, new, 3_000, 3_300, 100, out.path())
        .run(CancellationToken::new())
        .await
        .unwrap_err();

    // Then: the error names the source and window
    assert_eq!(err.kind(), ExErrorKind::Retrieval);
    assert_eq!(err.source_name(), Some("old"));
    assert_eq!(err.boundary(), Some(3_100));

    // And: the first window is durable, nothing from the failing window was written
    assert_eq!(
        read_lines(out.path(), NOT_IN_NEW_FILE),
        vec![HEADER_LINE, "b,3,3050,2"]
    );
    assert_eq!(read_lines(out.path(), NOT_IN_OLD_FILE), vec![HEADER_LINE]);
}

#[tokio::test]
async fn test_unusable_output_dir_fails_before_retrieval() {
    let out = TempDir::new().unwrap();
    let blocker = out.path().join("blocker");
    fs::write(&blocker, b"not a directory").unwrap();

    let old = Arc::new(MemoryExecutor::new(SourceSide::Old, vec![]));
    let new = Arc::new(MemoryExecutor::new(SourceSide::New, vec![]));
    let err = Pipeline::new(
        old.clone() as Arc<dyn QueryExecutor>,
        new.clone() as Arc<dyn QueryExecutor>,
        RangeConfig::new(100, 300, 100).unwrap(),
        blocker.join("out"),
    )
    .run(CancellationToken::new())
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::Persistence);
    assert_eq!(old.calls() + new.calls(), 0);
}

#[tokio::test]
async fn test_cancelled_before_start_fetches_nothing() {
    let out = TempDir::new().unwrap();
    let old = Arc::new(MemoryExecutor::new(SourceSide::Old, vec![Record::new("a", 150, 0, 3)]));
    let new = Arc::new(MemoryExecutor::new(SourceSide::New, vec![]));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = Pipeline::new(
        old.clone() as Arc<dyn QueryExecutor>,
        new.clone() as Arc<dyn QueryExecutor>,
        RangeConfig::new(100, 300, 100).unwrap(),
        out.path(),
    )
    .run(cancel)
    .await
    .unwrap();

    assert!(summary.cancelled());
    assert_eq!(summary.source.next_boundary, 100);
    assert_eq!(summary.source.windows_fetched, 0);
    assert_eq!(old.calls() + new.calls(), 0);
    // Logs are still initialized
    assert_eq!(read_lines(out.path(), NOT_IN_NEW_FILE), vec![HEADER_LINE]);
}

#[tokio::test]
async fn test_restart_appends_to_previous_run() {
    let out = TempDir::new().unwrap();
    for _ in 0..2 {
        let old = MemoryExecutor::new(SourceSide::Old, vec![Record::new("b", 5_010, 2, 3)]);
        let new = MemoryExecutor::new(SourceSide::New, vec![Record::new("c", 5_020, 5, 3)]);
        pipeline(old, new, 5_000, 5_100, 100, out.path())
            .run(CancellationToken::new())
            .await
            .unwrap();
    }

    assert_eq!(
        read_lines(out.path(), NOT_IN_NEW_FILE),
        vec![HEADER_LINE, "b,3,5010,2", "b,3,5010,2"]
    );
    assert_eq!(
        read_lines(out.path(), NOT_IN_OLD_FILE),
        vec![HEADER_LINE, "c,3,5020,5", "c,3,5020,5"]
    );
}

#[tokio::test]
async fn test_cancellation_mid_run_stops_before_next_window() {
    use ndiff_engine::pipeline::WindowSource;
    use tokio::sync::mpsc;

    // Every window has a record, so every fetched window is forwarded
    let records: Vec<Record> = (1..5).map(|w| Record::new(format!("k{}", w), w * 100, 0, 3)).collect();
    let old = Arc::new(MemoryExecutor::new(SourceSide::Old, records));
    let new = Arc::new(MemoryExecutor::new(SourceSide::New, vec![]));
    let source = WindowSource::new(
        old.clone() as Arc<dyn QueryExecutor>,
        new.clone() as Arc<dyn QueryExecutor>,
        RangeConfig::new(100, 500, 100).unwrap(),
    );

    let (tx, mut rx) = mpsc::channel(1);
    let cancel = CancellationToken::new();
    let task = tokio::spawn(source.run(tx, cancel.clone()));

    // Window 100 sits in the channel, window 200 is fetched and waiting to be sent
    while old.calls() + new.calls() < 4 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cancel.cancel();

    let mut received = Vec::new();
    while let Some(pair) = rx.recv().await {
        received.push(pair.boundary);
    }
    let outcome = task.await.unwrap().unwrap();

    assert_eq!(received, vec![100, 200]);
    assert!(outcome.cancelled);
    assert_eq!(outcome.windows_fetched, 2);
    assert_eq!(outcome.next_boundary, 300);
    assert_eq!(old.calls() + new.calls(), 4);
}

/// Appends to the real log file until it has been synced `syncs_allowed`
/// times, then fails every write as if the disk were full
struct DiskFillsUp {
    file: File,
    syncs_allowed: usize,
    syncs: AtomicUsize,
}

impl Write for DiskFillsUp {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.syncs.load(Ordering::SeqCst) >= self.syncs_allowed {
            return Err(io::Error::other("no space left on device"));
        }
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl LogTarget for DiskFillsUp {
    fn sync(&self) -> io::Result<()> {
        self.syncs.fetch_add(1, Ordering::SeqCst);
        self.file.sync_data()
    }
}

/// `not_in_new.csv` fills up after `syncs_allowed` syncs; `not_in_old.csv` is a plain file
fn not_in_new_fills_up(syncs_allowed: usize) -> TargetOpener {
    Arc::new(move |path: &Path| -> io::Result<Box<dyn LogTarget>> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        if path.ends_with(NOT_IN_NEW_FILE) {
            Ok(Box::new(DiskFillsUp {
                file,
                syncs_allowed,
                syncs: AtomicUsize::new(0),
            }))
        } else {
            Ok(Box::new(file))
        }
    })
}

#[tokio::test]
async fn test_persistence_failure_stops_run_and_keeps_earlier_windows() {
    // Given: three windows with a diff each, and a log that fills up after the first
    let out = TempDir::new().unwrap();
    let range = RangeConfig::new(6_000, 6_300, 100).unwrap();
    let old = Arc::new(MemoryExecutor::new(
        SourceSide::Old,
        vec![
            Record::new("b1", 6_050, 0, 3),
            Record::new("b2", 6_150, 0, 3),
            Record::new("b3", 6_250, 0, 3),
        ],
    ));
    let new = Arc::new(MemoryExecutor::new(SourceSide::New, vec![]));
    // One sync when the sink opens, one for window 6000
    let sink = ResultSink::new(out.path(), range).with_target_opener(not_in_new_fills_up(2));

    // When: the run reaches window 6100
    let err = Pipeline::new(
        old.clone() as Arc<dyn QueryExecutor>,
        new.clone() as Arc<dyn QueryExecutor>,
        range,
        out.path(),
    )
    .with_sink(sink)
    .run(CancellationToken::new())
    .await
    .unwrap_err();

    // Then: the persistence error names the window, and window 6000 is on disk
    assert_eq!(err.kind(), ExErrorKind::Persistence);
    assert_eq!(err.boundary(), Some(6_100));
    assert_eq!(
        read_lines(out.path(), NOT_IN_NEW_FILE),
        vec![HEADER_LINE, "b1,3,6050,0"]
    );
    assert_eq!(read_lines(out.path(), NOT_IN_OLD_FILE), vec![HEADER_LINE]);
}

#[tokio::test]
async fn test_cancelled_run_persists_completed_windows() {
    // Given: slow stores with a diff on both sides of every window
    let out = TempDir::new().unwrap();
    let delay = Duration::from_millis(50);
    let old = Arc::new(
        MemoryExecutor::new(
            SourceSide::Old,
            (0..5u64)
                .map(|w| Record::new(format!("a{}", w), 7_050 + w * 100, 0, 3))
                .collect(),
        )
        .with_delay(delay),
    );
    let new = Arc::new(
        MemoryExecutor::new(
            SourceSide::New,
            (0..5u64)
                .map(|w| Record::new(format!("c{}", w), 7_060 + w * 100, 1, 3))
                .collect(),
        )
        .with_delay(delay),
    );
    let cancel = CancellationToken::new();
    let run = tokio::spawn(
        Pipeline::new(
            old.clone() as Arc<dyn QueryExecutor>,
            new.clone() as Arc<dyn QueryExecutor>,
            RangeConfig::new(7_000, 7_500, 100).unwrap(),
            out.path(),
        )
        .run(cancel.clone()),
    );

    // When: the interrupt lands while window 7100 is being fetched
    while old.calls() < 2 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cancel.cancel();
    let summary = run.await.unwrap().unwrap();

    // Then: windows 7000 and 7100 are persisted in both logs and nothing later
    assert!(summary.cancelled());
    assert_eq!(summary.source.next_boundary, 7_200);
    assert_eq!(summary.source.windows_fetched, 2);
    assert_eq!(summary.sink.windows_written, 2);
    assert_eq!(summary.sink.progress_marker, Some(7_199));
    assert_eq!(
        read_lines(out.path(), NOT_IN_NEW_FILE),
        vec![HEADER_LINE, "a0,3,7050,0", "a1,3,7150,0"]
    );
    assert_eq!(
        read_lines(out.path(), NOT_IN_OLD_FILE),
        vec![HEADER_LINE, "c0,3,7060,1", "c1,3,7160,1"]
    );
    assert_eq!(old.calls(), 2);
}
