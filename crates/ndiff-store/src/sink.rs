//! Append-only result logs
//!
//! A run writes two CSV logs into its output directory:
//!
//! - `not_in_new.csv`: records the old store has and the new store lacks
//! - `not_in_old.csv`: records the new store has and the old store lacks
//!
//! Logs survive restarts. A log that already exists is appended to and its
//! header is left alone; a missing (or zero-length) log gets the header
//! written once. After every window both logs are flushed and synced before
//! the progress marker moves, so a recorded marker means both logs hold
//! every row up to it.

use crate::errors::{persistence_error, Result};
use ndiff_core::schema::EVENT_WINDOW_PERSISTED;
use ndiff_core::{DiffResult, RangeConfig, Record};
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const NOT_IN_NEW_FILE: &str = "not_in_new.csv";
pub const NOT_IN_OLD_FILE: &str = "not_in_old.csv";

/// Column order of every row: key, type, height, index
pub const HEADER: [&str; 4] = ["txid", "nft_type", "height", "nft_idx"];

/// Lifecycle of a [`ResultSink`]
///
/// `Idle → Initializing → Draining → Closed`. Any I/O failure moves the
/// sink to `Failed`, from which nothing more is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkPhase {
    Idle,
    Initializing,
    Draining,
    Closed,
    Failed,
}

/// Totals reported when a sink closes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SinkSummary {
    pub progress_marker: Option<u64>,
    pub windows_written: u64,
    pub rows_written: u64,
}

/// Byte destination behind one result log
pub trait LogTarget: Write + Send {
    /// Make everything written so far durable
    fn sync(&self) -> io::Result<()>;
}

impl LogTarget for File {
    fn sync(&self) -> io::Result<()> {
        self.sync_data()
    }
}

/// Opens the [`LogTarget`] for a result log path
pub type TargetOpener = Arc<dyn Fn(&Path) -> io::Result<Box<dyn LogTarget>> + Send + Sync>;

fn open_for_append(path: &Path) -> io::Result<Box<dyn LogTarget>> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(Box::new(file))
}

struct ResultLog {
    path: PathBuf,
    writer: csv::Writer<Box<dyn LogTarget>>,
}

impl ResultLog {
    fn open(path: PathBuf, opener: &TargetOpener) -> Result<Self> {
        let needs_header = match fs::metadata(&path) {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == ErrorKind::NotFound => true,
            Err(e) => return Err(persistence_error("stat_result_log", &path, e)),
        };

        let target = opener(&path).map_err(|e| persistence_error("open_result_log", &path, e))?;
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(target);
        let mut log = Self { path, writer };

        if needs_header {
            tracing::info!(
                component = module_path!(),
                path = %log.path.display(),
                "result log not present, creating it"
            );
            log.writer
                .write_record(HEADER)
                .map_err(|e| persistence_error("write_result_header", &log.path, e))?;
        } else {
            tracing::info!(
                component = module_path!(),
                path = %log.path.display(),
                "result log already present, appending to it"
            );
        }

        Ok(log)
    }

    fn append(&mut self, records: &[Record]) -> Result<()> {
        for record in records {
            let row = [
                record.key.clone(),
                record.kind.to_string(),
                record.height.to_string(),
                record.index.to_string(),
            ];
            self.writer
                .write_record(&row)
                .map_err(|e| persistence_error("write_result_row", &self.path, e))?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| persistence_error("flush_result_log", &self.path, e))?;
        self.writer
            .get_ref()
            .sync()
            .map_err(|e| persistence_error("sync_result_log", &self.path, e))
    }
}

/// Writes diff results to the two result logs and tracks progress
///
/// Owned by a single consumer; nothing here is shared across threads.
pub struct ResultSink {
    dir: PathBuf,
    range: RangeConfig,
    opener: TargetOpener,
    phase: SinkPhase,
    not_in_new: Option<ResultLog>,
    not_in_old: Option<ResultLog>,
    progress_marker: Option<u64>,
    windows_written: u64,
    rows_written: u64,
}

impl ResultSink {
    /// Create an idle sink for `dir`; no files are touched yet
    pub fn new(dir: impl Into<PathBuf>, range: RangeConfig) -> Self {
        Self {
            dir: dir.into(),
            range,
            opener: Arc::new(open_for_append),
            phase: SinkPhase::Idle,
            not_in_new: None,
            not_in_old: None,
            progress_marker: None,
            windows_written: 0,
            rows_written: 0,
        }
    }

    /// Create and initialize a sink in one step
    pub fn open(dir: impl Into<PathBuf>, range: RangeConfig) -> Result<Self> {
        let mut sink = Self::new(dir, range);
        sink.initialize()?;
        Ok(sink)
    }

    /// Write through `opener` instead of appending to files in `dir`.
    ///
    /// The header decision still looks at `dir` on disk.
    pub fn with_target_opener(mut self, opener: TargetOpener) -> Self {
        self.opener = opener;
        self
    }

    /// Create the output directory and open both logs.
    ///
    /// # Errors
    ///
    /// `Persistence` if the directory cannot be created or either log cannot
    /// be opened, created, or given its header.
    pub fn initialize(&mut self) -> Result<()> {
        if self.phase != SinkPhase::Idle {
            return Err(persistence_error(
                "initialize_sink",
                &self.dir,
                format!("sink is {:?}, expected Idle", self.phase),
            ));
        }
        self.phase = SinkPhase::Initializing;

        let opened = fs::create_dir_all(&self.dir)
            .map_err(|e| persistence_error("create_result_dir", &self.dir, e))
            .and_then(|_| {
                let mut not_in_new = ResultLog::open(self.dir.join(NOT_IN_NEW_FILE), &self.opener)?;
                let mut not_in_old = ResultLog::open(self.dir.join(NOT_IN_OLD_FILE), &self.opener)?;
                not_in_new.flush()?;
                not_in_old.flush()?;
                Ok((not_in_new, not_in_old))
            });

        match opened {
            Ok((not_in_new, not_in_old)) => {
                self.not_in_new = Some(not_in_new);
                self.not_in_old = Some(not_in_old);
                self.phase = SinkPhase::Draining;
                Ok(())
            }
            Err(e) => {
                self.phase = SinkPhase::Failed;
                Err(e)
            }
        }
    }

    /// Append one window's results to both logs, flush both, then advance
    /// the progress marker to the last height the window covers.
    ///
    /// Returns the new progress marker.
    ///
    /// # Errors
    ///
    /// `Persistence` on any write or flush failure; the sink is then `Failed`
    /// and the marker is left where it was.
    pub fn append(&mut self, result: &DiffResult) -> Result<u64> {
        let not_draining = || {
            persistence_error(
                "append_result",
                &self.dir,
                format!("sink is {:?}, expected Draining", self.phase),
            )
        };
        if self.phase != SinkPhase::Draining {
            return Err(not_draining());
        }
        let (Some(not_in_new), Some(not_in_old)) =
            (self.not_in_new.as_mut(), self.not_in_old.as_mut())
        else {
            return Err(not_draining());
        };

        let written = not_in_new
            .append(&result.not_in_new)
            .and_then(|_| not_in_old.append(&result.not_in_old))
            .and_then(|_| not_in_new.flush())
            .and_then(|_| not_in_old.flush());
        if let Err(e) = written {
            self.phase = SinkPhase::Failed;
            return Err(e.with_boundary(result.boundary));
        }

        let to_boundary = self.range.window_end(result.boundary);
        let marker = self.range.progress_marker(result.boundary);
        self.progress_marker = Some(self.progress_marker.map_or(marker, |m| m.max(marker)));
        self.windows_written += 1;
        self.rows_written += result.len() as u64;

        tracing::info!(
            component = module_path!(),
            event = EVENT_WINDOW_PERSISTED,
            boundary = result.boundary,
            to_boundary = to_boundary,
            not_in_new = result.not_in_new.len(),
            not_in_old = result.not_in_old.len(),
            "processed window, diff result saved"
        );

        Ok(marker)
    }

    /// Flush both logs and release their handles.
    ///
    /// A sink that already failed just drops its handles; the failure that
    /// put it there has been reported to the caller of `append`.
    pub fn close(mut self) -> Result<SinkSummary> {
        if self.phase == SinkPhase::Draining {
            if let Some(log) = self.not_in_new.as_mut() {
                log.flush()?;
            }
            if let Some(log) = self.not_in_old.as_mut() {
                log.flush()?;
            }
            self.phase = SinkPhase::Closed;
        }
        self.not_in_new = None;
        self.not_in_old = None;

        Ok(self.summary())
    }

    pub fn phase(&self) -> SinkPhase {
        self.phase
    }

    /// Highest position durably written to both logs, if any window was
    pub fn progress_marker(&self) -> Option<u64> {
        self.progress_marker
    }

    pub fn windows_written(&self) -> u64 {
        self.windows_written
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn summary(&self) -> SinkSummary {
        SinkSummary {
            progress_marker: self.progress_marker,
            windows_written: self.windows_written,
            rows_written: self.rows_written,
        }
    }
}
