//! In-memory query executor
//!
//! Serves a fixed set of records the way a store would: bounded to the
//! requested range and filtered to the side's allowed type codes. Failures
//! and latency can be injected per window.

use crate::errors::{retrieval_error, Result};
use crate::executor::{QueryExecutor, RecordRow};
use async_trait::async_trait;
use ndiff_core::{Record, SourceSide};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub struct MemoryExecutor {
    name: String,
    side: SourceSide,
    records: Vec<Record>,
    fail_at: HashSet<u64>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MemoryExecutor {
    pub fn new(side: SourceSide, records: Vec<Record>) -> Self {
        Self {
            name: side.as_str().to_string(),
            side,
            records,
            fail_at: HashSet::new(),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail any query whose lower bound is `boundary`
    pub fn fail_at(mut self, boundary: u64) -> Self {
        self.fail_at.insert(boundary);
        self
    }

    /// Sleep before answering each query
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of queries served so far, failed ones included
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryExecutor for MemoryExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query_range(&self, _sql: &str, lower: u64, upper: u64) -> Result<Vec<RecordRow>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_at.contains(&lower) {
            return Err(retrieval_error(
                "query_range",
                &self.name,
                format!("injected failure at {}", lower),
            ));
        }

        let allowed = self.side.allowed_types();
        Ok(self
            .records
            .iter()
            .filter(|r| r.height >= lower && r.height < upper && allowed.contains(&r.kind))
            .map(|r| RecordRow {
                key: r.key.clone(),
                height: r.height,
                index: r.index,
                kind: r.kind,
            })
            .collect())
    }
}
