// ABOUTME: Durable checkpoint ledger of requested and finished time ranges
// ABOUTME: Loaded once per run, mutated in memory, persisted wholesale after every transition
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Checkpoint Ledger
//!
//! The ledger is the poller's only durable state: an ordered queue of
//! `requested` (in-flight) ranges and a gap-merged list of `finished`
//! (completed) ranges. It is loaded once at the start of a run, mutated in
//! memory, and rewritten wholesale through a [`LedgerStore`] after every
//! structural mutation — there is no partial-write or transaction concept,
//! so the store must replace the blob atomically to keep concurrent readers
//! consistent.
//!
//! ## Invariants
//!
//! - No two adjacent `finished` ranges share a boundary: whenever
//!   `finished[i].end == finished[i+1].start` the pair is merged, so the
//!   list is the minimal gap-free representation of everything harvested.
//! - No duplicate range (by value) appears twice in `requested`.
//!
//! ## Durability contract
//!
//! A crash between fetch-completion and persist re-fetches the affected
//! range on the next run: at-least-once per range, never at-most-zero.

use crate::errors::LedgerError;
use crate::window::{default_window, floor_to_minute, TimeRange};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use tracing::debug;

/// Whole-blob persistence capability backing the ledger.
///
/// `read` reports absence through [`io::ErrorKind::NotFound`]; `write` must
/// replace the previous blob atomically.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Read the entire persisted blob.
    ///
    /// # Errors
    ///
    /// [`io::ErrorKind::NotFound`] when no blob exists yet; any other I/O
    /// failure otherwise.
    async fn read(&self) -> io::Result<Vec<u8>>;

    /// Overwrite the persisted blob with `bytes`.
    ///
    /// # Errors
    ///
    /// Any I/O failure while replacing the blob.
    async fn write(&self, bytes: &[u8]) -> io::Result<()>;
}

/// File-backed [`LedgerStore`] with atomic rewrite.
///
/// Writes land in a `.tmp` sibling first and are renamed over the target,
/// so a reader never observes a half-written blob.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Store the ledger blob at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[async_trait]
impl LedgerStore for FileStore {
    async fn read(&self) -> io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }

    async fn write(&self, bytes: &[u8]) -> io::Result<()> {
        let staging = self.staging_path();
        tokio::fs::write(&staging, bytes).await?;
        tokio::fs::rename(&staging, &self.path).await
    }
}

/// Checkpoint record of in-flight and completed harvest ranges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    requested: Vec<TimeRange>,
    finished: Vec<TimeRange>,
}

impl Ledger {
    /// Load the persisted ledger, degrading to an empty one when no blob
    /// exists yet.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Corrupt`] when a blob exists but cannot be parsed —
    /// deliberately fatal rather than silently resetting checkpoint history.
    pub async fn load(store: &dyn LedgerStore) -> Result<Self, LedgerError> {
        match store.read().await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(LedgerError::Corrupt),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("no persisted ledger yet, starting empty");
                Ok(Self::default())
            }
            Err(err) => Err(LedgerError::Store(err)),
        }
    }

    /// Serialize the full structure and overwrite the backing store.
    ///
    /// Called after every structural mutation so a restart resumes from the
    /// last completed transition.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Encode`] or [`LedgerError::Store`] when serializing
    /// or writing the blob fails.
    pub async fn persist(&self, store: &dyn LedgerStore) -> Result<(), LedgerError> {
        let bytes = serde_json::to_vec(self).map_err(LedgerError::Encode)?;
        store.write(&bytes).await?;
        Ok(())
    }

    /// Ranges queued for fetching, in request order.
    #[must_use]
    pub fn requested(&self) -> &[TimeRange] {
        &self.requested
    }

    /// Completed ranges, gap-merged.
    #[must_use]
    pub fn finished(&self) -> &[TimeRange] {
        &self.finished
    }

    /// Compute the next interval to request for a clock reading.
    ///
    /// The start anchors to the end of the most recent `requested` range if
    /// any (continuing the queue even when that range is still pending),
    /// else to the end of the most recent `finished` range, else to the
    /// default lookback window. The end is the reading's minute boundary.
    /// Returns `None` when the computed interval is zero-width — calling
    /// twice within the same minute must not queue anything.
    #[must_use]
    pub fn next_request(&self, now: DateTime<Utc>, lookback_minutes: u32) -> Option<TimeRange> {
        let end = floor_to_minute(now);
        let start = self
            .requested
            .last()
            .or_else(|| self.finished.last())
            .map_or_else(
                || default_window(now, lookback_minutes).start(),
                TimeRange::end,
            );
        TimeRange::new(start, end)
    }

    /// Append `range` to the request queue unless an identical range is
    /// already queued.
    pub fn add_requested(&mut self, range: TimeRange) {
        if !self.requested.contains(&range) {
            self.requested.push(range);
        }
    }

    /// Move `range` from `requested` to `finished` and re-merge.
    pub fn promote(&mut self, range: TimeRange) {
        self.requested.retain(|r| *r != range);
        self.finished.push(range);
        self.finished = merge_finished(std::mem::take(&mut self.finished));
    }
}

/// Collapse every pair of ranges where one's end equals the next's start,
/// producing the minimal gap-free representation. Non-adjacent ranges are
/// left separate.
#[must_use]
pub fn merge_finished(ranges: Vec<TimeRange>) -> Vec<TimeRange> {
    let mut merged: Vec<TimeRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(prev) if prev.end() == range.start() => *prev = prev.join(&range),
            _ => merged.push(range),
        }
    }
    merged
}
