// ABOUTME: Incremental JSON-array framing of fetched records over any async writer
// ABOUTME: One array per drained range, chunked page-by-page, surviving mid-range credential refresh
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Record Sink
//!
//! Consumers receive one JSON array of records per drained range — not one
//! array for the whole run — written incrementally as pages arrive. The sink
//! keeps its framing state across credential refreshes, so a range that
//! spans several credential lifetimes still emits a single well-formed
//! array. Records are written verbatim; the sink never re-serializes them.

use crate::fetch::ActivityRecord;
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};

enum FrameState {
    Idle,
    Open { any_written: bool },
}

/// Streams records as newline-separated JSON arrays, one per range.
pub struct RecordSink<W> {
    writer: W,
    state: FrameState,
}

impl<W: AsyncWrite + Unpin> RecordSink<W> {
    /// Wrap an async writer. Nothing is written until a range begins.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            state: FrameState::Idle,
        }
    }

    /// Open the array for the next range.
    ///
    /// # Errors
    ///
    /// Fails when a range is already open or the write fails.
    pub async fn begin_range(&mut self) -> io::Result<()> {
        if matches!(self.state, FrameState::Open { .. }) {
            return Err(io::Error::other("range already open in record sink"));
        }
        self.writer.write_all(b"[").await?;
        self.state = FrameState::Open { any_written: false };
        Ok(())
    }

    /// Append one page's records to the open array.
    ///
    /// # Errors
    ///
    /// Fails when no range is open or a write fails.
    pub async fn write_page(&mut self, records: &[ActivityRecord]) -> io::Result<()> {
        let FrameState::Open { any_written } = &mut self.state else {
            return Err(io::Error::other("page written outside an open range"));
        };
        for record in records {
            if *any_written {
                self.writer.write_all(b",").await?;
            }
            self.writer.write_all(record.as_str().as_bytes()).await?;
            *any_written = true;
        }
        Ok(())
    }

    /// Close the open array and flush.
    ///
    /// # Errors
    ///
    /// Fails when no range is open or the write or flush fails.
    pub async fn end_range(&mut self) -> io::Result<()> {
        if !matches!(self.state, FrameState::Open { .. }) {
            return Err(io::Error::other("no open range in record sink"));
        }
        self.writer.write_all(b"]\n").await?;
        self.writer.flush().await?;
        self.state = FrameState::Idle;
        Ok(())
    }

    /// Unwrap the inner writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}
