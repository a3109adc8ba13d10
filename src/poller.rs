// ABOUTME: Run orchestration: reconcile the ledger with the clock, then drain requested ranges
// ABOUTME: Promotes each completed range and persists the ledger before moving to the next
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Poller
//!
//! One [`Poller::run`] executes the two-phase state machine:
//!
//! 1. **Reconcile** — load the ledger, compute the next interval to request
//!    from the clock reading, queue it (if non-empty) and persist.
//! 2. **Drain** — snapshot the request queue and process each range in
//!    order: acquire a credential, walk the range's pages, and on
//!    completion promote the range to `finished` and persist before
//!    touching the next one. A crash mid-run therefore never loses ranges
//!    that already completed.
//!
//! Credential expiry mid-range is absorbed here: the provider is
//! invalidated and the walk resumes from its preserved cursor under a fresh
//! credential. Token-exchange failure aborts the whole run, and so does any
//! non-auth fetch failure — the conservative fail-fast choice; a softer
//! policy would skip the failing range and continue with the next, at the
//! cost of draining ranges out of queue order.

use crate::auth::CredentialProvider;
use crate::errors::RunError;
use crate::fetch::{fetch_range, PageCursor, PageTransport, RangeOutcome};
use crate::ledger::{Ledger, LedgerStore};
use crate::sink::RecordSink;
use crate::window::TimeRange;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::io::AsyncWrite;
use tracing::info;

/// Interval-checkpointing scheduler driving the whole harvest.
pub struct Poller {
    transport: Arc<dyn PageTransport>,
    credentials: CredentialProvider,
    store: Arc<dyn LedgerStore>,
    lookback_minutes: u32,
    page_limit: u32,
}

impl Poller {
    /// Assemble a poller from its collaborators.
    #[must_use]
    pub fn new(
        transport: Arc<dyn PageTransport>,
        credentials: CredentialProvider,
        store: Arc<dyn LedgerStore>,
        lookback_minutes: u32,
        page_limit: u32,
    ) -> Self {
        Self {
            transport,
            credentials,
            store,
            lookback_minutes,
            page_limit,
        }
    }

    /// Execute one run against the given clock reading, emitting records
    /// into `sink`.
    ///
    /// # Errors
    ///
    /// [`RunError`] when the ledger cannot be loaded or persisted, when
    /// credential exchange fails, or when a range walk hits a non-auth
    /// failure. The failing range stays in `requested` for the next run.
    pub async fn run<W>(
        &mut self,
        sink: &mut RecordSink<W>,
        now: DateTime<Utc>,
    ) -> Result<(), RunError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut ledger = Ledger::load(self.store.as_ref()).await?;

        if let Some(range) = ledger.next_request(now, self.lookback_minutes) {
            info!(range = %range, "queueing interval");
            ledger.add_requested(range);
            ledger.persist(self.store.as_ref()).await?;
        }

        // Snapshot: ranges queued by this reconcile are included, anything
        // appearing later is next run's business.
        let queue: Vec<TimeRange> = ledger.requested().to_vec();
        for range in queue {
            self.drain_range(&mut ledger, sink, range).await?;
        }

        info!(finished = ledger.finished().len(), "run complete");
        Ok(())
    }

    /// Fully process one requested range, across however many credential
    /// refreshes it takes.
    async fn drain_range<W>(
        &mut self,
        ledger: &mut Ledger,
        sink: &mut RecordSink<W>,
        range: TimeRange,
    ) -> Result<(), RunError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        sink.begin_range().await?;
        let mut resume: Option<PageCursor> = None;

        loop {
            let credential = self.credentials.token().await?;
            let outcome = fetch_range(
                self.transport.as_ref(),
                sink,
                range,
                &credential,
                self.page_limit,
                resume.take(),
            )
            .await
            .map_err(|source| RunError::Fetch { range, source })?;

            match outcome {
                RangeOutcome::Complete => {
                    sink.end_range().await?;
                    ledger.promote(range);
                    ledger.persist(self.store.as_ref()).await?;
                    info!(range = %range, "interval finished");
                    return Ok(());
                }
                RangeOutcome::AuthExpired { resume: cursor } => {
                    self.credentials.invalidate();
                    resume = cursor;
                }
            }
        }
    }
}
