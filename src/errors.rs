// ABOUTME: Error taxonomy for the poller: auth, transport, ledger and run-level failures
// ABOUTME: Only credential expiry is recoverable; everything else unwinds to the run boundary
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Error Handling
//!
//! The taxonomy mirrors the poller's recovery policy:
//!
//! - Credential expiry (401/403 from the data API) is the one recoverable
//!   condition. It is surfaced as [`TransportError::AuthExpired`], caught by
//!   the range walk, and never unwinds past the drain loop.
//! - Everything else — failed credential exchange, any other transport
//!   failure, an unreadable or unparsable ledger — propagates to
//!   [`crate::poller::Poller::run`]'s caller and terminates the run with a
//!   logged diagnostic. There is no retry or backoff for transient errors.

use crate::window::TimeRange;
use thiserror::Error;

/// Credential exchange failed. Fatal for the run: token issuance is
/// surfaced, never retried automatically.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The token endpoint answered with a non-2xx status.
    #[error("token endpoint returned status {status}: {detail}")]
    Rejected {
        /// HTTP status code of the rejection.
        status: u16,
        /// Response body, if one could be read.
        detail: String,
    },

    /// The token request never produced a usable response.
    #[error("token request failed: {0}")]
    Transport(#[source] reqwest::Error),
}

/// A single page request against the activity API failed.
#[derive(Debug, Error)]
pub enum TransportError {
    /// 401/403 — the credential went stale. Recovered by the drain loop,
    /// which re-acquires a credential and resumes from the preserved cursor.
    #[error("authorization rejected with status {status}")]
    AuthExpired {
        /// The rejecting status code (401 or 403).
        status: u16,
    },

    /// Any other non-2xx answer. Fatal for the range and the run.
    #[error("activity endpoint returned status {status}: {detail}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, if one could be read.
        detail: String,
    },

    /// The request failed below HTTP (connect, timeout, decode).
    #[error("activity request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// A continuation locator handed back by the server was not a URL.
    #[error("continuation cursor is not a valid url: {0}")]
    Cursor(#[from] url::ParseError),
}

/// A range walk failed for a reason other than credential expiry.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The underlying page request failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Writing fetched records to the output sink failed.
    #[error("record sink write failed: {0}")]
    Sink(#[from] std::io::Error),
}

/// Reading or writing the persisted ledger blob failed.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The blob exists but cannot be parsed. Propagated as a startup
    /// failure: silently resetting would discard checkpoint history and
    /// re-fetch already-exported intervals.
    #[error("persisted ledger blob is not parseable: {0}")]
    Corrupt(#[source] serde_json::Error),

    /// The in-memory ledger could not be serialized.
    #[error("ledger serialization failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// The backing store failed to read or write the blob.
    #[error("ledger store i/o: {0}")]
    Store(#[from] std::io::Error),
}

/// Top-level failure of a poller run.
#[derive(Debug, Error)]
pub enum RunError {
    /// Credential exchange failed; the run aborts before or mid-drain.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A range walk hit a non-auth failure. The whole run stops; the range
    /// stays in `requested` and is re-fetched from scratch next run.
    #[error("fetching {range} failed: {source}")]
    Fetch {
        /// The range being drained when the failure occurred.
        range: TimeRange,
        /// The underlying failure.
        #[source]
        source: FetchError,
    },

    /// Loading or persisting the ledger failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Framing writes to the output sink failed.
    #[error("record sink i/o: {0}")]
    Sink(#[from] std::io::Error),
}
