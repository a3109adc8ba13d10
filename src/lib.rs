// ABOUTME: Library root for pingpoll, the interval-checkpointing activity poller
// ABOUTME: Wires the window, ledger, auth, fetch, sink and poller modules together
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # pingpoll
//!
//! Incrementally harvests time-ranged activity records from the PingOne
//! API, checkpoints progress in a durable ledger so no interval is lost or
//! duplicated across restarts, and emits collected records as a stream of
//! JSON arrays (one per harvested range).
//!
//! The moving parts, leaf-first:
//!
//! - [`window`] — the [`TimeRange`](window::TimeRange) value type and the
//!   minute-aligned default lookback window.
//! - [`ledger`] — durable record of requested (in-flight) and finished
//!   (completed, gap-merged) ranges.
//! - [`auth`] — credential caching over a pluggable exchange capability;
//!   invalidated reactively on 401/403.
//! - [`fetch`] — the paginated range walk, preserving its continuation
//!   cursor across credential expiry so a range resumes mid-walk instead of
//!   restarting.
//! - [`poller`] — the reconcile/drain state machine tying it all together.
//! - [`pingone`] — the concrete HTTP client behind both capability seams.
//!
//! External collaborators (HTTP transport, the wall clock, ledger file
//! I/O) sit behind traits or parameters, so the whole state machine runs
//! against in-memory fakes in tests.

pub mod auth;
pub mod config;
pub mod errors;
pub mod fetch;
pub mod ledger;
pub mod logging;
pub mod pingone;
pub mod poller;
pub mod sink;
pub mod window;

pub use auth::{Credential, CredentialExchange, CredentialProvider};
pub use config::PollerConfig;
pub use errors::{AuthError, FetchError, LedgerError, RunError, TransportError};
pub use fetch::{
    fetch_range, ActivityPage, ActivityRecord, PageCursor, PageRequest, PageTransport,
    RangeOutcome,
};
pub use ledger::{merge_finished, FileStore, Ledger, LedgerStore};
pub use pingone::PingOneClient;
pub use poller::Poller;
pub use sink::RecordSink;
pub use window::{default_window, floor_to_minute, TimeRange};
