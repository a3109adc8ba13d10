// ABOUTME: Paginated range walk over the activity API with cursor preservation across auth expiry
// ABOUTME: Defines the page-transport capability seam plus the request, page and record types
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Paginated Fetching
//!
//! [`fetch_range`] walks every page of the remote API for one [`TimeRange`]:
//! the first request is scoped to the range via lower/upper bound filters,
//! each following request targets the continuation cursor carried by the
//! previous response, and a response with no cursor completes the walk.
//!
//! ## Resume-by-cursor
//!
//! When a page request is rejected with 401/403, the walk halts and hands
//! the *current* cursor back in [`RangeOutcome::AuthExpired`]. After the
//! caller re-acquires a credential, the walk resumes exactly where it
//! stopped instead of restarting at the range's lower bound — a single
//! range may span many credential lifetimes without ever re-scanning
//! already-fetched pages. Any other transport failure is fatal for the
//! whole range: no partial credit, the caller must re-request it in full.
//!
//! Records are opaque pass-through payloads: each page's records are
//! appended verbatim to the caller's [`RecordSink`], which frames one
//! logical JSON array per range across however many pages (and credential
//! refreshes) the walk takes.

use crate::auth::Credential;
use crate::errors::{FetchError, TransportError};
use crate::sink::RecordSink;
use crate::window::TimeRange;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use tokio::io::AsyncWrite;
use tracing::{debug, warn};

/// One activity record as returned by the remote API. The poller never
/// inspects its fields; the raw JSON text is carried through untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityRecord(Box<RawValue>);

impl ActivityRecord {
    /// Wrap a raw JSON value.
    ///
    /// # Errors
    ///
    /// Returns the underlying parse error when `json` is not valid JSON.
    pub fn from_json(json: String) -> serde_json::Result<Self> {
        RawValue::from_string(json).map(Self)
    }

    /// The record's raw JSON text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.get()
    }
}

/// Opaque continuation locator pointing at the next page of a paginated
/// result. Owned by the range walk; discarded when the walk completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor(String);

impl PageCursor {
    /// Wrap a server-provided continuation locator.
    #[must_use]
    pub fn new(href: impl Into<String>) -> Self {
        Self(href.into())
    }

    /// The raw locator string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Descriptor for a single page request.
#[derive(Debug, Clone)]
pub enum PageRequest {
    /// First page of a walk: scoped to a time range with a page-size limit.
    Window {
        /// The range whose records are being harvested.
        range: TimeRange,
        /// Maximum records per page.
        limit: u32,
    },
    /// Any subsequent page: follow a continuation cursor verbatim.
    Next(PageCursor),
}

/// One page of the paginated result.
#[derive(Debug)]
pub struct ActivityPage {
    /// Records carried by this page, in server order.
    pub records: Vec<ActivityRecord>,
    /// Continuation cursor; absent on the final page.
    pub next: Option<PageCursor>,
}

/// Capability to fetch one page given a request descriptor and a credential.
#[async_trait]
pub trait PageTransport: Send + Sync {
    /// Issue a single page request.
    ///
    /// # Errors
    ///
    /// [`TransportError::AuthExpired`] when the credential is rejected with
    /// 401/403; other variants for every other failure.
    async fn fetch_page(
        &self,
        request: &PageRequest,
        credential: &Credential,
    ) -> Result<ActivityPage, TransportError>;
}

/// How a range walk ended, short of a fatal error.
#[derive(Debug)]
pub enum RangeOutcome {
    /// Every page was fetched and emitted; the range can be promoted.
    Complete,
    /// A page request was rejected with 401/403. `resume` carries the
    /// cursor the walk stopped at (`None` when the very first page was
    /// rejected, in which case the walk restarts from the range bounds).
    AuthExpired {
        /// Where to pick the walk back up after re-acquiring a credential.
        resume: Option<PageCursor>,
    },
}

/// Walk all pages of `range`, appending each page's records to `sink`.
///
/// `resume` continues an interrupted walk from a preserved cursor. The
/// caller owns the sink's array framing (`begin_range`/`end_range`) so that
/// framing survives credential refreshes mid-range.
///
/// # Errors
///
/// [`FetchError`] on any non-auth transport failure or sink write failure;
/// the whole range must then be re-requested.
pub async fn fetch_range<W>(
    transport: &dyn PageTransport,
    sink: &mut RecordSink<W>,
    range: TimeRange,
    credential: &Credential,
    limit: u32,
    resume: Option<PageCursor>,
) -> Result<RangeOutcome, FetchError>
where
    W: AsyncWrite + Unpin + Send,
{
    let mut request = match resume {
        Some(cursor) => {
            debug!(range = %range, "resuming range walk from preserved cursor");
            PageRequest::Next(cursor)
        }
        None => PageRequest::Window { range, limit },
    };

    loop {
        match transport.fetch_page(&request, credential).await {
            Ok(page) => {
                debug!(range = %range, records = page.records.len(), "page fetched");
                sink.write_page(&page.records).await?;
                match page.next {
                    Some(cursor) => request = PageRequest::Next(cursor),
                    None => return Ok(RangeOutcome::Complete),
                }
            }
            Err(TransportError::AuthExpired { status }) => {
                let resume = match request {
                    PageRequest::Next(cursor) => Some(cursor),
                    PageRequest::Window { .. } => None,
                };
                warn!(status, range = %range, "credential rejected mid-range, cursor preserved");
                return Ok(RangeOutcome::AuthExpired { resume });
            }
            Err(err) => return Err(FetchError::Transport(err)),
        }
    }
}
