// ABOUTME: Shared fixtures for integration tests: in-memory store, scripted transport, fake exchange
// ABOUTME: Capability-trait fakes stand in for the HTTP transport and the ledger file
//
// SPDX-License-Identifier: MIT OR Apache-2.0

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(clippy::new_without_default)]
#![allow(missing_docs, dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pingpoll::window::parse_timestamp;
use pingpoll::{
    ActivityPage, ActivityRecord, AuthError, Credential, CredentialExchange, LedgerStore,
    PageCursor, PageRequest, PageTransport, TimeRange, TransportError,
};
use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::Mutex;

pub fn ts(s: &str) -> DateTime<Utc> {
    parse_timestamp(s).unwrap()
}

pub fn range(start: &str, end: &str) -> TimeRange {
    TimeRange::new(ts(start), ts(end)).unwrap()
}

pub fn credential() -> Credential {
    Credential {
        access_token: "token-0".into(),
        token_type: "Bearer".into(),
    }
}

/// In-memory [`LedgerStore`]: absent until first write, then a single blob.
#[derive(Default)]
pub struct MemoryStore {
    blob: Mutex<Option<Vec<u8>>>,
}

impl MemoryStore {
    pub fn snapshot(&self) -> Option<Vec<u8>> {
        self.blob.lock().unwrap().clone()
    }

    pub fn seed(&self, bytes: &[u8]) {
        *self.blob.lock().unwrap() = Some(bytes.to_vec());
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn read(&self) -> io::Result<Vec<u8>> {
        self.blob
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }

    async fn write(&self, bytes: &[u8]) -> io::Result<()> {
        *self.blob.lock().unwrap() = Some(bytes.to_vec());
        Ok(())
    }
}

/// One scripted answer for a page request.
pub enum Reply {
    Page {
        records: Vec<&'static str>,
        next: Option<&'static str>,
    },
    AuthExpired,
    Fail,
}

/// [`PageTransport`] fake answering from per-request-key reply queues and
/// logging every request it sees.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    log: Mutex<Vec<String>>,
}

/// Key a window-scoped first-page request resolves to.
pub fn window_key(range: &TimeRange) -> String {
    format!("window:{range}")
}

fn key_of(request: &PageRequest) -> String {
    match request {
        PageRequest::Window { range, .. } => window_key(range),
        PageRequest::Next(cursor) => cursor.as_str().to_string(),
    }
}

impl ScriptedTransport {
    pub fn script(&self, key: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn requests(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn request_count(&self, key: &str) -> usize {
        self.log.lock().unwrap().iter().filter(|k| *k == key).count()
    }
}

#[async_trait]
impl PageTransport for ScriptedTransport {
    async fn fetch_page(
        &self,
        request: &PageRequest,
        _credential: &Credential,
    ) -> Result<ActivityPage, TransportError> {
        let key = key_of(request);
        self.log.lock().unwrap().push(key.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(VecDeque::pop_front);
        match reply {
            Some(Reply::Page { records, next }) => Ok(ActivityPage {
                records: records
                    .into_iter()
                    .map(|r| ActivityRecord::from_json(r.to_string()).unwrap())
                    .collect(),
                next: next.map(PageCursor::new),
            }),
            Some(Reply::AuthExpired) => Err(TransportError::AuthExpired { status: 401 }),
            Some(Reply::Fail) => Err(TransportError::Api {
                status: 500,
                detail: "scripted failure".into(),
            }),
            None => Err(TransportError::Api {
                status: 599,
                detail: format!("unscripted request: {key}"),
            }),
        }
    }
}

/// [`CredentialExchange`] fake issuing numbered tokens, optionally failing.
pub struct CountingExchange {
    calls: Mutex<u32>,
    fail: bool,
}

impl CountingExchange {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(0),
            fail: true,
        }
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl CredentialExchange for CountingExchange {
    async fn exchange(&self) -> Result<Credential, AuthError> {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;
        if self.fail {
            return Err(AuthError::Rejected {
                status: 400,
                detail: "scripted rejection".into(),
            });
        }
        Ok(Credential {
            access_token: format!("token-{calls}"),
            token_type: "Bearer".into(),
        })
    }
}
