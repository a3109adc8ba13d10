// ABOUTME: Poller binary: environment configuration, shared HTTP client, one run, exit code
// ABOUTME: Records stream to stdout; diagnostics go to stderr through tracing
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # pingpoll binary
//!
//! Runs one reconcile/drain cycle and exits. Re-invocation on a schedule
//! (cron, a Splunk scripted input, systemd timer) is the caller's job.
//! Configuration comes exclusively from `PINGPOLL_*` environment variables;
//! there are no command-line flags.

use anyhow::Result;
use chrono::Utc;
use pingpoll::{
    logging, CredentialProvider, FileStore, PingOneClient, Poller, PollerConfig, RecordSink,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Per-request timeout for token and page calls.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Connection establishment timeout.
const CONNECT_TIMEOUT_SECS: u64 = 10;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_from_env()?;

    let config = PollerConfig::from_env()?;
    info!("starting activity poll: {}", config.summary());

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .build()?;

    let client = Arc::new(PingOneClient::new(http, &config)?);
    let store = Arc::new(FileStore::new(&config.ledger_path));
    let credentials = CredentialProvider::new(client.clone());

    let mut poller = Poller::new(
        client,
        credentials,
        store,
        config.lookback_minutes,
        config.page_limit,
    );

    let mut sink = RecordSink::new(tokio::io::stdout());
    if let Err(err) = poller.run(&mut sink, Utc::now()).await {
        error!(error = %err, "run aborted");
        return Err(err.into());
    }
    Ok(())
}
