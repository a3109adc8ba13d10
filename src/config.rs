// ABOUTME: Environment-based poller configuration with validation and a redacted startup summary
// ABOUTME: No config files and no CLI flags; everything is injected through PINGPOLL_* variables
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Environment-only configuration for the poller.

use crate::window::DEFAULT_LOOKBACK_MINUTES;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Default ledger blob location, relative to the working directory.
pub const DEFAULT_LEDGER_PATH: &str = "status.json";

/// Default page-size limit sent with the first page request.
pub const DEFAULT_PAGE_LIMIT: u32 = 500;

/// Largest page size the activity endpoint accepts.
pub const MAX_PAGE_LIMIT: u32 = 500;

/// Default authorization host.
pub const DEFAULT_AUTH_BASE_URL: &str = "https://auth.pingone.com";

/// Default data API base, including the version segment.
pub const DEFAULT_API_BASE_URL: &str = "https://api.pingone.com/v1";

/// Runtime configuration for one poller invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    /// PingOne environment whose activity data is harvested.
    pub environment_id: String,
    /// Worker application client id.
    pub client_id: String,
    /// Worker application client secret.
    pub client_secret: String,
    /// Location of the persisted checkpoint ledger.
    pub ledger_path: PathBuf,
    /// Lookback window used when the ledger carries no history.
    pub lookback_minutes: u32,
    /// Page-size limit for activity requests, clamped to the endpoint maximum.
    pub page_limit: u32,
    /// Authorization host; override for non-default PingOne regions.
    pub auth_base_url: String,
    /// Data API base; override for non-default PingOne regions.
    pub api_base_url: String,
}

impl PollerConfig {
    /// Load configuration from `PINGPOLL_*` environment variables.
    ///
    /// # Errors
    ///
    /// Fails when a required variable is absent or empty, or when a numeric
    /// variable does not parse.
    pub fn from_env() -> Result<Self> {
        let environment_id = required("PINGPOLL_ENVIRONMENT_ID")?;
        let client_id = required("PINGPOLL_CLIENT_ID")?;
        let client_secret = required("PINGPOLL_CLIENT_SECRET")?;

        let ledger_path = env::var("PINGPOLL_LEDGER_PATH")
            .unwrap_or_else(|_| DEFAULT_LEDGER_PATH.into())
            .into();

        let lookback_minutes = parsed("PINGPOLL_LOOKBACK_MINUTES", DEFAULT_LOOKBACK_MINUTES)?;
        anyhow::ensure!(
            lookback_minutes >= 1,
            "PINGPOLL_LOOKBACK_MINUTES must be at least 1"
        );

        let page_limit: u32 = parsed("PINGPOLL_PAGE_LIMIT", DEFAULT_PAGE_LIMIT)?;
        let page_limit = page_limit.clamp(1, MAX_PAGE_LIMIT);

        let auth_base_url =
            env::var("PINGPOLL_AUTH_BASE_URL").unwrap_or_else(|_| DEFAULT_AUTH_BASE_URL.into());
        let api_base_url =
            env::var("PINGPOLL_API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.into());

        Ok(Self {
            environment_id,
            client_id,
            client_secret,
            ledger_path,
            lookback_minutes,
            page_limit,
            auth_base_url,
            api_base_url,
        })
    }

    /// One-line description for startup logs. The client secret is redacted.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "environment={} client_id={} ledger={} lookback={}m page_limit={} api={}",
            self.environment_id,
            self.client_id,
            self.ledger_path.display(),
            self.lookback_minutes,
            self.page_limit,
            self.api_base_url
        )
    }
}

fn required(name: &str) -> Result<String> {
    let value = env::var(name).with_context(|| format!("{name} is not set"))?;
    anyhow::ensure!(!value.trim().is_empty(), "{name} is empty");
    Ok(value)
}

fn parsed<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{name} is not a valid number: {raw}")),
        Err(_) => Ok(default),
    }
}
