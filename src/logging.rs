// ABOUTME: Structured logging setup over tracing-subscriber with env-driven level and format
// ABOUTME: Pretty output for development, JSON for production log pipelines
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Logging initialization for the poller binary.

use anyhow::Result;
use std::env;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format options.
#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    /// Human-readable format for development.
    Pretty,
    /// JSON lines for production log pipelines.
    Json,
    /// Single-line format for space-constrained environments.
    Compact,
}

impl LogFormat {
    fn from_env() -> Self {
        match env::var("PINGPOLL_LOG_FORMAT").as_deref() {
            Ok("json") => Self::Json,
            Ok("compact") => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

/// Initialize the global tracing subscriber from the environment.
///
/// `RUST_LOG` controls the filter (defaulting to `info` with HTTP-stack
/// noise reduced), `PINGPOLL_LOG_FORMAT` selects the output format.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_from_env() -> Result<()> {
    let filter = env::var("RUST_LOG")
        .map_or_else(|_| EnvFilter::new("info"), EnvFilter::new)
        .add_directive(
            "hyper=warn"
                .parse()
                .unwrap_or_else(|_| tracing::Level::WARN.into()),
        )
        .add_directive(
            "reqwest=warn"
                .parse()
                .unwrap_or_else(|_| tracing::Level::WARN.into()),
        );

    let registry = tracing_subscriber::registry().with(filter);
    match LogFormat::from_env() {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init()?,
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init()?,
        LogFormat::Pretty => registry.with(fmt::layer()).try_init()?,
    }
    Ok(())
}
