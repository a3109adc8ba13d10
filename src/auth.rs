// ABOUTME: Access credential type, caching provider and the credential-exchange capability seam
// ABOUTME: Staleness is detected reactively via 401/403, never from a local expiry timer
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Credentials
//!
//! [`CredentialProvider`] holds zero or one cached [`Credential`] and
//! re-acquires one through the [`CredentialExchange`] capability on demand.
//! There is no expiry tracking: the data API tells us a credential went
//! stale by answering 401/403, at which point the poller calls
//! [`CredentialProvider::invalidate`] and the next [`CredentialProvider::token`]
//! performs a fresh exchange. Exchange failure itself is fatal for the run.

use crate::errors::AuthError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Short-lived access token plus its type, as issued by the token endpoint.
#[derive(Debug, Clone)]
pub struct Credential {
    /// Opaque access token.
    pub access_token: String,
    /// Token type used to build the authorization header, e.g. `Bearer`.
    pub token_type: String,
}

impl Credential {
    /// Value for the `Authorization` request header.
    #[must_use]
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

/// Capability to obtain a fresh credential from the remote issuer.
#[async_trait]
pub trait CredentialExchange: Send + Sync {
    /// Perform one credential exchange.
    ///
    /// # Errors
    ///
    /// [`AuthError`] for any non-2xx answer or transport failure.
    async fn exchange(&self) -> Result<Credential, AuthError>;
}

/// Caching front for [`CredentialExchange`].
pub struct CredentialProvider {
    exchange: Arc<dyn CredentialExchange>,
    cached: Option<Credential>,
}

impl CredentialProvider {
    /// Wrap an exchange capability with an empty cache.
    #[must_use]
    pub fn new(exchange: Arc<dyn CredentialExchange>) -> Self {
        Self {
            exchange,
            cached: None,
        }
    }

    /// Return the cached credential, exchanging a fresh one first if the
    /// cache is empty.
    ///
    /// # Errors
    ///
    /// Propagates [`AuthError`] from the exchange; the caller treats this as
    /// fatal for the current run.
    pub async fn token(&mut self) -> Result<Credential, AuthError> {
        if let Some(credential) = &self.cached {
            return Ok(credential.clone());
        }
        info!("acquiring access credential");
        let credential = self.exchange.exchange().await?;
        self.cached = Some(credential.clone());
        Ok(credential)
    }

    /// Drop any cached credential, forcing the next [`Self::token`] to
    /// re-exchange. Called on 401/403 from the data API.
    pub fn invalidate(&mut self) {
        if self.cached.take().is_some() {
            debug!("cached credential invalidated");
        }
    }
}
