// ABOUTME: PingOne API client implementing the credential-exchange and page-transport capabilities
// ABOUTME: Client-credentials grant against the auth host, filtered activity pages against the API host
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # PingOne Client
//!
//! Concrete transport for both capability seams. The credential exchange
//! POSTs a `client_credentials` grant to
//! `{auth_base}/{environment_id}/as/token`; activity pages are fetched from
//! `{api_base}/environments/{environment_id}/activities` with a `createdat`
//! range filter on the first page and the server-provided `_links.next.href`
//! URL verbatim on every following page.

use crate::auth::{Credential, CredentialExchange};
use crate::config::PollerConfig;
use crate::errors::{AuthError, TransportError};
use crate::fetch::{ActivityPage, ActivityRecord, PageCursor, PageRequest, PageTransport};
use crate::window::{format_timestamp, TimeRange};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

/// OAuth scope required to read environment activity data.
const ACTIVITY_SCOPE: &str = "p1:read:env:activity";

/// Token endpoint response format.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
}

/// Activity page envelope: records under `_embedded.activities`, the
/// continuation locator under `_links.next.href`.
#[derive(Debug, Deserialize)]
struct PageEnvelope {
    #[serde(rename = "_embedded", default)]
    embedded: Embedded,
    #[serde(rename = "_links", default)]
    links: Links,
}

#[derive(Debug, Deserialize, Default)]
struct Embedded {
    #[serde(default)]
    activities: Vec<ActivityRecord>,
}

#[derive(Debug, Deserialize, Default)]
struct Links {
    next: Option<Link>,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
}

/// HTTP client for one PingOne environment.
pub struct PingOneClient {
    http: Client,
    environment_id: String,
    client_id: String,
    client_secret: String,
    token_url: Url,
    activities_url: Url,
}

impl PingOneClient {
    /// Build a client from configuration and a shared HTTP client.
    ///
    /// # Errors
    ///
    /// Fails when the configured base URLs do not parse.
    pub fn new(http: Client, config: &PollerConfig) -> Result<Self, url::ParseError> {
        let token_url = Url::parse(&format!(
            "{}/{}/as/token",
            config.auth_base_url.trim_end_matches('/'),
            config.environment_id
        ))?;
        let activities_url = Url::parse(&format!(
            "{}/environments/{}/activities",
            config.api_base_url.trim_end_matches('/'),
            config.environment_id
        ))?;
        Ok(Self {
            http,
            environment_id: config.environment_id.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token_url,
            activities_url,
        })
    }

    /// Environment this client is scoped to.
    #[must_use]
    pub fn environment_id(&self) -> &str {
        &self.environment_id
    }

    fn window_url(&self, range: &TimeRange, limit: u32) -> Url {
        let filter = format!(
            r#"createdat ge "{}" and createdat le "{}""#,
            format_timestamp(range.start()),
            format_timestamp(range.end())
        );
        let mut url = self.activities_url.clone();
        url.query_pairs_mut()
            .append_pair("filter", &filter)
            .append_pair("limit", &limit.to_string());
        url
    }
}

#[async_trait]
impl CredentialExchange for PingOneClient {
    async fn exchange(&self) -> Result<Credential, AuthError> {
        let params = [
            ("grant_type", "client_credentials"),
            ("scope", ACTIVITY_SCOPE),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(self.token_url.clone())
            .form(&params)
            .send()
            .await
            .map_err(AuthError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        let token: TokenResponse = response.json().await.map_err(AuthError::Transport)?;
        Ok(Credential {
            access_token: token.access_token,
            token_type: token.token_type,
        })
    }
}

#[async_trait]
impl PageTransport for PingOneClient {
    async fn fetch_page(
        &self,
        request: &PageRequest,
        credential: &Credential,
    ) -> Result<ActivityPage, TransportError> {
        let url = match request {
            PageRequest::Window { range, limit } => self.window_url(range, *limit),
            PageRequest::Next(cursor) => Url::parse(cursor.as_str())?,
        };

        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, credential.authorization_header())
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(TransportError::AuthExpired {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(TransportError::Api {
                status: status.as_u16(),
                detail,
            });
        }

        let envelope: PageEnvelope = response.json().await?;
        Ok(ActivityPage {
            records: envelope.embedded.activities,
            next: envelope.links.next.map(|link| PageCursor::new(link.href)),
        })
    }
}
