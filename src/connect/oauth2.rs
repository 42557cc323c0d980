// ABOUTME: Generic OAuth2 authorization-code connection factory used by the fallback paths
// ABOUTME: Builds standard authorize URLs and exchanges callback codes for connections
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Generic OAuth2 Fallback
//!
//! Every registered provider that is not Last.fm goes through the
//! standard authorization-code flow implemented here. This is the
//! generic sign-in behavior the router falls through to when the
//! factory variant is not the non-standard one.

use super::ConnectError;
use crate::models::Connection;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

/// How long an issued `state` parameter stays valid
const STATE_TTL_MINUTES: i64 = 10;

/// Issued `state` parameters awaiting their callback
///
/// Each initiation stores the `state` value it sent to the provider;
/// the code callback must present a stored value or it is rejected as
/// forged. Entries are consumed on verification and expire after ten
/// minutes.
#[derive(Debug, Default)]
pub struct OAuth2StateStore {
    states: DashMap<String, DateTime<Utc>>,
}

impl OAuth2StateStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            states: DashMap::new(),
        }
    }

    /// Issue a fresh `state` value for an authorization redirect
    #[must_use]
    pub fn issue(&self) -> String {
        let state = Uuid::new_v4().to_string();
        self.states
            .insert(state.clone(), Utc::now() + Duration::minutes(STATE_TTL_MINUTES));
        state
    }

    /// Verify and consume a callback `state` value
    ///
    /// Returns `false` for values that were never issued, were already
    /// consumed, or have expired.
    #[must_use]
    pub fn verify(&self, state: &str) -> bool {
        match self.states.remove(state) {
            Some((_, expires_at)) if Utc::now() <= expires_at => true,
            Some(_) => {
                warn!("Rejecting expired OAuth2 state parameter");
                false
            }
            None => false,
        }
    }
}

/// Factory for a standard OAuth2 authorization-code provider
#[derive(Debug, Clone)]
pub struct OAuth2ConnectionFactory {
    provider_id: String,
    client_id: String,
    client_secret: String,
    auth_url: String,
    token_url: String,
    scopes: Vec<String>,
}

/// Token endpoint response
///
/// `user_id` is non-standard but returned by several providers; when it
/// is absent the connection gets a locally generated account identifier.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    user_name: Option<String>,
}

impl OAuth2ConnectionFactory {
    /// Create a factory for the given provider key and OAuth2 endpoints
    #[must_use]
    pub fn new(
        provider_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        auth_url: impl Into<String>,
        token_url: impl Into<String>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_url: auth_url.into(),
            token_url: token_url.into(),
            scopes,
        }
    }

    /// Provider key this factory is registered under
    #[must_use]
    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// Build the provider authorization URL for a sign-in initiation
    #[must_use]
    pub fn authorization_url(&self, callback: &Url, state: &str) -> String {
        let scope = self.scopes.join(" ");
        debug!(
            provider = %self.provider_id,
            callback = callback.as_str(),
            "Building OAuth2 authorization URL"
        );
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(callback.as_str()),
            urlencoding::encode(&scope),
            urlencoding::encode(state)
        )
    }

    /// Exchange an authorization code for a connection
    ///
    /// # Errors
    ///
    /// Returns an error when the token endpoint is unreachable or rejects
    /// the code.
    pub async fn exchange_code(
        &self,
        http: &reqwest::Client,
        code: &str,
        callback: &Url,
    ) -> Result<Connection, ConnectError> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", callback.as_str()),
        ];

        let response = http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| ConnectError::Http(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| ConnectError::Http(e.to_string()))?;

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| ConnectError::TokenExchangeFailed(format!("Parse error: {e}")))?;

        let provider_user_id = token
            .user_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        info!(
            provider = %self.provider_id,
            user = %provider_user_id,
            "Exchanged authorization code for access token"
        );

        Ok(Connection::new(
            &self.provider_id,
            provider_user_id,
            token.user_name,
            token.access_token,
        ))
    }
}
