// ABOUTME: Last.fm connection factory and connect support for the non-OAuth token handshake
// ABOUTME: Builds the authorization URL and exchanges callback tokens for sessions
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Last.fm Connect Support
//!
//! Last.fm's web-service authentication is neither OAuth1 nor OAuth2: the
//! user is sent to an authorization page with only an API key and a
//! callback (`cb`) parameter, and the provider calls back with a `token`
//! query parameter. The token is then exchanged for a session through
//! `auth.getSession`, signed with the md5 parameter signature the API
//! documents.

use super::{ConnectError, ConnectSupport};
use crate::models::Connection;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

/// Last.fm authorization page
const LASTFM_AUTH_URL: &str = "https://www.last.fm/api/auth/";

/// Last.fm web-service root
const LASTFM_WS_ROOT: &str = "https://ws.audioscrobbler.com/2.0/";

/// Factory holding the credentials for one registered Last.fm provider
#[derive(Debug, Clone)]
pub struct LastFmConnectionFactory {
    provider_id: String,
    api_key: String,
    api_secret: String,
}

impl LastFmConnectionFactory {
    /// Create a factory for the given provider key and API credentials
    #[must_use]
    pub fn new(
        provider_id: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Provider key this factory is registered under
    #[must_use]
    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// API key sent to the authorization page and the web service
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

/// `auth.getSession` response envelope
///
/// Errors come back as `{"error": N, "message": "..."}` on HTTP 200, so
/// both shapes are parsed from the same body.
#[derive(Debug, Deserialize)]
struct SessionEnvelope {
    session: Option<LastFmSession>,
    error: Option<i64>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LastFmSession {
    name: String,
    key: String,
}

/// Production connect support talking to the Last.fm web service
pub struct LastFmConnectSupport {
    http: reqwest::Client,
}

impl LastFmConnectSupport {
    #[must_use]
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Callback URL the provider redirects back to after authorization
    ///
    /// Prefers the configured application URL override; otherwise the
    /// base derived from the live request is used. The base's own path is
    /// preserved so deployments under a sub-path keep working.
    fn callback_url(
        factory: &LastFmConnectionFactory,
        request_base: &Url,
        application_url: Option<&Url>,
    ) -> Result<Url, ConnectError> {
        let base = application_url.unwrap_or(request_base);
        let callback = format!(
            "{}/signin/{}",
            base.as_str().trim_end_matches('/'),
            factory.provider_id()
        );
        Url::parse(&callback).map_err(|e| ConnectError::CallbackUrl(e.to_string()))
    }

    /// md5 parameter signature for an `auth.getSession` call
    ///
    /// Parameters are concatenated name-then-value in alphabetical order,
    /// followed by the shared secret.
    fn session_signature(factory: &LastFmConnectionFactory, token: &str) -> String {
        let material = format!(
            "api_key{}methodauth.getSessiontoken{}{}",
            factory.api_key, token, factory.api_secret
        );
        format!("{:x}", md5::compute(material.as_bytes()))
    }
}

#[async_trait::async_trait]
impl ConnectSupport for LastFmConnectSupport {
    fn build_auth_url(
        &self,
        factory: &LastFmConnectionFactory,
        request_base: &Url,
        application_url: Option<&Url>,
    ) -> Result<String, ConnectError> {
        let callback = Self::callback_url(factory, request_base, application_url)?;
        debug!(
            provider = factory.provider_id(),
            callback = callback.as_str(),
            "Building Last.fm authorization URL"
        );
        Ok(format!(
            "{LASTFM_AUTH_URL}?api_key={}&cb={}",
            urlencoding::encode(factory.api_key()),
            urlencoding::encode(callback.as_str())
        ))
    }

    async fn complete_connection(
        &self,
        factory: &LastFmConnectionFactory,
        token: &str,
    ) -> Result<Connection, ConnectError> {
        let api_sig = Self::session_signature(factory, token);
        let url = format!(
            "{LASTFM_WS_ROOT}?method=auth.getSession&api_key={}&token={}&api_sig={}&format=json",
            urlencoding::encode(factory.api_key()),
            urlencoding::encode(token),
            api_sig
        );

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ConnectError::Http(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| ConnectError::Http(e.to_string()))?;

        let envelope: SessionEnvelope = serde_json::from_str(&body)
            .map_err(|e| ConnectError::TokenExchangeFailed(format!("Parse error: {e}")))?;

        let session = envelope.session.ok_or_else(|| {
            let code = envelope.error.unwrap_or(-1);
            let message = envelope
                .message
                .unwrap_or_else(|| "provider returned no session".to_owned());
            ConnectError::TokenExchangeFailed(format!("error {code}: {message}"))
        })?;

        info!(
            provider = factory.provider_id(),
            user = %session.name,
            "Established Last.fm session"
        );

        Ok(Connection::new(
            factory.provider_id(),
            session.name.clone(),
            Some(session.name),
            session.key,
        ))
    }
}
