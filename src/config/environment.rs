// ABOUTME: Environment-based server configuration with fail-fast validation
// ABOUTME: Loads ports, the application base URL override, and provider credentials
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Server Configuration
//!
//! All configuration comes from environment variables and is loaded once
//! at startup. A malformed `APPLICATION_URL` is a fatal configuration
//! error raised here, at load time, so no request ever observes a
//! half-configured callback base.

use crate::errors::{AppError, AppResult};
use std::env;
use tracing::info;
use url::Url;

/// Default HTTP port when `HTTP_PORT` is not set
const DEFAULT_HTTP_PORT: u16 = 8080;

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,
    /// Optional base URL override for outbound callback URLs
    ///
    /// Set this when requests flow through a proxy that rewrites
    /// scheme/host/port; absent means "derive from the live request".
    pub application_url: Option<Url>,
    /// Where the default sign-in adapter redirects after login
    pub post_signin_url: String,
    /// Last.fm provider credentials, present when both env vars are set
    pub lastfm: Option<LastFmProviderConfig>,
    /// Generic OAuth2 fallback providers
    pub oauth2_providers: Vec<OAuth2ProviderConfig>,
}

/// Last.fm API credentials
#[derive(Debug, Clone)]
pub struct LastFmProviderConfig {
    pub api_key: String,
    pub api_secret: String,
}

/// Configuration for one generic OAuth2 provider
#[derive(Debug, Clone)]
pub struct OAuth2ProviderConfig {
    pub provider_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub scopes: Vec<String>,
}

impl ServerConfig {
    /// Load server configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `HTTP_PORT` is not a valid
    /// port number or `APPLICATION_URL` is not a well-formed URL.
    pub fn from_env() -> AppResult<Self> {
        let http_port = match env::var("HTTP_PORT") {
            Ok(value) => value.parse::<u16>().map_err(|e| {
                AppError::config_invalid(format!("HTTP_PORT is not a valid port: {e}"))
            })?,
            Err(_) => DEFAULT_HTTP_PORT,
        };

        let application_url = match env::var("APPLICATION_URL") {
            Ok(value) => Some(Url::parse(&value).map_err(|e| {
                AppError::config_invalid(format!("APPLICATION_URL is not a valid URL: {e}"))
            })?),
            Err(_) => None,
        };

        let post_signin_url = env::var("POST_SIGNIN_URL").unwrap_or_else(|_| "/".to_owned());

        let lastfm = Self::load_lastfm();
        let oauth2_providers = Self::load_oauth2_providers();

        Ok(Self {
            http_port,
            application_url,
            post_signin_url,
            lastfm,
            oauth2_providers,
        })
    }

    /// One-line configuration summary for startup logging
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "port={}, application_url={}, lastfm={}, oauth2_providers={}",
            self.http_port,
            self.application_url
                .as_ref()
                .map_or_else(|| "(derive from request)".to_owned(), ToString::to_string),
            if self.lastfm.is_some() {
                "enabled"
            } else {
                "disabled"
            },
            self.oauth2_providers.len()
        )
    }

    /// Last.fm credentials; the provider is enabled only when both the
    /// key and the secret are present
    fn load_lastfm() -> Option<LastFmProviderConfig> {
        let api_key = env::var("LASTFM_API_KEY").ok()?;
        let api_secret = env::var("LASTFM_API_SECRET").ok()?;
        Some(LastFmProviderConfig {
            api_key,
            api_secret,
        })
    }

    /// Load generic OAuth2 providers named in `SIGNIN_OAUTH2_PROVIDERS`
    ///
    /// For each provider id in the comma-separated list, credentials and
    /// endpoints come from `<ID>_CLIENT_ID`, `<ID>_CLIENT_SECRET`,
    /// `<ID>_AUTH_URL`, `<ID>_TOKEN_URL`, and `<ID>_SCOPES` (uppercased).
    /// Providers with incomplete configuration are skipped with a log
    /// line rather than failing startup.
    fn load_oauth2_providers() -> Vec<OAuth2ProviderConfig> {
        let Ok(list) = env::var("SIGNIN_OAUTH2_PROVIDERS") else {
            return Vec::new();
        };

        list.split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .filter_map(Self::load_oauth2_provider)
            .collect()
    }

    fn load_oauth2_provider(provider_id: &str) -> Option<OAuth2ProviderConfig> {
        let upper = provider_id.to_uppercase().replace('-', "_");

        let required = |suffix: &str| -> Option<String> {
            match env::var(format!("{upper}_{suffix}")) {
                Ok(value) if !value.is_empty() => Some(value),
                _ => {
                    info!(
                        provider = provider_id,
                        "Skipping OAuth2 provider: {upper}_{suffix} is missing"
                    );
                    None
                }
            }
        };

        let client_id = required("CLIENT_ID")?;
        let client_secret = required("CLIENT_SECRET")?;
        let auth_url = required("AUTH_URL")?;
        let token_url = required("TOKEN_URL")?;
        let scopes = env::var(format!("{upper}_SCOPES"))
            .map(|s| parse_scopes(&s))
            .unwrap_or_default();

        Some(OAuth2ProviderConfig {
            provider_id: provider_id.to_owned(),
            client_id,
            client_secret,
            auth_url,
            token_url,
            scopes,
        })
    }
}

/// Parse comma-separated scopes
#[must_use]
pub fn parse_scopes(scopes_str: &str) -> Vec<String> {
    scopes_str
        .split(',')
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .collect()
}
