// ABOUTME: Provider factories, the factory registry, and the connect-support seam
// ABOUTME: Centralizes everything needed to start and complete a provider sign-in handshake
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Connect Module
//!
//! Provider-facing half of the sign-in flow. A [`ConnectionFactory`] is a
//! tagged variant carrying the configuration for one registered provider;
//! the [`ConnectionFactoryRegistry`] resolves provider identifiers from
//! the URL path to factories. [`ConnectSupport`] is the seam behind which
//! the non-OAuth handshake (authorization URL construction and token
//! exchange) lives.
//!
//! Storing the specialized Last.fm factory together with its dispatch tag
//! makes the downcast failure mode of a class-based design
//! unrepresentable on the initiation path: handlers `match` on the
//! variant instead of checking runtime types.

pub mod lastfm;
pub mod oauth2;

pub use lastfm::{LastFmConnectSupport, LastFmConnectionFactory};
pub use oauth2::{OAuth2ConnectionFactory, OAuth2StateStore};

use crate::errors::{AppError, ErrorCode};
use crate::models::Connection;
use std::collections::HashMap;
use url::Url;

/// Errors raised while starting or completing a provider handshake
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("Provider not registered: {0}")]
    UnknownProvider(String),

    #[error("Failed to construct callback URL: {0}")]
    CallbackUrl(String),

    #[error("Provider request failed: {0}")]
    Http(String),

    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl From<ConnectError> for AppError {
    fn from(error: ConnectError) -> Self {
        let code = match &error {
            ConnectError::UnknownProvider(_) => ErrorCode::ResourceNotFound,
            ConnectError::CallbackUrl(_) => ErrorCode::InternalError,
            ConnectError::Http(_) => ErrorCode::ExternalServiceError,
            ConnectError::TokenExchangeFailed(_) => ErrorCode::ExternalAuthFailed,
            ConnectError::ConfigurationError(_) => ErrorCode::ConfigError,
        };
        Self::new(code, error.to_string()).with_source(error)
    }
}

/// Configuration for one registered provider, tagged by handshake scheme
///
/// The Last.fm variant holds the specialized factory used by the
/// non-OAuth handshake; every other provider goes through the generic
/// OAuth2 authorization-code flow.
#[derive(Debug, Clone)]
pub enum ConnectionFactory {
    /// Last.fm's proprietary token handshake
    LastFm(LastFmConnectionFactory),
    /// Standard OAuth2 authorization-code provider
    OAuth2(OAuth2ConnectionFactory),
}

impl ConnectionFactory {
    /// Provider key this factory is registered under
    #[must_use]
    pub fn provider_id(&self) -> &str {
        match self {
            Self::LastFm(factory) => factory.provider_id(),
            Self::OAuth2(factory) => factory.provider_id(),
        }
    }
}

/// Registry resolving provider identifiers to connection factories
///
/// Built once at startup and immutable afterwards; lookups are the only
/// operation performed per request.
#[derive(Debug, Default)]
pub struct ConnectionFactoryRegistry {
    factories: HashMap<String, ConnectionFactory>,
}

impl ConnectionFactoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a factory under its provider identifier
    pub fn register(&mut self, factory: ConnectionFactory) {
        let provider_id = factory.provider_id().to_owned();
        self.factories.insert(provider_id, factory);
    }

    /// Resolve a provider identifier to its factory
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::UnknownProvider`] when no factory is
    /// registered under the identifier.
    pub fn lookup(&self, provider_id: &str) -> Result<&ConnectionFactory, ConnectError> {
        self.factories
            .get(provider_id)
            .ok_or_else(|| ConnectError::UnknownProvider(provider_id.to_owned()))
    }

    /// List all registered provider identifiers
    #[must_use]
    pub fn provider_ids(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

/// Seam for the provider-specific parts of the non-OAuth handshake
///
/// The production implementation is [`LastFmConnectSupport`]; tests
/// substitute recording doubles to observe dispatch without touching the
/// network.
#[async_trait::async_trait]
pub trait ConnectSupport: Send + Sync {
    /// Build the provider authorization URL for a sign-in initiation
    ///
    /// `request_base` is the scheme/host derived from the live request;
    /// `application_url` is the configure-once override used when the
    /// deployment sits behind a proxy that rewrites scheme/host/port.
    ///
    /// # Errors
    ///
    /// Returns an error if the callback URL cannot be constructed from
    /// the chosen base.
    fn build_auth_url(
        &self,
        factory: &LastFmConnectionFactory,
        request_base: &Url,
        application_url: Option<&Url>,
    ) -> Result<String, ConnectError>;

    /// Exchange a callback token for a provider session
    ///
    /// # Errors
    ///
    /// Returns an error when the provider is unreachable or rejects the
    /// token; the router propagates these unchanged.
    async fn complete_connection(
        &self,
        factory: &LastFmConnectionFactory,
        token: &str,
    ) -> Result<Connection, ConnectError>;
}
