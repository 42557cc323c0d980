// ABOUTME: Sign-in completion adapter and connection storage
// ABOUTME: Finalizes application-level login once a provider connection exists
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Sign-In Completion
//!
//! Once connect support has produced a [`Connection`], the router hands
//! it to a [`SignInAdapter`] and returns whatever the adapter returns;
//! the post-login response is opaque to the routing layer. The default
//! adapter persists the connection and redirects to the configured
//! post-sign-in URL.

use crate::errors::AppResult;
use crate::models::Connection;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

/// Storage seam for established connections
///
/// Storage design is out of scope for this service; the in-memory
/// implementation below is what the default adapter and the tests use,
/// and real deployments substitute their own backend.
#[async_trait::async_trait]
pub trait ConnectionRepository: Send + Sync {
    /// Persist a connection, replacing any previous connection for the
    /// same provider account
    async fn save(&self, connection: Connection) -> AppResult<()>;

    /// Look up the connection for a provider account
    async fn find(
        &self,
        provider_id: &str,
        provider_user_id: &str,
    ) -> AppResult<Option<Connection>>;
}

/// Concurrent in-memory connection store
#[derive(Debug, Default)]
pub struct InMemoryConnectionRepository {
    connections: DashMap<String, Connection>,
}

impl InMemoryConnectionRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }
}

#[async_trait::async_trait]
impl ConnectionRepository for InMemoryConnectionRepository {
    async fn save(&self, connection: Connection) -> AppResult<()> {
        self.connections
            .insert(connection.account_key(), connection);
        Ok(())
    }

    async fn find(
        &self,
        provider_id: &str,
        provider_user_id: &str,
    ) -> AppResult<Option<Connection>> {
        let key = format!("{provider_id}:{provider_user_id}");
        Ok(self.connections.get(&key).map(|entry| entry.value().clone()))
    }
}

/// Application-specific logic finalizing a user session once a
/// connection exists
///
/// The router passes the connection onward unmodified and returns the
/// adapter's response as-is.
#[async_trait::async_trait]
pub trait SignInAdapter: Send + Sync {
    /// Finalize application-level login for the given connection
    async fn sign_in(&self, connection: Connection, headers: &HeaderMap) -> AppResult<Response>;
}

/// Default adapter: persist the connection and redirect to the
/// configured post-sign-in URL
pub struct RedirectSignInAdapter {
    repository: Arc<dyn ConnectionRepository>,
    post_signin_url: String,
}

impl RedirectSignInAdapter {
    #[must_use]
    pub fn new(repository: Arc<dyn ConnectionRepository>, post_signin_url: impl Into<String>) -> Self {
        Self {
            repository,
            post_signin_url: post_signin_url.into(),
        }
    }
}

#[async_trait::async_trait]
impl SignInAdapter for RedirectSignInAdapter {
    async fn sign_in(&self, connection: Connection, _headers: &HeaderMap) -> AppResult<Response> {
        info!(
            provider = %connection.provider_id,
            user = %connection.provider_user_id,
            "Completing sign-in"
        );
        self.repository.save(connection).await?;
        Ok(Redirect::to(&self.post_signin_url).into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn connection() -> Connection {
        Connection::new("lastfm", "some-listener", None, "session-key")
    }

    #[tokio::test]
    async fn test_repository_save_and_find() {
        let repository = InMemoryConnectionRepository::new();
        let original = connection();
        repository.save(original.clone()).await.unwrap();

        let found = repository.find("lastfm", "some-listener").await.unwrap();
        assert_eq!(found, Some(original));

        let missing = repository.find("lastfm", "other-listener").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_redirect_adapter_persists_and_redirects() {
        let repository = Arc::new(InMemoryConnectionRepository::new());
        let adapter = RedirectSignInAdapter::new(repository.clone(), "/welcome");

        let response = adapter
            .sign_in(connection(), &HeaderMap::new())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get("location").unwrap(),
            "/welcome"
        );
        assert!(repository
            .find("lastfm", "some-listener")
            .await
            .unwrap()
            .is_some());
    }
}
