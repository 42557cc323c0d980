// ABOUTME: Connection data model linking a local account to a provider account
// ABOUTME: Created by connect support on successful token exchange, consumed by the sign-in adapter
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared data model for established provider connections

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An established link between a local application user and a remote
/// provider account.
///
/// A `Connection` is created only by connect support after a successful
/// token exchange. The router never mutates one; it is handed unmodified
/// to the sign-in adapter, which owns it from there on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Local identifier for this connection
    pub id: Uuid,
    /// Provider key this connection belongs to (e.g. `lastfm`)
    pub provider_id: String,
    /// The user's identifier on the provider side
    pub provider_user_id: String,
    /// Display name reported by the provider, when available
    pub display_name: Option<String>,
    /// Provider session key or access token
    pub secret: String,
    /// When the connection was established
    pub created_at: DateTime<Utc>,
}

impl Connection {
    /// Create a new connection for the given provider account
    #[must_use]
    pub fn new(
        provider_id: impl Into<String>,
        provider_user_id: impl Into<String>,
        display_name: Option<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            provider_id: provider_id.into(),
            provider_user_id: provider_user_id.into(),
            display_name,
            secret: secret.into(),
            created_at: Utc::now(),
        }
    }

    /// Storage key identifying the remote account this connection points at
    #[must_use]
    pub fn account_key(&self) -> String {
        format!("{}:{}", self.provider_id, self.provider_user_id)
    }
}
