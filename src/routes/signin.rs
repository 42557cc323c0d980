// ABOUTME: Sign-in initiation and callback route handlers
// ABOUTME: Dispatches POST/GET /signin/:provider_id to the right provider flow
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Sign-In Routes
//!
//! Two operations on one route, both thin wrappers over collaborators:
//!
//! - `POST /signin/:provider_id` — resolve the provider factory; for the
//!   Last.fm variant, redirect to the URL built by connect support, else
//!   fall through to the generic OAuth2 initiation.
//! - `GET /signin/:provider_id` — the provider callback. Requests
//!   carrying `code` or `oauth_token` belong to the generic OAuth
//!   handling and never reach the token handler; requests carrying only
//!   `token` complete the non-OAuth connection and hand off to the
//!   sign-in adapter.
//!
//! The handlers hold no per-request state and perform no recovery;
//! collaborator failures propagate unchanged.

use crate::connect::{
    ConnectSupport, ConnectionFactory, ConnectionFactoryRegistry, OAuth2StateStore,
};
use crate::errors::{AppError, AppResult};
use crate::signin::SignInAdapter;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
    routing::post,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use url::Url;

/// Shared state for the sign-in routes
///
/// Everything here is built once at startup; the application URL
/// override is write-once, read-many, and the rest are shared handles.
#[derive(Clone)]
pub struct SignInState {
    /// Registry resolving provider identifiers to factories
    pub registry: Arc<ConnectionFactoryRegistry>,
    /// Connect support for the non-OAuth handshake
    pub connect_support: Arc<dyn ConnectSupport>,
    /// Sign-in completion adapter
    pub sign_in: Arc<dyn SignInAdapter>,
    /// Optional base URL override for outbound callback URLs
    pub application_url: Option<Url>,
    /// Issued OAuth2 `state` parameters awaiting their callback
    pub oauth_states: Arc<OAuth2StateStore>,
    /// HTTP client shared by the generic OAuth2 fallback
    pub http: reqwest::Client,
}

/// Query parameters a provider callback may carry
///
/// `code` signals an OAuth2 callback and `oauth_token` an OAuth1 one;
/// their presence excludes the request from the non-standard token
/// handler.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    token: Option<String>,
    code: Option<String>,
    oauth_token: Option<String>,
    /// Echo of the `state` value issued at OAuth2 initiation
    state: Option<String>,
}

/// Sign-in routes
#[must_use]
pub fn router(state: SignInState) -> Router {
    Router::new()
        .route(
            "/signin/:provider_id",
            post(initiate).get(complete_callback),
        )
        .with_state(state)
}

/// Process a sign-in form submission by commencing the connection
/// handshake on behalf of the user
///
/// For the Last.fm factory this redirects to the authorization URL the
/// connect support builds; every other factory falls through to the
/// generic OAuth2 initiation.
async fn initiate(
    State(state): State<SignInState>,
    Path(provider_id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let factory = state.registry.lookup(&provider_id)?;

    match factory {
        ConnectionFactory::LastFm(factory) => {
            // The live request is consulted only when no application URL
            // override is configured.
            let base = match &state.application_url {
                Some(url) => url.clone(),
                None => request_base(&headers)?,
            };
            let auth_url = state.connect_support.build_auth_url(
                factory,
                &base,
                state.application_url.as_ref(),
            )?;
            info!(provider = %provider_id, "Redirecting to Last.fm authorization page");
            Ok(Redirect::to(&auth_url).into_response())
        }
        ConnectionFactory::OAuth2(factory) => {
            let callback = callback_url(&state, &headers, &provider_id)?;
            let state_token = state.oauth_states.issue();
            let auth_url = factory.authorization_url(&callback, &state_token);
            info!(provider = %provider_id, "Redirecting to OAuth2 authorization page");
            Ok(Redirect::to(&auth_url).into_response())
        }
    }
}

/// Receive the provider authentication callback and establish the
/// connection
async fn complete_callback(
    State(state): State<SignInState>,
    Path(provider_id): Path<String>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
) -> AppResult<Response> {
    // Generic OAuth callbacks are excluded from the token handler by
    // parameter shape.
    if params.code.is_some() || params.oauth_token.is_some() {
        return oauth_callback(&state, &provider_id, &params, &headers).await;
    }

    let token = params
        .token
        .ok_or_else(|| AppError::invalid_input("missing token parameter"))?;

    let factory = state.registry.lookup(&provider_id)?;
    let ConnectionFactory::LastFm(factory) = factory else {
        // Only a registry/routing misconfiguration reaches this branch.
        return Err(AppError::internal(format!(
            "provider '{provider_id}' does not use the token callback"
        )));
    };

    let connection = state
        .connect_support
        .complete_connection(factory, &token)
        .await?;

    state.sign_in.sign_in(connection, &headers).await
}

/// Generic OAuth callback handling for non-Last.fm providers
async fn oauth_callback(
    state: &SignInState,
    provider_id: &str,
    params: &CallbackParams,
    headers: &HeaderMap,
) -> AppResult<Response> {
    if params.oauth_token.is_some() {
        return Err(AppError::invalid_input(
            "OAuth1 callbacks are not supported",
        ));
    }

    let Some(code) = params.code.as_deref() else {
        return Err(AppError::invalid_input("missing code parameter"));
    };

    // A callback must echo a state value this server issued; anything
    // else is treated as forged.
    let issued = params
        .state
        .as_deref()
        .is_some_and(|value| state.oauth_states.verify(value));
    if !issued {
        return Err(AppError::invalid_input("Invalid state parameter"));
    }

    let factory = state.registry.lookup(provider_id)?;
    let ConnectionFactory::OAuth2(factory) = factory else {
        return Err(AppError::invalid_input(format!(
            "provider '{provider_id}' does not use the OAuth2 code callback"
        )));
    };

    let callback = callback_url(state, headers, provider_id)?;
    let connection = factory.exchange_code(&state.http, code, &callback).await?;

    state.sign_in.sign_in(connection, headers).await
}

/// Scheme and host of the live request, honoring `X-Forwarded-Proto`
fn request_base(headers: &HeaderMap) -> AppResult<Url> {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::invalid_input("missing Host header"))?;

    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("http");

    Url::parse(&format!("{scheme}://{host}"))
        .map_err(|e| AppError::invalid_input(format!("invalid request host: {e}")))
}

/// Callback URL for a provider, honoring the application URL override
fn callback_url(state: &SignInState, headers: &HeaderMap, provider_id: &str) -> AppResult<Url> {
    let base = match &state.application_url {
        Some(url) => url.clone(),
        None => request_base(headers)?,
    };
    let callback = format!(
        "{}/signin/{provider_id}",
        base.as_str().trim_end_matches('/')
    );
    Url::parse(&callback)
        .map_err(|e| AppError::internal(format!("failed to construct callback URL: {e}")))
}
