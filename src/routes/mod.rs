// ABOUTME: Route module organization and top-level router assembly
// ABOUTME: Merges the sign-in routes with the health surface and tracing middleware
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Route definitions for the sign-in service

/// Health check route
pub mod health;
/// Sign-in initiation and callback routes
pub mod signin;

pub use signin::SignInState;

use axum::Router;
use tower_http::trace::TraceLayer;

/// Assemble the full application router
#[must_use]
pub fn app(state: SignInState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(signin::router(state))
        .layer(TraceLayer::new_for_http())
}
