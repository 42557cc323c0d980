// ABOUTME: Health check route for deployment probes
// ABOUTME: Reports service name and version with a 200 status
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Health check endpoint

use axum::{response::IntoResponse, routing::get, Json, Router};
use serde_json::json;

/// Health check routes
#[must_use]
pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
