// ABOUTME: Main library entry point for the Last.fm sign-in service
// ABOUTME: Adapts Last.fm's non-OAuth token handshake to a generic social sign-in flow
//
// SPDX-License-Identifier: MIT OR Apache-2.0

#![deny(unsafe_code)]

//! # Last.fm Sign-In Service
//!
//! A small HTTP service that adapts the Last.fm web-service API — whose
//! authentication handshake is neither OAuth1 nor OAuth2 — into a generic
//! "social sign-in" abstraction.
//!
//! The externally observable surface is one route handled for two verbs:
//!
//! - `POST /signin/{provider_id}` — initiate sign-in by redirecting the
//!   browser to the provider's authorization page.
//! - `GET /signin/{provider_id}?token=...` — receive the provider callback
//!   (only when the generic OAuth parameters `code` and `oauth_token` are
//!   absent), complete the token exchange, and hand the resulting
//!   connection to the sign-in adapter.
//!
//! ## Architecture
//!
//! - **connect**: provider factories, the factory registry, and the
//!   connect-support seam that builds authorization URLs and completes
//!   token exchanges
//! - **signin**: the sign-in adapter that finalizes application-level
//!   login once a connection exists, plus connection storage
//! - **routes**: thin axum handlers dispatching requests to the right
//!   collaborator
//! - **config**: environment-driven server configuration
//!
//! Provider dispatch is a tagged enum matched with `match`; the router
//! itself holds no mutable state across requests.

/// Environment configuration for the server and providers
pub mod config;

/// Provider factories, the factory registry, and connect support
pub mod connect;

/// Unified error handling with standard error codes and HTTP responses
pub mod errors;

/// Structured logging configuration
pub mod logging;

/// Connection data model shared across modules
pub mod models;

/// HTTP route handlers and router assembly
pub mod routes;

/// Sign-in completion and connection storage
pub mod signin;
