// ABOUTME: Configuration module for server and provider settings
// ABOUTME: Environment-driven configuration loaded once at startup
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration management for the sign-in service

pub mod environment;

pub use environment::{LastFmProviderConfig, OAuth2ProviderConfig, ServerConfig};
