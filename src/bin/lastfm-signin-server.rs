// ABOUTME: Server binary wiring configuration, providers, and routes together
// ABOUTME: Loads environment configuration, builds the registry, and serves the sign-in routes
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Sign-In Server Binary
//!
//! Loads configuration from the environment, registers the configured
//! providers, and serves the sign-in routes over HTTP.

use anyhow::Result;
use clap::Parser;
use lastfm_signin::{
    config::ServerConfig,
    connect::{
        ConnectionFactory, ConnectionFactoryRegistry, LastFmConnectSupport,
        LastFmConnectionFactory, OAuth2ConnectionFactory, OAuth2StateStore,
    },
    logging, routes,
    routes::SignInState,
    signin::{InMemoryConnectionRepository, RedirectSignInAdapter},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "lastfm-signin-server")]
#[command(about = "Social sign-in service for Last.fm's non-OAuth token handshake")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,
}

/// Provider key the Last.fm factory is registered under
const LASTFM_PROVIDER_ID: &str = "lastfm";

fn build_state(config: &ServerConfig) -> SignInState {
    let mut registry = ConnectionFactoryRegistry::new();

    if let Some(lastfm) = &config.lastfm {
        registry.register(ConnectionFactory::LastFm(LastFmConnectionFactory::new(
            LASTFM_PROVIDER_ID,
            &lastfm.api_key,
            &lastfm.api_secret,
        )));
        info!("Registered provider: {LASTFM_PROVIDER_ID}");
    }

    for provider in &config.oauth2_providers {
        registry.register(ConnectionFactory::OAuth2(OAuth2ConnectionFactory::new(
            &provider.provider_id,
            &provider.client_id,
            &provider.client_secret,
            &provider.auth_url,
            &provider.token_url,
            provider.scopes.clone(),
        )));
        info!("Registered provider: {}", provider.provider_id);
    }

    let http = reqwest::Client::new();
    let repository = Arc::new(InMemoryConnectionRepository::new());
    let sign_in = Arc::new(RedirectSignInAdapter::new(
        repository,
        config.post_signin_url.clone(),
    ));

    SignInState {
        registry: Arc::new(registry),
        connect_support: Arc::new(LastFmConnectSupport::new(http.clone())),
        sign_in,
        application_url: config.application_url.clone(),
        oauth_states: Arc::new(OAuth2StateStore::new()),
        http,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init_from_env()?;

    // Fail fast: a malformed APPLICATION_URL aborts startup here.
    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }

    info!("Starting Last.fm sign-in service");
    info!("{}", config.summary());

    let state = build_state(&config);
    let app = routes::app(state);

    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.http_port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
