// ABOUTME: Integration tests for environment-based server configuration
// ABOUTME: Validates defaults, fail-fast URL validation, and provider loading
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use lastfm_signin::config::ServerConfig;
use lastfm_signin::errors::ErrorCode;
use serial_test::serial;
use std::env;

fn clear_env() {
    for key in [
        "HTTP_PORT",
        "APPLICATION_URL",
        "POST_SIGNIN_URL",
        "LASTFM_API_KEY",
        "LASTFM_API_SECRET",
        "SIGNIN_OAUTH2_PROVIDERS",
        "SOUNDCLOUD_CLIENT_ID",
        "SOUNDCLOUD_CLIENT_SECRET",
        "SOUNDCLOUD_AUTH_URL",
        "SOUNDCLOUD_TOKEN_URL",
        "SOUNDCLOUD_SCOPES",
    ] {
        env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_defaults() {
    clear_env();

    let config = ServerConfig::from_env().unwrap();

    assert_eq!(config.http_port, 8080);
    assert!(config.application_url.is_none());
    assert_eq!(config.post_signin_url, "/");
    assert!(config.lastfm.is_none());
    assert!(config.oauth2_providers.is_empty());
}

#[test]
#[serial]
fn test_malformed_application_url_fails_at_load_time() {
    clear_env();
    env::set_var("APPLICATION_URL", "not a url");

    let error = ServerConfig::from_env().unwrap_err();

    assert_eq!(error.code, ErrorCode::ConfigInvalid);
    assert!(error.message.contains("APPLICATION_URL"));
    clear_env();
}

#[test]
#[serial]
fn test_application_url_override_is_parsed() {
    clear_env();
    env::set_var("APPLICATION_URL", "https://myapp.com");

    let config = ServerConfig::from_env().unwrap();

    assert_eq!(
        config.application_url.unwrap().as_str(),
        "https://myapp.com/"
    );
    clear_env();
}

#[test]
#[serial]
fn test_lastfm_requires_both_credentials() {
    clear_env();
    env::set_var("LASTFM_API_KEY", "key-only");

    let config = ServerConfig::from_env().unwrap();
    assert!(config.lastfm.is_none());

    env::set_var("LASTFM_API_SECRET", "secret");
    let config = ServerConfig::from_env().unwrap();
    let lastfm = config.lastfm.unwrap();
    assert_eq!(lastfm.api_key, "key-only");
    assert_eq!(lastfm.api_secret, "secret");
    clear_env();
}

#[test]
#[serial]
fn test_oauth2_provider_loading() {
    clear_env();
    env::set_var("SIGNIN_OAUTH2_PROVIDERS", "soundcloud");
    env::set_var("SOUNDCLOUD_CLIENT_ID", "client-123");
    env::set_var("SOUNDCLOUD_CLIENT_SECRET", "secret-456");
    env::set_var("SOUNDCLOUD_AUTH_URL", "https://provider.example/authorize");
    env::set_var("SOUNDCLOUD_TOKEN_URL", "https://provider.example/token");
    env::set_var("SOUNDCLOUD_SCOPES", "profile,listening");

    let config = ServerConfig::from_env().unwrap();

    assert_eq!(config.oauth2_providers.len(), 1);
    let provider = &config.oauth2_providers[0];
    assert_eq!(provider.provider_id, "soundcloud");
    assert_eq!(provider.scopes, vec!["profile", "listening"]);
    clear_env();
}

#[test]
#[serial]
fn test_incomplete_oauth2_provider_is_skipped() {
    clear_env();
    env::set_var("SIGNIN_OAUTH2_PROVIDERS", "soundcloud");
    env::set_var("SOUNDCLOUD_CLIENT_ID", "client-123");

    let config = ServerConfig::from_env().unwrap();

    assert!(config.oauth2_providers.is_empty());
    clear_env();
}

#[test]
#[serial]
fn test_http_port_parsing() {
    clear_env();
    env::set_var("HTTP_PORT", "9000");
    let config = ServerConfig::from_env().unwrap();
    assert_eq!(config.http_port, 9000);

    env::set_var("HTTP_PORT", "not-a-port");
    let error = ServerConfig::from_env().unwrap_err();
    assert_eq!(error.code, ErrorCode::ConfigInvalid);
    clear_env();
}
