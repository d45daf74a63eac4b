//! Authentication against the token service
//!
//! The pipeline authenticates once at startup; the token is then attached
//! as a bearer credential to every identifier-resolution call.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use jsonwebtoken::decode_header;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AuthConfig;

#[derive(Clone)]
pub struct AuthClient {
    endpoint: String,
    user: String,
    password: String,
    client: Client,
}

impl AuthClient {
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("readership/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client for authentication")?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            user: config.user.clone(),
            password: config.password.clone(),
            client,
        })
    }

    /// Exchange the configured credentials for a bearer token
    pub async fn fetch_token(&self) -> Result<String> {
        let response: TokenResponse = self
            .client
            .post(&self.endpoint)
            .json(&Credentials {
                email: &self.user,
                password: &self.password,
            })
            .send()
            .await
            .context("failed to request authentication token")?
            .error_for_status()
            .context("authentication endpoint returned an error status")?
            .json()
            .await
            .context("failed to parse authentication response")?;

        let token = extract_token(response)?;

        let header = decode_header(&token).context("authentication service returned a malformed token")?;
        debug!(alg = ?header.alg, "obtained authentication token");

        Ok(token)
    }
}

fn extract_token(response: TokenResponse) -> Result<String> {
    response
        .data
        .into_iter()
        .next()
        .map(|entry| entry.token)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| anyhow!("authentication response did not include a token"))
}

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    data: Vec<TokenEntry>,
}

#[derive(Debug, Deserialize)]
struct TokenEntry {
    token: String,
}
