use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use crate::config::ResolverConfig;
use crate::models::Identifier;
use crate::resolver::{IdentifierResolver, ResolveError, ResolveResult};

/// Identifier resolver backed by the remote translation service
pub struct HttpResolver {
    endpoint: Url,
    scheme: String,
    strict: bool,
    token: String,
    client: Client,
}

impl HttpResolver {
    pub fn from_config(config: &ResolverConfig, token: String) -> anyhow::Result<Self> {
        let endpoint = Url::parse(&config.endpoint)
            .with_context(|| format!("invalid identifier resolution endpoint '{}'", config.endpoint))?;

        let client = Client::builder()
            .user_agent(concat!("readership/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client for identifier resolution")?;

        Ok(Self {
            endpoint,
            scheme: config.scheme.clone(),
            strict: config.strict,
            token,
            client,
        })
    }

    fn request_url(&self, url: &str) -> Url {
        let mut request_url = self.endpoint.clone();
        request_url
            .query_pairs_mut()
            .append_pair("uri", url)
            .append_pair("filter", &format!("uri_scheme:{}", self.scheme))
            .append_pair("strict", if self.strict { "true" } else { "false" });
        request_url
    }
}

#[async_trait]
impl IdentifierResolver for HttpResolver {
    async fn resolve(&self, url: &str) -> ResolveResult<Vec<Identifier>> {
        debug!(url, "resolving identifiers");

        let response = self
            .client
            .get(self.request_url(url))
            .bearer_auth(&self.token)
            .send()
            .await
            .context("failed to request identifiers")?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ResolveError::NotFound);
        }

        let body: TranslationResponse = response
            .error_for_status()
            .context("identifier resolution endpoint returned an error status")?
            .json()
            .await
            .context("failed to parse identifier resolution response")?;

        if body.data.is_empty() {
            return Err(ResolveError::NotFound);
        }

        Ok(body.data)
    }
}

#[derive(Debug, Deserialize)]
struct TranslationResponse {
    #[serde(default)]
    data: Vec<Identifier>,
}
