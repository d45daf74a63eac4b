use crate::models::Identifier;
use crate::resolver::{IdentifierResolver, ResolveError, ResolveResult};
use async_trait::async_trait;
use moka::future::Cache;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Resolver wrapper that drops excluded URLs and memoizes successful lookups
///
/// The cache has no expiry: a URL is resolved at most once per instance.
/// Failures are not cached.
pub struct CachedResolver {
    /// Underlying resolver implementation
    inner: Arc<dyn IdentifierResolver>,
    /// URLs rejected before reaching the inner resolver
    excluded: HashSet<String>,
    /// Resolved identifiers keyed by URL
    cache: Cache<String, Arc<Vec<Identifier>>>,
}

impl CachedResolver {
    pub fn new(inner: Arc<dyn IdentifierResolver>, excluded: HashSet<String>) -> Self {
        Self {
            inner,
            excluded,
            cache: Cache::builder().build(),
        }
    }

    pub fn is_excluded(&self, url: &str) -> bool {
        self.excluded.contains(url)
    }
}

#[async_trait]
impl IdentifierResolver for CachedResolver {
    async fn resolve(&self, url: &str) -> ResolveResult<Vec<Identifier>> {
        if self.is_excluded(url) {
            debug!(url, "URL is excluded");
            return Err(ResolveError::Excluded);
        }

        if let Some(identifiers) = self.cache.get(url).await {
            return Ok(identifiers.as_ref().clone());
        }

        let identifiers = self.inner.resolve(url).await?;
        self.cache
            .insert(url.to_string(), Arc::new(identifiers.clone()))
            .await;

        Ok(identifiers)
    }
}
