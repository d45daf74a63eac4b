use crate::models::Identifier;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The URL is on the exclusion list; callers drop the line silently
    #[error("URL is excluded")]
    Excluded,
    #[error("No identifiers found")]
    NotFound,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type ResolveResult<T> = Result<T, ResolveError>;

#[async_trait]
pub trait IdentifierResolver: Send + Sync {
    /// Resolve a URL to one or more canonical content identifiers
    async fn resolve(&self, url: &str) -> ResolveResult<Vec<Identifier>>;
}
