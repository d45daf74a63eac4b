pub mod cached;
pub mod http;
pub mod trait_def;

pub use cached::CachedResolver;
pub use http::HttpResolver;
pub use trait_def::{IdentifierResolver, ResolveError, ResolveResult};
