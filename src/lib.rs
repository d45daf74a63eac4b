pub mod analytics;
pub mod auth;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod resolver;
