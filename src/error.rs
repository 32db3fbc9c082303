//! Error types for `StreetScout`

use thiserror::Error;

/// Error type for all `StreetScout` operations, one variant per failure
/// class so callers can tell an unreachable network from a bad token from
/// an undecodable image.
#[derive(Error, Debug)]
pub enum StreetScoutError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limit error: {0}")]
    RateLimit(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Image decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, StreetScoutError>;
