use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {0}")]
    InvalidVar(&'static str),
}

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// DynamoDB table holding task records
    pub table_name: String,
    /// S3 bucket holding attachment blobs
    pub bucket_name: String,
    /// URL of the token issuer's JWKS document
    pub jwks_url: String,
    /// Lifetime of signed upload URLs, in seconds
    pub signed_url_expiration: u64,
    /// Optional endpoint override for local stacks
    pub endpoint_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            table_name: require("TASKS_TABLE")?,
            bucket_name: require("ATTACHMENTS_BUCKET")?,
            jwks_url: require("JWKS_URL")?,
            signed_url_expiration: match env::var("SIGNED_URL_EXPIRATION") {
                Ok(raw) => raw
                    .parse()
                    .map_err(|_| ConfigError::InvalidVar("SIGNED_URL_EXPIRATION"))?,
                Err(_) => 300,
            },
            endpoint_url: env::var("AWS_ENDPOINT_URL").ok(),
        })
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVar(name))
}
