use thiserror::Error;

use crate::api::consumption::Granularity;

#[derive(Debug, Error)]
pub enum LinkyError {
    /// Bad credentials, or a session the portal no longer honours
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The portal answered with an `etat` error payload
    #[error("Portal error: {0}")]
    Service(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Hourly, daily and monthly queries need explicit bounds
    #[error("A date range is required for {0:?} consumption data")]
    MissingDateRange(Granularity),

    /// No HTTP response at all (connection refused, timeout, ...)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),
}
