use thiserror::Error;

use crate::models::Coordinate;
use crate::route::RawRoute;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("request timed out")]
    Timeout,
    #[error("generation service returned HTTP {code}")]
    Status { code: u16 },
    #[error("{0}")]
    Transport(String),
    #[error("generation service returned no text")]
    Empty,
    #[error("no generation service is configured")]
    Unavailable,
}

/// Remote generative-text service used for messages outside the local domain.
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectionsError {
    #[error("directions api rejected the request ({status}): {message}")]
    Api { status: String, message: String },
    #[error("directions service returned HTTP {code}")]
    Status { code: u16 },
    #[error("{0}")]
    Transport(String),
    #[error("directions response could not be parsed: {0}")]
    Malformed(String),
    #[error("no directions service is configured")]
    Unavailable,
}

/// Source of driving routes between two points, alternatives included.
pub trait DirectionsSource: Send + Sync {
    async fn fetch_routes(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<Vec<RawRoute>, DirectionsError>;
}
