use raksha_core::{
    Coordinate, DirectionsError, DirectionsSource, GenerationError, RawRoute, TextGenerator,
};
use raksha_remote::{DirectionsClient, GeminiClient, GeminiConfig, MapsConfig, RemoteError};

/// The generative-text backend picked at startup.
#[derive(Debug, Clone)]
pub enum Generator {
    Gemini(GeminiClient),
    Offline,
}

impl Generator {
    pub fn from_config(config: Option<GeminiConfig>) -> Result<Self, RemoteError> {
        match config {
            Some(config) => Ok(Self::Gemini(GeminiClient::new(config)?)),
            None => Ok(Self::Offline),
        }
    }

    pub fn from_env() -> Result<Self, RemoteError> {
        Self::from_config(GeminiConfig::from_env())
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, Self::Gemini(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Gemini(_) => "gemini",
            Self::Offline => "offline",
        }
    }
}

impl TextGenerator for Generator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        match self {
            Self::Gemini(client) => client.generate(prompt).await,
            Self::Offline => Err(GenerationError::Unavailable),
        }
    }
}

/// The directions backend picked at startup.
#[derive(Debug, Clone)]
pub enum Directions {
    Google(DirectionsClient),
    Unconfigured,
}

impl Directions {
    pub fn from_config(config: Option<MapsConfig>) -> Result<Self, RemoteError> {
        match config {
            Some(config) => Ok(Self::Google(DirectionsClient::new(config)?)),
            None => Ok(Self::Unconfigured),
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, Self::Google(_))
    }
}

impl DirectionsSource for Directions {
    async fn fetch_routes(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<Vec<RawRoute>, DirectionsError> {
        match self {
            Self::Google(client) => client.fetch_routes(origin, destination).await,
            Self::Unconfigured => Err(DirectionsError::Unavailable),
        }
    }
}
