use reqwest::{Client, Url};
use tracing::debug;

use raksha_core::{first_geocode_match, GeocodeResponse, PlaceMatch};

use crate::{build_http_client, endpoint, MapsConfig, RemoteError};

/// Looks destinations up by name through the geocoding API.
#[derive(Debug, Clone)]
pub struct GeocodeClient {
    http: Client,
    config: MapsConfig,
}

impl GeocodeClient {
    pub fn new(config: MapsConfig) -> Result<Self, RemoteError> {
        Ok(Self {
            http: build_http_client(config.timeout)?,
            config,
        })
    }

    pub fn search_url(&self, query: &str) -> Result<Url, RemoteError> {
        endpoint(
            &self.config.base_url,
            "geocode/json",
            &[
                ("address", query.to_string()),
                ("key", self.config.api_key.clone()),
            ],
        )
    }

    /// Best match for a place name, or `None` when the service found nothing.
    pub async fn search(&self, query: &str) -> Result<Option<PlaceMatch>, RemoteError> {
        let response = self.http.get(self.search_url(query)?).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                code: status.as_u16(),
            });
        }

        let text = response.text().await?;
        let parsed: GeocodeResponse = serde_json::from_str(&text)?;
        let found = first_geocode_match(query, &parsed)?;
        debug!(
            status = %parsed.status,
            results = parsed.results.len(),
            found = found.is_some(),
            "geocode search complete"
        );
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_encodes_the_address() {
        let client = GeocodeClient::new(MapsConfig::new("maps-key")).unwrap();
        let url = client.search_url("India Gate, New Delhi").unwrap();
        assert_eq!(url.path(), "/maps/api/geocode/json");
        let query = url.query_pairs().collect::<Vec<_>>();
        assert!(query.contains(&("address".into(), "India Gate, New Delhi".into())));
        assert!(query.contains(&("key".into(), "maps-key".into())));
        assert!(url.as_str().contains("address=India+Gate%2C+New+Delhi"));
    }

    #[tokio::test]
    async fn search_failures_do_not_expose_the_key() {
        let mut config = MapsConfig::new("SECRET-KEY-123");
        config.base_url = "http://127.0.0.1:9".to_string();
        config.timeout = std::time::Duration::from_secs(2);
        let client = GeocodeClient::new(config).unwrap();

        let err = client.search("India Gate").await.unwrap_err();
        assert!(matches!(err, RemoteError::Http(_)), "{err:?}");
        assert!(!err.to_string().contains("SECRET-KEY-123"), "{err}");
    }
}
