use reqwest::{Client, Url};
use tracing::{debug, warn};

use raksha_core::{Coordinate, DirectionsError, DirectionsResponse, DirectionsSource, RawRoute};

use crate::{build_http_client, endpoint, transport_message, MapsConfig, RemoteError};

#[derive(Debug, Clone)]
pub struct DirectionsClient {
    http: Client,
    config: MapsConfig,
}

impl DirectionsClient {
    pub fn new(config: MapsConfig) -> Result<Self, RemoteError> {
        Ok(Self {
            http: build_http_client(config.timeout)?,
            config,
        })
    }

    /// Driving directions with alternatives, so the selector has routes to compare.
    pub fn directions_url(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<Url, RemoteError> {
        endpoint(
            &self.config.base_url,
            "directions/json",
            &[
                ("origin", origin.as_query()),
                ("destination", destination.as_query()),
                ("mode", "driving".to_string()),
                ("alternatives", "true".to_string()),
                ("key", self.config.api_key.clone()),
            ],
        )
    }
}

impl DirectionsSource for DirectionsClient {
    async fn fetch_routes(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<Vec<RawRoute>, DirectionsError> {
        let url = self
            .directions_url(origin, destination)
            .map_err(|err| DirectionsError::Transport(err.to_string()))?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| DirectionsError::Transport(transport_message(err)))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "directions returned non-success status");
            return Err(DirectionsError::Status {
                code: status.as_u16(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|err| DirectionsError::Transport(transport_message(err)))?;
        let parsed: DirectionsResponse = serde_json::from_str(&text)
            .map_err(|err| DirectionsError::Malformed(err.to_string()))?;

        debug!(
            status = parsed.status.as_deref().unwrap_or(""),
            routes = parsed.routes.len(),
            "directions response received"
        );
        interpret_directions(parsed)
    }
}

/// Maps the service status onto routes or an error. `ZERO_RESULTS` is an
/// empty list so the selector reports it as no route found.
pub fn interpret_directions(response: DirectionsResponse) -> Result<Vec<RawRoute>, DirectionsError> {
    match response.status.as_deref().unwrap_or("OK") {
        "OK" => Ok(response.routes),
        "ZERO_RESULTS" | "NOT_FOUND" => Ok(Vec::new()),
        status => Err(DirectionsError::Api {
            status: status.to_string(),
            message: response
                .error_message
                .unwrap_or_else(|| "Unknown error".to_string()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(value: serde_json::Value) -> DirectionsResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn url_requests_driving_alternatives() {
        let client = DirectionsClient::new(MapsConfig::new("maps-key")).unwrap();
        let url = client
            .directions_url(
                Coordinate::new(28.6, 77.2).unwrap(),
                Coordinate::new(28.7, 77.1).unwrap(),
            )
            .unwrap();
        let query = url.query_pairs().collect::<Vec<_>>();
        assert_eq!(url.path(), "/maps/api/directions/json");
        assert!(query.contains(&("origin".into(), "28.6,77.2".into())));
        assert!(query.contains(&("destination".into(), "28.7,77.1".into())));
        assert!(query.contains(&("mode".into(), "driving".into())));
        assert!(query.contains(&("alternatives".into(), "true".into())));
        assert!(query.contains(&("key".into(), "maps-key".into())));
    }

    #[tokio::test]
    async fn fetch_failures_do_not_expose_the_key() {
        let mut config = MapsConfig::new("SECRET-KEY-123");
        config.base_url = "http://127.0.0.1:9".to_string();
        config.timeout = std::time::Duration::from_secs(2);
        let client = DirectionsClient::new(config).unwrap();

        let err = client
            .fetch_routes(
                Coordinate::new(28.6, 77.2).unwrap(),
                Coordinate::new(28.7, 77.1).unwrap(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DirectionsError::Transport(_)), "{err:?}");
        assert!(!err.to_string().contains("SECRET-KEY-123"), "{err}");
    }

    #[test]
    fn zero_results_is_empty() {
        let routes = interpret_directions(parse(serde_json::json!({
            "status": "ZERO_RESULTS",
            "routes": []
        })))
        .unwrap();
        assert!(routes.is_empty());
    }

    #[test]
    fn denied_is_api_error() {
        let result = interpret_directions(parse(serde_json::json!({
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid."
        })));
        assert_eq!(
            result.unwrap_err(),
            DirectionsError::Api {
                status: "REQUEST_DENIED".to_string(),
                message: "The provided API key is invalid.".to_string(),
            }
        );
        assert!(matches!(
            interpret_directions(parse(serde_json::json!({ "status": "OVER_QUERY_LIMIT" }))),
            Err(DirectionsError::Api { .. })
        ));
    }

    #[test]
    fn ok_passes_routes_through() {
        let routes = interpret_directions(parse(serde_json::json!({
            "status": "OK",
            "routes": [ { "legs": [], "overview_polyline": { "points": "" } } ]
        })))
        .unwrap();
        assert_eq!(routes.len(), 1);
    }
}
