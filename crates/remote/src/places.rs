use reqwest::{Client, Url};
use tracing::debug;

use raksha_core::places::SEARCH_RADIUS_METERS;
use raksha_core::{nearby_places, Coordinate, NearbyPlace, NearbySearchResponse, PlaceCategory};

use crate::{build_http_client, endpoint, MapsConfig, RemoteError};

#[derive(Debug, Clone)]
pub struct PlacesClient {
    http: Client,
    config: MapsConfig,
}

impl PlacesClient {
    pub fn new(config: MapsConfig) -> Result<Self, RemoteError> {
        Ok(Self {
            http: build_http_client(config.timeout)?,
            config,
        })
    }

    pub fn nearby_url(&self, origin: Coordinate, category: PlaceCategory) -> Result<Url, RemoteError> {
        endpoint(
            &self.config.base_url,
            "place/nearbysearch/json",
            &[
                ("location", origin.as_query()),
                ("radius", SEARCH_RADIUS_METERS.to_string()),
                ("type", category.api_type().to_string()),
                ("key", self.config.api_key.clone()),
            ],
        )
    }

    /// Safety points of one category within the search radius, nearest first.
    pub async fn nearby(
        &self,
        origin: Coordinate,
        category: PlaceCategory,
    ) -> Result<Vec<NearbyPlace>, RemoteError> {
        let response = self.http.get(self.nearby_url(origin, category)?).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                code: status.as_u16(),
            });
        }

        let text = response.text().await?;
        let parsed: NearbySearchResponse = serde_json::from_str(&text)?;
        let places = nearby_places(origin, category, &parsed)?;
        debug!(
            category = category.api_type(),
            status = %parsed.status,
            found = places.len(),
            "nearby search complete"
        );
        Ok(places)
    }
}
