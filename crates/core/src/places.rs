use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::haversine_km;
use crate::models::Coordinate;

pub const SEARCH_RADIUS_METERS: u32 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceCategory {
    Hospital,
    Police,
    Pharmacy,
}

impl PlaceCategory {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "hospital" | "hospitals" => Some(Self::Hospital),
            "police" | "police_station" => Some(Self::Police),
            "pharmacy" | "pharmacies" | "medical" => Some(Self::Pharmacy),
            _ => None,
        }
    }

    /// Place type understood by the nearby-search API.
    pub fn api_type(self) -> &'static str {
        match self {
            Self::Hospital => "hospital",
            Self::Police => "police",
            Self::Pharmacy => "pharmacy",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NearbySearchResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub results: Vec<RawPlace>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPlace {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub geometry: Option<RawGeometry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawGeometry {
    #[serde(default)]
    pub location: Option<RawLatLng>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawLatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyPlace {
    pub name: String,
    pub category: PlaceCategory,
    pub location: Coordinate,
    pub distance_km: f64,
}

impl NearbyPlace {
    pub fn distance_label(&self) -> String {
        format!("Distance: {:.2} km", self.distance_km)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlacesError {
    #[error("places api rejected the request ({status}): {message}")]
    Api { status: String, message: String },
}

fn api_error(status: &str, message: Option<&String>) -> Option<PlacesError> {
    matches!(status, "REQUEST_DENIED" | "INVALID_REQUEST").then(|| PlacesError::Api {
        status: status.to_string(),
        message: message
            .cloned()
            .unwrap_or_else(|| "Unknown error".to_string()),
    })
}

/// Turns a nearby-search response into places ordered by distance from `origin`.
///
/// Entries without a usable location are skipped.
pub fn nearby_places(
    origin: Coordinate,
    category: PlaceCategory,
    response: &NearbySearchResponse,
) -> Result<Vec<NearbyPlace>, PlacesError> {
    if let Some(err) = api_error(&response.status, response.error_message.as_ref()) {
        return Err(err);
    }

    let mut places = response
        .results
        .iter()
        .filter_map(|place| {
            let raw = place.geometry.as_ref()?.location?;
            let location = Coordinate::new(raw.lat, raw.lng).ok()?;
            Some(NearbyPlace {
                name: place.name.clone().unwrap_or_else(|| "Unknown".to_string()),
                category,
                location,
                distance_km: haversine_km(origin, location),
            })
        })
        .collect::<Vec<_>>();

    places.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    Ok(places)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeocodeResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub results: Vec<RawGeocodeResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawGeocodeResult {
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub geometry: Option<RawGeometry>,
}

/// A destination found by name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceMatch {
    pub query: String,
    pub address: String,
    pub location: Coordinate,
}

/// The first geocoding result for `query`, or `None` when nothing matched.
/// The address falls back to the query text.
pub fn first_geocode_match(
    query: &str,
    response: &GeocodeResponse,
) -> Result<Option<PlaceMatch>, PlacesError> {
    if let Some(err) = api_error(&response.status, response.error_message.as_ref()) {
        return Err(err);
    }

    let Some(first) = response.results.first() else {
        return Ok(None);
    };
    let Some(location) = first
        .geometry
        .as_ref()
        .and_then(|geometry| geometry.location)
        .and_then(|raw| Coordinate::new(raw.lat, raw.lng).ok())
    else {
        return Ok(None);
    };

    Ok(Some(PlaceMatch {
        query: query.to_string(),
        address: first
            .formatted_address
            .clone()
            .filter(|address| !address.trim().is_empty())
            .unwrap_or_else(|| query.to_string()),
        location,
    }))
}
