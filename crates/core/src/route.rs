use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::Bounds;
use crate::models::Coordinate;
use crate::polyline::{decode_polyline, DecodeError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectionsResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub routes: Vec<RawRoute>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRoute {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub legs: Vec<RawLeg>,
    #[serde(default)]
    pub overview_polyline: Option<OverviewPolyline>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverviewPolyline {
    pub points: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawLeg {
    #[serde(default)]
    pub distance: Option<TextValue>,
    #[serde(default)]
    pub duration: Option<TextValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextValue {
    #[serde(default)]
    pub text: String,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteCandidate {
    pub route_index: usize,
    pub path: Vec<Coordinate>,
    pub distance_meters: i64,
    pub distance_text: String,
    pub duration_text: String,
    pub summary: Option<String>,
    pub is_preferred: bool,
}

#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteRejection {
    #[error("route has no legs")]
    MissingLeg,
    #[error("first leg has no distance")]
    MissingDistance,
    #[error("route has no overview polyline")]
    MissingPolyline,
    #[error("overview polyline is malformed: {error}")]
    Decode { error: DecodeError },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedRoute {
    pub route_index: usize,
    pub reason: RouteRejection,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    #[error("no route found")]
    NoRouteFound,
    #[error("none of the {} candidate routes could be used", .rejected.len())]
    NoUsableRoute { rejected: Vec<RejectedRoute> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSelection {
    pub preferred_index: usize,
    pub candidates: Vec<RouteCandidate>,
    pub rejected: Vec<RejectedRoute>,
}

impl RouteSelection {
    pub fn preferred(&self) -> Option<&RouteCandidate> {
        self.candidates.iter().find(|candidate| candidate.is_preferred)
    }

    pub fn alternates(&self) -> impl Iterator<Item = &RouteCandidate> {
        self.candidates.iter().filter(|candidate| !candidate.is_preferred)
    }

    /// Bounding box of the preferred path, for framing the map camera.
    pub fn bounds(&self) -> Option<Bounds> {
        self.preferred()
            .and_then(|candidate| Bounds::from_path(&candidate.path))
    }
}

/// Decodes every route and marks the one with the shortest first leg.
///
/// Ties go to the lowest index. Routes that cannot be read are reported in
/// [`RouteSelection::rejected`] instead of failing the whole selection.
pub fn select_shortest_route(routes: &[RawRoute]) -> Result<RouteSelection, RouteError> {
    if routes.is_empty() {
        return Err(RouteError::NoRouteFound);
    }

    let mut candidates = Vec::with_capacity(routes.len());
    let mut rejected = Vec::new();

    for (route_index, route) in routes.iter().enumerate() {
        match candidate_from(route_index, route) {
            Ok(candidate) => candidates.push(candidate),
            Err(reason) => rejected.push(RejectedRoute {
                route_index,
                reason,
            }),
        }
    }

    let Some(preferred_index) = candidates
        .iter()
        .min_by_key(|candidate| (candidate.distance_meters, candidate.route_index))
        .map(|candidate| candidate.route_index)
    else {
        return Err(RouteError::NoUsableRoute { rejected });
    };

    for candidate in &mut candidates {
        candidate.is_preferred = candidate.route_index == preferred_index;
    }

    Ok(RouteSelection {
        preferred_index,
        candidates,
        rejected,
    })
}

fn candidate_from(route_index: usize, route: &RawRoute) -> Result<RouteCandidate, RouteRejection> {
    let leg = route.legs.first().ok_or(RouteRejection::MissingLeg)?;
    let distance = leg.distance.as_ref().ok_or(RouteRejection::MissingDistance)?;
    let encoded = route
        .overview_polyline
        .as_ref()
        .ok_or(RouteRejection::MissingPolyline)?;
    let path =
        decode_polyline(&encoded.points).map_err(|error| RouteRejection::Decode { error })?;

    Ok(RouteCandidate {
        route_index,
        path,
        distance_meters: distance.value,
        distance_text: distance.text.clone(),
        duration_text: leg
            .duration
            .as_ref()
            .map(|duration| duration.text.clone())
            .unwrap_or_default(),
        summary: route.summary.clone(),
        is_preferred: false,
    })
}
