pub mod geo;
pub mod intent;
pub mod models;
pub mod places;
pub mod polyline;
pub mod responder;
pub mod route;
pub mod services;
pub mod sos;

pub use geo::{haversine_km, Bounds, NavigationProgress};
pub use intent::{classify_local, is_locally_answerable, normalize_message, Classifier};
pub use models::*;
pub use places::{
    first_geocode_match, nearby_places, GeocodeResponse, NearbyPlace, NearbySearchResponse,
    PlaceCategory, PlaceMatch, PlacesError,
};
pub use polyline::{decode_polyline, DecodeError};
pub use responder::{respond, RandomSource, Responder, SeededRandom, ThreadRandom};
pub use route::{
    select_shortest_route, DirectionsResponse, RawRoute, RejectedRoute, RouteCandidate, RouteError,
    RouteRejection, RouteSelection,
};
pub use services::{DirectionsError, DirectionsSource, GenerationError, TextGenerator};
pub use sos::{
    is_valid_phone_number, validate_contacts, ContactError, SosAlert, SosController, SosState,
    MIN_TRUSTED_CONTACTS,
};
