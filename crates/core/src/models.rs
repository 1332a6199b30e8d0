use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateError {
    #[error("latitude {0} is outside [-90, 90]")]
    Latitude(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    Longitude(f64),
    #[error("expected `lat,lng`, got `{0}`")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::Latitude(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::Longitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Parses the `lat,lng` form used on the command line and in query strings.
    pub fn parse(value: &str) -> Result<Self, CoordinateError> {
        let malformed = || CoordinateError::Malformed(value.to_string());
        let (lat, lng) = value.split_once(',').ok_or_else(malformed)?;
        let latitude = lat.trim().parse::<f64>().map_err(|_| malformed())?;
        let longitude = lng.trim().parse::<f64>().map_err(|_| malformed())?;
        Self::new(latitude, longitude)
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }

    pub fn as_query(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub id: Uuid,
    pub text: String,
    pub is_from_user: bool,
    pub timestamp_ms: i64,
}

impl ChatTurn {
    pub fn new(text: impl Into<String>, is_from_user: bool, timestamp_ms: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            is_from_user,
            timestamp_ms,
        }
    }

    pub fn from_user(text: impl Into<String>) -> Self {
        Self::new(text, true, Utc::now().timestamp_millis())
    }

    pub fn from_bot(text: impl Into<String>) -> Self {
        Self::new(text, false, Utc::now().timestamp_millis())
    }
}

/// Which classifier stage accepted a message for local answering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalMatch {
    Greeting,
    Closing,
    AppPhrase,
    ContextualKeyword,
    FeatureQuestion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseCategory {
    Greeting,
    AboutBot,
    SosFeature,
    LocationSharing,
    NearbyHospital,
    NearbyPolice,
    NearbyPharmacy,
    MapFeatures,
    EmergencyContacts,
    HowToUse,
    FeatureOverview,
    Privacy,
    Settings,
    Battery,
    Network,
    Thanks,
    Goodbye,
    Fallback,
}

impl ResponseCategory {
    pub fn as_code(self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::AboutBot => "about_bot",
            Self::SosFeature => "sos_feature",
            Self::LocationSharing => "location_sharing",
            Self::NearbyHospital => "nearby_hospital",
            Self::NearbyPolice => "nearby_police",
            Self::NearbyPharmacy => "nearby_pharmacy",
            Self::MapFeatures => "map_features",
            Self::EmergencyContacts => "emergency_contacts",
            Self::HowToUse => "how_to_use",
            Self::FeatureOverview => "feature_overview",
            Self::Privacy => "privacy",
            Self::Settings => "settings",
            Self::Battery => "battery",
            Self::Network => "network",
            Self::Thanks => "thanks",
            Self::Goodbye => "goodbye",
            Self::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    Substring,
    WholeWord,
}

impl MatchMode {
    pub fn from_optional_str(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()) {
            Some(v) if v == "word" || v == "whole_word" || v == "whole-word" => Self::WholeWord,
            _ => Self::Substring,
        }
    }
}
