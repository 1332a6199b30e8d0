use std::time::Duration;

use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;

use crate::models::Coordinate;

pub const DEFAULT_SENDER: &str = "Someone";
pub const SOS_UPDATE_INTERVAL: Duration = Duration::from_secs(30);
pub const MIN_TRUSTED_CONTACTS: usize = 3;
const MIN_PHONE_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SosAlert {
    pub sender: String,
    pub location: Coordinate,
    pub maps_url: String,
    pub sent_at: String,
    pub message: String,
}

impl SosAlert {
    /// Renders the emergency text sent to every trusted contact.
    pub fn compose(sender: Option<&str>, location: Coordinate, at: NaiveDateTime) -> Self {
        let sender = sender
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_SENDER)
            .to_string();
        let maps_url = maps_url(location);
        let sent_at = at.format("%Y-%m-%d %H:%M:%S").to_string();
        let message = format!(
            "🚨 EMERGENCY ALERT 🚨\n\n{sender} is in danger and needs help!\n\nLocation: {maps_url}\n\nTime: {sent_at}\n\nThis is an automated SOS alert."
        );

        Self {
            sender,
            location,
            maps_url,
            sent_at,
            message,
        }
    }
}

pub fn maps_url(location: Coordinate) -> String {
    format!(
        "https://maps.google.com/?q={},{}",
        location.latitude, location.longitude
    )
}

/// At least ten characters, made only of digits, `+`, `-` and spaces.
pub fn is_valid_phone_number(number: &str) -> bool {
    number.chars().count() >= MIN_PHONE_LEN
        && number
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' '))
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContactError {
    #[error("add and save emergency contacts before sending an SOS")]
    Missing,
    #[error("add at least {required} valid contacts ({valid} valid given)")]
    TooFew {
        valid: usize,
        required: usize,
        rejected: Vec<String>,
    },
}

/// The trusted contacts an alert goes to: trimmed, deduplicated, and only
/// well-formed numbers. Fewer than [`MIN_TRUSTED_CONTACTS`] is an error.
pub fn validate_contacts<S: AsRef<str>>(contacts: &[S]) -> Result<Vec<String>, ContactError> {
    let mut valid: Vec<String> = Vec::new();
    let mut rejected = Vec::new();

    for contact in contacts.iter().map(|c| c.as_ref().trim()) {
        if contact.is_empty() {
            continue;
        }
        if !is_valid_phone_number(contact) {
            rejected.push(contact.to_string());
        } else if !valid.iter().any(|seen| seen == contact) {
            valid.push(contact.to_string());
        }
    }

    if valid.is_empty() && rejected.is_empty() {
        return Err(ContactError::Missing);
    }
    if valid.len() < MIN_TRUSTED_CONTACTS {
        return Err(ContactError::TooFew {
            valid: valid.len(),
            required: MIN_TRUSTED_CONTACTS,
            rejected,
        });
    }
    Ok(valid)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SosState {
    Idle,
    Active {
        sender: Option<String>,
        last_alert_at: Option<NaiveDateTime>,
    },
}

/// Owns the SOS-active flag for one user session.
#[derive(Debug, Clone)]
pub struct SosController {
    state: SosState,
    interval: Duration,
}

impl Default for SosController {
    fn default() -> Self {
        Self::new()
    }
}

impl SosController {
    pub fn new() -> Self {
        Self::with_interval(SOS_UPDATE_INTERVAL)
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            state: SosState::Idle,
            interval,
        }
    }

    pub fn state(&self) -> &SosState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SosState::Active { .. })
    }

    /// Returns false when SOS was already active.
    pub fn start(&mut self, sender: Option<String>) -> bool {
        if self.is_active() {
            return false;
        }
        self.state = SosState::Active {
            sender,
            last_alert_at: None,
        };
        true
    }

    pub fn stop(&mut self) -> bool {
        let was_active = self.is_active();
        self.state = SosState::Idle;
        was_active
    }

    /// Produces an alert for a fresh location while SOS is active, at most
    /// once per update interval.
    pub fn on_location_update(
        &mut self,
        location: Coordinate,
        at: NaiveDateTime,
    ) -> Option<SosAlert> {
        let interval = chrono::Duration::from_std(self.interval).ok()?;
        let SosState::Active {
            sender,
            last_alert_at,
        } = &mut self.state
        else {
            return None;
        };

        if let Some(previous) = last_alert_at {
            if at - *previous < interval {
                return None;
            }
        }

        *last_alert_at = Some(at);
        Some(SosAlert::compose(sender.as_deref(), location, at))
    }
}
