use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use crate::error::AppError;

/// Placeholder accepted instead of a stream URL while the virtual venue is not set up yet.
pub const VIRTUAL_URL_PLACEHOLDER: &str = "TBD";

const STREAM_KEY_SUFFIX_LEN: usize = 9;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VirtualMode {
    #[default]
    #[serde(alias = "none")]
    None,
    #[serde(alias = "live")]
    Live,
    #[serde(alias = "vr")]
    Vr,
    #[serde(alias = "both")]
    Both,
}

impl VirtualMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            VirtualMode::None => "NONE",
            VirtualMode::Live => "LIVE",
            VirtualMode::Vr => "VR",
            VirtualMode::Both => "BOTH",
        }
    }

    pub fn is_virtual(&self) -> bool {
        !matches!(self, VirtualMode::None)
    }

    pub fn includes_vr(&self) -> bool {
        matches!(self, VirtualMode::Vr | VirtualMode::Both)
    }
}

impl fmt::Display for VirtualMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VirtualMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NONE" => Ok(VirtualMode::None),
            "LIVE" => Ok(VirtualMode::Live),
            "VR" => Ok(VirtualMode::Vr),
            "BOTH" => Ok(VirtualMode::Both),
            other => Err(AppError::validation("virtual_mode", format!("Unknown virtual mode '{}'", other))),
        }
    }
}

/// Lifecycle label derived from the clock, never persisted.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    #[serde(alias = "upcoming")]
    Upcoming,
    #[serde(alias = "live")]
    Live,
    #[serde(alias = "ended")]
    Ended,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Upcoming => "UPCOMING",
            EventStatus::Live => "LIVE",
            EventStatus::Ended => "ENDED",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UPCOMING" => Ok(EventStatus::Upcoming),
            "LIVE" => Ok(EventStatus::Live),
            "ENDED" => Ok(EventStatus::Ended),
            other => Err(AppError::validation("status", format!("Unknown event status '{}'", other))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: Option<String>,
    pub virtual_mode: VirtualMode,
    pub virtual_url: Option<String>,
    pub max_attendees: Option<u32>,
    /// Issued once at creation and kept for the life of the event.
    #[serde(default, skip_serializing)]
    pub stream_key: String,
    pub created_at: DateTime<Utc>,
}

pub struct NewEventParams {
    pub title: String,
    pub description: String,
    pub category: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: Option<String>,
    pub virtual_mode: VirtualMode,
    pub virtual_url: Option<String>,
    pub max_attendees: Option<u32>,
}

/// Partial edit. Empty strings clear the optional text fields; `max_attendees: Some(None)`
/// removes the attendance ceiling.
#[derive(Debug, Default, Clone)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub virtual_mode: Option<VirtualMode>,
    pub virtual_url: Option<String>,
    pub max_attendees: Option<Option<u32>>,
}

impl Event {
    pub fn new(params: NewEventParams, now: DateTime<Utc>) -> Result<Self, AppError> {
        let id = Uuid::new_v4().to_string();
        let event = Self {
            stream_key: generate_stream_key(&id),
            id,
            title: params.title.trim().to_string(),
            description: params.description,
            category: params.category,
            start_time: params.start_time,
            end_time: params.end_time,
            location: non_blank(params.location),
            virtual_mode: params.virtual_mode,
            virtual_url: non_blank(params.virtual_url),
            max_attendees: params.max_attendees,
            created_at: now,
        };
        event.validate()?;
        Ok(event)
    }

    /// Returns the edited event; the original is untouched when validation fails.
    pub fn apply_patch(&self, patch: EventPatch) -> Result<Self, AppError> {
        let mut event = self.clone();

        if let Some(val) = patch.title { event.title = val.trim().to_string(); }
        if let Some(val) = patch.description { event.description = val; }
        if let Some(val) = patch.category { event.category = val; }
        if let Some(val) = patch.start_time { event.start_time = val; }
        if let Some(val) = patch.end_time { event.end_time = val; }
        if let Some(val) = patch.location { event.location = non_blank(Some(val)); }
        if let Some(val) = patch.virtual_mode { event.virtual_mode = val; }
        if let Some(val) = patch.virtual_url { event.virtual_url = non_blank(Some(val)); }
        if let Some(val) = patch.max_attendees { event.max_attendees = val; }

        event.validate()?;
        Ok(event)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.is_empty() {
            return Err(AppError::validation("title", "Title is required"));
        }
        if self.start_time >= self.end_time {
            return Err(AppError::validation("end_time", "End time must be after start time"));
        }
        if self.max_attendees == Some(0) {
            return Err(AppError::validation("max_attendees", "Max attendees must be positive"));
        }

        match self.virtual_mode {
            VirtualMode::None => {
                if self.location.is_none() {
                    return Err(AppError::validation("location", "In-person events require a location"));
                }
            }
            VirtualMode::Live | VirtualMode::Vr | VirtualMode::Both => {
                let url = self.virtual_url.as_deref().ok_or_else(|| {
                    AppError::validation("virtual_url", "Virtual events require a stream URL or 'TBD'")
                })?;
                let is_placeholder = url.eq_ignore_ascii_case(VIRTUAL_URL_PLACEHOLDER);
                if !is_placeholder && !(url.starts_with("https://") || url.starts_with("http://")) {
                    return Err(AppError::validation("virtual_url", "Stream URL must be an http(s) URL"));
                }
            }
        }

        Ok(())
    }

    pub fn is_virtual(&self) -> bool {
        self.virtual_mode.is_virtual()
    }
}

/// `sk_<event id>_` followed by nine lowercase alphanumerics.
pub fn generate_stream_key(event_id: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(STREAM_KEY_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("sk_{}_{}", event_id, suffix)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
