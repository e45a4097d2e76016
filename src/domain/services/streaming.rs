use serde::Serialize;
use crate::domain::models::event::{Event, VirtualMode, VIRTUAL_URL_PLACEHOLDER};
use crate::error::AppError;

const STREAM_HOST: &str = "stream.eventpro.com";

/// Broadcast details shown to organizers of virtual events. These are display values
/// only; nothing here talks to a streaming server.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct StreamingSettings {
    pub event_id: String,
    pub virtual_mode: VirtualMode,
    pub stream_url: String,
    pub rtmp_url: String,
    pub stream_key: String,
    pub vr_enabled: bool,
}

pub fn streaming_settings(event: &Event) -> Result<StreamingSettings, AppError> {
    if !event.is_virtual() {
        return Err(AppError::validation("virtual_mode", "Streaming is only available for virtual events"));
    }

    let stream_url = event
        .virtual_url
        .clone()
        .filter(|url| !url.eq_ignore_ascii_case(VIRTUAL_URL_PLACEHOLDER))
        .unwrap_or_else(|| format!("https://{}/watch/{}", STREAM_HOST, event.id));

    Ok(StreamingSettings {
        event_id: event.id.clone(),
        virtual_mode: event.virtual_mode,
        stream_url,
        rtmp_url: format!("rtmp://{}/live/{}", STREAM_HOST, event.id),
        stream_key: event.stream_key.clone(),
        vr_enabled: event.virtual_mode.includes_vr(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::event::generate_stream_key;
    use chrono::{Duration, TimeZone, Utc};

    fn virtual_event(mode: VirtualMode, url: Option<&str>) -> Event {
        let start = Utc.with_ymd_and_hms(2024, 2, 20, 10, 0, 0).unwrap();
        Event {
            id: "ev-2".into(),
            title: "Virtual Marketing Summit".into(),
            description: String::new(),
            category: "Marketing".into(),
            start_time: start,
            end_time: start + Duration::hours(6),
            location: None,
            virtual_mode: mode,
            virtual_url: url.map(String::from),
            max_attendees: Some(1500),
            stream_key: generate_stream_key("ev-2"),
            created_at: start,
        }
    }

    #[test]
    fn defaults_stream_url_when_placeholder() {
        let settings = streaming_settings(&virtual_event(VirtualMode::Live, Some("TBD"))).unwrap();
        assert_eq!(settings.stream_url, "https://stream.eventpro.com/watch/ev-2");
        assert_eq!(settings.rtmp_url, "rtmp://stream.eventpro.com/live/ev-2");
        assert!(!settings.vr_enabled);
    }

    #[test]
    fn keeps_configured_url_and_flags_vr() {
        let settings = streaming_settings(&virtual_event(VirtualMode::Both, Some("https://watch.example.com/s"))).unwrap();
        assert_eq!(settings.stream_url, "https://watch.example.com/s");
        assert!(settings.vr_enabled);
    }

    #[test]
    fn stream_key_shape() {
        let key = generate_stream_key("ev-2");
        let suffix = key.strip_prefix("sk_ev-2_").unwrap();
        assert_eq!(suffix.len(), 9);
        assert!(suffix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn settings_return_the_stored_key() {
        let event = virtual_event(VirtualMode::Vr, Some("TBD"));
        let first = streaming_settings(&event).unwrap();
        let second = streaming_settings(&event).unwrap();
        assert_eq!(first.stream_key, event.stream_key);
        assert_eq!(first.stream_key, second.stream_key);
    }

    #[test]
    fn in_person_events_have_no_stream() {
        let mut event = virtual_event(VirtualMode::None, None);
        event.location = Some("Hall A".into());
        assert!(streaming_settings(&event).is_err());
    }
}
