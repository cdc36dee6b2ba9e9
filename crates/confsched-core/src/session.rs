use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One conference-talk record.
///
/// `id` is the stable unique identifier assigned by the conference data
/// source. Every field except `is_starred` is immutable after creation;
/// records come and go only through bulk replacement during a resync.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub speaker_name: String,
    /// Opaque image bytes. No validation; rendering fallback is the UI's job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker_icon: Option<Vec<u8>>,
    pub starts_at: DateTime<Utc>,
    pub track: String,
    pub length_minutes: u32,
    #[serde(default)]
    pub is_starred: bool,
}

impl Session {
    /// Total ordering over the schedule: `(starts_at, track)` ascending,
    /// with `id` as the final tiebreak so equal slots sort deterministically.
    pub fn schedule_cmp(&self, other: &Session) -> Ordering {
        self.starts_at
            .cmp(&other.starts_at)
            .then_with(|| self.track.cmp(&other.track))
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Sort a collection into schedule order. Recomputed after every mutation;
/// all index-based diffs reference positions in this order.
pub fn sort_schedule(sessions: &mut [Session]) {
    sessions.sort_by(Session::schedule_cmp);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn session(id: &str, hour: u32, track: &str) -> Session {
        Session {
            id: id.into(),
            title: format!("Talk {id}"),
            abstract_text: String::new(),
            speaker_name: "Speaker".into(),
            speaker_icon: None,
            starts_at: Utc.with_ymd_and_hms(2020, 1, 1, hour, 0, 0).unwrap(),
            track: track.into(),
            length_minutes: 30,
            is_starred: false,
        }
    }

    #[test]
    fn sorts_by_start_time_then_track() {
        let mut sessions = vec![
            session("late", 11, "A"),
            session("track-b", 9, "B"),
            session("track-a", 9, "A"),
        ];
        sort_schedule(&mut sessions);
        let ids: Vec<&str> = sessions.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["track-a", "track-b", "late"]);
    }

    #[test]
    fn equal_slot_breaks_tie_by_id() {
        let mut sessions = vec![session("2", 9, "A"), session("1", 9, "A")];
        sort_schedule(&mut sessions);
        assert_eq!(sessions[0].id, "1");
        assert_eq!(sessions[1].id, "2");
    }

    #[test]
    fn serde_roundtrip_with_icon() {
        let mut s = session("1", 9, "A");
        s.speaker_icon = Some(vec![0xde, 0xad]);
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"abstract\""));
        let parsed: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, s);
    }

    #[test]
    fn serde_defaults_for_optional_fields() {
        let json = r#"{
            "id": "1",
            "title": "t",
            "abstract": "a",
            "speaker_name": "s",
            "starts_at": "2020-01-01T09:00:00Z",
            "track": "A",
            "length_minutes": 45
        }"#;
        let parsed: Session = serde_json::from_str(json).unwrap();
        assert!(parsed.speaker_icon.is_none());
        assert!(!parsed.is_starred);
    }
}
