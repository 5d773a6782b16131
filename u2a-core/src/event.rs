//! Synthetic producer events and their wire encoding.
//!
//! One event per datagram, encoded as a compact JSON object:
//!
//! ```text
//! {"event_time":"2024-05-01T12:30:00.123456","index":42}
//! ```
//!
//! `event_time` is UTC with microsecond precision and no offset suffix.

use bytes::Bytes;
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// `strftime` layout of `event_time` on the wire.
pub const EVENT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// A single indexed, timestamped event.
///
/// Events carry no state beyond these two fields: they are built, encoded,
/// sent and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Wall-clock time the event was built, UTC.
    #[serde(with = "event_time")]
    pub event_time: NaiveDateTime,
    /// Position in the emission sequence, starting at 0.
    pub index: u64,
}

impl Event {
    /// Build an event stamped with the current UTC time.
    #[must_use]
    pub fn now(index: u64) -> Self {
        Self::at(index, Utc::now().naive_utc())
    }

    /// Build an event with an explicit timestamp.
    #[must_use]
    pub const fn at(index: u64, event_time: NaiveDateTime) -> Self {
        Self { event_time, index }
    }

    /// Encode to compact ASCII JSON.
    pub fn encode(&self) -> Result<Bytes> {
        let bytes = serde_json::to_vec(self)?;
        debug_assert!(bytes.is_ascii());
        Ok(Bytes::from(bytes))
    }

    /// Decode an event from a datagram payload.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}

mod event_time {
    use chrono::NaiveDateTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::EVENT_TIME_FORMAT;

    pub fn serialize<S>(time: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&time.format(EVENT_TIME_FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f").map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fixed_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_micro_opt(12, 30, 0, 123_456)
            .unwrap()
    }

    #[test]
    fn test_wire_format() {
        let event = Event::at(42, fixed_time());
        let bytes = event.encode().unwrap();
        assert_eq!(
            &bytes[..],
            br#"{"event_time":"2024-05-01T12:30:00.123456","index":42}"#
        );
    }

    #[test]
    fn test_whole_seconds_keep_fraction() {
        let time = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let bytes = Event::at(0, time).encode().unwrap();
        assert_eq!(
            &bytes[..],
            br#"{"event_time":"2024-01-01T00:00:00.000000","index":0}"#
        );
    }

    #[test]
    fn test_exactly_two_keys() {
        let bytes = Event::now(7).encode().unwrap();
        assert!(bytes.is_ascii());

        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert_eq!(object["index"], 7);
        assert!(!object["event_time"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_decode_accepts_foreign_precision() {
        let event = Event::decode(br#"{"event_time":"2024-05-01T12:30:00","index":3}"#).unwrap();
        assert_eq!(event.index, 3);
        assert!(Event::decode(b"not json").is_err());
    }
}
