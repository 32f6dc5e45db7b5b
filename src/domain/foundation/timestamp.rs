use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// UTC instant; serialized as RFC 3339.
///
/// Platform clocks arrive as Unix seconds (Telegram) or milliseconds
/// (webhooks); out-of-range values are reported as `None` so callers can
/// fall back to receipt time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn from_unix_secs(secs: i64) -> Option<Self> {
        Utc.timestamp_opt(secs, 0).single().map(Self)
    }

    pub fn from_unix_millis(millis: i64) -> Option<Self> {
        Utc.timestamp_millis_opt(millis).single().map(Self)
    }

    pub fn as_unix_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_and_millis_describe_the_same_instant() {
        let secs = Timestamp::from_unix_secs(1_700_000_000).unwrap();
        let millis = Timestamp::from_unix_millis(1_700_000_000_250).unwrap();
        assert!(secs < millis);
        assert_eq!(millis.as_unix_millis() - secs.as_unix_millis(), 250);
    }

    #[test]
    fn platform_clock_garbage_is_none() {
        assert!(Timestamp::from_unix_secs(i64::MAX).is_none());
        assert!(Timestamp::from_unix_millis(i64::MIN).is_none());
    }

    #[test]
    fn serializes_as_rfc3339() {
        let ts = Timestamp::from_unix_secs(0).unwrap();
        assert_eq!(serde_json::to_string(&ts).unwrap(), "\"1970-01-01T00:00:00Z\"");
        assert_eq!(ts.to_rfc3339(), "1970-01-01T00:00:00+00:00");
    }
}
