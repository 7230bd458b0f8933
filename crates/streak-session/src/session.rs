//! Timer session as reported by the server

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSession {
    /// Server-assigned identifier, normalised to a string
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    /// When the session started
    pub start_time: DateTime<Utc>,
    /// Set once the server has closed the session
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Abstinence mode flag
    #[serde(default)]
    pub is_abstinence: bool,
}

impl TimerSession {
    pub fn is_closed(&self) -> bool {
        self.end_time.is_some()
    }

    /// Time elapsed since start, capped at the end time for closed sessions.
    /// Never negative.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        let until = self.end_time.unwrap_or(now);
        (until - self.start_time).max(Duration::zero())
    }
}

/// Ids arrive as JSON numbers from some deployments and strings from others.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Int(i64),
        Text(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Int(n) => n.to_string(),
        RawId::Text(s) => s,
    })
}
