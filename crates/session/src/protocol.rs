//! Message shapes exchanged with the grid and their JSON decoding.
//!
//! Decoding degrades instead of failing where it can: missing optional
//! fields become `None`, a malformed position is dropped, an unknown queued
//! event becomes [`QueuedEvent::Unknown`].

use crate::transport::TransportError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Result of a start/login/logout request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestResult {
    pub success: bool,
    pub message: Option<String>,
    pub user: Option<UserInfo>,
}

impl RequestResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            user: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserInfo {
    pub name: String,
    pub id: String,
}

/// Login form values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub grid: String,
}

impl Credentials {
    pub fn new(first_name: &str, last_name: &str, password: &str) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            password: password.into(),
            grid: "kitely".into(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Periodic session snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSnapshot {
    pub status: Option<String>,
    pub logged_in: bool,
    pub user: Option<UserInfo>,
    pub current_region: Option<String>,
    /// Wire axes: east/west, north/south, elevation.
    #[serde(deserialize_with = "lenient_position")]
    pub position: Option<[f32; 3]>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
}

impl From<String> for LogLevel {
    fn from(raw: String) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "debug" => LogLevel::Debug,
            "warn" | "warning" => LogLevel::Warning,
            "error" | "critical" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        level.as_str().to_string()
    }
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

/// One entry of the polled event queue.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueuedEvent {
    Log {
        #[serde(default)]
        message: String,
        #[serde(default)]
        level: LogLevel,
    },
    Chat {
        #[serde(default)]
        message: String,
    },
    Teleport {
        #[serde(default)]
        message: String,
    },
    Login {
        #[serde(default)]
        message: String,
    },
    Logout {
        #[serde(default)]
        message: String,
    },
    #[serde(other)]
    Unknown,
}

/// Low-latency event from the push channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum PushEvent {
    ChatMessage {
        #[serde(default)]
        from: String,
        #[serde(default)]
        message: String,
    },
    StatusUpdate {
        status: String,
    },
    Teleport {
        #[serde(default)]
        region: String,
        #[serde(default, deserialize_with = "lenient_position")]
        position: Option<[f32; 3]>,
    },
}

fn lenient_position<'de, D>(deserializer: D) -> Result<Option<[f32; 3]>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|v| match serde_json::from_value::<[f32; 3]>(v.clone()) {
        Ok(p) => Some(p),
        Err(e) => {
            tracing::warn!(value = %v, "dropping malformed position: {e}");
            None
        }
    }))
}

pub fn decode_push(text: &str) -> Result<PushEvent, TransportError> {
    Ok(serde_json::from_str(text)?)
}

pub fn decode_snapshot(text: &str) -> Result<SessionSnapshot, TransportError> {
    Ok(serde_json::from_str(text)?)
}

/// Decode an event array. Entries that fail to decode become
/// [`QueuedEvent::Unknown`] so one bad entry does not drop the rest.
pub fn decode_events(text: &str) -> Result<Vec<QueuedEvent>, TransportError> {
    let entries: Vec<Value> = serde_json::from_str(text)?;
    Ok(entries.into_iter().map(decode_event_value).collect())
}

fn decode_event_value(value: Value) -> QueuedEvent {
    serde_json::from_value(value).unwrap_or_else(|e| {
        tracing::warn!("undecodable queued event: {e}");
        QueuedEvent::Unknown
    })
}

/// One line of a recorded session transcript.
#[derive(Debug, Clone, PartialEq)]
pub enum WireMessage {
    Push(PushEvent),
    Snapshot(SessionSnapshot),
    Events(Vec<QueuedEvent>),
}

/// Decode a transcript line: `{"event": .., "data": ..}` for push events,
/// `{"snapshot": {..}}` or `{"events": [..]}` for polled data.
pub fn decode_line(text: &str) -> Result<WireMessage, TransportError> {
    let mut value: Value = serde_json::from_str(text)?;
    if value.get("event").is_some() {
        return Ok(WireMessage::Push(serde_json::from_value(value)?));
    }
    if let Some(snapshot) = value.get_mut("snapshot").map(Value::take) {
        return Ok(WireMessage::Snapshot(serde_json::from_value(snapshot)?));
    }
    if let Some(Value::Array(events)) = value.get_mut("events").map(Value::take) {
        return Ok(WireMessage::Events(
            events.into_iter().map(decode_event_value).collect(),
        ));
    }
    Err(TransportError::Unrecognized(text.chars().take(80).collect()))
}
