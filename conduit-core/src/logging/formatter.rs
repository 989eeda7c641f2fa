//! Log line formatting

use super::LogLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How log lines are rendered
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line:
    /// `{"timestamp":"2024-01-15T10:30:00Z","level":"INFO","target":"conduit_core::rpc","message":"..."}`
    Json,

    /// `2024-01-15 10:30:00.000 INFO  [conduit_core::rpc] ...`
    #[default]
    Human,
}

/// One log line before rendering
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub target: String,
    /// Source file and line
    pub location: Option<(String, u32)>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: String, target: String) -> Self {
        Self { timestamp: Utc::now(), level, message, target, location: None }
    }

    pub fn from_record(record: &log::Record) -> Self {
        let mut entry = Self::new(record.level().into(), record.args().to_string(), record.target().to_string());
        if let (Some(file), Some(line)) = (record.file(), record.line()) {
            entry.location = Some((file.to_string(), line));
        }
        entry
    }
}

impl LogFormat {
    pub fn format_entry(&self, entry: &LogEntry) -> String {
        match self {
            LogFormat::Json => format_json(entry),
            LogFormat::Human => format_human(entry),
        }
    }
}

fn format_json(entry: &LogEntry) -> String {
    let mut json = serde_json::Map::new();
    json.insert("timestamp".to_string(), Value::String(entry.timestamp.to_rfc3339()));
    json.insert("level".to_string(), Value::String(entry.level.as_str().to_uppercase()));
    json.insert("target".to_string(), Value::String(entry.target.clone()));
    json.insert("message".to_string(), Value::String(entry.message.clone()));

    if let Some((file, line)) = &entry.location {
        json.insert("file".to_string(), Value::String(file.clone()));
        json.insert("line".to_string(), Value::from(*line));
    }

    serde_json::to_string(&json).unwrap_or_else(|_| "Failed to serialize log entry".to_string())
}

fn format_human(entry: &LogEntry) -> String {
    let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
    let level = format!("{:5}", entry.level.as_str().to_uppercase());
    format!("{} {} [{}] {}", timestamp, level, entry.target, entry.message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_format() {
        let mut entry = LogEntry::new(LogLevel::Info, "Listening".to_string(), "conduit_core::rpc".to_string());
        entry.location = Some(("src/rpc/server.rs".to_string(), 42));

        let formatted = LogFormat::Json.format_entry(&entry);
        let parsed: Value = serde_json::from_str(&formatted).unwrap();
        assert_eq!(parsed["message"], "Listening");
        assert_eq!(parsed["level"], "INFO");
        assert_eq!(parsed["target"], "conduit_core::rpc");
        assert_eq!(parsed["line"], 42);
    }

    #[test]
    fn test_human_format() {
        let entry = LogEntry::new(LogLevel::Error, "Sync failed".to_string(), "conduit_core::cache".to_string());
        let formatted = LogFormat::Human.format_entry(&entry);

        assert!(formatted.contains("ERROR"));
        assert!(formatted.contains("[conduit_core::cache] Sync failed"));
    }
}
