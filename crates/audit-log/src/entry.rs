use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// `strftime` layout shared by CDR lines and diagnostic log lines.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render a local timestamp as `YYYY-MM-DD HH:MM:SS`.
pub fn format_timestamp(ts: &DateTime<Local>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// A single admission decision written to the CDR file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Local>,
    pub id: String,
    pub action: AuditAction,
}

impl AuditRecord {
    /// Create a record for `id` stamped with the current local time.
    pub fn new(id: impl Into<String>, action: AuditAction) -> Self {
        Self {
            timestamp: Local::now(),
            id: id.into(),
            action,
        }
    }

    /// Serialise as one CDR line: `<timestamp>, <id>, <action>\n`.
    pub fn to_line(&self) -> String {
        format!(
            "{}, {}, {}\n",
            format_timestamp(&self.timestamp),
            self.id,
            self.action
        )
    }
}

/// What happened to the session identified by an [`AuditRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    RejectedBlacklist,
    TimeoutRemove,
    ShutdownRemove,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Created => "created",
            AuditAction::RejectedBlacklist => "rejected_blacklist",
            AuditAction::TimeoutRemove => "timeout_remove",
            AuditAction::ShutdownRemove => "shutdown_remove",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn line_layout_matches_cdr_format() {
        let ts = Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap();
        let record = AuditRecord {
            timestamp: ts,
            id: "001010123456789".to_string(),
            action: AuditAction::Created,
        };
        assert_eq!(record.to_line(), "2024-03-07 09:05:01, 001010123456789, created\n");
    }

    #[test]
    fn action_spellings() {
        assert_eq!(AuditAction::Created.to_string(), "created");
        assert_eq!(AuditAction::RejectedBlacklist.to_string(), "rejected_blacklist");
        assert_eq!(AuditAction::TimeoutRemove.to_string(), "timeout_remove");
        assert_eq!(AuditAction::ShutdownRemove.to_string(), "shutdown_remove");
    }

    #[test]
    fn record_serde_roundtrip() {
        let record = AuditRecord {
            timestamp: Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap(),
            id: "001010123456789".to_string(),
            action: AuditAction::RejectedBlacklist,
        };

        let yaml = serde_yml::to_string(&record).unwrap();
        assert!(yaml.contains("action: rejected_blacklist"));

        let back: AuditRecord = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(back.timestamp, record.timestamp);
        assert_eq!(back.id, record.id);
        assert_eq!(back.action, record.action);
        assert_eq!(back.to_line(), record.to_line());
    }
}
