//! Append-only task audit events.
//!
//! Written whenever a session pauses, resumes, is interrupted, or is
//! cancelled. Observability only; no core logic ever reads these back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskEventKind {
    SessionPaused,
    SessionResumed,
    SessionInterrupted,
    SessionCancelled,
}

impl TaskEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskEventKind::SessionPaused => "session_paused",
            TaskEventKind::SessionResumed => "session_resumed",
            TaskEventKind::SessionInterrupted => "session_interrupted",
            TaskEventKind::SessionCancelled => "session_cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "session_paused" => Some(TaskEventKind::SessionPaused),
            "session_resumed" => Some(TaskEventKind::SessionResumed),
            "session_interrupted" => Some(TaskEventKind::SessionInterrupted),
            "session_cancelled" => Some(TaskEventKind::SessionCancelled),
            _ => None,
        }
    }
}

impl fmt::Display for TaskEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored audit row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEvent {
    pub id: i64,
    pub task_id: String,
    pub kind: TaskEventKind,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// An audit entry produced by a session transition, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub kind: TaskEventKind,
    pub description: String,
}

impl AuditEntry {
    pub fn new(kind: TaskEventKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
        }
    }
}
