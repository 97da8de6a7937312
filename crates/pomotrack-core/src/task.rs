//! Task ledger records.
//!
//! Tasks are created by external collaborators (the CLI, an editing UI);
//! the session engine only touches `status`, `completed_pomodoros` and
//! `completed_at`, and only through a transactional apply.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task status enumeration.
///
/// `completed` is reached only when `completed_pomodoros` catches up with
/// `estimated_pomodoros`; `postponed` is set by external collaborators only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Postponed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Postponed => "postponed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "in_progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            "postponed" => Some(TaskStatus::Postponed),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Pending
    }
}

/// A tracked task with its pomodoro progress counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: String,
    /// Owning user
    pub owner: String,
    /// Task title
    pub title: String,
    /// Optional description (opaque to the core)
    pub description: Option<String>,
    /// Task status
    pub status: TaskStatus,
    /// Estimated number of pomodoros (always >= 1)
    pub estimated_pomodoros: u32,
    /// Number of completed pomodoros
    pub completed_pomodoros: u32,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
    /// Completion timestamp (null if not completed)
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a new pending task.
    ///
    /// `estimated_pomodoros` is clamped to at least 1.
    pub fn new(owner: impl Into<String>, title: impl Into<String>, estimated_pomodoros: u32) -> Self {
        let now = Utc::now();
        Task {
            id: format!("task-{}-{}", now.timestamp(), uuid::Uuid::new_v4()),
            owner: owner.into(),
            title: title.into(),
            description: None,
            status: TaskStatus::Pending,
            estimated_pomodoros: estimated_pomodoros.max(1),
            completed_pomodoros: 0,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Whether the task has fulfilled its estimated work intervals.
    pub fn is_fulfilled(&self) -> bool {
        self.completed_pomodoros >= self.estimated_pomodoros
    }
}
