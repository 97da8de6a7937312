//! Session state machine.
//!
//! A session is one timed focus or break interval. Transitions are pure:
//! each one takes the current session (and, where task progress is affected,
//! the owning task) and produces a [`Transition`] value holding the new
//! session state, the task patch, and the audit entry to append. The
//! directory applies the whole transition in a single storage transaction,
//! so a failed transition never leaves a partial write behind.
//!
//! ## State Transitions
//!
//! ```text
//! Running <-> Paused
//!    |           |
//!    +--> Completed / Cancelled   (terminal)
//! ```
//!
//! `interrupt` is not a state change: it increments a counter while the
//! session stays `running` or `paused`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cadence::CadenceConfig;
use crate::error::{CoreError, Result};
use crate::events::{AuditEntry, TaskEventKind};
use crate::task::{Task, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Work,
    ShortBreak,
    LongBreak,
}

impl SessionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Work => "work",
            SessionKind::ShortBreak => "short_break",
            SessionKind::LongBreak => "long_break",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "work" => Some(SessionKind::Work),
            "short_break" => Some(SessionKind::ShortBreak),
            "long_break" => Some(SessionKind::LongBreak),
            _ => None,
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session status.
///
/// `Interrupted` is kept for historical rows (the original data model listed
/// it) but no transition produces it: interruptions are counted, not a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Paused,
    Completed,
    Interrupted,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Running => "running",
            SessionStatus::Paused => "paused",
            SessionStatus::Completed => "completed",
            SessionStatus::Interrupted => "interrupted",
            SessionStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(SessionStatus::Running),
            "paused" => Some(SessionStatus::Paused),
            "completed" => Some(SessionStatus::Completed),
            "interrupted" => Some(SessionStatus::Interrupted),
            "cancelled" => Some(SessionStatus::Cancelled),
            _ => None,
        }
    }

    /// Running or paused: the session still occupies the owner's single
    /// active slot.
    pub fn is_active(&self) -> bool {
        matches!(self, SessionStatus::Running | SessionStatus::Paused)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One timed focus or break interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub owner: String,
    pub task_id: String,
    pub kind: SessionKind,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    /// Set on any terminal transition.
    pub ended_at: Option<DateTime<Utc>>,
    /// Planned duration in minutes, resolved from cadence config at start.
    pub planned_minutes: u32,
    /// Net active minutes, computed on termination. Whole minutes; the
    /// fractional remainder is discarded.
    pub actual_minutes: Option<i64>,
    pub pause_count: u32,
    /// Total paused time in whole seconds. Monotonic non-decreasing.
    pub total_paused_secs: i64,
    /// Set iff status is `paused`.
    pub pause_started_at: Option<DateTime<Utc>>,
    pub interruption_count: u32,
    #[serde(default)]
    pub notes: String,
}

/// The outcome of a session transition: the new session state, the task
/// patch (if the ledger is affected), and the audit entry to append.
/// Applied atomically by storage; computed here without side effects.
#[derive(Debug, Clone)]
pub struct Transition {
    pub session: Session,
    pub task: Option<Task>,
    pub audit: Option<AuditEntry>,
}

impl Session {
    /// Create a new running session for `task`.
    ///
    /// Fails with `Policy` if a work session is requested for a task that
    /// has already fulfilled its estimate. The caller is responsible for
    /// the one-active-session-per-owner check; that belongs inside the
    /// storage transaction.
    ///
    /// Returns the session together with the task patch (a pending task is
    /// advanced to `in_progress` when a work session starts on it).
    pub fn start(
        task: &Task,
        kind: SessionKind,
        config: &CadenceConfig,
        now: DateTime<Utc>,
    ) -> Result<Transition> {
        if kind == SessionKind::Work && task.is_fulfilled() {
            return Err(CoreError::Policy {
                task_id: task.id.clone(),
            });
        }

        let session = Session {
            id: format!("session-{}-{}", now.timestamp(), uuid::Uuid::new_v4()),
            owner: task.owner.clone(),
            task_id: task.id.clone(),
            kind,
            status: SessionStatus::Running,
            started_at: now,
            ended_at: None,
            planned_minutes: config.duration_for(kind),
            actual_minutes: None,
            pause_count: 0,
            total_paused_secs: 0,
            pause_started_at: None,
            interruption_count: 0,
            notes: String::new(),
        };

        let task_patch = if kind == SessionKind::Work && task.status == TaskStatus::Pending {
            let mut task = task.clone();
            task.status = TaskStatus::InProgress;
            task.updated_at = now;
            Some(task)
        } else {
            None
        };

        Ok(Transition {
            session,
            task: task_patch,
            audit: None,
        })
    }

    /// Pause a running session.
    pub fn pause(&self, now: DateTime<Utc>) -> Result<Transition> {
        if self.status != SessionStatus::Running {
            return Err(self.invalid("pause"));
        }
        let mut session = self.clone();
        session.status = SessionStatus::Paused;
        session.pause_started_at = Some(now);
        session.pause_count += 1;
        Ok(Transition {
            session,
            task: None,
            audit: Some(AuditEntry::new(
                TaskEventKind::SessionPaused,
                format!("{} session paused", self.kind),
            )),
        })
    }

    /// Resume a paused session, folding the open pause interval into
    /// `total_paused_secs`.
    pub fn resume(&self, now: DateTime<Utc>) -> Result<Transition> {
        if self.status != SessionStatus::Paused {
            return Err(self.invalid("resume"));
        }
        let mut session = self.clone();
        session.fold_open_pause(now);
        session.status = SessionStatus::Running;
        Ok(Transition {
            session,
            task: None,
            audit: Some(AuditEntry::new(
                TaskEventKind::SessionResumed,
                format!("{} session resumed", self.kind),
            )),
        })
    }

    /// Record an interruption. Valid while the session is active; the
    /// status and all timestamps are left untouched.
    pub fn interrupt(&self) -> Result<Transition> {
        if !self.status.is_active() {
            return Err(self.invalid("interrupt"));
        }
        let mut session = self.clone();
        session.interruption_count += 1;
        let audit = Some(AuditEntry::new(
            TaskEventKind::SessionInterrupted,
            format!("interruption {} recorded", session.interruption_count),
        ));
        Ok(Transition {
            session,
            task: None,
            audit,
        })
    }

    /// Cancel an active session.
    ///
    /// `other_active_for_task` tells the engine whether another active
    /// session still references the task; if not, and the task's estimate is
    /// not yet met, the task falls back to `pending`.
    pub fn cancel(
        &self,
        task: &Task,
        other_active_for_task: bool,
        now: DateTime<Utc>,
    ) -> Result<Transition> {
        if !self.status.is_active() {
            return Err(self.invalid("cancel"));
        }
        let mut session = self.clone();
        session.fold_open_pause(now);
        session.status = SessionStatus::Cancelled;
        session.finish(now);

        let task_patch = if !other_active_for_task && !task.is_fulfilled() {
            let mut task = task.clone();
            task.status = TaskStatus::Pending;
            task.updated_at = now;
            Some(task)
        } else {
            None
        };

        let minutes = session.actual_minutes.unwrap_or(0);
        Ok(Transition {
            session,
            task: task_patch,
            audit: Some(AuditEntry::new(
                TaskEventKind::SessionCancelled,
                format!("cancelled after {minutes} active minutes"),
            )),
        })
    }

    /// Complete an active session.
    ///
    /// A completed work session credits one pomodoro to the task; reaching
    /// the estimate marks the task completed and stamps `completed_at`.
    pub fn complete(&self, task: &Task, now: DateTime<Utc>) -> Result<Transition> {
        if !self.status.is_active() {
            return Err(self.invalid("complete"));
        }
        let mut session = self.clone();
        session.fold_open_pause(now);
        session.status = SessionStatus::Completed;
        session.finish(now);

        let task_patch = if session.kind == SessionKind::Work {
            let mut task = task.clone();
            task.completed_pomodoros += 1;
            task.updated_at = now;
            if task.is_fulfilled() {
                task.status = TaskStatus::Completed;
                task.completed_at = Some(now);
            }
            Some(task)
        } else {
            None
        };

        Ok(Transition {
            session,
            task: task_patch,
            audit: None,
        })
    }

    /// Wall-clock seconds elapsed since start, before subtracting pauses.
    pub fn wall_clock_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.started_at).num_seconds().max(0)
    }

    /// Planned seconds remaining, accounting for folded and open pauses.
    /// Saturates at zero for overrunning sessions.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> i64 {
        let mut paused = self.total_paused_secs;
        if let Some(pause_start) = self.pause_started_at {
            paused += (now - pause_start).num_seconds().max(0);
        }
        let active = (self.wall_clock_secs(now) - paused).max(0);
        (i64::from(self.planned_minutes) * 60 - active).max(0)
    }

    fn fold_open_pause(&mut self, now: DateTime<Utc>) {
        if let Some(pause_start) = self.pause_started_at.take() {
            self.total_paused_secs += (now - pause_start).num_seconds().max(0);
        }
    }

    /// Stamp `ended_at` and derive `actual_minutes` from net active seconds.
    /// Integer division: fractional minutes are discarded, never rounded.
    fn finish(&mut self, now: DateTime<Utc>) {
        self.ended_at = Some(now);
        let net = (self.wall_clock_secs(now) - self.total_paused_secs).max(0);
        self.actual_minutes = Some(net / 60);
    }

    fn invalid(&self, action: &'static str) -> CoreError {
        CoreError::InvalidTransition {
            action,
            status: self.status,
        }
    }
}
