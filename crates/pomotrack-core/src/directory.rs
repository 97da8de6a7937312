//! Session directory: the single entry point for session actions.
//!
//! The directory upholds the at-most-one-active-session-per-owner invariant.
//! Requests are serialized on the database lock, and the start existence
//! check runs inside the same storage transaction as the insert, so two
//! racing `start` calls cannot both succeed. Transitions themselves are
//! computed by the pure session state machine; the directory only fetches
//! the inputs and applies the result atomically.

use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::cadence::{self, CadenceConfig};
use crate::clock::{Clock, SystemClock};
use crate::error::{CoreError, Result};
use crate::session::{Session, SessionKind};
use crate::storage::{Database, DayStats};
use crate::task::{Task, TaskStatus};

/// The result of completing a session: the terminal session, the task
/// snapshot after crediting, and the suggested next interval kind.
/// `task_completed` is set when this completion finished the task, so
/// callers can trigger their task-complete notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    pub session: Session,
    pub task: Task,
    pub next_kind: SessionKind,
    pub task_completed: bool,
}

/// An active session plus its remaining planned time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveSnapshot {
    pub session: Session,
    pub remaining_secs: i64,
}

/// Maps each owner to at most one active session and routes the session
/// actions to it.
pub struct SessionDirectory<C: Clock = SystemClock> {
    db: Mutex<Database>,
    defaults: CadenceConfig,
    clock: C,
}

impl SessionDirectory<SystemClock> {
    pub fn new(db: Database, defaults: CadenceConfig) -> Self {
        Self::with_clock(db, defaults, SystemClock)
    }
}

impl<C: Clock> SessionDirectory<C> {
    pub fn with_clock(db: Database, defaults: CadenceConfig, clock: C) -> Self {
        Self {
            db: Mutex::new(db),
            defaults,
            clock,
        }
    }

    /// The clock this directory reads time from.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn lock(&self) -> MutexGuard<'_, Database> {
        // A poisoned lock only means another request panicked mid-call;
        // the database itself stays consistent (transactions), so recover.
        self.db.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start a new session on `task_id` for `owner`.
    ///
    /// Fails with `Conflict` if the owner already has an active session,
    /// `Policy` if a work session is requested on a fulfilled task, and
    /// `NotFound` if the task is absent or owned by someone else.
    pub fn start(&self, owner: &str, task_id: &str, kind: SessionKind) -> Result<Session> {
        let mut db = self.lock();
        let now = self.clock.now();
        let task = db
            .get_task(owner, task_id)?
            .ok_or_else(|| not_found("task", task_id))?;
        let config = db.cadence_config(owner)?.unwrap_or(self.defaults);
        let transition = Session::start(&task, kind, &config, now)?;
        db.start_session(&transition)?;
        Ok(transition.session)
    }

    /// Pause the owner's running session.
    pub fn pause(&self, owner: &str, session_id: &str) -> Result<Session> {
        let mut db = self.lock();
        let now = self.clock.now();
        let session = fetch_session(&db, owner, session_id)?;
        let transition = session.pause(now)?;
        db.apply_transition(&transition, now)?;
        Ok(transition.session)
    }

    /// Resume the owner's paused session.
    pub fn resume(&self, owner: &str, session_id: &str) -> Result<Session> {
        let mut db = self.lock();
        let now = self.clock.now();
        let session = fetch_session(&db, owner, session_id)?;
        let transition = session.resume(now)?;
        db.apply_transition(&transition, now)?;
        Ok(transition.session)
    }

    /// Record an interruption on an active session.
    pub fn interrupt(&self, owner: &str, session_id: &str) -> Result<Session> {
        let mut db = self.lock();
        let now = self.clock.now();
        let session = fetch_session(&db, owner, session_id)?;
        let transition = session.interrupt()?;
        db.apply_transition(&transition, now)?;
        Ok(transition.session)
    }

    /// Cancel an active session.
    pub fn cancel(&self, owner: &str, session_id: &str) -> Result<Session> {
        let mut db = self.lock();
        let now = self.clock.now();
        let session = fetch_session(&db, owner, session_id)?;
        let task = db
            .get_task(owner, &session.task_id)?
            .ok_or_else(|| not_found("task", &session.task_id))?;
        let others = db.active_count_for_task(&session.task_id, &session.id)? > 0;
        let transition = session.cancel(&task, others, now)?;
        db.apply_transition(&transition, now)?;
        Ok(transition.session)
    }

    /// Complete an active session and report the suggested next interval.
    pub fn complete(&self, owner: &str, session_id: &str) -> Result<Completion> {
        let mut db = self.lock();
        let now = self.clock.now();
        let session = fetch_session(&db, owner, session_id)?;
        let task = db
            .get_task(owner, &session.task_id)?
            .ok_or_else(|| not_found("task", &session.task_id))?;
        let transition = session.complete(&task, now)?;
        db.apply_transition(&transition, now)?;

        let config = db.cadence_config(owner)?.unwrap_or(self.defaults);
        let completed_today = if session.kind == SessionKind::Work {
            db.completed_work_on(owner, now)?
        } else {
            0
        };
        let next_kind = cadence::next_kind(session.kind, completed_today, &config);

        let task_completed = transition
            .task
            .as_ref()
            .is_some_and(|t| t.status == TaskStatus::Completed);
        let task = transition.task.unwrap_or(task);
        Ok(Completion {
            session: transition.session,
            task,
            next_kind,
            task_completed,
        })
    }

    /// The owner's active session, if any, with its remaining planned time.
    pub fn get_active(&self, owner: &str) -> Result<Option<ActiveSnapshot>> {
        let db = self.lock();
        let now = self.clock.now();
        Ok(db.find_active(owner)?.map(|session| {
            let remaining_secs = session.remaining_secs(now);
            ActiveSnapshot {
                session,
                remaining_secs,
            }
        }))
    }

    /// Effective cadence config for an owner (saved settings or defaults).
    pub fn cadence_config(&self, owner: &str) -> Result<CadenceConfig> {
        let db = self.lock();
        Ok(db.cadence_config(owner)?.unwrap_or(self.defaults))
    }

    /// Save per-owner cadence settings.
    pub fn set_cadence_config(&self, owner: &str, config: &CadenceConfig) -> Result<()> {
        let db = self.lock();
        db.set_cadence_config(owner, config)
    }

    /// Today's read-only session aggregates for an owner.
    pub fn day_stats(&self, owner: &str) -> Result<DayStats> {
        let db = self.lock();
        Ok(db.day_stats(owner, self.clock.now())?)
    }

    /// Create a task through the directory's ledger (external collaborator
    /// convenience; the engine itself never creates tasks).
    pub fn save_task(&self, task: &Task) -> Result<()> {
        let db = self.lock();
        Ok(db.save_task(task)?)
    }

    pub fn get_task(&self, owner: &str, task_id: &str) -> Result<Task> {
        let db = self.lock();
        db.get_task(owner, task_id)?
            .ok_or_else(|| not_found("task", task_id))
    }

    pub fn list_tasks(&self, owner: &str) -> Result<Vec<Task>> {
        let db = self.lock();
        Ok(db.list_tasks(owner)?)
    }

    /// The audit trail for one of the owner's tasks, oldest first.
    pub fn task_events(&self, owner: &str, task_id: &str) -> Result<Vec<crate::events::TaskEvent>> {
        let db = self.lock();
        db.get_task(owner, task_id)?
            .ok_or_else(|| not_found("task", task_id))?;
        Ok(db.events_for_task(task_id)?)
    }
}

fn fetch_session(db: &Database, owner: &str, session_id: &str) -> Result<Session> {
    db.get_session(owner, session_id)?
        .ok_or_else(|| not_found("session", session_id))
}

fn not_found(entity: &'static str, id: &str) -> CoreError {
    CoreError::NotFound {
        entity,
        id: id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStatus;

    fn directory() -> SessionDirectory {
        let db = Database::open_memory().unwrap();
        SessionDirectory::new(db, CadenceConfig::default())
    }

    fn seeded_task(dir: &SessionDirectory, estimate: u32) -> Task {
        let task = Task::new("mina", "refactor parser", estimate);
        dir.save_task(&task).unwrap();
        task
    }

    #[test]
    fn start_rejects_second_active_session() {
        let dir = directory();
        let task = seeded_task(&dir, 3);
        dir.start("mina", &task.id, SessionKind::Work).unwrap();
        let err = dir.start("mina", &task.id, SessionKind::Work).unwrap_err();
        assert!(matches!(err, CoreError::Conflict { .. }));
    }

    #[test]
    fn start_on_missing_task_is_not_found() {
        let dir = directory();
        let err = dir.start("mina", "task-0-missing", SessionKind::Work).unwrap_err();
        assert!(matches!(err, CoreError::NotFound { entity: "task", .. }));
    }

    #[test]
    fn actions_are_scoped_to_the_owner() {
        let dir = directory();
        let task = seeded_task(&dir, 3);
        let session = dir.start("mina", &task.id, SessionKind::Work).unwrap();
        let err = dir.pause("sol", &session.id).unwrap_err();
        assert!(matches!(err, CoreError::NotFound { entity: "session", .. }));
    }

    #[test]
    fn get_active_tracks_the_lifecycle() {
        let dir = directory();
        let task = seeded_task(&dir, 3);
        assert!(dir.get_active("mina").unwrap().is_none());

        let session = dir.start("mina", &task.id, SessionKind::Work).unwrap();
        let snapshot = dir.get_active("mina").unwrap().unwrap();
        assert_eq!(snapshot.session.id, session.id);
        assert!(snapshot.remaining_secs <= 25 * 60);

        dir.pause("mina", &session.id).unwrap();
        assert!(dir.get_active("mina").unwrap().is_some());

        dir.cancel("mina", &session.id).unwrap();
        assert!(dir.get_active("mina").unwrap().is_none());
    }

    #[test]
    fn complete_reports_next_kind_and_task_completion() {
        let dir = directory();
        let task = seeded_task(&dir, 1);
        let session = dir.start("mina", &task.id, SessionKind::Work).unwrap();
        let completion = dir.complete("mina", &session.id).unwrap();
        assert_eq!(completion.session.status, SessionStatus::Completed);
        assert_eq!(completion.task.completed_pomodoros, 1);
        assert!(completion.task_completed);
        // First completed work interval of the day: 1 % 4 != 0.
        assert_eq!(completion.next_kind, SessionKind::ShortBreak);
    }

    #[test]
    fn completing_a_break_suggests_work() {
        let dir = directory();
        let task = seeded_task(&dir, 1);
        let session = dir.start("mina", &task.id, SessionKind::ShortBreak).unwrap();
        let completion = dir.complete("mina", &session.id).unwrap();
        assert_eq!(completion.next_kind, SessionKind::Work);
        assert!(!completion.task_completed);
    }

    #[test]
    fn start_after_fulfillment_is_a_policy_error() {
        let dir = directory();
        let task = seeded_task(&dir, 1);
        let session = dir.start("mina", &task.id, SessionKind::Work).unwrap();
        dir.complete("mina", &session.id).unwrap();
        let err = dir.start("mina", &task.id, SessionKind::Work).unwrap_err();
        assert!(matches!(err, CoreError::Policy { .. }));
    }

    #[test]
    fn failed_transition_leaves_state_untouched() {
        let dir = directory();
        let task = seeded_task(&dir, 2);
        let session = dir.start("mina", &task.id, SessionKind::Work).unwrap();
        dir.pause("mina", &session.id).unwrap();
        let err = dir.pause("mina", &session.id).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));

        let snapshot = dir.get_active("mina").unwrap().unwrap();
        assert_eq!(snapshot.session.status, SessionStatus::Paused);
        assert_eq!(snapshot.session.pause_count, 1);
    }

    #[test]
    fn per_owner_cadence_settings_override_defaults() {
        let dir = directory();
        let custom = CadenceConfig {
            work_minutes: 50,
            ..CadenceConfig::default()
        };
        dir.set_cadence_config("mina", &custom).unwrap();
        assert_eq!(dir.cadence_config("mina").unwrap().work_minutes, 50);
        assert_eq!(dir.cadence_config("sol").unwrap().work_minutes, 25);

        let task = seeded_task(&dir, 2);
        let session = dir.start("mina", &task.id, SessionKind::Work).unwrap();
        assert_eq!(session.planned_minutes, 50);
    }
}
