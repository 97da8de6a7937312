//! SQLite-backed storage for tasks, sessions, audit events, and per-owner
//! cadence settings.
//!
//! The two composite operations (`start_session`, `apply_transition`) run
//! inside a single rusqlite transaction: the session check-and-write and any
//! task ledger update commit together or not at all. Everything else is a
//! plain read.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Transaction};

use super::data_dir;
use crate::cadence::CadenceConfig;
use crate::error::{CoreError, DatabaseError, Result};
use crate::events::{AuditEntry, TaskEvent, TaskEventKind};
use crate::session::{Session, SessionKind, SessionStatus, Transition};
use crate::task::{Task, TaskStatus};

/// Read-only daily aggregates, computed over sessions started on one
/// calendar day. Never consulted by transition logic.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct DayStats {
    pub completed_pomodoros: u32,
    pub focus_minutes: i64,
    pub pause_count: u32,
    pub interruption_count: u32,
}

/// SQLite database holding the task ledger and session history.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/pomotrack/pomotrack.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("pomotrack.db");
        let conn = Connection::open(&path).map_err(|source| DatabaseError::OpenFailed {
            path: path.clone(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(db)
    }

    /// Open an in-memory database (for tests and ephemeral use).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(DatabaseError::from)?;
        let db = Self { conn };
        db.migrate()
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS tasks (
                id                  TEXT PRIMARY KEY,
                owner               TEXT NOT NULL,
                title               TEXT NOT NULL,
                description         TEXT,
                status              TEXT NOT NULL,
                estimated_pomodoros INTEGER NOT NULL,
                completed_pomodoros INTEGER NOT NULL DEFAULT 0,
                created_at          TEXT NOT NULL,
                updated_at          TEXT NOT NULL,
                completed_at        TEXT
            );

            CREATE TABLE IF NOT EXISTS sessions (
                id                 TEXT PRIMARY KEY,
                owner              TEXT NOT NULL,
                task_id            TEXT NOT NULL REFERENCES tasks(id),
                kind               TEXT NOT NULL,
                status             TEXT NOT NULL,
                started_at         TEXT NOT NULL,
                ended_at           TEXT,
                planned_minutes    INTEGER NOT NULL,
                actual_minutes     INTEGER,
                pause_count        INTEGER NOT NULL DEFAULT 0,
                total_paused_secs  INTEGER NOT NULL DEFAULT 0,
                pause_started_at   TEXT,
                interruption_count INTEGER NOT NULL DEFAULT 0,
                notes              TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE IF NOT EXISTS task_events (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                task_id     TEXT NOT NULL,
                event_type  TEXT NOT NULL,
                description TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS cadence_settings (
                owner                      TEXT PRIMARY KEY,
                work_minutes               INTEGER NOT NULL,
                short_break_minutes        INTEGER NOT NULL,
                long_break_minutes         INTEGER NOT NULL,
                pomodoros_until_long_break INTEGER NOT NULL,
                auto_start_breaks          INTEGER NOT NULL,
                auto_start_pomodoros       INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_owner_status_started
                ON sessions(owner, status, started_at);
            CREATE INDEX IF NOT EXISTS idx_sessions_task_kind
                ON sessions(task_id, kind);
            CREATE INDEX IF NOT EXISTS idx_tasks_owner ON tasks(owner);
            CREATE INDEX IF NOT EXISTS idx_task_events_task ON task_events(task_id);",
        )?;
        Ok(())
    }

    // ── Tasks ────────────────────────────────────────────────────────

    /// Insert or update a task record.
    pub fn save_task(&self, task: &Task) -> Result<(), DatabaseError> {
        put_task(&self.conn, task)?;
        Ok(())
    }

    pub fn get_task(&self, owner: &str, id: &str) -> Result<Option<Task>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, owner, title, description, status, estimated_pomodoros,
                    completed_pomodoros, created_at, updated_at, completed_at
             FROM tasks WHERE id = ?1 AND owner = ?2",
        )?;
        let mut rows = stmt.query_map(params![id, owner], row_to_task)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    pub fn list_tasks(&self, owner: &str) -> Result<Vec<Task>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, owner, title, description, status, estimated_pomodoros,
                    completed_pomodoros, created_at, updated_at, completed_at
             FROM tasks WHERE owner = ?1 ORDER BY created_at",
        )?;
        let rows = stmt.query_map(params![owner], row_to_task)?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok(tasks)
    }

    // ── Sessions ─────────────────────────────────────────────────────

    pub fn get_session(&self, owner: &str, id: &str) -> Result<Option<Session>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1 AND owner = ?2"
        ))?;
        let mut rows = stmt.query_map(params![id, owner], row_to_session)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// The owner's running or paused session, if any.
    pub fn find_active(&self, owner: &str) -> Result<Option<Session>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions
             WHERE owner = ?1 AND status IN ('running', 'paused')
             ORDER BY started_at DESC"
        ))?;
        let mut rows = stmt.query_map(params![owner], row_to_session)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Count active sessions referencing `task_id`, excluding one session.
    pub fn active_count_for_task(
        &self,
        task_id: &str,
        exclude_session_id: &str,
    ) -> Result<u32, DatabaseError> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM sessions
             WHERE task_id = ?1 AND id != ?2 AND status IN ('running', 'paused')",
            params![task_id, exclude_session_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Persist a freshly started session.
    ///
    /// The uniqueness invariant is enforced here, inside the transaction:
    /// the active-session existence check and the insert commit as one unit,
    /// so two racing starts cannot both succeed.
    pub fn start_session(&mut self, transition: &Transition) -> Result<()> {
        let tx = self.conn.transaction().map_err(DatabaseError::from)?;
        let owner = transition.session.owner.as_str();
        let active: u32 = tx
            .query_row(
                "SELECT COUNT(*) FROM sessions
                 WHERE owner = ?1 AND status IN ('running', 'paused')",
                params![owner],
                |row| row.get(0),
            )
            .map_err(DatabaseError::from)?;
        if active > 0 {
            return Err(CoreError::Conflict {
                owner: owner.to_string(),
            });
        }
        insert_session(&tx, &transition.session)?;
        if let Some(task) = &transition.task {
            put_task(&tx, task)?;
        }
        tx.commit().map_err(DatabaseError::from)?;
        Ok(())
    }

    /// Apply a computed transition: session update, task patch, and audit
    /// entry commit together or not at all.
    pub fn apply_transition(&mut self, transition: &Transition, now: DateTime<Utc>) -> Result<()> {
        let tx = self.conn.transaction().map_err(DatabaseError::from)?;
        update_session(&tx, &transition.session)?;
        if let Some(task) = &transition.task {
            put_task(&tx, task)?;
        }
        if let Some(audit) = &transition.audit {
            insert_event(&tx, &transition.session.task_id, audit, now)?;
        }
        tx.commit().map_err(DatabaseError::from)?;
        Ok(())
    }

    // ── Cadence settings ─────────────────────────────────────────────

    /// Per-owner cadence settings, if the owner has saved any.
    pub fn cadence_config(&self, owner: &str) -> Result<Option<CadenceConfig>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT work_minutes, short_break_minutes, long_break_minutes,
                    pomodoros_until_long_break, auto_start_breaks, auto_start_pomodoros
             FROM cadence_settings WHERE owner = ?1",
        )?;
        let mut rows = stmt.query_map(params![owner], |row| {
            Ok(CadenceConfig {
                work_minutes: row.get(0)?,
                short_break_minutes: row.get(1)?,
                long_break_minutes: row.get(2)?,
                pomodoros_until_long_break: row.get(3)?,
                auto_start_breaks: row.get::<_, i64>(4)? != 0,
                auto_start_pomodoros: row.get::<_, i64>(5)? != 0,
            })
        })?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Save per-owner cadence settings after validating their bounds.
    pub fn set_cadence_config(&self, owner: &str, config: &CadenceConfig) -> Result<()> {
        config.validate()?;
        self.conn
            .execute(
                "INSERT OR REPLACE INTO cadence_settings
                 (owner, work_minutes, short_break_minutes, long_break_minutes,
                  pomodoros_until_long_break, auto_start_breaks, auto_start_pomodoros)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    owner,
                    config.work_minutes,
                    config.short_break_minutes,
                    config.long_break_minutes,
                    config.pomodoros_until_long_break,
                    config.auto_start_breaks as i64,
                    config.auto_start_pomodoros as i64,
                ],
            )
            .map_err(DatabaseError::from)?;
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Completed work sessions started on the same calendar day as `now`.
    pub fn completed_work_on(
        &self,
        owner: &str,
        now: DateTime<Utc>,
    ) -> Result<u32, DatabaseError> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM sessions
             WHERE owner = ?1 AND kind = 'work' AND status = 'completed'
               AND date(started_at) = date(?2)",
            params![owner, now.to_rfc3339()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Aggregates over sessions started on the same calendar day as `now`.
    pub fn day_stats(&self, owner: &str, now: DateTime<Utc>) -> Result<DayStats, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT kind, status, COALESCE(actual_minutes, 0), pause_count, interruption_count
             FROM sessions
             WHERE owner = ?1 AND date(started_at) = date(?2)",
        )?;
        let rows = stmt.query_map(params![owner, now.to_rfc3339()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, u32>(3)?,
                row.get::<_, u32>(4)?,
            ))
        })?;

        let mut stats = DayStats::default();
        for row in rows {
            let (kind, status, minutes, pauses, interruptions) = row?;
            if kind == "work" && status == "completed" {
                stats.completed_pomodoros += 1;
                stats.focus_minutes += minutes;
            }
            stats.pause_count += pauses;
            stats.interruption_count += interruptions;
        }
        Ok(stats)
    }

    /// The audit trail for one task, oldest first.
    pub fn events_for_task(&self, task_id: &str) -> Result<Vec<TaskEvent>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, task_id, event_type, description, created_at
             FROM task_events WHERE task_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![task_id], |row| {
            let kind_str: String = row.get(2)?;
            let created: String = row.get(4)?;
            Ok(TaskEvent {
                id: row.get(0)?,
                task_id: row.get(1)?,
                kind: parse_text(&kind_str, "event type", TaskEventKind::parse)?,
                description: row.get(3)?,
                created_at: parse_ts(&created)?,
            })
        })?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }
        Ok(events)
    }
}

const SESSION_COLUMNS: &str = "id, owner, task_id, kind, status, started_at, ended_at, \
     planned_minutes, actual_minutes, pause_count, total_paused_secs, \
     pause_started_at, interruption_count, notes";

// ── Row mapping ──────────────────────────────────────────────────────

fn parse_ts(s: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn parse_text<T>(
    s: &str,
    what: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, rusqlite::Error> {
    parse(s).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("unknown {what}: {s}").into(),
        )
    })
}

fn row_to_task(row: &rusqlite::Row<'_>) -> Result<Task, rusqlite::Error> {
    let status: String = row.get(4)?;
    let created: String = row.get(7)?;
    let updated: String = row.get(8)?;
    let completed: Option<String> = row.get(9)?;
    Ok(Task {
        id: row.get(0)?,
        owner: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        status: parse_text(&status, "task status", TaskStatus::parse)?,
        estimated_pomodoros: row.get(5)?,
        completed_pomodoros: row.get(6)?,
        created_at: parse_ts(&created)?,
        updated_at: parse_ts(&updated)?,
        completed_at: completed.as_deref().map(parse_ts).transpose()?,
    })
}

fn row_to_session(row: &rusqlite::Row<'_>) -> Result<Session, rusqlite::Error> {
    let kind: String = row.get(3)?;
    let status: String = row.get(4)?;
    let started: String = row.get(5)?;
    let ended: Option<String> = row.get(6)?;
    let pause_started: Option<String> = row.get(11)?;
    Ok(Session {
        id: row.get(0)?,
        owner: row.get(1)?,
        task_id: row.get(2)?,
        kind: parse_text(&kind, "session kind", SessionKind::parse)?,
        status: parse_text(&status, "session status", SessionStatus::parse)?,
        started_at: parse_ts(&started)?,
        ended_at: ended.as_deref().map(parse_ts).transpose()?,
        planned_minutes: row.get(7)?,
        actual_minutes: row.get(8)?,
        pause_count: row.get(9)?,
        total_paused_secs: row.get(10)?,
        pause_started_at: pause_started.as_deref().map(parse_ts).transpose()?,
        interruption_count: row.get(12)?,
        notes: row.get(13)?,
    })
}

// ── Write helpers (run inside or outside a transaction) ──────────────

fn put_task(conn: &Connection, task: &Task) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT OR REPLACE INTO tasks
         (id, owner, title, description, status, estimated_pomodoros,
          completed_pomodoros, created_at, updated_at, completed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            task.id,
            task.owner,
            task.title,
            task.description,
            task.status.as_str(),
            task.estimated_pomodoros,
            task.completed_pomodoros,
            task.created_at.to_rfc3339(),
            task.updated_at.to_rfc3339(),
            task.completed_at.map(|t| t.to_rfc3339()),
        ],
    )?;
    Ok(())
}

fn insert_session(tx: &Transaction<'_>, session: &Session) -> Result<(), DatabaseError> {
    tx.execute(
        "INSERT INTO sessions
         (id, owner, task_id, kind, status, started_at, ended_at, planned_minutes,
          actual_minutes, pause_count, total_paused_secs, pause_started_at,
          interruption_count, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            session.id,
            session.owner,
            session.task_id,
            session.kind.as_str(),
            session.status.as_str(),
            session.started_at.to_rfc3339(),
            session.ended_at.map(|t| t.to_rfc3339()),
            session.planned_minutes,
            session.actual_minutes,
            session.pause_count,
            session.total_paused_secs,
            session.pause_started_at.map(|t| t.to_rfc3339()),
            session.interruption_count,
            session.notes,
        ],
    )?;
    Ok(())
}

fn update_session(tx: &Transaction<'_>, session: &Session) -> Result<(), DatabaseError> {
    tx.execute(
        "UPDATE sessions SET
            status = ?2, ended_at = ?3, actual_minutes = ?4, pause_count = ?5,
            total_paused_secs = ?6, pause_started_at = ?7,
            interruption_count = ?8, notes = ?9
         WHERE id = ?1",
        params![
            session.id,
            session.status.as_str(),
            session.ended_at.map(|t| t.to_rfc3339()),
            session.actual_minutes,
            session.pause_count,
            session.total_paused_secs,
            session.pause_started_at.map(|t| t.to_rfc3339()),
            session.interruption_count,
            session.notes,
        ],
    )?;
    Ok(())
}

fn insert_event(
    tx: &Transaction<'_>,
    task_id: &str,
    audit: &AuditEntry,
    now: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    tx.execute(
        "INSERT INTO task_events (task_id, event_type, description, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![task_id, audit.kind.as_str(), audit.description, now.to_rfc3339()],
    )?;
    Ok(())
}
