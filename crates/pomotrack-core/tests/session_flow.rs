//! End-to-end session lifecycle tests on an in-memory database with a
//! manually driven clock.

use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeZone, Utc};
use pomotrack_core::{
    CadenceConfig, Clock, CoreError, Database, SessionDirectory, SessionKind, SessionStatus, Task,
    TaskStatus,
};

struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    fn starting_at(t: DateTime<Utc>) -> Self {
        Self(Mutex::new(t))
    }

    fn advance(&self, d: Duration) {
        *self.0.lock().unwrap() += d;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
}

fn directory() -> SessionDirectory<ManualClock> {
    let db = Database::open_memory().unwrap();
    SessionDirectory::with_clock(
        db,
        CadenceConfig::default(),
        ManualClock::starting_at(t0()),
    )
}

fn seeded_task(dir: &SessionDirectory<ManualClock>, owner: &str, estimate: u32) -> Task {
    let task = Task::new(owner, "deep work", estimate);
    dir.save_task(&task).unwrap();
    task
}

#[test]
fn single_pomodoro_task_runs_to_completion() {
    let dir = directory();
    let task = seeded_task(&dir, "mina", 1);

    let session = dir.start("mina", &task.id, SessionKind::Work).unwrap();
    assert_eq!(session.status, SessionStatus::Running);
    assert_eq!(session.planned_minutes, 25);
    assert_eq!(
        dir.get_task("mina", &task.id).unwrap().status,
        TaskStatus::InProgress
    );

    dir.clock().advance(Duration::minutes(25));
    let completion = dir.complete("mina", &session.id).unwrap();
    assert_eq!(completion.session.status, SessionStatus::Completed);
    assert_eq!(completion.session.actual_minutes, Some(25));
    assert_eq!(completion.task.completed_pomodoros, 1);
    assert_eq!(completion.task.status, TaskStatus::Completed);
    assert!(completion.task.completed_at.is_some());
    assert!(completion.task_completed);
}

#[test]
fn pause_accounting_discards_fractional_minutes() {
    let dir = directory();
    let task = seeded_task(&dir, "mina", 2);
    let session = dir.start("mina", &task.id, SessionKind::Work).unwrap();

    dir.clock().advance(Duration::minutes(5));
    dir.pause("mina", &session.id).unwrap();
    dir.clock().advance(Duration::minutes(5));
    dir.resume("mina", &session.id).unwrap();
    dir.clock().advance(Duration::minutes(15));
    let completion = dir.complete("mina", &session.id).unwrap();

    // 25 min wall clock, one 5 min pause: floor((1500 - 300) / 60) = 20.
    assert_eq!(completion.session.total_paused_secs, 300);
    assert_eq!(completion.session.actual_minutes, Some(20));
    assert_eq!(completion.session.pause_count, 1);
}

#[test]
fn completing_from_paused_folds_the_open_pause() {
    let dir = directory();
    let task = seeded_task(&dir, "mina", 2);
    let session = dir.start("mina", &task.id, SessionKind::Work).unwrap();

    dir.clock().advance(Duration::minutes(10));
    dir.pause("mina", &session.id).unwrap();
    dir.clock().advance(Duration::minutes(20));
    let completion = dir.complete("mina", &session.id).unwrap();

    assert_eq!(completion.session.total_paused_secs, 1200);
    assert_eq!(completion.session.actual_minutes, Some(10));
}

#[test]
fn cancel_returns_the_task_to_pending() {
    let dir = directory();
    let task = seeded_task(&dir, "mina", 2);
    let session = dir.start("mina", &task.id, SessionKind::Work).unwrap();
    assert_eq!(
        dir.get_task("mina", &task.id).unwrap().status,
        TaskStatus::InProgress
    );

    dir.clock().advance(Duration::minutes(12));
    let cancelled = dir.cancel("mina", &session.id).unwrap();
    assert_eq!(cancelled.status, SessionStatus::Cancelled);
    assert_eq!(cancelled.actual_minutes, Some(12));
    assert!(cancelled.ended_at.is_some());
    assert_eq!(
        dir.get_task("mina", &task.id).unwrap().status,
        TaskStatus::Pending
    );
}

#[test]
fn interrupt_counts_without_ending_the_session() {
    let dir = directory();
    let task = seeded_task(&dir, "mina", 2);
    let session = dir.start("mina", &task.id, SessionKind::Work).unwrap();

    let after = dir.interrupt("mina", &session.id).unwrap();
    assert_eq!(after.status, SessionStatus::Running);
    assert_eq!(after.interruption_count, 1);

    dir.pause("mina", &session.id).unwrap();
    let after = dir.interrupt("mina", &session.id).unwrap();
    assert_eq!(after.status, SessionStatus::Paused);
    assert_eq!(after.interruption_count, 2);
}

#[test]
fn fulfilled_task_rejects_new_work_sessions() {
    let dir = directory();
    let task = seeded_task(&dir, "mina", 1);
    let session = dir.start("mina", &task.id, SessionKind::Work).unwrap();
    dir.clock().advance(Duration::minutes(25));
    dir.complete("mina", &session.id).unwrap();

    let err = dir.start("mina", &task.id, SessionKind::Work).unwrap_err();
    assert!(matches!(err, CoreError::Policy { .. }));
    // Breaks are still allowed on the fulfilled task.
    assert!(dir.start("mina", &task.id, SessionKind::ShortBreak).is_ok());
}

#[test]
fn cadence_over_a_full_day() {
    let dir = directory();
    let task = seeded_task(&dir, "mina", 10);

    for round in 1..=8u32 {
        let work = dir.start("mina", &task.id, SessionKind::Work).unwrap();
        dir.clock().advance(Duration::minutes(25));
        let completion = dir.complete("mina", &work.id).unwrap();
        let expected = if round % 4 == 0 {
            SessionKind::LongBreak
        } else {
            SessionKind::ShortBreak
        };
        assert_eq!(completion.next_kind, expected, "work round {round}");

        let brk = dir.start("mina", &task.id, completion.next_kind).unwrap();
        dir.clock().advance(Duration::minutes(5));
        let completion = dir.complete("mina", &brk.id).unwrap();
        assert_eq!(completion.next_kind, SessionKind::Work);
    }
}

#[test]
fn owners_are_isolated_from_each_other() {
    let dir = directory();
    let mina_task = seeded_task(&dir, "mina", 2);
    let sol_task = seeded_task(&dir, "sol", 2);

    let mina_session = dir.start("mina", &mina_task.id, SessionKind::Work).unwrap();
    // A second owner gets their own active slot.
    let sol_session = dir.start("sol", &sol_task.id, SessionKind::Work).unwrap();

    assert_eq!(
        dir.get_active("mina").unwrap().unwrap().session.id,
        mina_session.id
    );
    assert_eq!(
        dir.get_active("sol").unwrap().unwrap().session.id,
        sol_session.id
    );
}

#[test]
fn second_pause_is_rejected_and_changes_nothing() {
    let dir = directory();
    let task = seeded_task(&dir, "mina", 2);
    let session = dir.start("mina", &task.id, SessionKind::Work).unwrap();

    dir.clock().advance(Duration::minutes(3));
    let first = dir.pause("mina", &session.id).unwrap();
    let err = dir.pause("mina", &session.id).unwrap_err();
    assert!(matches!(
        err,
        CoreError::InvalidTransition {
            action: "pause",
            status: SessionStatus::Paused
        }
    ));

    let snapshot = dir.get_active("mina").unwrap().unwrap();
    assert_eq!(snapshot.session.pause_count, first.pause_count);
    assert_eq!(snapshot.session.status, SessionStatus::Paused);
}

#[test]
fn terminal_sessions_reject_further_actions() {
    let dir = directory();
    let task = seeded_task(&dir, "mina", 2);
    let session = dir.start("mina", &task.id, SessionKind::Work).unwrap();
    dir.clock().advance(Duration::minutes(25));
    dir.complete("mina", &session.id).unwrap();

    for result in [
        dir.pause("mina", &session.id),
        dir.resume("mina", &session.id),
        dir.interrupt("mina", &session.id),
        dir.cancel("mina", &session.id),
    ] {
        assert!(matches!(
            result.unwrap_err(),
            CoreError::InvalidTransition { .. }
        ));
    }
    assert!(matches!(
        dir.complete("mina", &session.id).unwrap_err(),
        CoreError::InvalidTransition { .. }
    ));
}
