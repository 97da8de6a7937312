//! # Pomotrack Core Library
//!
//! Core business logic for Pomotrack: tasks with pomodoro progress counters
//! and the focus-session state machine that drives them. The CLI binary is a
//! thin request layer over this library, and any other frontend is expected
//! to be the same.
//!
//! ## Architecture
//!
//! - **Session state machine**: pure transitions over one timed interval
//!   (running, paused, completed, cancelled), with pause accounting in whole
//!   seconds and completion side-effects on the owning task
//! - **Cadence policy**: a pure function choosing the next interval kind
//!   from per-user settings and the day's completed work count
//! - **Session directory**: the single entry point, holding the
//!   one-active-session-per-owner invariant inside the storage transaction
//! - **Storage**: SQLite task/session/audit persistence and TOML app config
//!
//! ## Key Components
//!
//! - [`Session`]: interval record and its transition methods
//! - [`SessionDirectory`]: request routing and invariant enforcement
//! - [`CadenceConfig`] / [`next_kind`]: work/break sequencing
//! - [`Database`]: persistence layer

pub mod cadence;
pub mod clock;
pub mod directory;
pub mod error;
pub mod events;
pub mod session;
pub mod storage;
pub mod task;

pub use cadence::{next_kind, CadenceConfig};
pub use clock::{Clock, SystemClock};
pub use directory::{ActiveSnapshot, Completion, SessionDirectory};
pub use error::{ConfigError, CoreError, DatabaseError, Result};
pub use events::{TaskEvent, TaskEventKind};
pub use session::{Session, SessionKind, SessionStatus, Transition};
pub use storage::{Config, Database, DayStats};
pub use task::{Task, TaskStatus};
