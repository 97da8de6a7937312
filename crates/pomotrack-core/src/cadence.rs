//! Cadence policy: per-user interval durations and the work/break sequencing
//! rule.
//!
//! `next_kind` is a pure function so the sequencing rule can be tested
//! without a session engine or storage behind it.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::session::SessionKind;

/// Per-user cadence configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CadenceConfig {
    /// Work interval duration in minutes (1-60).
    #[serde(default = "default_work_minutes")]
    pub work_minutes: u32,
    /// Short break duration in minutes (1-30).
    #[serde(default = "default_short_break_minutes")]
    pub short_break_minutes: u32,
    /// Long break duration in minutes (1-60).
    #[serde(default = "default_long_break_minutes")]
    pub long_break_minutes: u32,
    /// Completed work intervals before a long break (1-10).
    #[serde(default = "default_pomodoros_until_long_break")]
    pub pomodoros_until_long_break: u32,
    /// Start breaks automatically after a work interval completes.
    #[serde(default = "default_true")]
    pub auto_start_breaks: bool,
    /// Start work intervals automatically after a break completes.
    #[serde(default)]
    pub auto_start_pomodoros: bool,
}

fn default_work_minutes() -> u32 {
    25
}
fn default_short_break_minutes() -> u32 {
    5
}
fn default_long_break_minutes() -> u32 {
    15
}
fn default_pomodoros_until_long_break() -> u32 {
    4
}
fn default_true() -> bool {
    true
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            work_minutes: default_work_minutes(),
            short_break_minutes: default_short_break_minutes(),
            long_break_minutes: default_long_break_minutes(),
            pomodoros_until_long_break: default_pomodoros_until_long_break(),
            auto_start_breaks: true,
            auto_start_pomodoros: false,
        }
    }
}

impl CadenceConfig {
    /// Validate the configured bounds before persisting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks: [(&str, u32, u32, u32); 4] = [
            ("work_minutes", self.work_minutes, 1, 60),
            ("short_break_minutes", self.short_break_minutes, 1, 30),
            ("long_break_minutes", self.long_break_minutes, 1, 60),
            (
                "pomodoros_until_long_break",
                self.pomodoros_until_long_break,
                1,
                10,
            ),
        ];
        for (key, value, min, max) in checks {
            if value < min || value > max {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("{value} is outside {min}..={max}"),
                });
            }
        }
        Ok(())
    }

    /// Planned duration in minutes for a session of the given kind.
    pub fn duration_for(&self, kind: SessionKind) -> u32 {
        match kind {
            SessionKind::Work => self.work_minutes,
            SessionKind::ShortBreak => self.short_break_minutes,
            SessionKind::LongBreak => self.long_break_minutes,
        }
    }
}

/// Choose the kind of the next interval after one has completed.
///
/// A finished break is always followed by work. A finished work interval is
/// followed by a long break every `pomodoros_until_long_break`-th completed
/// work interval of the day (counting the one just finished), otherwise by a
/// short break.
pub fn next_kind(
    finished: SessionKind,
    completed_work_today: u32,
    config: &CadenceConfig,
) -> SessionKind {
    if finished != SessionKind::Work {
        return SessionKind::Work;
    }
    let threshold = config.pomodoros_until_long_break.max(1);
    if completed_work_today % threshold == 0 {
        SessionKind::LongBreak
    } else {
        SessionKind::ShortBreak
    }
}
