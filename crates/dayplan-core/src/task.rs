use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

pub const RATIO_MIN: f64 = 0.0;
pub const RATIO_MAX: f64 = 100.0;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TaskState {
    #[default]
    Planned,
    Working,
    Closed,
}

impl TaskState {
    pub const ALL: [TaskState; 3] = [TaskState::Planned, TaskState::Working, TaskState::Closed];

    /// Planned -> Working -> Closed -> Planned.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Planned => Self::Working,
            Self::Working => Self::Closed,
            Self::Closed => Self::Planned,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "Planned",
            Self::Working => "Working",
            Self::Closed => "Closed",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| anyhow!("unknown task state: {wanted} (expected planned, working or closed)"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskRecord {
    pub text: String,

    #[serde(default)]
    pub state: TaskState,

    #[serde(default)]
    pub attr_ratio: Option<f64>,
}

impl TaskRecord {
    pub fn new_planned(text: String, attr_ratio: Option<f64>) -> Self {
        Self {
            text,
            state: TaskState::Planned,
            attr_ratio,
        }
    }

    /// Display line used by the task list: `text [State]` with ` (r%)` when a ratio is set.
    pub fn label(&self) -> String {
        match self.attr_ratio {
            Some(ratio) => format!("{} [{}] ({}%)", self.text, self.state, format_decimal(ratio)),
            None => format!("{} [{}]", self.text, self.state),
        }
    }
}

/// Parses user-entered ratio text. `None` when the text is not a finite number.
pub fn parse_ratio(raw: &str) -> Option<f64> {
    let value: f64 = raw.trim().parse().ok()?;
    clamp_ratio(value)
}

/// Rounds to two decimals (ties to even on the exact binary value) and clamps
/// into `[0, 100]`. Non-finite input is rejected.
pub fn clamp_ratio(value: f64) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    let rounded: f64 = format!("{value:.2}").parse().ok()?;
    let clamped = rounded.clamp(RATIO_MIN, RATIO_MAX);
    // normalise -0.0
    if clamped == 0.0 {
        Some(0.0)
    } else {
        Some(clamped)
    }
}

/// Formats like the stored JSON number: whole values keep one decimal (`8.0`).
pub fn format_decimal(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}
