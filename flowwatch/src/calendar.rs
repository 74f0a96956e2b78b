//! Trading-window gate.
//!
//! Pure logic over local wall-clock time, no IO. Collection is permitted on
//! weekdays from 09:00 through the 15:00 minute; every other instant maps to
//! the next 09:00 on a weekday.
//!
//! ```text
//! WeekendWait ──Mon 09:00──▶ Open ──15:01──▶ PostCloseWait ──next weekday 09:00──▶ Open
//!                             ▲
//! PreOpenWait ───09:00────────┘
//! ```

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use std::fmt;

pub const OPEN_HOUR: u32 = 9;
pub const CLOSE_HOUR: u32 = 15;

/// Where an instant falls relative to the trading window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    WeekendWait,
    PreOpenWait,
    PostCloseWait,
    Open,
}

impl GateState {
    pub fn classify(now: NaiveDateTime) -> Self {
        if is_weekend(now.date()) {
            GateState::WeekendWait
        } else if now.hour() < OPEN_HOUR {
            GateState::PreOpenWait
        } else if now.hour() > CLOSE_HOUR || (now.hour() == CLOSE_HOUR && now.minute() > 0) {
            GateState::PostCloseWait
        } else {
            GateState::Open
        }
    }

    pub fn is_open(self) -> bool {
        self == GateState::Open
    }
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GateState::WeekendWait => "weekend",
            GateState::PreOpenWait => "pre-open",
            GateState::PostCloseWait => "post-close",
            GateState::Open => "open",
        };
        f.write_str(label)
    }
}

/// Outcome of checking the gate at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Open,
    Closed {
        state: GateState,
        resume_at: NaiveDateTime,
    },
}

pub fn decide(now: NaiveDateTime) -> GateDecision {
    let state = GateState::classify(now);
    let resume_at = match state {
        GateState::Open => return GateDecision::Open,
        GateState::WeekendWait => {
            let days_to_monday = 7 - u64::from(now.weekday().num_days_from_monday());
            opening_on(now.date() + Days::new(days_to_monday))
        }
        GateState::PreOpenWait => opening_on(now.date()),
        GateState::PostCloseWait => opening_on(next_weekday(now.date())),
    };
    GateDecision::Closed { state, resume_at }
}

pub fn is_collection_window(now: NaiveDateTime) -> bool {
    GateState::classify(now).is_open()
}

/// The next instant collection is permitted; `now` itself when already open.
pub fn next_boundary(now: NaiveDateTime) -> NaiveDateTime {
    match decide(now) {
        GateDecision::Open => now,
        GateDecision::Closed { resume_at, .. } => resume_at,
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn next_weekday(date: NaiveDate) -> NaiveDate {
    let mut next = date + Days::new(1);
    while is_weekend(next) {
        next = next + Days::new(1);
    }
    next
}

fn opening_on(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(OPEN_HOUR, 0, 0).unwrap_or(NaiveTime::MIN))
}
