//! Time-of-day and calendar-date windows used to gate replayed events

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};

/// Wall time compared as an (hour, minute) tuple
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    pub fn of(ts: &DateTime<Utc>) -> Self {
        Self {
            hour: ts.hour(),
            minute: ts.minute(),
        }
    }

    /// Parse `HH:MM`.
    pub fn from_str(s: &str) -> Option<Self> {
        let (h, m) = s.trim().split_once(':')?;
        Self::new(h.parse().ok()?, m.parse().ok()?)
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Calendar day compared as a (month, day) tuple; the year is ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthDay {
    pub month: u32,
    pub day: u32,
}

impl MonthDay {
    pub fn new(month: u32, day: u32) -> Option<Self> {
        ((1..=12).contains(&month) && (1..=31).contains(&day)).then_some(Self { month, day })
    }

    pub fn of(date: &NaiveDate) -> Self {
        Self {
            month: date.month(),
            day: date.day(),
        }
    }

    /// Parse `MM-DD`.
    pub fn from_str(s: &str) -> Option<Self> {
        let (m, d) = s.trim().split_once('-')?;
        Self::new(m.parse().ok()?, d.parse().ok()?)
    }
}

impl std::fmt::Display for MonthDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}-{:02}", self.month, self.day)
    }
}

/// Inclusive time-of-day bounds. No wraparound past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl TimeWindow {
    pub fn contains(&self, tod: TimeOfDay) -> bool {
        self.start <= tod && tod <= self.end
    }
}

/// Inclusive calendar-date bounds. No wraparound past new year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: MonthDay,
    pub end: MonthDay,
}

impl DateWindow {
    pub fn contains(&self, day: MonthDay) -> bool {
        self.start <= day && day <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Open,
    Closed,
}

/// What the gate decided for one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Closed -> Open; the event is kept
    Started,
    /// Open -> Closed; the event is dropped
    Stopped,
    Admit,
    Discard,
}

impl GateDecision {
    pub fn admits(&self) -> bool {
        matches!(self, GateDecision::Started | GateDecision::Admit)
    }
}

/// Stateful filter over event time-of-day.
///
/// Without a window the gate is permanently open. With one it starts closed,
/// opens only on a counter event inside the bounds and closes on the first
/// event past them.
#[derive(Debug, Clone)]
pub struct WindowGate {
    window: Option<TimeWindow>,
    state: GateState,
}

impl WindowGate {
    pub fn new(window: Option<TimeWindow>) -> Self {
        let state = match window {
            Some(_) => GateState::Closed,
            None => GateState::Open,
        };
        Self { window, state }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == GateState::Open
    }

    pub fn evaluate(&mut self, ts: &DateTime<Utc>, is_counter: bool) -> GateDecision {
        let Some(window) = self.window else {
            return GateDecision::Admit;
        };
        let inside = window.contains(TimeOfDay::of(ts));

        match (self.state, inside) {
            (GateState::Closed, true) if is_counter => {
                self.state = GateState::Open;
                GateDecision::Started
            }
            (GateState::Closed, _) => GateDecision::Discard,
            (GateState::Open, true) => GateDecision::Admit,
            (GateState::Open, false) => {
                self.state = GateState::Closed;
                GateDecision::Stopped
            }
        }
    }
}
