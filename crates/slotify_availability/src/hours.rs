// --- File: crates/slotify_availability/src/hours.rs ---
//! Weekly operating-hours model.
//!
//! Businesses configure hours as a JSON object mapping lowercase weekday
//! names to "HH:MM-HH:MM" range strings. An empty sequence means closed that
//! day. Parsing is shallow: the shape is checked here, the range strings only
//! when slots are generated, so a malformed range degrades to "no slots" for
//! that range instead of failing the whole schedule.

use chrono::{NaiveTime, Weekday};
use serde_json::Value;

pub const WEEKDAY_NAMES: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

/// A wall-clock open/close pair within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl TimeRange {
    /// Parses "HH:MM-HH:MM". Returns `None` for anything else. Open < close
    /// is assumed, not enforced; an inverted range simply yields no slots.
    pub fn parse(raw: &str) -> Option<Self> {
        let (open, close) = raw.split_once('-')?;
        Some(Self {
            open: NaiveTime::parse_from_str(open.trim(), "%H:%M").ok()?,
            close: NaiveTime::parse_from_str(close.trim(), "%H:%M").ok()?,
        })
    }
}

/// A parsed weekly schedule, Monday-first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatingHours {
    days: [Vec<String>; 7],
}

impl OperatingHours {
    /// Parses the raw configured value.
    ///
    /// Returns `None` when the value is absent or not an object. Weekdays
    /// missing from the object, and values that are not arrays of strings,
    /// are treated as closed.
    pub fn parse(raw: &Value) -> Option<Self> {
        let object = raw.as_object()?;
        let mut days: [Vec<String>; 7] = Default::default();
        for (index, name) in WEEKDAY_NAMES.iter().enumerate() {
            if let Some(Value::Array(entries)) = object.get(*name) {
                days[index] = entries
                    .iter()
                    .filter_map(|entry| entry.as_str().map(|s| s.to_string()))
                    .collect();
            }
        }
        Some(Self { days })
    }

    /// The fallback schedule applied when a business has no configured
    /// hours: Mon-Fri 09:00-18:00, Sat 09:00-14:00, Sun closed.
    pub fn default_schedule() -> Self {
        let weekday = || vec!["09:00-18:00".to_string()];
        Self {
            days: [
                weekday(),
                weekday(),
                weekday(),
                weekday(),
                weekday(),
                vec!["09:00-14:00".to_string()],
                Vec::new(),
            ],
        }
    }

    /// Raw range strings for a weekday; empty means closed.
    pub fn ranges_for(&self, weekday: Weekday) -> &[String] {
        &self.days[weekday.num_days_from_monday() as usize]
    }

    /// (weekday name, ranges) pairs in Monday-first order, for rendering.
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, &[String])> {
        WEEKDAY_NAMES
            .iter()
            .zip(self.days.iter())
            .map(|(name, ranges)| (*name, ranges.as_slice()))
    }
}
