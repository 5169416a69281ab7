use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_PERIOD_MARKER: &str = "Période";

pub const MAX_DAYS: usize = 7;
pub const MAX_SLOTS: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub label: String,
    pub time: String,
}

impl Slot {
    pub fn new(label: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            time: time.into(),
        }
    }
}

/// Zero-based cell coordinates inside a week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DaySlot {
    pub day: usize,
    pub slot: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeriodError {
    /// The label did not carry a usable number (degraded to 0).
    Unparsable,
    OutOfRange { number: i64, total: i64 },
}

impl PeriodError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unparsable => "unparsable_period",
            Self::OutOfRange { .. } => "period_out_of_range",
        }
    }
}

impl fmt::Display for PeriodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unparsable => write!(f, "period label has no period number"),
            Self::OutOfRange { number, total } => {
                write!(f, "period {} is outside 1..={}", number, total)
            }
        }
    }
}

/// Days × slots shape of the teaching week.
///
/// Periods are numbered from 1 with slots varying fastest: with four slots a
/// day, periods 1-4 are the first day, 5-8 the second, and so on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekLayout {
    pub days: Vec<String>,
    pub slots: Vec<Slot>,
    pub period_marker: String,
}

impl Default for WeekLayout {
    fn default() -> Self {
        Self {
            days: ["Lundi", "Mardi", "Mercredi", "Jeudi", "Vendredi"]
                .into_iter()
                .map(String::from)
                .collect(),
            slots: vec![
                Slot::new("Période 1 (8h–9h30)", "8h–9h30"),
                Slot::new("Période 2 (9h30–11h)", "9h30–11h"),
                Slot::new("Période 3 (11h–12h30)", "11h–12h30"),
                Slot::new("Période 4 (13h30–15h)", "13h30–15h"),
            ],
            period_marker: DEFAULT_PERIOD_MARKER.to_string(),
        }
    }
}

impl WeekLayout {
    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    pub fn slots_per_day(&self) -> usize {
        self.slots.len()
    }

    pub fn total_periods(&self) -> i64 {
        (self.day_count() * self.slots_per_day()) as i64
    }

    pub fn to_day_slot(&self, period: i64) -> Option<DaySlot> {
        if period < 1 || period > self.total_periods() {
            return None;
        }
        let per_day = self.slots_per_day() as i64;
        let zero_based = period - 1;
        Some(DaySlot {
            day: (zero_based / per_day) as usize,
            slot: (zero_based % per_day) as usize,
        })
    }

    pub fn period_number(&self, cell: DaySlot) -> Option<i64> {
        if cell.day >= self.day_count() || cell.slot >= self.slots_per_day() {
            return None;
        }
        Some((cell.day * self.slots_per_day() + cell.slot) as i64 + 1)
    }

    pub fn period_label(&self, period: i64) -> String {
        format!("{} {}", self.period_marker, period)
    }

    pub fn decode(&self, label: &str) -> Result<DaySlot, PeriodError> {
        let number = extract_period_number(label);
        if number == 0 {
            return Err(PeriodError::Unparsable);
        }
        self.to_day_slot(number).ok_or(PeriodError::OutOfRange {
            number,
            total: self.total_periods(),
        })
    }

    /// Checks the shape limits accepted from setup patches.
    pub fn validate(&self) -> Result<(), String> {
        if self.days.is_empty() || self.days.len() > MAX_DAYS {
            return Err(format!("days must have 1..={} entries", MAX_DAYS));
        }
        if self.slots.is_empty() || self.slots.len() > MAX_SLOTS {
            return Err(format!("slots must have 1..={} entries", MAX_SLOTS));
        }
        if self.days.iter().any(|d| d.trim().is_empty()) {
            return Err("day names must not be empty".into());
        }
        if self.slots.iter().any(|s| s.label.trim().is_empty()) {
            return Err("slot labels must not be empty".into());
        }
        if self.period_marker.trim().is_empty() {
            return Err("periodMarker must not be empty".into());
        }
        Ok(())
    }
}

/// Reads the number out of a label such as `"Période 7"`.
///
/// The second whitespace-separated token is parsed leniently: an optional
/// sign followed by leading digits, anything after the digits ignored.
/// Labels without such a token degrade to 0, which no layout accepts.
pub fn extract_period_number(label: &str) -> i64 {
    let Some(token) = label.split_whitespace().nth(1) else {
        return 0;
    };
    let (negative, rest) = match token.as_bytes().first() {
        Some(b'-') => (true, &token[1..]),
        Some(b'+') => (false, &token[1..]),
        _ => (false, token),
    };
    let digits_end = rest
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    let Ok(n) = rest[..digits_end].parse::<i64>() else {
        return 0;
    };
    if negative {
        -n
    } else {
        n
    }
}
