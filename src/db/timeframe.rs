//! Date windows used to decide which chores are currently relevant.
//!
//! One-time chores are gated by their due date; recurring chores in the
//! window's `recurring` set are always included.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use super::models::RepeatType;
use super::query::SqlValue;

const DAILY: &[RepeatType] = &[RepeatType::Daily];
const RECURRING: &[RepeatType] = &[RepeatType::Daily, RepeatType::Weekly];

/// Which chores a list view shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    /// Due today, plus every daily chore.
    #[default]
    Today,
    /// Due within the next seven days, plus every daily and weekly chore.
    Week,
    /// No date gating.
    All,
}

impl Timeframe {
    /// The window for this timeframe, or `None` when nothing is date-gated.
    pub fn window(self, today: NaiveDate) -> Option<DateWindow> {
        match self {
            Timeframe::Today => Some(DateWindow {
                from: today,
                to: today,
                recurring: DAILY,
            }),
            Timeframe::Week => Some(DateWindow {
                from: today,
                to: days_after(today, 7),
                recurring: RECURRING,
            }),
            Timeframe::All => None,
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Timeframe::Today => write!(f, "today"),
            Timeframe::Week => write!(f, "week"),
            Timeframe::All => write!(f, "all"),
        }
    }
}

impl std::str::FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "today" => Ok(Timeframe::Today),
            "week" => Ok(Timeframe::Week),
            "all" => Ok(Timeframe::All),
            _ => Err(format!("Invalid timeframe: {}", s)),
        }
    }
}

/// Inclusive date range plus the repeat types exempt from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub recurring: &'static [RepeatType],
}

impl DateWindow {
    /// The trailing week `[today - 7, today]` used by completion reports.
    pub fn trailing_week(today: NaiveDate) -> Self {
        Self {
            from: days_before(today, 7),
            to: today,
            recurring: RECURRING,
        }
    }

    pub fn includes(&self, due_date: NaiveDate, repeat_type: RepeatType) -> bool {
        (self.from..=self.to).contains(&due_date) || self.recurring.contains(&repeat_type)
    }

    /// Render [`DateWindow::includes`] as a SQL condition on `{alias}.due_date`
    /// and `{alias}.repeat_type`, pushing its bound parameters onto `params`.
    pub fn condition(&self, alias: &str, params: &mut Vec<SqlValue>) -> String {
        params.push(SqlValue::Date(self.from));
        params.push(SqlValue::Date(self.to));

        if self.recurring.is_empty() {
            return format!("{alias}.due_date BETWEEN ? AND ?");
        }

        let placeholders = vec!["?"; self.recurring.len()].join(", ");
        params.extend(
            self.recurring
                .iter()
                .map(|repeat| SqlValue::Text(repeat.as_str().to_string())),
        );
        format!(
            "({alias}.due_date BETWEEN ? AND ? OR {alias}.repeat_type IN ({placeholders}))"
        )
    }
}

fn days_after(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_add_days(Days::new(days))
        .unwrap_or(NaiveDate::MAX)
}

fn days_before(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days))
        .unwrap_or(NaiveDate::MIN)
}
