//! Domain models for the chore database.
//!
//! These models are storage-agnostic and represent the core entities
//! used throughout the application.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::timeframe::Timeframe;

/// Integer identity shared by all entities.
pub type Id = i64;

/// A household member chores can be assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyMember {
    pub id: Id,
    pub name: String,
    pub color: String,
}

/// How often a chore comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RepeatType {
    #[default]
    #[serde(rename = "one-time")]
    OneTime,
    #[serde(rename = "daily")]
    Daily,
    #[serde(rename = "weekly")]
    Weekly,
}

impl RepeatType {
    pub fn as_str(self) -> &'static str {
        match self {
            RepeatType::OneTime => "one-time",
            RepeatType::Daily => "daily",
            RepeatType::Weekly => "weekly",
        }
    }
}

impl std::fmt::Display for RepeatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RepeatType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "one-time" => Ok(RepeatType::OneTime),
            "daily" => Ok(RepeatType::Daily),
            "weekly" => Ok(RepeatType::Weekly),
            _ => Err(format!("Invalid repeat type: {}", s)),
        }
    }
}

/// Per-member completion record joined with the member's display data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignee {
    pub id: Id,
    pub name: String,
    pub color: String,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A chore with its full assignee list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chore {
    pub id: Id,
    pub name: String,
    pub details: Option<String>,
    pub due_date: NaiveDate,
    pub repeat_type: RepeatType,
    /// AND over every assignment's completion; false when nobody is assigned.
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub assigned_to: Vec<Assignee>,
}

/// Input for creating a chore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChore {
    pub name: String,
    pub details: Option<String>,
    pub due_date: NaiveDate,
    pub repeat_type: RepeatType,
    pub assignee_ids: Vec<Id>,
}

/// Partial update of a chore's scalar fields. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChorePatch {
    pub name: Option<String>,
    /// `Some(None)` clears the details.
    pub details: Option<Option<String>>,
    pub due_date: Option<NaiveDate>,
    pub repeat_type: Option<RepeatType>,
}

impl ChorePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.details.is_none()
            && self.due_date.is_none()
            && self.repeat_type.is_none()
    }
}

/// Filter for listing chores.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChoreFilter {
    /// Only chores assigned to this member.
    pub member_id: Option<Id>,
    /// When false, only chores whose relevant assignment is still open.
    pub include_completed: bool,
    pub timeframe: Timeframe,
}

/// Outcome of toggling one assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionUpdate {
    pub chore_id: Id,
    pub member_id: Id,
    pub completed: bool,
    /// Chore-level completion after recomputation.
    pub chore_completed: bool,
}

/// A chore as listed in a report, without assignee metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoreSummary {
    pub id: Id,
    pub name: String,
    pub details: Option<String>,
    pub due_date: NaiveDate,
    pub repeat_type: RepeatType,
}

/// Completion statistics for one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_chores: usize,
    pub completed_chores: usize,
    pub completion_percentage: u32,
    pub incomplete_chores: Vec<ChoreSummary>,
}

/// Inclusive date range a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPeriod {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// A member's completion report over the trailing week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyReport {
    pub member: FamilyMember,
    pub report: ReportSummary,
    pub report_period: ReportPeriod,
}
