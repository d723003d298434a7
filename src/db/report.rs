//! Weekly completion reports per family member.

use tracing::{debug, instrument};

use super::family::FamilyRepository;
use super::query::{QueryBackend, SqlValue};
use super::timeframe::DateWindow;
use super::utils::Clock;
use super::{
    ChoreSummary, DbError, DbResult, Id, RepeatType, ReportPeriod, ReportSummary, WeeklyReport,
};

/// `completed / total` as a percentage rounded half up; 0 when there is nothing to count.
pub fn completion_percentage(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let rounded = (completed * 100 + total / 2) / total;
    u32::try_from(rounded).unwrap_or(u32::MAX)
}

/// Builds reports over the trailing week.
pub struct ReportGenerator<'a, B: QueryBackend> {
    pub(crate) backend: &'a B,
    pub(crate) clock: &'a dyn Clock,
}

impl<'a, B: QueryBackend> ReportGenerator<'a, B> {
    #[instrument(skip(self))]
    pub async fn weekly_report(&self, member_id: Id) -> DbResult<WeeklyReport> {
        let member = FamilyRepository {
            backend: self.backend,
        }
        .get(member_id)
        .await?;

        let window = DateWindow::trailing_week(self.clock.today());
        let mut params: Vec<SqlValue> = vec![member_id.into()];
        let in_window = window.condition("c", &mut params);

        let result = self
            .backend
            .execute(
                &format!(
                    "SELECT c.id, c.name, c.details, c.due_date, c.repeat_type,
                            ca.completed AS member_completed
                     FROM chores c
                     JOIN chore_assignments ca ON ca.chore_id = c.id
                     WHERE ca.family_member_id = ? AND {in_window}
                     ORDER BY c.due_date, c.id"
                ),
                &params,
            )
            .await?;

        let total_chores = result.rows.len();
        let mut completed_chores = 0;
        let mut incomplete_chores = Vec::new();

        for row in &result.rows {
            if row.get_bool("member_completed")? {
                completed_chores += 1;
                continue;
            }
            incomplete_chores.push(ChoreSummary {
                id: row.get_i64("id")?,
                name: row.get_string("name")?,
                details: row.get_opt_string("details")?,
                due_date: row.get_date("due_date")?,
                repeat_type: row
                    .get_string("repeat_type")?
                    .parse::<RepeatType>()
                    .map_err(DbError::internal)?,
            });
        }

        debug!(total_chores, completed_chores, "Built weekly report");

        Ok(WeeklyReport {
            member,
            report: ReportSummary {
                total_chores,
                completed_chores,
                completion_percentage: completion_percentage(completed_chores, total_chores),
                incomplete_chores,
            },
            report_period: ReportPeriod {
                from: window.from,
                to: window.to,
            },
        })
    }
}
