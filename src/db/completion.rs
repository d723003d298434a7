//! Per-member completion and the derived chore-level flag.

use tracing::{debug, instrument};

use super::query::{QueryBackend, QueryClient, SqlValue};
use super::utils::Clock;
use super::{CompletionUpdate, DbError, DbResult, Id};

/// A chore is complete when it has assignments and every one of them is complete.
pub fn compute_completion(flags: &[bool]) -> bool {
    !flags.is_empty() && flags.iter().all(|done| *done)
}

/// Toggles assignments and keeps `chores.completed` in step.
pub struct CompletionEngine<'a, B: QueryBackend> {
    pub(crate) backend: &'a B,
    pub(crate) clock: &'a dyn Clock,
}

impl<'a, B: QueryBackend> CompletionEngine<'a, B> {
    /// Mark one member's assignment done or not done, then recompute the chore.
    #[instrument(skip(self))]
    pub async fn set_completion(
        &self,
        chore_id: Id,
        member_id: Id,
        completed: bool,
    ) -> DbResult<CompletionUpdate> {
        let mut client = self.backend.get_client().await?;

        let (sql, params): (&str, Vec<SqlValue>) = if completed {
            (
                "UPDATE chore_assignments SET completed = ?, completed_at = ?
                 WHERE chore_id = ? AND family_member_id = ?",
                vec![
                    true.into(),
                    self.clock.now().into(),
                    chore_id.into(),
                    member_id.into(),
                ],
            )
        } else {
            (
                "UPDATE chore_assignments SET completed = ?, completed_at = NULL
                 WHERE chore_id = ? AND family_member_id = ?",
                vec![false.into(), chore_id.into(), member_id.into()],
            )
        };

        let updated = client.execute(sql, &params).await?;
        if updated.row_count == 0 {
            return Err(DbError::not_found(
                "Assignment",
                format!("{}/{}", chore_id, member_id),
            ));
        }

        let chore_completed = recompute_completion(&mut client, chore_id).await?;
        client.commit().await?;

        Ok(CompletionUpdate {
            chore_id,
            member_id,
            completed,
            chore_completed,
        })
    }
}

/// Re-derive `chores.completed` from the chore's assignments inside `client`'s transaction.
pub(crate) async fn recompute_completion<C: QueryClient>(
    client: &mut C,
    chore_id: Id,
) -> DbResult<bool> {
    let result = client
        .execute(
            "SELECT completed FROM chore_assignments WHERE chore_id = ?",
            &[chore_id.into()],
        )
        .await?;

    let flags = result
        .rows
        .iter()
        .map(|row| row.get_bool("completed"))
        .collect::<DbResult<Vec<_>>>()?;
    let completed = compute_completion(&flags);

    client
        .execute(
            "UPDATE chores SET completed = ? WHERE id = ?",
            &[completed.into(), chore_id.into()],
        )
        .await?;

    debug!(chore_id, assignments = flags.len(), completed, "Recomputed chore completion");
    Ok(completed)
}
