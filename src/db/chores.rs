//! Chore storage: creation, projection, filtering, updates and deletion.
//!
//! Multi-statement operations run on one [`QueryClient`] so they either
//! commit together or roll back together.

use std::collections::BTreeSet;

use tracing::{debug, info, instrument};

use super::completion::recompute_completion;
use super::query::{QueryBackend, QueryClient, Row, SqlValue};
use super::utils::Clock;
use super::{
    Assignee, Chore, ChoreFilter, ChorePatch, DbError, DbResult, Id, NewChore, RepeatType,
};

const CHORE_COLUMNS: &str =
    "c.id, c.name, c.details, c.due_date, c.repeat_type, c.completed, c.created_at";

const ASSIGNEE_COLUMNS: &str = "fm.id AS member_id, fm.name AS member_name, \
     fm.color AS member_color, ca.completed AS member_completed, \
     ca.completed_at AS member_completed_at";

/// Assignment inserts and deletes needed to move from one assignee set to another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssigneeDiff {
    pub to_add: Vec<Id>,
    pub to_remove: Vec<Id>,
}

impl AssigneeDiff {
    pub fn between(current: &BTreeSet<Id>, desired: &BTreeSet<Id>) -> Self {
        Self {
            to_add: desired.difference(current).copied().collect(),
            to_remove: current.difference(desired).copied().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Chore repository bound to a backend and a clock.
pub struct ChoreRepository<'a, B: QueryBackend> {
    pub(crate) backend: &'a B,
    pub(crate) clock: &'a dyn Clock,
}

impl<'a, B: QueryBackend> ChoreRepository<'a, B> {
    /// Create a chore with its initial assignees.
    #[instrument(skip(self, new), fields(name = %new.name))]
    pub async fn create(&self, new: NewChore) -> DbResult<Chore> {
        let name = validate_name(&new.name)?;
        let assignees: BTreeSet<Id> = new.assignee_ids.iter().copied().collect();
        if assignees.is_empty() {
            return Err(DbError::validation(
                "At least one family member must be assigned",
            ));
        }

        let mut client = self.backend.get_client().await?;

        let id = client
            .insert(
                "INSERT INTO chores (name, details, due_date, repeat_type, completed, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
                &[
                    name.into(),
                    new.details.into(),
                    new.due_date.into(),
                    new.repeat_type.as_str().into(),
                    false.into(),
                    self.clock.now().into(),
                ],
            )
            .await?;

        for member_id in &assignees {
            insert_assignment(&mut client, id, *member_id).await?;
        }

        client.commit().await?;
        info!(id, assignees = assignees.len(), "Created chore");

        self.get(id).await
    }

    /// A chore with every assignee, read in one statement.
    #[instrument(skip(self))]
    pub async fn get(&self, id: Id) -> DbResult<Chore> {
        let result = self
            .backend
            .execute(
                &format!(
                    "SELECT {CHORE_COLUMNS}, {ASSIGNEE_COLUMNS}
                     FROM chores c
                     LEFT JOIN chore_assignments ca ON ca.chore_id = c.id
                     LEFT JOIN family_members fm ON fm.id = ca.family_member_id
                     WHERE c.id = ?
                     ORDER BY fm.id"
                ),
                &[id.into()],
            )
            .await?;

        fold_projections(&result.rows)?
            .pop()
            .ok_or_else(|| DbError::not_found("Chore", id))
    }

    /// Chores matching the filter, ordered by due date then id.
    #[instrument(skip(self))]
    pub async fn list(&self, filter: &ChoreFilter) -> DbResult<Vec<Chore>> {
        let mut conditions = Vec::new();
        let mut params: Vec<SqlValue> = Vec::new();

        // With a member, completion is that member's assignment; otherwise it
        // is the chore-level flag.
        match (filter.member_id, filter.include_completed) {
            (Some(member_id), include_completed) => {
                params.push(member_id.into());
                let open = if include_completed {
                    ""
                } else {
                    params.push(false.into());
                    " AND scope.completed = ?"
                };
                conditions.push(format!(
                    "EXISTS (SELECT 1 FROM chore_assignments scope
                     WHERE scope.chore_id = c.id AND scope.family_member_id = ?{open})"
                ));
            }
            (None, false) => {
                params.push(false.into());
                conditions.push("c.completed = ?".to_string());
            }
            (None, true) => {}
        }

        if let Some(window) = filter.timeframe.window(self.clock.today()) {
            conditions.push(window.condition("c", &mut params));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            "SELECT {CHORE_COLUMNS}, {ASSIGNEE_COLUMNS}
             FROM chores c
             LEFT JOIN chore_assignments ca ON ca.chore_id = c.id
             LEFT JOIN family_members fm ON fm.id = ca.family_member_id
             {where_clause}
             ORDER BY c.due_date, c.id, fm.id"
        );

        let result = self.backend.execute(&sql, &params).await?;

        let chores = fold_projections(&result.rows)?;

        debug!(count = chores.len(), timeframe = %filter.timeframe, "Listed chores");
        Ok(chores)
    }

    /// Apply the supplied fields and, when given, replace the assignee set.
    ///
    /// Only the assignments that actually change are inserted or deleted.
    /// An empty assignee list is accepted and leaves the chore incomplete.
    #[instrument(skip(self, patch, assignee_ids))]
    pub async fn update(
        &self,
        id: Id,
        patch: ChorePatch,
        assignee_ids: Option<Vec<Id>>,
    ) -> DbResult<Chore> {
        let name = patch.name.as_deref().map(validate_name).transpose()?;

        let mut client = self.backend.get_client().await?;
        ensure_chore_exists(&mut client, id).await?;

        if !patch.is_empty() {
            let mut sets = Vec::new();
            let mut params: Vec<SqlValue> = Vec::new();

            if let Some(name) = name {
                sets.push("name = ?");
                params.push(name.into());
            }
            if let Some(details) = patch.details {
                sets.push("details = ?");
                params.push(details.into());
            }
            if let Some(due_date) = patch.due_date {
                sets.push("due_date = ?");
                params.push(due_date.into());
            }
            if let Some(repeat_type) = patch.repeat_type {
                sets.push("repeat_type = ?");
                params.push(repeat_type.as_str().into());
            }
            params.push(id.into());

            client
                .execute(
                    &format!("UPDATE chores SET {} WHERE id = ?", sets.join(", ")),
                    &params,
                )
                .await?;
        }

        if let Some(ids) = assignee_ids {
            let current = client
                .execute(
                    "SELECT family_member_id FROM chore_assignments WHERE chore_id = ?",
                    &[id.into()],
                )
                .await?
                .rows
                .iter()
                .map(|row| row.get_i64("family_member_id"))
                .collect::<DbResult<BTreeSet<_>>>()?;
            let desired: BTreeSet<Id> = ids.into_iter().collect();

            let diff = AssigneeDiff::between(&current, &desired);
            for member_id in &diff.to_remove {
                client
                    .execute(
                        "DELETE FROM chore_assignments WHERE chore_id = ? AND family_member_id = ?",
                        &[id.into(), (*member_id).into()],
                    )
                    .await?;
            }
            for member_id in &diff.to_add {
                insert_assignment(&mut client, id, *member_id).await?;
            }

            if !diff.is_empty() {
                debug!(
                    added = diff.to_add.len(),
                    removed = diff.to_remove.len(),
                    "Assignees changed"
                );
                recompute_completion(&mut client, id).await?;
            }
        }

        client.commit().await?;
        self.get(id).await
    }

    /// Assign a member to a chore. Returns false when the assignment already existed.
    #[instrument(skip(self))]
    pub async fn assign(&self, chore_id: Id, member_id: Id) -> DbResult<bool> {
        let mut client = self.backend.get_client().await?;
        ensure_chore_exists(&mut client, chore_id).await?;

        let inserted = insert_assignment(&mut client, chore_id, member_id).await?;
        if inserted {
            recompute_completion(&mut client, chore_id).await?;
        }

        client.commit().await?;
        Ok(inserted)
    }

    /// Delete a chore; its assignments go with it.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Id) -> DbResult<()> {
        let result = self
            .backend
            .execute("DELETE FROM chores WHERE id = ?", &[id.into()])
            .await?;

        if result.row_count == 0 {
            return Err(DbError::not_found("Chore", id));
        }

        info!(id, "Deleted chore");
        Ok(())
    }
}

fn validate_name(name: &str) -> DbResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DbError::validation("Chore name is required"));
    }
    Ok(name.to_string())
}

async fn ensure_chore_exists<C: QueryClient>(client: &mut C, id: Id) -> DbResult<()> {
    let found = client
        .execute("SELECT id FROM chores WHERE id = ?", &[id.into()])
        .await?;
    if found.rows.is_empty() {
        return Err(DbError::not_found("Chore", id));
    }
    Ok(())
}

/// Insert one assignment, doing nothing if the pair already exists.
async fn insert_assignment<C: QueryClient>(
    client: &mut C,
    chore_id: Id,
    member_id: Id,
) -> DbResult<bool> {
    let result = client
        .execute(
            "INSERT INTO chore_assignments (chore_id, family_member_id, completed)
             VALUES (?, ?, ?)
             ON CONFLICT (chore_id, family_member_id) DO NOTHING",
            &[chore_id.into(), member_id.into(), false.into()],
        )
        .await?;
    Ok(result.row_count > 0)
}

/// Fold chore-by-assignee join rows, grouped by chore, into one projection each.
fn fold_projections(rows: &[Row]) -> DbResult<Vec<Chore>> {
    let mut chores: Vec<Chore> = Vec::new();
    for row in rows {
        let id = row.get_i64("id")?;
        if chores.last().map(|c| c.id) != Some(id) {
            chores.push(chore_from_row(row)?);
        }
        if matches!(row.get("member_id"), Some(SqlValue::Null) | None) {
            continue;
        }
        if let Some(chore) = chores.last_mut() {
            chore.assigned_to.push(assignee_from_row(row)?);
        }
    }
    Ok(chores)
}

fn chore_from_row(row: &Row) -> DbResult<Chore> {
    let repeat_type = row
        .get_string("repeat_type")?
        .parse::<RepeatType>()
        .map_err(DbError::internal)?;

    Ok(Chore {
        id: row.get_i64("id")?,
        name: row.get_string("name")?,
        details: row.get_opt_string("details")?,
        due_date: row.get_date("due_date")?,
        repeat_type,
        completed: row.get_bool("completed")?,
        created_at: row.get_timestamp("created_at")?,
        assigned_to: Vec::new(),
    })
}

fn assignee_from_row(row: &Row) -> DbResult<Assignee> {
    Ok(Assignee {
        id: row.get_i64("member_id")?,
        name: row.get_string("member_name")?,
        color: row.get_string("member_color")?,
        completed: row.get_bool("member_completed")?,
        completed_at: row.get_opt_timestamp("member_completed_at")?,
    })
}
