//! Read access to the seeded family members.

use tracing::instrument;

use super::query::{QueryBackend, Row};
use super::{DbError, DbResult, FamilyMember, Id};

/// Family member lookups.
pub struct FamilyRepository<'a, B: QueryBackend> {
    pub(crate) backend: &'a B,
}

impl<'a, B: QueryBackend> FamilyRepository<'a, B> {
    /// All members in id order.
    #[instrument(skip(self))]
    pub async fn list(&self) -> DbResult<Vec<FamilyMember>> {
        let result = self
            .backend
            .execute("SELECT id, name, color FROM family_members ORDER BY id", &[])
            .await?;

        result.rows.iter().map(member_from_row).collect()
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Id) -> DbResult<FamilyMember> {
        let result = self
            .backend
            .execute(
                "SELECT id, name, color FROM family_members WHERE id = ?",
                &[id.into()],
            )
            .await?;

        result
            .rows
            .first()
            .map(member_from_row)
            .unwrap_or_else(|| Err(DbError::not_found("FamilyMember", id)))
    }
}

fn member_from_row(row: &Row) -> DbResult<FamilyMember> {
    Ok(FamilyMember {
        id: row.get_i64("id")?,
        name: row.get_string("name")?,
        color: row.get_string("color")?,
    })
}
