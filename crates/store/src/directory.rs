use async_trait::async_trait;
use common::MemberId;
use domain::{DirectoryError, Member, MemberDirectory, MemberProfile};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::error::{Result, StoreError};

/// Member directory backed by the `members` table.
#[derive(Clone)]
pub struct PostgresMemberDirectory {
    pool: PgPool,
}

impl PostgresMemberDirectory {
    /// Creates a new PostgreSQL member directory.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a member, replacing the profile if the ID already exists.
    pub async fn upsert(&self, member: &Member) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO members (id, name, email)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, email = EXCLUDED.email
            "#,
        )
        .bind(member.id.as_str())
        .bind(&member.profile.name)
        .bind(&member.profile.email)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn row_to_member(row: PgRow) -> Result<Member> {
        Ok(Member::new(
            row.try_get::<String, _>("id")?,
            MemberProfile::new(
                row.try_get::<String, _>("name")?,
                row.try_get::<String, _>("email")?,
            ),
        ))
    }
}

#[async_trait]
impl MemberDirectory for PostgresMemberDirectory {
    async fn get_by_id(&self, member_id: &MemberId) -> std::result::Result<Member, DirectoryError> {
        let row = sqlx::query("SELECT id, name, email FROM members WHERE id = $1")
            .bind(member_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?
            .ok_or_else(|| DirectoryError::NotFound(member_id.clone()))?;

        Ok(Self::row_to_member(row)?)
    }
}
