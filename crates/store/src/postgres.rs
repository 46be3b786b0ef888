use async_trait::async_trait;
use common::{GroupId, MemberId, Version};
use domain::{
    Group, GroupFilters, GroupPage, GroupRepository, GroupStatus, GroupSummary, RepositoryError,
};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};

use crate::error::{Result, StoreError};

const UNIQUE_NAME_CONSTRAINT: &str = "unique_owner_group_name";

/// PostgreSQL-backed group repository.
///
/// The full aggregate is stored as JSONB in `state`; the remaining columns
/// mirror the fields that searches filter and sort on.
#[derive(Clone)]
pub struct PostgresGroupRepository {
    pool: PgPool,
}

impl PostgresGroupRepository {
    /// Creates a new PostgreSQL group repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_group(row: PgRow) -> Result<Group> {
        let state: serde_json::Value = row.try_get("state")?;
        let mut group: Group = serde_json::from_value(state)?;
        group.set_version(Version::new(row.try_get("version")?));
        Ok(group)
    }

    fn row_to_summary(row: PgRow) -> Result<GroupSummary> {
        let status: String = row.try_get("status")?;
        let status = status
            .parse::<GroupStatus>()
            .map_err(|e| StoreError::InvalidRow(e.to_string()))?;
        let member_count: i32 = row.try_get("member_count")?;

        Ok(GroupSummary {
            id: GroupId::new(row.try_get::<String, _>("id")?),
            name: row.try_get("name")?,
            owner_id: MemberId::new(row.try_get::<String, _>("owner_id")?),
            status,
            member_count: member_count as usize,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn member_ids(group: &Group) -> Vec<String> {
        group
            .members()
            .iter()
            .map(|m| m.id.as_str().to_string())
            .collect()
    }

    /// Maps a failed write, recognising the per-owner name constraint.
    fn write_error(err: sqlx::Error, group: &Group) -> RepositoryError {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.constraint() == Some(UNIQUE_NAME_CONSTRAINT)
        {
            return RepositoryError::DuplicateName {
                owner_id: group.owner_id().clone(),
                name: group.name().to_string(),
            };
        }
        storage(err)
    }

    /// Appends the WHERE clause for `filters`, numbering parameters from 1.
    fn push_conditions(sql: &mut String, filters: &GroupFilters) -> usize {
        let mut param_count = 0;

        if filters.name.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND name ILIKE ${param_count}"));
        }
        if filters.status.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND status = ${param_count}"));
        }
        if filters.owner_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND owner_id = ${param_count}"));
        }
        if filters.member_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND ${param_count} = ANY(member_ids)"));
        }

        param_count
    }

    fn bind_conditions<'q>(
        mut query: Query<'q, Postgres, PgArguments>,
        filters: &GroupFilters,
    ) -> Query<'q, Postgres, PgArguments> {
        if let Some(ref name) = filters.name {
            query = query.bind(format!("%{}%", escape_like(name)));
        }
        if let Some(status) = filters.status {
            query = query.bind(status.as_str());
        }
        if let Some(ref owner_id) = filters.owner_id {
            query = query.bind(owner_id.as_str().to_string());
        }
        if let Some(ref member_id) = filters.member_id {
            query = query.bind(member_id.as_str().to_string());
        }
        query
    }
}

#[async_trait]
impl GroupRepository for PostgresGroupRepository {
    async fn create(&self, group: &Group) -> std::result::Result<Version, RepositoryError> {
        let version = Version::first();
        let state = serde_json::to_value(group).map_err(storage)?;

        sqlx::query(
            r#"
            INSERT INTO groups (id, name, owner_id, status, member_ids, member_count, version, state, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(group.id().as_str())
        .bind(group.name())
        .bind(group.owner_id().as_str())
        .bind(group.status().as_str())
        .bind(Self::member_ids(group))
        .bind(group.member_count() as i32)
        .bind(version.as_i64())
        .bind(state)
        .bind(group.created_at())
        .bind(group.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| Self::write_error(e, group))?;

        tracing::debug!(group_id = %group.id(), "group inserted");
        Ok(version)
    }

    async fn get_by_id(&self, group_id: &GroupId) -> std::result::Result<Group, RepositoryError> {
        let row = sqlx::query("SELECT state, version FROM groups WHERE id = $1")
            .bind(group_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?
            .ok_or_else(|| RepositoryError::NotFound(group_id.clone()))?;

        Self::row_to_group(row).map_err(RepositoryError::from)
    }

    async fn update(&self, group: &Group) -> std::result::Result<Version, RepositoryError> {
        let state = serde_json::to_value(group).map_err(storage)?;

        let mut tx = self.pool.begin().await.map_err(storage)?;

        let current: Option<i64> =
            sqlx::query_scalar("SELECT version FROM groups WHERE id = $1 FOR UPDATE")
                .bind(group.id().as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(storage)?;

        let current = current
            .map(Version::new)
            .ok_or_else(|| RepositoryError::NotFound(group.id().clone()))?;

        if current != group.version() {
            return Err(RepositoryError::ConcurrencyConflict {
                group_id: group.id().clone(),
                expected: group.version(),
                actual: current,
            });
        }

        let new_version = current.next();
        sqlx::query(
            r#"
            UPDATE groups
            SET name = $2, status = $3, member_ids = $4, member_count = $5, version = $6, state = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(group.id().as_str())
        .bind(group.name())
        .bind(group.status().as_str())
        .bind(Self::member_ids(group))
        .bind(group.member_count() as i32)
        .bind(new_version.as_i64())
        .bind(state)
        .bind(group.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| Self::write_error(e, group))?;

        tx.commit().await.map_err(storage)?;

        tracing::debug!(group_id = %group.id(), version = %new_version, "group updated");
        Ok(new_version)
    }

    async fn search(&self, filters: &GroupFilters) -> std::result::Result<GroupPage, RepositoryError> {
        let mut conditions = String::from(" WHERE 1=1");
        let param_count = Self::push_conditions(&mut conditions, filters);

        let count_sql = format!("SELECT COUNT(*) AS total FROM groups{conditions}");
        let total: i64 = Self::bind_conditions(sqlx::query(&count_sql), filters)
            .fetch_one(&self.pool)
            .await
            .and_then(|row| row.try_get("total"))
            .map_err(storage)?;

        let sql = format!(
            "SELECT id, name, owner_id, status, member_count, created_at, updated_at FROM groups{conditions} ORDER BY {} {}, id ASC LIMIT ${} OFFSET ${}",
            filters.sort_by.column(),
            filters.sort_direction.as_sql(),
            param_count + 1,
            param_count + 2,
        );
        let rows = Self::bind_conditions(sqlx::query(&sql), filters)
            .bind(i64::try_from(filters.limit).unwrap_or(i64::MAX))
            .bind(i64::try_from(filters.offset).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

        let items = rows
            .into_iter()
            .map(Self::row_to_summary)
            .collect::<Result<Vec<_>>>()?;

        Ok(GroupPage {
            items,
            total: total as u64,
            limit: filters.limit,
            offset: filters.offset,
        })
    }
}

fn storage(err: impl Into<StoreError>) -> RepositoryError {
    RepositoryError::from(err.into())
}

/// Escapes the LIKE wildcards in user input.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
