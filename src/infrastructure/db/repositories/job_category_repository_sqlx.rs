use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::application::ports::job_category_repository::{
    JobCategoryPatch, JobCategoryRepository, NewJobCategory,
};
use crate::domain::jobs::job::JobCategory;
use crate::infrastructure::db::{PgPool, map_db_error};

const CATEGORY_COLUMNS: &str =
    "id, name, description, staff_only, always_required, created_at, updated_at";

pub struct SqlxJobCategoryRepository {
    pub pool: PgPool,
}

impl SqlxJobCategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn category_from_row(r: &PgRow) -> JobCategory {
    JobCategory {
        id: r.get("id"),
        name: r.get("name"),
        description: r.get("description"),
        staff_only: r.get("staff_only"),
        always_required: r.get("always_required"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

#[async_trait]
impl JobCategoryRepository for SqlxJobCategoryRepository {
    async fn create(&self, category: &NewJobCategory) -> anyhow::Result<JobCategory> {
        let sql = format!(
            r#"INSERT INTO job_categories (name, description, staff_only, always_required)
               VALUES ($1, $2, $3, $4)
               RETURNING {CATEGORY_COLUMNS}"#
        );
        let row = sqlx::query(&sql)
            .bind(&category.name)
            .bind(&category.description)
            .bind(category.staff_only)
            .bind(category.always_required)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(category_from_row(&row))
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<JobCategory>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM job_categories WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(category_from_row))
    }

    async fn get_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<JobCategory>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {CATEGORY_COLUMNS} FROM job_categories WHERE id = ANY($1) ORDER BY name"
        );
        let rows = sqlx::query(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(category_from_row).collect())
    }

    async fn list(&self) -> anyhow::Result<Vec<JobCategory>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM job_categories ORDER BY name ASC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(category_from_row).collect())
    }

    async fn update(
        &self,
        id: Uuid,
        patch: &JobCategoryPatch,
    ) -> anyhow::Result<Option<JobCategory>> {
        let mut tx = self.pool.begin().await?;
        let sql = format!(
            r#"UPDATE job_categories SET
                   name = COALESCE($2, name),
                   description = COALESCE($3, description),
                   staff_only = COALESCE($4, staff_only),
                   always_required = COALESCE($5, always_required),
                   updated_at = now()
               WHERE id = $1
               RETURNING {CATEGORY_COLUMNS}"#
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(&patch.name)
            .bind(&patch.description)
            .bind(patch.staff_only)
            .bind(patch.always_required)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_db_error)?;
        let Some(row) = row else {
            return Ok(None);
        };
        let category = category_from_row(&row);
        if patch.staff_only.is_some() || patch.always_required.is_some() {
            let res = sqlx::query(
                r#"UPDATE jobs SET staff_only = $2, always_required = $3, updated_at = now()
                   WHERE category_id = $1"#,
            )
            .bind(id)
            .bind(category.staff_only)
            .bind(category.always_required)
            .execute(&mut *tx)
            .await?;
            tracing::debug!(
                category_id = %id,
                jobs = res.rows_affected(),
                "job_category_flags_propagated"
            );
        }
        tx.commit().await?;
        Ok(Some(category))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM job_categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(res.rows_affected() > 0)
    }

    async fn count_jobs(&self, id: Uuid) -> anyhow::Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE category_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
