use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::application::ports::job_repository::{JobFilter, JobPatch, JobRepository, NewJob};
use crate::domain::jobs::job::{Job, JobWithCount};
use crate::infrastructure::db::{PgPool, clear_pair, map_db_error};

const JOB_COLUMNS: &str = "j.id, j.name, j.location, j.category_id, j.start_time, j.end_time, \
    j.max_registrations, j.staff_only, j.always_required, j.created_at, j.updated_at";

/// Signups that hold a slot on the job.
const OCCUPIED_COUNT: &str = r#"(SELECT COUNT(*) FROM registration_jobs rj
       JOIN registrations r ON r.id = rj.registration_id
       WHERE rj.job_id = j.id AND r.status IN ('PENDING', 'CONFIRMED')) AS registration_count"#;

pub struct SqlxJobRepository {
    pub pool: PgPool,
}

impl SqlxJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn job_from_row(r: &PgRow) -> Job {
    Job {
        id: r.get("id"),
        name: r.get("name"),
        location: r.get("location"),
        category_id: r.get("category_id"),
        start_time: r.get("start_time"),
        end_time: r.get("end_time"),
        max_registrations: r.get("max_registrations"),
        staff_only: r.get("staff_only"),
        always_required: r.get("always_required"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

fn counted_from_row(r: &PgRow) -> JobWithCount {
    JobWithCount {
        job: job_from_row(r),
        registration_count: r.get("registration_count"),
    }
}

#[async_trait]
impl JobRepository for SqlxJobRepository {
    async fn create(&self, job: &NewJob) -> anyhow::Result<Job> {
        let sql = format!(
            r#"INSERT INTO jobs AS j (name, location, category_id, start_time, end_time,
                   max_registrations, staff_only, always_required)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING {JOB_COLUMNS}"#
        );
        let row = sqlx::query(&sql)
            .bind(&job.name)
            .bind(&job.location)
            .bind(job.category_id)
            .bind(job.start_time)
            .bind(job.end_time)
            .bind(job.max_registrations)
            .bind(job.staff_only)
            .bind(job.always_required)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(job_from_row(&row))
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<JobWithCount>> {
        let sql = format!("SELECT {JOB_COLUMNS}, {OCCUPIED_COUNT} FROM jobs j WHERE j.id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(counted_from_row))
    }

    async fn get_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<JobWithCount>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {JOB_COLUMNS}, {OCCUPIED_COUNT} FROM jobs j WHERE j.id = ANY($1) ORDER BY j.name"
        );
        let rows = sqlx::query(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(counted_from_row).collect())
    }

    async fn list(&self, filter: &JobFilter) -> anyhow::Result<Vec<JobWithCount>> {
        let sql = format!(
            r#"SELECT {JOB_COLUMNS}, {OCCUPIED_COUNT} FROM jobs j
               WHERE ($1::uuid IS NULL OR j.category_id = $1)
                 AND ($2 OR NOT j.staff_only)
               ORDER BY j.start_time ASC NULLS LAST, j.name ASC"#
        );
        let rows = sqlx::query(&sql)
            .bind(filter.category_id)
            .bind(filter.include_staff_only)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(counted_from_row).collect())
    }

    async fn update(&self, id: Uuid, patch: &JobPatch) -> anyhow::Result<Option<Job>> {
        let (start_set, start) = clear_pair(&patch.start_time);
        let (end_set, end) = clear_pair(&patch.end_time);
        let sql = format!(
            r#"UPDATE jobs AS j SET
                   name = COALESCE($2, j.name),
                   location = COALESCE($3, j.location),
                   category_id = COALESCE($4, j.category_id),
                   start_time = CASE WHEN $5 THEN $6 ELSE j.start_time END,
                   end_time = CASE WHEN $7 THEN $8 ELSE j.end_time END,
                   max_registrations = COALESCE($9, j.max_registrations),
                   staff_only = COALESCE($10, j.staff_only),
                   always_required = COALESCE($11, j.always_required),
                   updated_at = now()
               WHERE j.id = $1
               RETURNING {JOB_COLUMNS}"#
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(&patch.name)
            .bind(&patch.location)
            .bind(patch.category_id)
            .bind(start_set)
            .bind(start)
            .bind(end_set)
            .bind(end)
            .bind(patch.max_registrations)
            .bind(patch.staff_only)
            .bind(patch.always_required)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(row.as_ref().map(job_from_row))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(res.rows_affected() > 0)
    }

    async fn count_registrations(&self, id: Uuid) -> anyhow::Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM registration_jobs WHERE job_id = $1")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
