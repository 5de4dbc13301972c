use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Row};
use uuid::Uuid;

use crate::application::dto::pagination::PageRequest;
use crate::application::ports::registration_repository::{
    AdminRegistrationCancel, AdminRegistrationEdit, NewRegistration, RegistrationFilter,
    RegistrationRepository,
};
use crate::domain::payments::payment::Payment;
use crate::domain::registrations::registration::{
    CampingOptionRegistration, Registration, RegistrationDetail, RegistrationJobLink,
    RegistrationStatus,
};
use crate::infrastructure::db::repositories::admin_audit_repository_sqlx::insert_audit;
use crate::infrastructure::db::repositories::payment_repository_sqlx::{
    PAYMENT_COLUMNS, payment_from_row,
};
use crate::infrastructure::db::{PgPool, clear_pair, map_db_error};

const REGISTRATION_COLUMNS: &str = "id, user_id, year, status, notes, created_at, updated_at";

pub struct SqlxRegistrationRepository {
    pub pool: PgPool,
}

impl SqlxRegistrationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn details(&self, registrations: Vec<Registration>) -> anyhow::Result<Vec<RegistrationDetail>> {
        if registrations.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = registrations.iter().map(|r| r.id).collect();

        let job_rows = sqlx::query(
            r#"SELECT rj.registration_id, j.id AS job_id, j.name AS job_name, j.category_id,
                      j.start_time, j.end_time
               FROM registration_jobs rj
               JOIN jobs j ON j.id = rj.job_id
               WHERE rj.registration_id = ANY($1)
               ORDER BY j.start_time ASC NULLS LAST, j.name ASC"#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;
        let mut jobs: HashMap<Uuid, Vec<RegistrationJobLink>> = HashMap::new();
        for r in &job_rows {
            jobs.entry(r.get("registration_id"))
                .or_default()
                .push(RegistrationJobLink {
                    job_id: r.get("job_id"),
                    job_name: r.get("job_name"),
                    category_id: r.get("category_id"),
                    start_time: r.get("start_time"),
                    end_time: r.get("end_time"),
                });
        }

        let option_rows = sqlx::query(
            r#"SELECT cor.registration_id, o.id AS camping_option_id,
                      o.name AS camping_option_name, cor.field_values
               FROM camping_option_registrations cor
               JOIN camping_options o ON o.id = cor.camping_option_id
               WHERE cor.registration_id = ANY($1)
               ORDER BY o.name ASC"#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;
        let mut options: HashMap<Uuid, Vec<CampingOptionRegistration>> = HashMap::new();
        for r in &option_rows {
            options
                .entry(r.get("registration_id"))
                .or_default()
                .push(CampingOptionRegistration {
                    camping_option_id: r.get("camping_option_id"),
                    camping_option_name: r.get("camping_option_name"),
                    field_values: r.get("field_values"),
                });
        }

        Ok(registrations
            .into_iter()
            .map(|registration| RegistrationDetail {
                jobs: jobs.remove(&registration.id).unwrap_or_default(),
                camping_options: options.remove(&registration.id).unwrap_or_default(),
                registration,
            })
            .collect())
    }

    async fn detail_or_missing(&self, id: Uuid) -> anyhow::Result<RegistrationDetail> {
        self.get(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("registration {id} not found"))
    }
}

fn registration_from_row(r: &PgRow) -> anyhow::Result<Registration> {
    Ok(Registration {
        id: r.get("id"),
        user_id: r.get("user_id"),
        year: r.get("year"),
        status: r.get::<String, _>("status").parse()?,
        notes: r.get("notes"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    })
}

async fn update_registration_row(
    conn: &mut PgConnection,
    id: Uuid,
    status: Option<RegistrationStatus>,
    notes: &Option<Option<String>>,
) -> anyhow::Result<Option<Registration>> {
    let (notes_set, notes) = clear_pair(notes);
    let sql = format!(
        r#"UPDATE registrations SET
               status = COALESCE($2, status),
               notes = CASE WHEN $3 THEN $4 ELSE notes END,
               updated_at = now()
           WHERE id = $1
           RETURNING {REGISTRATION_COLUMNS}"#
    );
    let row = sqlx::query(&sql)
        .bind(id)
        .bind(status.map(|s| s.as_str()))
        .bind(notes_set)
        .bind(notes)
        .fetch_optional(conn)
        .await?;
    row.as_ref().map(registration_from_row).transpose()
}

async fn link_jobs(conn: &mut PgConnection, registration_id: Uuid, job_ids: &[Uuid]) -> anyhow::Result<()> {
    if job_ids.is_empty() {
        return Ok(());
    }
    sqlx::query(
        r#"INSERT INTO registration_jobs (registration_id, job_id)
           SELECT $1, UNNEST($2::uuid[]) ON CONFLICT DO NOTHING"#,
    )
    .bind(registration_id)
    .bind(job_ids)
    .execute(conn)
    .await
    .map_err(map_db_error)?;
    Ok(())
}

async fn link_camping_option(
    conn: &mut PgConnection,
    registration_id: Uuid,
    camping_option_id: Uuid,
    field_values: &serde_json::Value,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"INSERT INTO camping_option_registrations (registration_id, camping_option_id, field_values)
           VALUES ($1, $2, $3) ON CONFLICT (registration_id, camping_option_id) DO NOTHING"#,
    )
    .bind(registration_id)
    .bind(camping_option_id)
    .bind(field_values)
    .execute(conn)
    .await
    .map_err(map_db_error)?;
    Ok(())
}

#[async_trait]
impl RegistrationRepository for SqlxRegistrationRepository {
    async fn find_for_user_year(
        &self,
        user_id: Uuid,
        year: i32,
    ) -> anyhow::Result<Option<Registration>> {
        let sql = format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE user_id = $1 AND year = $2"
        );
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(year)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(registration_from_row).transpose()
    }

    async fn create(&self, registration: &NewRegistration) -> anyhow::Result<RegistrationDetail> {
        let mut tx = self.pool.begin().await?;
        let id: Uuid = sqlx::query_scalar(
            r#"INSERT INTO registrations (user_id, year, status)
               VALUES ($1, $2, $3) RETURNING id"#,
        )
        .bind(registration.user_id)
        .bind(registration.year)
        .bind(registration.status.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;
        link_jobs(&mut tx, id, &registration.job_ids).await?;
        for signup in &registration.camping_options {
            link_camping_option(&mut tx, id, signup.camping_option_id, &signup.field_values)
                .await?;
        }
        tx.commit().await?;
        self.detail_or_missing(id).await
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<RegistrationDetail>> {
        let sql = format!("SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        let registrations = row
            .as_ref()
            .map(registration_from_row)
            .transpose()?
            .into_iter()
            .collect();
        Ok(self.details(registrations).await?.into_iter().next())
    }

    async fn list_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<RegistrationDetail>> {
        let sql = format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE user_id = $1 ORDER BY year DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        let registrations = rows
            .iter()
            .map(registration_from_row)
            .collect::<anyhow::Result<_>>()?;
        self.details(registrations).await
    }

    async fn list(
        &self,
        filter: &RegistrationFilter,
        page: PageRequest,
    ) -> anyhow::Result<(Vec<RegistrationDetail>, i64)> {
        let predicate = r#"($1::int IS NULL OR year = $1)
               AND ($2::text IS NULL OR status = $2)
               AND ($3::uuid IS NULL OR user_id = $3)"#;
        let status = filter.status.map(|s| s.as_str());
        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM registrations WHERE {predicate}"))
                .bind(filter.year)
                .bind(status)
                .bind(filter.user_id)
                .fetch_one(&self.pool)
                .await?;
        let sql = format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE {predicate}
             ORDER BY created_at DESC, id DESC LIMIT $4 OFFSET $5"
        );
        let rows = sqlx::query(&sql)
            .bind(filter.year)
            .bind(status)
            .bind(filter.user_id)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;
        let registrations = rows
            .iter()
            .map(registration_from_row)
            .collect::<anyhow::Result<_>>()?;
        Ok((self.details(registrations).await?, total))
    }

    async fn update(
        &self,
        id: Uuid,
        status: Option<RegistrationStatus>,
        notes: Option<Option<String>>,
    ) -> anyhow::Result<Option<Registration>> {
        let mut conn = self.pool.acquire().await?;
        update_registration_row(&mut conn, id, status, &notes).await
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM registrations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(res.rows_affected() > 0)
    }

    async fn count_by_status(&self, year: i32) -> anyhow::Result<Vec<(RegistrationStatus, i64)>> {
        let rows = sqlx::query(
            r#"SELECT status, COUNT(*)::BIGINT AS count FROM registrations
               WHERE year = $1 GROUP BY status"#,
        )
        .bind(year)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|r| Ok((r.get::<String, _>("status").parse()?, r.get("count"))))
            .collect()
    }

    async fn apply_admin_edit(
        &self,
        edit: &AdminRegistrationEdit,
    ) -> anyhow::Result<RegistrationDetail> {
        let id = edit.registration_id;
        let mut tx = self.pool.begin().await?;
        update_registration_row(&mut tx, id, edit.status, &edit.notes)
            .await?
            .ok_or_else(|| anyhow::anyhow!("registration {id} not found"))?;
        if !edit.remove_job_ids.is_empty() {
            sqlx::query(
                "DELETE FROM registration_jobs WHERE registration_id = $1 AND job_id = ANY($2)",
            )
            .bind(id)
            .bind(&edit.remove_job_ids)
            .execute(&mut *tx)
            .await?;
        }
        link_jobs(&mut tx, id, &edit.add_job_ids).await?;
        if !edit.remove_camping_option_ids.is_empty() {
            sqlx::query(
                r#"DELETE FROM camping_option_registrations
                   WHERE registration_id = $1 AND camping_option_id = ANY($2)"#,
            )
            .bind(id)
            .bind(&edit.remove_camping_option_ids)
            .execute(&mut *tx)
            .await?;
        }
        let no_values = serde_json::json!({});
        for option_id in &edit.add_camping_option_ids {
            link_camping_option(&mut tx, id, *option_id, &no_values).await?;
        }
        for audit in &edit.audits {
            insert_audit(&mut tx, audit).await?;
        }
        tx.commit().await?;
        self.detail_or_missing(id).await
    }

    async fn apply_admin_cancel(
        &self,
        cancel: &AdminRegistrationCancel,
    ) -> anyhow::Result<(Registration, Vec<Payment>)> {
        let id = cancel.registration_id;
        let mut tx = self.pool.begin().await?;
        let registration =
            update_registration_row(&mut tx, id, Some(RegistrationStatus::Cancelled), &None)
                .await?
                .ok_or_else(|| anyhow::anyhow!("registration {id} not found"))?;
        let mut refunded = Vec::new();
        if !cancel.refund_payment_ids.is_empty() {
            let sql = format!(
                r#"UPDATE payments SET status = 'REFUNDED', updated_at = now()
                   WHERE id = ANY($1) AND status = 'COMPLETED'
                   RETURNING {PAYMENT_COLUMNS}"#
            );
            let rows = sqlx::query(&sql)
                .bind(&cancel.refund_payment_ids)
                .fetch_all(&mut *tx)
                .await?;
            refunded = rows
                .iter()
                .map(payment_from_row)
                .collect::<anyhow::Result<Vec<_>>>()?;
        }
        insert_audit(&mut tx, &cancel.audit).await?;
        for payment in &refunded {
            insert_audit(&mut tx, &cancel.audit.refund_of(payment)).await?;
        }
        tx.commit().await?;
        Ok((registration, refunded))
    }
}
