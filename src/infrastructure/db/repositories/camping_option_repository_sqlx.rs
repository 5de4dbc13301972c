use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Postgres, Row, Transaction};
use uuid::Uuid;

use crate::application::ports::camping_option_repository::{
    CampingOptionPatch, CampingOptionRepository, NewCampingOption,
};
use crate::domain::camping::camping_option::{
    CampingOption, CampingOptionDetail, CampingOptionField,
};
use crate::infrastructure::db::repositories::camping_option_field_repository_sqlx::{
    FIELD_COLUMNS, field_from_row,
};
use crate::infrastructure::db::{PgPool, clear_pair, map_db_error};

const OPTION_COLUMNS: &str = "o.id, o.name, o.description, o.enabled, o.work_shifts_required, \
    o.participant_dues, o.staff_dues, o.max_signups, o.created_at, o.updated_at, \
    ARRAY(SELECT job_category_id FROM camping_option_job_categories c \
          WHERE c.camping_option_id = o.id ORDER BY job_category_id) AS job_category_ids";

const SIGNUP_COUNT: &str = r#"(SELECT COUNT(*) FROM camping_option_registrations cor
       JOIN registrations r ON r.id = cor.registration_id
       WHERE cor.camping_option_id = o.id AND r.status IN ('PENDING', 'CONFIRMED')) AS current_signups"#;

pub struct SqlxCampingOptionRepository {
    pub pool: PgPool,
}

impl SqlxCampingOptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fields_for(
        &self,
        option_ids: &[Uuid],
    ) -> anyhow::Result<HashMap<Uuid, Vec<CampingOptionField>>> {
        let sql = format!(
            "SELECT {FIELD_COLUMNS} FROM camping_option_fields
             WHERE camping_option_id = ANY($1) ORDER BY ordinal ASC, created_at ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(option_ids)
            .fetch_all(&self.pool)
            .await?;
        let mut out: HashMap<Uuid, Vec<CampingOptionField>> = HashMap::new();
        for row in &rows {
            let field = field_from_row(row)?;
            out.entry(field.camping_option_id).or_default().push(field);
        }
        Ok(out)
    }

    async fn details(&self, rows: Vec<PgRow>) -> anyhow::Result<Vec<CampingOptionDetail>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.get("id")).collect();
        let mut fields = self.fields_for(&ids).await?;
        Ok(rows
            .iter()
            .map(|r| {
                let option = option_from_row(r);
                CampingOptionDetail {
                    fields: fields.remove(&option.id).unwrap_or_default(),
                    current_signups: r.get("current_signups"),
                    option,
                }
            })
            .collect())
    }
}

fn option_from_row(r: &PgRow) -> CampingOption {
    CampingOption {
        id: r.get("id"),
        name: r.get("name"),
        description: r.get("description"),
        enabled: r.get("enabled"),
        work_shifts_required: r.get("work_shifts_required"),
        participant_dues: r.get("participant_dues"),
        staff_dues: r.get("staff_dues"),
        max_signups: r.get("max_signups"),
        job_category_ids: r.get("job_category_ids"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

async fn replace_categories(
    tx: &mut Transaction<'_, Postgres>,
    option_id: Uuid,
    category_ids: &[Uuid],
) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM camping_option_job_categories WHERE camping_option_id = $1")
        .bind(option_id)
        .execute(&mut **tx)
        .await?;
    sqlx::query(
        r#"INSERT INTO camping_option_job_categories (camping_option_id, job_category_id)
           SELECT $1, UNNEST($2::uuid[]) ON CONFLICT DO NOTHING"#,
    )
    .bind(option_id)
    .bind(category_ids)
    .execute(&mut **tx)
    .await
    .map_err(map_db_error)?;
    Ok(())
}

async fn fetch_option(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> anyhow::Result<Option<CampingOption>> {
    let sql = format!("SELECT {OPTION_COLUMNS} FROM camping_options o WHERE o.id = $1");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.as_ref().map(option_from_row))
}

#[async_trait]
impl CampingOptionRepository for SqlxCampingOptionRepository {
    async fn create(&self, option: &NewCampingOption) -> anyhow::Result<CampingOption> {
        let mut tx = self.pool.begin().await?;
        let id: Uuid = sqlx::query_scalar(
            r#"INSERT INTO camping_options (name, description, enabled, work_shifts_required,
                   participant_dues, staff_dues, max_signups)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING id"#,
        )
        .bind(&option.name)
        .bind(&option.description)
        .bind(option.enabled)
        .bind(option.work_shifts_required)
        .bind(option.participant_dues)
        .bind(option.staff_dues)
        .bind(option.max_signups)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;
        replace_categories(&mut tx, id, &option.job_category_ids).await?;
        let created = fetch_option(&mut tx, id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("camping option {id} vanished during insert"))?;
        tx.commit().await?;
        Ok(created)
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<CampingOptionDetail>> {
        let sql = format!(
            "SELECT {OPTION_COLUMNS}, {SIGNUP_COUNT} FROM camping_options o WHERE o.id = $1"
        );
        let rows: Vec<PgRow> = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .into_iter()
            .collect();
        Ok(self.details(rows).await?.into_iter().next())
    }

    async fn get_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<CampingOptionDetail>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {OPTION_COLUMNS}, {SIGNUP_COUNT} FROM camping_options o
             WHERE o.id = ANY($1) ORDER BY o.name ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        self.details(rows).await
    }

    async fn list(&self, include_disabled: bool) -> anyhow::Result<Vec<CampingOptionDetail>> {
        let sql = format!(
            "SELECT {OPTION_COLUMNS}, {SIGNUP_COUNT} FROM camping_options o
             WHERE $1 OR o.enabled ORDER BY o.name ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(include_disabled)
            .fetch_all(&self.pool)
            .await?;
        self.details(rows).await
    }

    async fn update(
        &self,
        id: Uuid,
        patch: &CampingOptionPatch,
    ) -> anyhow::Result<Option<CampingOption>> {
        let mut tx = self.pool.begin().await?;
        let (desc_set, desc) = clear_pair(&patch.description);
        let res = sqlx::query(
            r#"UPDATE camping_options SET
                   name = COALESCE($2, name),
                   description = CASE WHEN $3 THEN $4 ELSE description END,
                   enabled = COALESCE($5, enabled),
                   work_shifts_required = COALESCE($6, work_shifts_required),
                   participant_dues = COALESCE($7, participant_dues),
                   staff_dues = COALESCE($8, staff_dues),
                   max_signups = COALESCE($9, max_signups),
                   updated_at = now()
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(&patch.name)
        .bind(desc_set)
        .bind(desc)
        .bind(patch.enabled)
        .bind(patch.work_shifts_required)
        .bind(patch.participant_dues)
        .bind(patch.staff_dues)
        .bind(patch.max_signups)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;
        if res.rows_affected() == 0 {
            return Ok(None);
        }
        if let Some(category_ids) = &patch.job_category_ids {
            replace_categories(&mut tx, id, category_ids).await?;
        }
        let updated = fetch_option(&mut tx, id).await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM camping_options WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(res.rows_affected() > 0)
    }

    async fn count_registrations(&self, id: Uuid) -> anyhow::Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM camping_option_registrations WHERE camping_option_id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
