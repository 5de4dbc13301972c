use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::application::ports::camping_option_field_repository::{
    CampingOptionFieldPatch, CampingOptionFieldRepository, NewCampingOptionField,
};
use crate::domain::camping::camping_option::CampingOptionField;
use crate::infrastructure::db::{PgPool, clear_pair, map_db_error};

pub(crate) const FIELD_COLUMNS: &str = "id, camping_option_id, display_name, description, \
    data_type, required, max_length, min_value, max_value, ordinal, created_at, updated_at";

pub struct SqlxCampingOptionFieldRepository {
    pub pool: PgPool,
}

impl SqlxCampingOptionFieldRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn field_from_row(r: &PgRow) -> anyhow::Result<CampingOptionField> {
    Ok(CampingOptionField {
        id: r.get("id"),
        camping_option_id: r.get("camping_option_id"),
        display_name: r.get("display_name"),
        description: r.get("description"),
        data_type: r.get::<String, _>("data_type").parse()?,
        required: r.get("required"),
        max_length: r.get("max_length"),
        min_value: r.get("min_value"),
        max_value: r.get("max_value"),
        ordinal: r.get("ordinal"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    })
}

#[async_trait]
impl CampingOptionFieldRepository for SqlxCampingOptionFieldRepository {
    async fn list(&self, camping_option_id: Uuid) -> anyhow::Result<Vec<CampingOptionField>> {
        let sql = format!(
            "SELECT {FIELD_COLUMNS} FROM camping_option_fields
             WHERE camping_option_id = $1 ORDER BY ordinal ASC, created_at ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(camping_option_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(field_from_row).collect()
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<CampingOptionField>> {
        let sql = format!("SELECT {FIELD_COLUMNS} FROM camping_option_fields WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(field_from_row).transpose()
    }

    async fn create(&self, field: &NewCampingOptionField) -> anyhow::Result<CampingOptionField> {
        let sql = format!(
            r#"INSERT INTO camping_option_fields (camping_option_id, display_name, description,
                   data_type, required, max_length, min_value, max_value, ordinal)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8,
                   (SELECT COALESCE(MAX(ordinal) + 1, 0) FROM camping_option_fields
                    WHERE camping_option_id = $1))
               RETURNING {FIELD_COLUMNS}"#
        );
        let row = sqlx::query(&sql)
            .bind(field.camping_option_id)
            .bind(&field.display_name)
            .bind(&field.description)
            .bind(field.data_type.as_str())
            .bind(field.required)
            .bind(field.max_length)
            .bind(field.min_value)
            .bind(field.max_value)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;
        field_from_row(&row)
    }

    async fn update(
        &self,
        id: Uuid,
        patch: &CampingOptionFieldPatch,
    ) -> anyhow::Result<Option<CampingOptionField>> {
        let (desc_set, desc) = clear_pair(&patch.description);
        let (len_set, len) = clear_pair(&patch.max_length);
        let (min_set, min) = clear_pair(&patch.min_value);
        let (max_set, max) = clear_pair(&patch.max_value);
        let sql = format!(
            r#"UPDATE camping_option_fields SET
                   display_name = COALESCE($2, display_name),
                   description = CASE WHEN $3 THEN $4 ELSE description END,
                   data_type = COALESCE($5, data_type),
                   required = COALESCE($6, required),
                   max_length = CASE WHEN $7 THEN $8 ELSE max_length END,
                   min_value = CASE WHEN $9 THEN $10 ELSE min_value END,
                   max_value = CASE WHEN $11 THEN $12 ELSE max_value END,
                   updated_at = now()
               WHERE id = $1
               RETURNING {FIELD_COLUMNS}"#
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(&patch.display_name)
            .bind(desc_set)
            .bind(desc)
            .bind(patch.data_type.map(|d| d.as_str()))
            .bind(patch.required)
            .bind(len_set)
            .bind(len)
            .bind(min_set)
            .bind(min)
            .bind(max_set)
            .bind(max)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(field_from_row).transpose()
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM camping_option_fields WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn reorder(&self, camping_option_id: Uuid, ordered_ids: &[Uuid]) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        for (ordinal, id) in ordered_ids.iter().enumerate() {
            sqlx::query(
                r#"UPDATE camping_option_fields SET ordinal = $3, updated_at = now()
                   WHERE id = $1 AND camping_option_id = $2"#,
            )
            .bind(id)
            .bind(camping_option_id)
            .bind(i32::try_from(ordinal)?)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
