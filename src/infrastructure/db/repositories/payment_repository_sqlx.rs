use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::application::dto::pagination::PageRequest;
use crate::application::ports::payment_repository::{
    NewPayment, PaymentFilter, PaymentPatch, PaymentRepository,
};
use crate::domain::audit::admin_audit::NewAdminAudit;
use crate::domain::payments::payment::Payment;
use crate::infrastructure::db::repositories::admin_audit_repository_sqlx::insert_audit;
use crate::infrastructure::db::{PgPool, clear_pair, map_db_error};

pub(crate) const PAYMENT_COLUMNS: &str = "id, user_id, registration_id, amount_cents, currency, \
    status, provider, provider_ref, notes, created_at, updated_at";

pub struct SqlxPaymentRepository {
    pub pool: PgPool,
}

impl SqlxPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn payment_from_row(r: &PgRow) -> anyhow::Result<Payment> {
    Ok(Payment {
        id: r.get("id"),
        user_id: r.get("user_id"),
        registration_id: r.get("registration_id"),
        amount_cents: r.get("amount_cents"),
        currency: r.get("currency"),
        status: r.get::<String, _>("status").parse()?,
        provider: r.get::<String, _>("provider").parse()?,
        provider_ref: r.get("provider_ref"),
        notes: r.get("notes"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    })
}

#[async_trait]
impl PaymentRepository for SqlxPaymentRepository {
    async fn create(&self, payment: &NewPayment) -> anyhow::Result<Payment> {
        let sql = format!(
            r#"INSERT INTO payments (user_id, registration_id, amount_cents, currency, status,
                   provider, provider_ref, notes)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING {PAYMENT_COLUMNS}"#
        );
        let row = sqlx::query(&sql)
            .bind(payment.user_id)
            .bind(payment.registration_id)
            .bind(payment.amount_cents)
            .bind(&payment.currency)
            .bind(payment.status.as_str())
            .bind(payment.provider.as_str())
            .bind(&payment.provider_ref)
            .bind(&payment.notes)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;
        payment_from_row(&row)
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Payment>> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(payment_from_row).transpose()
    }

    async fn list(
        &self,
        filter: &PaymentFilter,
        page: PageRequest,
    ) -> anyhow::Result<(Vec<Payment>, i64)> {
        let predicate = r#"($1::uuid IS NULL OR user_id = $1)
               AND ($2::uuid IS NULL OR registration_id = $2)
               AND ($3::text IS NULL OR status = $3)"#;
        let status = filter.status.map(|s| s.as_str());
        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM payments WHERE {predicate}"))
                .bind(filter.user_id)
                .bind(filter.registration_id)
                .bind(status)
                .fetch_one(&self.pool)
                .await?;
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE {predicate}
             ORDER BY created_at DESC, id DESC LIMIT $4 OFFSET $5"
        );
        let rows = sqlx::query(&sql)
            .bind(filter.user_id)
            .bind(filter.registration_id)
            .bind(status)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;
        let items = rows
            .iter()
            .map(payment_from_row)
            .collect::<anyhow::Result<_>>()?;
        Ok((items, total))
    }

    async fn list_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Payment>> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE user_id = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(payment_from_row).collect()
    }

    async fn list_for_registration(&self, registration_id: Uuid) -> anyhow::Result<Vec<Payment>> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE registration_id = $1
             ORDER BY created_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(registration_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(payment_from_row).collect()
    }

    async fn update(&self, id: Uuid, patch: &PaymentPatch) -> anyhow::Result<Option<Payment>> {
        let (ref_set, provider_ref) = clear_pair(&patch.provider_ref);
        let (notes_set, notes) = clear_pair(&patch.notes);
        let sql = format!(
            r#"UPDATE payments SET
                   status = COALESCE($2, status),
                   provider_ref = CASE WHEN $3 THEN $4 ELSE provider_ref END,
                   notes = CASE WHEN $5 THEN $6 ELSE notes END,
                   updated_at = now()
               WHERE id = $1 AND ($2::text IS NULL OR status <> 'REFUNDED')
               RETURNING {PAYMENT_COLUMNS}"#
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(patch.status.map(|s| s.as_str()))
            .bind(ref_set)
            .bind(provider_ref)
            .bind(notes_set)
            .bind(notes)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(payment_from_row).transpose()
    }

    async fn refund(&self, id: Uuid, audit: &NewAdminAudit) -> anyhow::Result<Option<Payment>> {
        let mut tx = self.pool.begin().await?;
        let sql = format!(
            r#"UPDATE payments SET status = 'REFUNDED', updated_at = now()
               WHERE id = $1 AND status = 'COMPLETED'
               RETURNING {PAYMENT_COLUMNS}"#
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let payment = payment_from_row(&row)?;
        insert_audit(&mut tx, audit).await?;
        tx.commit().await?;
        Ok(Some(payment))
    }
}
