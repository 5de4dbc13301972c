use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Row};
use uuid::Uuid;

use crate::application::dto::pagination::PageRequest;
use crate::application::ports::admin_audit_repository::{
    ActorCount, AdminAuditRepository, AuditFilter, AuditStats,
};
use crate::domain::audit::admin_audit::{AdminAudit, AuditTargetType, NewAdminAudit};
use crate::infrastructure::db::{PgPool, map_db_error};

const AUDIT_COLUMNS: &str = "id, actor_user_id, action_type, target_record_type, \
    target_record_id, old_values, new_values, reason, transaction_id, created_at";

const AUDIT_PREDICATE: &str = r#"($1::uuid IS NULL OR actor_user_id = $1)
       AND ($2::text IS NULL OR action_type = $2)
       AND ($3::text IS NULL OR target_record_type = $3)
       AND ($4::uuid IS NULL OR target_record_id = $4)
       AND ($5::timestamptz IS NULL OR created_at >= $5)
       AND ($6::timestamptz IS NULL OR created_at <= $6)"#;

pub struct SqlxAdminAuditRepository {
    pub pool: PgPool,
}

impl SqlxAdminAuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn audit_from_row(r: &PgRow) -> anyhow::Result<AdminAudit> {
    Ok(AdminAudit {
        id: r.get("id"),
        actor_user_id: r.get("actor_user_id"),
        action_type: r.get::<String, _>("action_type").parse()?,
        target_record_type: r.get::<String, _>("target_record_type").parse()?,
        target_record_id: r.get("target_record_id"),
        old_values: r.get("old_values"),
        new_values: r.get("new_values"),
        reason: r.get("reason"),
        transaction_id: r.get("transaction_id"),
        created_at: r.get("created_at"),
    })
}

/// Writes one audit row on an open connection so callers can share their transaction.
pub(crate) async fn insert_audit(
    conn: &mut PgConnection,
    entry: &NewAdminAudit,
) -> anyhow::Result<AdminAudit> {
    let sql = format!(
        r#"INSERT INTO admin_audits (actor_user_id, action_type, target_record_type,
               target_record_id, old_values, new_values, reason, transaction_id)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
           RETURNING {AUDIT_COLUMNS}"#
    );
    let row = sqlx::query(&sql)
        .bind(entry.actor_user_id)
        .bind(entry.action_type.as_str())
        .bind(entry.target_record_type.as_str())
        .bind(entry.target_record_id)
        .bind(&entry.old_values)
        .bind(&entry.new_values)
        .bind(&entry.reason)
        .bind(entry.transaction_id)
        .fetch_one(conn)
        .await
        .map_err(map_db_error)?;
    audit_from_row(&row)
}

#[async_trait]
impl AdminAuditRepository for SqlxAdminAuditRepository {
    async fn record(&self, entry: &NewAdminAudit) -> anyhow::Result<AdminAudit> {
        let mut conn = self.pool.acquire().await?;
        insert_audit(&mut conn, entry).await
    }

    async fn list(
        &self,
        filter: &AuditFilter,
        page: PageRequest,
    ) -> anyhow::Result<(Vec<AdminAudit>, i64)> {
        let action = filter.action_type.map(|a| a.as_str());
        let target = filter.target_record_type.map(|t| t.as_str());
        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM admin_audits WHERE {AUDIT_PREDICATE}"
        ))
        .bind(filter.actor_user_id)
        .bind(action)
        .bind(target)
        .bind(filter.target_record_id)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_one(&self.pool)
        .await?;
        let sql = format!(
            "SELECT {AUDIT_COLUMNS} FROM admin_audits WHERE {AUDIT_PREDICATE}
             ORDER BY created_at DESC, id DESC LIMIT $7 OFFSET $8"
        );
        let rows = sqlx::query(&sql)
            .bind(filter.actor_user_id)
            .bind(action)
            .bind(target)
            .bind(filter.target_record_id)
            .bind(filter.from)
            .bind(filter.to)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;
        let items = rows
            .iter()
            .map(audit_from_row)
            .collect::<anyhow::Result<_>>()?;
        Ok((items, total))
    }

    async fn history(
        &self,
        target_type: AuditTargetType,
        target_id: Uuid,
    ) -> anyhow::Result<Vec<AdminAudit>> {
        let sql = format!(
            "SELECT {AUDIT_COLUMNS} FROM admin_audits
             WHERE target_record_type = $1 AND target_record_id = $2
             ORDER BY created_at ASC, id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(target_type.as_str())
            .bind(target_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(audit_from_row).collect()
    }

    async fn stats(
        &self,
        from: Option<chrono::DateTime<chrono::Utc>>,
        to: Option<chrono::DateTime<chrono::Utc>>,
    ) -> anyhow::Result<AuditStats> {
        let window = r#"($1::timestamptz IS NULL OR a.created_at >= $1)
               AND ($2::timestamptz IS NULL OR a.created_at <= $2)"#;
        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM admin_audits a WHERE {window}"
        ))
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;
        let action_rows = sqlx::query(&format!(
            r#"SELECT a.action_type, COUNT(*)::BIGINT AS count FROM admin_audits a
               WHERE {window}
               GROUP BY a.action_type
               ORDER BY count DESC, a.action_type ASC"#
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        let by_action = action_rows
            .iter()
            .map(|r| Ok((r.get::<String, _>("action_type").parse()?, r.get("count"))))
            .collect::<anyhow::Result<_>>()?;
        let actor_rows = sqlx::query(&format!(
            r#"SELECT a.actor_user_id, u.email, COUNT(*)::BIGINT AS count
               FROM admin_audits a
               LEFT JOIN users u ON u.id = a.actor_user_id
               WHERE {window}
               GROUP BY a.actor_user_id, u.email
               ORDER BY count DESC, u.email ASC"#
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        let by_actor = actor_rows
            .iter()
            .map(|r| ActorCount {
                actor_user_id: r.get("actor_user_id"),
                actor_email: r.get("email"),
                count: r.get("count"),
            })
            .collect();
        Ok(AuditStats {
            total,
            by_action,
            by_actor,
        })
    }
}
