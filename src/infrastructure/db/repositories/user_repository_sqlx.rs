use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Row};
use uuid::Uuid;

use crate::application::dto::pagination::PageRequest;
use crate::application::ports::user_repository::{
    NewUser, UserCredentials, UserFilter, UserPatch, UserRepository,
};
use crate::domain::audit::admin_audit::{AuditActionType, AuditTargetType, NewAdminAudit};
use crate::domain::users::user::User;
use crate::infrastructure::db::repositories::admin_audit_repository_sqlx::insert_audit;
use crate::infrastructure::db::{PgPool, clear_pair, map_db_error};

const USER_COLUMNS: &str = "id, email, first_name, last_name, playa_name, phone, city, \
    state_province, country, emergency_contact, role, is_email_verified, allow_registration, \
    allow_early_registration, allow_deferred_dues_payment, allow_no_job, internal_notes, \
    created_at, updated_at";

pub struct SqlxUserRepository {
    pub pool: PgPool,
}

impl SqlxUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn user_from_row(r: &PgRow) -> anyhow::Result<User> {
    Ok(User {
        id: r.get("id"),
        email: r.get("email"),
        first_name: r.get("first_name"),
        last_name: r.get("last_name"),
        playa_name: r.get("playa_name"),
        phone: r.get("phone"),
        city: r.get("city"),
        state_province: r.get("state_province"),
        country: r.get("country"),
        emergency_contact: r.get("emergency_contact"),
        role: r.get::<String, _>("role").parse()?,
        is_email_verified: r.get("is_email_verified"),
        allow_registration: r.get("allow_registration"),
        allow_early_registration: r.get("allow_early_registration"),
        allow_deferred_dues_payment: r.get("allow_deferred_dues_payment"),
        allow_no_job: r.get("allow_no_job"),
        internal_notes: r.get("internal_notes"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    })
}

async fn update_user_row(
    conn: &mut PgConnection,
    id: Uuid,
    patch: &UserPatch,
) -> anyhow::Result<Option<User>> {
    let (playa_set, playa) = clear_pair(&patch.playa_name);
    let (phone_set, phone) = clear_pair(&patch.phone);
    let (city_set, city) = clear_pair(&patch.city);
    let (state_set, state) = clear_pair(&patch.state_province);
    let (country_set, country) = clear_pair(&patch.country);
    let (contact_set, contact) = clear_pair(&patch.emergency_contact);
    let (notes_set, notes) = clear_pair(&patch.internal_notes);
    let sql = format!(
        r#"UPDATE users SET
               email = COALESCE($2, email),
               first_name = COALESCE($3, first_name),
               last_name = COALESCE($4, last_name),
               playa_name = CASE WHEN $5 THEN $6 ELSE playa_name END,
               phone = CASE WHEN $7 THEN $8 ELSE phone END,
               city = CASE WHEN $9 THEN $10 ELSE city END,
               state_province = CASE WHEN $11 THEN $12 ELSE state_province END,
               country = CASE WHEN $13 THEN $14 ELSE country END,
               emergency_contact = CASE WHEN $15 THEN $16 ELSE emergency_contact END,
               role = COALESCE($17, role),
               is_email_verified = COALESCE($18, is_email_verified),
               allow_registration = COALESCE($19, allow_registration),
               allow_early_registration = COALESCE($20, allow_early_registration),
               allow_deferred_dues_payment = COALESCE($21, allow_deferred_dues_payment),
               allow_no_job = COALESCE($22, allow_no_job),
               internal_notes = CASE WHEN $23 THEN $24 ELSE internal_notes END,
               updated_at = now()
           WHERE id = $1
           RETURNING {USER_COLUMNS}"#
    );
    let row = sqlx::query(&sql)
        .bind(id)
        .bind(&patch.email)
        .bind(&patch.first_name)
        .bind(&patch.last_name)
        .bind(playa_set)
        .bind(playa)
        .bind(phone_set)
        .bind(phone)
        .bind(city_set)
        .bind(city)
        .bind(state_set)
        .bind(state)
        .bind(country_set)
        .bind(country)
        .bind(contact_set)
        .bind(contact)
        .bind(patch.role.map(|r| r.as_str()))
        .bind(patch.is_email_verified)
        .bind(patch.allow_registration)
        .bind(patch.allow_early_registration)
        .bind(patch.allow_deferred_dues_payment)
        .bind(patch.allow_no_job)
        .bind(notes_set)
        .bind(notes)
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_db_error)?;
    row.as_ref().map(user_from_row).transpose()
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create_user(&self, user: &NewUser) -> anyhow::Result<User> {
        let sql = format!(
            r#"INSERT INTO users (email, password_hash, first_name, last_name, playa_name, phone,
                   city, state_province, country, emergency_contact, role, is_email_verified,
                   allow_registration, allow_early_registration, allow_deferred_dues_payment,
                   allow_no_job, internal_notes)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
               RETURNING {USER_COLUMNS}"#
        );
        let row = sqlx::query(&sql)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.playa_name)
            .bind(&user.phone)
            .bind(&user.city)
            .bind(&user.state_province)
            .bind(&user.country)
            .bind(&user.emergency_contact)
            .bind(user.role.as_str())
            .bind(user.is_email_verified)
            .bind(user.allow_registration)
            .bind(user.allow_early_registration)
            .bind(user.allow_deferred_dues_payment)
            .bind(user.allow_no_job)
            .bind(&user.internal_notes)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;
        user_from_row(&row)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> anyhow::Result<Option<UserCredentials>> {
        let sql = format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE LOWER(email) = LOWER($1)"
        );
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(r) => Ok(Some(UserCredentials {
                user: user_from_row(&r)?,
                password_hash: r.try_get("password_hash").ok().flatten(),
            })),
            None => Ok(None),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn list_users(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> anyhow::Result<(Vec<User>, i64)> {
        let role = filter.role.map(|r| r.as_str());
        let like = filter
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{q}%"));
        let predicate = r#"($1::text IS NULL OR role = $1)
               AND ($2::text IS NULL OR email ILIKE $2 OR first_name ILIKE $2
                    OR last_name ILIKE $2 OR playa_name ILIKE $2)"#;
        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM users WHERE {predicate}"))
                .bind(role)
                .bind(&like)
                .fetch_one(&self.pool)
                .await?;
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {predicate}
             ORDER BY last_name ASC, first_name ASC, id ASC LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query(&sql)
            .bind(role)
            .bind(&like)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;
        let users = rows.iter().map(user_from_row).collect::<anyhow::Result<_>>()?;
        Ok((users, total))
    }

    async fn update_user(&self, id: Uuid, patch: &UserPatch) -> anyhow::Result<Option<User>> {
        let mut conn = self.pool.acquire().await?;
        update_user_row(&mut conn, id, patch).await
    }

    async fn update_user_audited(
        &self,
        id: Uuid,
        patch: &UserPatch,
        actor_user_id: Uuid,
    ) -> anyhow::Result<Option<User>> {
        let mut tx = self.pool.begin().await?;
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE");
        let Some(row) = sqlx::query(&sql).bind(id).fetch_optional(&mut *tx).await? else {
            return Ok(None);
        };
        let before = user_from_row(&row)?;
        let Some(after) = update_user_row(&mut tx, id, patch).await? else {
            return Ok(None);
        };
        if let Some((old_values, new_values)) = after.changes_since(&before) {
            insert_audit(
                &mut tx,
                &NewAdminAudit {
                    actor_user_id,
                    action_type: AuditActionType::UserUpdate,
                    target_record_type: AuditTargetType::User,
                    target_record_id: id,
                    old_values: Some(old_values),
                    new_values: Some(new_values),
                    reason: None,
                    transaction_id: None,
                },
            )
            .await?;
        }
        tx.commit().await?;
        Ok(Some(after))
    }

    async fn delete_user(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(res.rows_affected() > 0)
    }

    async fn count_dependents(&self, id: Uuid) -> anyhow::Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"SELECT (SELECT COUNT(*) FROM registrations WHERE user_id = $1)
                    + (SELECT COUNT(*) FROM payments WHERE user_id = $1)"#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
