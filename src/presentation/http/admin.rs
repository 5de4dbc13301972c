use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::dto::pagination::{Page, PageRequest};
use crate::application::ports::admin_audit_repository::{AuditFilter, AuditStats};
use crate::application::use_cases::admin::audit::{AuditHistory, GetAuditStats, ListAudit};
use crate::application::use_cases::admin::cancel_registration::{
    AdminCancelOutcome, AdminCancelRequest, CancelRegistration,
};
use crate::application::use_cases::admin::edit_registration::{
    AdminEditRequest, EditRegistration,
};
use crate::bootstrap::app_context::AppContext;
use crate::domain::audit::admin_audit::{AdminAudit, AuditActionType, AuditTargetType};
use crate::domain::registrations::registration::RegistrationStatus;
use crate::presentation::http::auth::{Bearer, authenticate};
use crate::presentation::http::error::{ApiError, ApiResult};
use crate::presentation::http::payments::PaymentResponse;
use crate::presentation::http::registrations::{RegistrationRecord, RegistrationResponse};

type Timestamp = chrono::DateTime<chrono::Utc>;

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct AdminEditBody {
    pub status: Option<RegistrationStatus>,
    /// Replaces the registration's jobs when present.
    pub job_ids: Option<Vec<Uuid>>,
    /// Replaces the registration's camping options when present.
    pub camping_option_ids: Option<Vec<Uuid>>,
    pub notes: Option<String>,
    pub reason: Option<String>,
    pub notify_user: bool,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct AdminCancelBody {
    pub reason: Option<String>,
    pub process_refunds: bool,
    pub notify_user: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminCancelResponse {
    pub registration: RegistrationRecord,
    pub refunded_payments: Vec<PaymentResponse>,
}

impl From<AdminCancelOutcome> for AdminCancelResponse {
    fn from(o: AdminCancelOutcome) -> Self {
        AdminCancelResponse {
            registration: o.registration.into(),
            refunded_payments: o.refunded_payments.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditResponse {
    pub id: Uuid,
    pub actor_user_id: Uuid,
    pub action_type: AuditActionType,
    pub target_record_type: AuditTargetType,
    pub target_record_id: Uuid,
    #[schema(value_type = Option<Object>)]
    pub old_values: Option<serde_json::Value>,
    #[schema(value_type = Option<Object>)]
    pub new_values: Option<serde_json::Value>,
    pub reason: Option<String>,
    pub transaction_id: Option<Uuid>,
    pub created_at: Timestamp,
}

impl From<AdminAudit> for AuditResponse {
    fn from(a: AdminAudit) -> Self {
        AuditResponse {
            id: a.id,
            actor_user_id: a.actor_user_id,
            action_type: a.action_type,
            target_record_type: a.target_record_type,
            target_record_id: a.target_record_id,
            old_values: a.old_values,
            new_values: a.new_values,
            reason: a.reason,
            transaction_id: a.transaction_id,
            created_at: a.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditPage {
    pub items: Vec<AuditResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

impl From<Page<AdminAudit>> for AuditPage {
    fn from(p: Page<AdminAudit>) -> Self {
        let p = p.map(AuditResponse::from);
        AuditPage {
            items: p.items,
            total: p.total,
            limit: p.limit,
            offset: p.offset,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ActionCount {
    pub action_type: AuditActionType,
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ActorCountResponse {
    pub actor_user_id: Uuid,
    pub actor_email: Option<String>,
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditStatsResponse {
    pub total: i64,
    pub by_action: Vec<ActionCount>,
    pub by_actor: Vec<ActorCountResponse>,
}

impl From<AuditStats> for AuditStatsResponse {
    fn from(s: AuditStats) -> Self {
        AuditStatsResponse {
            total: s.total,
            by_action: s
                .by_action
                .into_iter()
                .map(|(action_type, count)| ActionCount { action_type, count })
                .collect(),
            by_actor: s
                .by_actor
                .into_iter()
                .map(|a| ActorCountResponse {
                    actor_user_id: a.actor_user_id,
                    actor_email: a.actor_email,
                    count: a.count,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListAuditQuery {
    pub actor_user_id: Option<Uuid>,
    pub action_type: Option<AuditActionType>,
    pub target_record_type: Option<AuditTargetType>,
    pub target_record_id: Option<Uuid>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
}

/// Accepts `registration`, `camping-option` and the canonical upper-case names.
fn parse_target_type(raw: &str) -> Result<AuditTargetType, ApiError> {
    raw.trim()
        .to_ascii_uppercase()
        .replace('-', "_")
        .parse()
        .map_err(|_| ApiError::bad_request(format!("unknown target type {raw}")))
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/admin/registrations/:id", put(edit_registration))
        .route(
            "/admin/registrations/:id/cancel",
            post(cancel_registration),
        )
        .route("/admin/audit", get(list_audit))
        .route("/admin/audit/stats", get(audit_stats))
        .route("/admin/audit/:target_type/:target_id", get(audit_history))
        .with_state(ctx)
}

#[utoipa::path(put, path = "/api/admin/registrations/{id}", tag = "Admin", request_body = AdminEditBody,
    params(("id" = Uuid, Path, description = "Registration ID")),
    responses(
        (status = 200, body = RegistrationResponse),
        (status = 403, body = crate::presentation::http::error::ErrorBody),
        (status = 404, body = crate::presentation::http::error::ErrorBody)
    ))]
pub async fn edit_registration(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
    Json(body): Json<AdminEditBody>,
) -> ApiResult<Json<RegistrationResponse>> {
    let actor = authenticate(&ctx, bearer).await?;
    let registrations = ctx.registration_repo();
    let jobs = ctx.job_repo();
    let options = ctx.camping_option_repo();
    let users = ctx.user_repo();
    let notifier = ctx.notifier();
    let uc = EditRegistration {
        registrations: registrations.as_ref(),
        jobs: jobs.as_ref(),
        options: options.as_ref(),
        users: users.as_ref(),
        notifier: notifier.as_ref(),
        settings: ctx.camp(),
    };
    let req = AdminEditRequest {
        status: body.status,
        job_ids: body.job_ids,
        camping_option_ids: body.camping_option_ids,
        notes: body.notes,
        reason: body.reason,
        notify_user: body.notify_user,
    };
    let detail = uc.execute(&actor, id, req).await?;
    Ok(Json(detail.into()))
}

#[utoipa::path(post, path = "/api/admin/registrations/{id}/cancel", tag = "Admin", request_body = AdminCancelBody,
    params(("id" = Uuid, Path, description = "Registration ID")),
    responses(
        (status = 200, body = AdminCancelResponse),
        (status = 400, body = crate::presentation::http::error::ErrorBody)
    ))]
pub async fn cancel_registration(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
    Json(body): Json<AdminCancelBody>,
) -> ApiResult<Json<AdminCancelResponse>> {
    let actor = authenticate(&ctx, bearer).await?;
    let registrations = ctx.registration_repo();
    let payments = ctx.payment_repo();
    let users = ctx.user_repo();
    let notifier = ctx.notifier();
    let uc = CancelRegistration {
        registrations: registrations.as_ref(),
        payments: payments.as_ref(),
        users: users.as_ref(),
        notifier: notifier.as_ref(),
        settings: ctx.camp(),
    };
    let req = AdminCancelRequest {
        reason: body.reason,
        process_refunds: body.process_refunds,
        notify_user: body.notify_user,
    };
    Ok(Json(uc.execute(&actor, id, req).await?.into()))
}

#[utoipa::path(get, path = "/api/admin/audit", tag = "Admin",
    params(
        ("actor_user_id" = Option<Uuid>, Query, description = "Acting admin"),
        ("action_type" = Option<AuditActionType>, Query, description = "Action type"),
        ("target_record_type" = Option<AuditTargetType>, Query, description = "Target record type"),
        ("target_record_id" = Option<Uuid>, Query, description = "Target record"),
        ("from" = Option<String>, Query, description = "RFC 3339 lower bound"),
        ("to" = Option<String>, Query, description = "RFC 3339 upper bound"),
        ("limit" = Option<i64>, Query, description = "Page size (max 200)"),
        ("offset" = Option<i64>, Query, description = "Rows to skip")
    ),
    responses((status = 200, body = AuditPage)))]
pub async fn list_audit(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Query(q): Query<ListAuditQuery>,
) -> ApiResult<Json<AuditPage>> {
    let actor = authenticate(&ctx, bearer).await?;
    let repo = ctx.admin_audit_repo();
    let uc = ListAudit {
        repo: repo.as_ref(),
    };
    let filter = AuditFilter {
        actor_user_id: q.actor_user_id,
        action_type: q.action_type,
        target_record_type: q.target_record_type,
        target_record_id: q.target_record_id,
        from: q.from,
        to: q.to,
    };
    let page = uc
        .execute(&actor, filter, PageRequest::new(q.limit, q.offset))
        .await?;
    Ok(Json(page.into()))
}

#[utoipa::path(get, path = "/api/admin/audit/stats", tag = "Admin",
    params(
        ("from" = Option<String>, Query, description = "RFC 3339 lower bound"),
        ("to" = Option<String>, Query, description = "RFC 3339 upper bound")
    ),
    responses((status = 200, body = AuditStatsResponse)))]
pub async fn audit_stats(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Query(q): Query<StatsQuery>,
) -> ApiResult<Json<AuditStatsResponse>> {
    let actor = authenticate(&ctx, bearer).await?;
    let repo = ctx.admin_audit_repo();
    let uc = GetAuditStats {
        repo: repo.as_ref(),
    };
    Ok(Json(uc.execute(&actor, q.from, q.to).await?.into()))
}

#[utoipa::path(get, path = "/api/admin/audit/{target_type}/{target_id}", tag = "Admin",
    params(
        ("target_type" = String, Path, description = "REGISTRATION, USER, PAYMENT, CAMPING_OPTION or JOB"),
        ("target_id" = Uuid, Path, description = "Target record ID")
    ),
    responses((status = 200, body = [AuditResponse])))]
pub async fn audit_history(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path((target_type, target_id)): Path<(String, Uuid)>,
) -> ApiResult<Json<Vec<AuditResponse>>> {
    let actor = authenticate(&ctx, bearer).await?;
    let target_type = parse_target_type(&target_type)?;
    let repo = ctx.admin_audit_repo();
    let uc = AuditHistory {
        repo: repo.as_ref(),
    };
    let rows = uc.execute(&actor, target_type, target_id).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}
