use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use utoipa::ToSchema;

use crate::bootstrap::app_context::AppContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Degraded,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub camp_name: String,
    pub registration_year: i32,
}

impl HealthStatus {
    fn from_db_check(db_ok: bool) -> Self {
        if db_ok {
            HealthStatus::Ok
        } else {
            HealthStatus::Degraded
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    security(()),
    responses((status = 200, body = HealthResponse))
)]
pub async fn health(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    let db_ok = match sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(ctx.pool())
        .await
    {
        Ok(_) => true,
        Err(err) => {
            tracing::warn!(error = ?err, "health_check_db_failed");
            false
        }
    };
    let camp = ctx.camp();
    Json(HealthResponse {
        status: HealthStatus::from_db_check(db_ok),
        camp_name: camp.camp_name.clone(),
        registration_year: camp.registration_year,
    })
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new().route("/health", get(health)).with_state(ctx)
}
