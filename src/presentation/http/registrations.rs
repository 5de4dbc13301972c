use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::dto::pagination::{Page, PageRequest};
use crate::application::ports::registration_repository::RegistrationFilter;
use crate::application::use_cases::registrations::create_registration::{
    CampingOptionChoice, CreateRegistration, CreateRegistrationRequest,
};
use crate::application::use_cases::registrations::queries::{
    GetRegistration, ListRegistrations, MyRegistrations, RegistrationSummary,
    SummarizeRegistrations,
};
use crate::application::use_cases::registrations::update_registration::{
    CancelOwnRegistration, DeleteRegistration, UpdateRegistration, UpdateRegistrationRequest,
};
use crate::bootstrap::app_context::AppContext;
use crate::domain::registrations::registration::{
    CampingOptionRegistration, Registration, RegistrationDetail, RegistrationJobLink,
    RegistrationStatus,
};
use crate::presentation::http::auth::{Bearer, authenticate};
use crate::presentation::http::error::ApiResult;

type Timestamp = chrono::DateTime<chrono::Utc>;

#[derive(Debug, Serialize, ToSchema)]
pub struct RegistrationRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub year: i32,
    pub status: RegistrationStatus,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<Registration> for RegistrationRecord {
    fn from(r: Registration) -> Self {
        RegistrationRecord {
            id: r.id,
            user_id: r.user_id,
            year: r.year,
            status: r.status,
            notes: r.notes,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegistrationJobResponse {
    pub job_id: Uuid,
    pub job_name: String,
    pub category_id: Uuid,
    pub start_time: Option<Timestamp>,
    pub end_time: Option<Timestamp>,
}

impl From<RegistrationJobLink> for RegistrationJobResponse {
    fn from(j: RegistrationJobLink) -> Self {
        RegistrationJobResponse {
            job_id: j.job_id,
            job_name: j.job_name,
            category_id: j.category_id,
            start_time: j.start_time,
            end_time: j.end_time,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegistrationCampingOptionResponse {
    pub camping_option_id: Uuid,
    pub camping_option_name: String,
    /// Custom field answers keyed by field id.
    #[schema(value_type = Object)]
    pub field_values: serde_json::Value,
}

impl From<CampingOptionRegistration> for RegistrationCampingOptionResponse {
    fn from(c: CampingOptionRegistration) -> Self {
        RegistrationCampingOptionResponse {
            camping_option_id: c.camping_option_id,
            camping_option_name: c.camping_option_name,
            field_values: c.field_values,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegistrationResponse {
    #[serde(flatten)]
    pub registration: RegistrationRecord,
    pub jobs: Vec<RegistrationJobResponse>,
    pub camping_options: Vec<RegistrationCampingOptionResponse>,
}

impl From<RegistrationDetail> for RegistrationResponse {
    fn from(d: RegistrationDetail) -> Self {
        RegistrationResponse {
            registration: d.registration.into(),
            jobs: d.jobs.into_iter().map(Into::into).collect(),
            camping_options: d.camping_options.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegistrationPage {
    pub items: Vec<RegistrationResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

impl From<Page<RegistrationDetail>> for RegistrationPage {
    fn from(p: Page<RegistrationDetail>) -> Self {
        let p = p.map(RegistrationResponse::from);
        RegistrationPage {
            items: p.items,
            total: p.total,
            limit: p.limit,
            offset: p.offset,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusCount {
    pub status: RegistrationStatus,
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegistrationSummaryResponse {
    pub year: i32,
    pub total: i64,
    pub by_status: Vec<StatusCount>,
}

impl From<RegistrationSummary> for RegistrationSummaryResponse {
    fn from(s: RegistrationSummary) -> Self {
        RegistrationSummaryResponse {
            year: s.year,
            total: s.total,
            by_status: s
                .by_status
                .into_iter()
                .map(|(status, count)| StatusCount { status, count })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CampingOptionChoiceBody {
    pub camping_option_id: Uuid,
    /// Answers keyed by field id.
    #[schema(value_type = Option<Object>)]
    pub field_values: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct CreateRegistrationBody {
    /// Defaults to the current registration year.
    pub year: Option<i32>,
    pub job_ids: Vec<Uuid>,
    pub camping_options: Vec<CampingOptionChoiceBody>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct UpdateRegistrationBody {
    pub status: Option<RegistrationStatus>,
    /// An empty string clears the notes.
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListRegistrationsQuery {
    pub year: Option<i32>,
    pub status: Option<RegistrationStatus>,
    pub user_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub year: Option<i32>,
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route(
            "/registrations",
            get(list_registrations).post(create_registration),
        )
        .route("/registrations/me", get(my_registrations))
        .route("/registrations/summary", get(summary))
        .route(
            "/registrations/:id",
            get(get_registration)
                .patch(update_registration)
                .delete(delete_registration),
        )
        .route("/registrations/:id/cancel", post(cancel_registration))
        .with_state(ctx)
}

#[utoipa::path(post, path = "/api/registrations", tag = "Registrations", request_body = CreateRegistrationBody,
    responses(
        (status = 201, body = RegistrationResponse),
        (status = 400, body = crate::presentation::http::error::ErrorBody),
        (status = 403, body = crate::presentation::http::error::ErrorBody),
        (status = 409, body = crate::presentation::http::error::ErrorBody)
    ))]
pub async fn create_registration(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Json(body): Json<CreateRegistrationBody>,
) -> ApiResult<(StatusCode, Json<RegistrationResponse>)> {
    let actor = authenticate(&ctx, bearer).await?;
    let users = ctx.user_repo();
    let registrations = ctx.registration_repo();
    let options = ctx.camping_option_repo();
    let jobs = ctx.job_repo();
    let categories = ctx.job_category_repo();
    let notifier = ctx.notifier();
    let uc = CreateRegistration {
        users: users.as_ref(),
        registrations: registrations.as_ref(),
        options: options.as_ref(),
        jobs: jobs.as_ref(),
        categories: categories.as_ref(),
        notifier: notifier.as_ref(),
        settings: ctx.camp(),
    };
    let req = CreateRegistrationRequest {
        year: body.year,
        job_ids: body.job_ids,
        camping_options: body
            .camping_options
            .into_iter()
            .map(|c| CampingOptionChoice {
                camping_option_id: c.camping_option_id,
                field_values: c.field_values,
            })
            .collect(),
    };
    let detail = uc.execute(&actor, req).await?;
    Ok((StatusCode::CREATED, Json(detail.into())))
}

#[utoipa::path(get, path = "/api/registrations", tag = "Registrations",
    params(
        ("year" = Option<i32>, Query, description = "Registration year"),
        ("status" = Option<RegistrationStatus>, Query, description = "Registration status"),
        ("user_id" = Option<Uuid>, Query, description = "Owner"),
        ("limit" = Option<i64>, Query, description = "Page size (max 200)"),
        ("offset" = Option<i64>, Query, description = "Rows to skip")
    ),
    responses((status = 200, body = RegistrationPage)))]
pub async fn list_registrations(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Query(q): Query<ListRegistrationsQuery>,
) -> ApiResult<Json<RegistrationPage>> {
    let actor = authenticate(&ctx, bearer).await?;
    let repo = ctx.registration_repo();
    let uc = ListRegistrations {
        repo: repo.as_ref(),
    };
    let filter = RegistrationFilter {
        year: q.year,
        status: q.status,
        user_id: q.user_id,
    };
    let page = uc
        .execute(&actor, filter, PageRequest::new(q.limit, q.offset))
        .await?;
    Ok(Json(page.into()))
}

#[utoipa::path(get, path = "/api/registrations/me", tag = "Registrations",
    responses((status = 200, body = [RegistrationResponse])))]
pub async fn my_registrations(
    State(ctx): State<AppContext>,
    bearer: Bearer,
) -> ApiResult<Json<Vec<RegistrationResponse>>> {
    let actor = authenticate(&ctx, bearer).await?;
    let repo = ctx.registration_repo();
    let uc = MyRegistrations {
        repo: repo.as_ref(),
    };
    let items = uc.execute(&actor).await?;
    Ok(Json(items.into_iter().map(Into::into).collect()))
}

#[utoipa::path(get, path = "/api/registrations/summary", tag = "Registrations",
    params(("year" = Option<i32>, Query, description = "Defaults to the current registration year")),
    responses((status = 200, body = RegistrationSummaryResponse)))]
pub async fn summary(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Query(q): Query<SummaryQuery>,
) -> ApiResult<Json<RegistrationSummaryResponse>> {
    let actor = authenticate(&ctx, bearer).await?;
    let repo = ctx.registration_repo();
    let uc = SummarizeRegistrations {
        repo: repo.as_ref(),
    };
    let year = q.year.unwrap_or(ctx.camp().registration_year);
    Ok(Json(uc.execute(&actor, year).await?.into()))
}

#[utoipa::path(get, path = "/api/registrations/{id}", tag = "Registrations",
    params(("id" = Uuid, Path, description = "Registration ID")),
    responses((status = 200, body = RegistrationResponse)))]
pub async fn get_registration(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RegistrationResponse>> {
    let actor = authenticate(&ctx, bearer).await?;
    let repo = ctx.registration_repo();
    let uc = GetRegistration {
        repo: repo.as_ref(),
    };
    Ok(Json(uc.execute(&actor, id).await?.into()))
}

#[utoipa::path(patch, path = "/api/registrations/{id}", tag = "Registrations", request_body = UpdateRegistrationBody,
    params(("id" = Uuid, Path, description = "Registration ID")),
    responses((status = 200, body = RegistrationRecord)))]
pub async fn update_registration(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateRegistrationBody>,
) -> ApiResult<Json<RegistrationRecord>> {
    let actor = authenticate(&ctx, bearer).await?;
    let repo = ctx.registration_repo();
    let uc = UpdateRegistration {
        repo: repo.as_ref(),
    };
    let req = UpdateRegistrationRequest {
        status: body.status,
        notes: body.notes,
    };
    Ok(Json(uc.execute(&actor, id, req).await?.into()))
}

#[utoipa::path(delete, path = "/api/registrations/{id}", tag = "Registrations",
    params(("id" = Uuid, Path, description = "Registration ID")),
    responses((status = 204)))]
pub async fn delete_registration(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let actor = authenticate(&ctx, bearer).await?;
    let repo = ctx.registration_repo();
    let uc = DeleteRegistration {
        repo: repo.as_ref(),
    };
    uc.execute(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(post, path = "/api/registrations/{id}/cancel", tag = "Registrations",
    params(("id" = Uuid, Path, description = "Registration ID")),
    responses((status = 200, body = RegistrationRecord)))]
pub async fn cancel_registration(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RegistrationRecord>> {
    let actor = authenticate(&ctx, bearer).await?;
    let repo = ctx.registration_repo();
    let users = ctx.user_repo();
    let notifier = ctx.notifier();
    let uc = CancelOwnRegistration {
        repo: repo.as_ref(),
        users: users.as_ref(),
        notifier: notifier.as_ref(),
        settings: ctx.camp(),
    };
    Ok(Json(uc.execute(&actor, id).await?.into()))
}
