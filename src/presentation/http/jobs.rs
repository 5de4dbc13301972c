use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::use_cases::jobs::categories::{
    CreateJobCategory, DeleteJobCategory, GetJobCategory, JobCategoryInput, ListJobCategories,
    UpdateJobCategory,
};
use crate::application::use_cases::jobs::jobs::{
    CreateJob, DeleteJob, GetJob, JobInput, ListJobs, UpdateJob,
};
use crate::bootstrap::app_context::AppContext;
use crate::domain::jobs::job::{Job, JobCategory, JobWithCount};
use crate::presentation::http::auth::{Bearer, authenticate};
use crate::presentation::http::error::ApiResult;

type Timestamp = chrono::DateTime<chrono::Utc>;

#[derive(Debug, Serialize, ToSchema)]
pub struct JobCategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub staff_only: bool,
    pub always_required: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<JobCategory> for JobCategoryResponse {
    fn from(c: JobCategory) -> Self {
        JobCategoryResponse {
            id: c.id,
            name: c.name,
            description: c.description,
            staff_only: c.staff_only,
            always_required: c.always_required,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct JobCategoryBody {
    pub name: Option<String>,
    pub description: Option<String>,
    pub staff_only: Option<bool>,
    pub always_required: Option<bool>,
}

impl From<JobCategoryBody> for JobCategoryInput {
    fn from(b: JobCategoryBody) -> Self {
        JobCategoryInput {
            name: b.name,
            description: b.description,
            staff_only: b.staff_only,
            always_required: b.always_required,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JobResponse {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub category_id: Uuid,
    pub start_time: Option<Timestamp>,
    pub end_time: Option<Timestamp>,
    pub max_registrations: i32,
    pub staff_only: bool,
    pub always_required: bool,
    /// PENDING and CONFIRMED registrations holding a slot; omitted on writes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_count: Option<i64>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<Job> for JobResponse {
    fn from(j: Job) -> Self {
        JobResponse {
            id: j.id,
            name: j.name,
            location: j.location,
            category_id: j.category_id,
            start_time: j.start_time,
            end_time: j.end_time,
            max_registrations: j.max_registrations,
            staff_only: j.staff_only,
            always_required: j.always_required,
            registration_count: None,
            created_at: j.created_at,
            updated_at: j.updated_at,
        }
    }
}

impl From<JobWithCount> for JobResponse {
    fn from(j: JobWithCount) -> Self {
        JobResponse {
            registration_count: Some(j.registration_count),
            ..JobResponse::from(j.job)
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct JobBody {
    pub name: Option<String>,
    pub location: Option<String>,
    pub category_id: Option<Uuid>,
    pub start_time: Option<Timestamp>,
    pub end_time: Option<Timestamp>,
    pub max_registrations: Option<i32>,
}

impl From<JobBody> for JobInput {
    fn from(b: JobBody) -> Self {
        JobInput {
            name: b.name,
            location: b.location,
            category_id: b.category_id,
            start_time: b.start_time,
            end_time: b.end_time,
            max_registrations: b.max_registrations,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub category_id: Option<Uuid>,
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route(
            "/job-categories",
            get(list_categories).post(create_category),
        )
        .route(
            "/job-categories/:id",
            get(get_category)
                .patch(update_category)
                .delete(delete_category),
        )
        .route("/jobs", get(list_jobs).post(create_job))
        .route("/jobs/:id", get(get_job).patch(update_job).delete(delete_job))
        .with_state(ctx)
}

#[utoipa::path(get, path = "/api/job-categories", tag = "Jobs",
    responses((status = 200, body = [JobCategoryResponse])))]
pub async fn list_categories(
    State(ctx): State<AppContext>,
    bearer: Bearer,
) -> ApiResult<Json<Vec<JobCategoryResponse>>> {
    authenticate(&ctx, bearer).await?;
    let repo = ctx.job_category_repo();
    let uc = ListJobCategories {
        repo: repo.as_ref(),
    };
    let items = uc.execute().await?;
    Ok(Json(items.into_iter().map(Into::into).collect()))
}

#[utoipa::path(post, path = "/api/job-categories", tag = "Jobs", request_body = JobCategoryBody,
    responses((status = 201, body = JobCategoryResponse)))]
pub async fn create_category(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Json(body): Json<JobCategoryBody>,
) -> ApiResult<(StatusCode, Json<JobCategoryResponse>)> {
    let actor = authenticate(&ctx, bearer).await?;
    let repo = ctx.job_category_repo();
    let uc = CreateJobCategory {
        repo: repo.as_ref(),
    };
    let category = uc.execute(&actor, body.into()).await?;
    Ok((StatusCode::CREATED, Json(category.into())))
}

#[utoipa::path(get, path = "/api/job-categories/{id}", tag = "Jobs",
    params(("id" = Uuid, Path, description = "Job category ID")),
    responses((status = 200, body = JobCategoryResponse)))]
pub async fn get_category(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<JobCategoryResponse>> {
    authenticate(&ctx, bearer).await?;
    let repo = ctx.job_category_repo();
    let uc = GetJobCategory {
        repo: repo.as_ref(),
    };
    Ok(Json(uc.execute(id).await?.into()))
}

#[utoipa::path(patch, path = "/api/job-categories/{id}", tag = "Jobs", request_body = JobCategoryBody,
    params(("id" = Uuid, Path, description = "Job category ID")),
    responses((status = 200, body = JobCategoryResponse)))]
pub async fn update_category(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
    Json(body): Json<JobCategoryBody>,
) -> ApiResult<Json<JobCategoryResponse>> {
    let actor = authenticate(&ctx, bearer).await?;
    let repo = ctx.job_category_repo();
    let uc = UpdateJobCategory {
        repo: repo.as_ref(),
    };
    Ok(Json(uc.execute(&actor, id, body.into()).await?.into()))
}

#[utoipa::path(delete, path = "/api/job-categories/{id}", tag = "Jobs",
    params(("id" = Uuid, Path, description = "Job category ID")),
    responses((status = 204)))]
pub async fn delete_category(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let actor = authenticate(&ctx, bearer).await?;
    let repo = ctx.job_category_repo();
    let uc = DeleteJobCategory {
        repo: repo.as_ref(),
    };
    uc.execute(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(get, path = "/api/jobs", tag = "Jobs",
    params(("category_id" = Option<Uuid>, Query, description = "Only jobs in this category")),
    responses((status = 200, body = [JobResponse])))]
pub async fn list_jobs(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Query(q): Query<ListJobsQuery>,
) -> ApiResult<Json<Vec<JobResponse>>> {
    let actor = authenticate(&ctx, bearer).await?;
    let repo = ctx.job_repo();
    let uc = ListJobs {
        repo: repo.as_ref(),
    };
    let jobs = uc.execute(&actor, q.category_id).await?;
    Ok(Json(jobs.into_iter().map(Into::into).collect()))
}

#[utoipa::path(post, path = "/api/jobs", tag = "Jobs", request_body = JobBody,
    responses((status = 201, body = JobResponse)))]
pub async fn create_job(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Json(body): Json<JobBody>,
) -> ApiResult<(StatusCode, Json<JobResponse>)> {
    let actor = authenticate(&ctx, bearer).await?;
    let repo = ctx.job_repo();
    let categories = ctx.job_category_repo();
    let uc = CreateJob {
        repo: repo.as_ref(),
        categories: categories.as_ref(),
    };
    let job = uc.execute(&actor, body.into()).await?;
    Ok((StatusCode::CREATED, Json(job.into())))
}

#[utoipa::path(get, path = "/api/jobs/{id}", tag = "Jobs",
    params(("id" = Uuid, Path, description = "Job ID")),
    responses((status = 200, body = JobResponse)))]
pub async fn get_job(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<JobResponse>> {
    authenticate(&ctx, bearer).await?;
    let repo = ctx.job_repo();
    let uc = GetJob {
        repo: repo.as_ref(),
    };
    Ok(Json(uc.execute(id).await?.into()))
}

#[utoipa::path(patch, path = "/api/jobs/{id}", tag = "Jobs", request_body = JobBody,
    params(("id" = Uuid, Path, description = "Job ID")),
    responses((status = 200, body = JobResponse)))]
pub async fn update_job(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
    Json(body): Json<JobBody>,
) -> ApiResult<Json<JobResponse>> {
    let actor = authenticate(&ctx, bearer).await?;
    let repo = ctx.job_repo();
    let categories = ctx.job_category_repo();
    let uc = UpdateJob {
        repo: repo.as_ref(),
        categories: categories.as_ref(),
    };
    Ok(Json(uc.execute(&actor, id, body.into()).await?.into()))
}

#[utoipa::path(delete, path = "/api/jobs/{id}", tag = "Jobs",
    params(("id" = Uuid, Path, description = "Job ID")),
    responses((status = 204)))]
pub async fn delete_job(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let actor = authenticate(&ctx, bearer).await?;
    let repo = ctx.job_repo();
    let uc = DeleteJob {
        repo: repo.as_ref(),
    };
    uc.execute(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
