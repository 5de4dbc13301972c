use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, put},
};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::use_cases::camping_options::fields::{
    CreateField, DeleteField, FieldInput, ListFields, ReorderFields, UpdateField,
};
use crate::application::use_cases::camping_options::options::{
    CampingOptionInput, CreateCampingOption, DeleteCampingOption, GetCampingOption,
    ListCampingOptions, UpdateCampingOption,
};
use crate::bootstrap::app_context::AppContext;
use crate::domain::camping::camping_option::{
    CampingOptionDetail, CampingOptionField, FieldDataType,
};
use crate::presentation::http::auth::{Bearer, authenticate};
use crate::presentation::http::error::ApiResult;

type Timestamp = chrono::DateTime<chrono::Utc>;

#[derive(Debug, Serialize, ToSchema)]
pub struct FieldResponse {
    pub id: Uuid,
    pub camping_option_id: Uuid,
    pub display_name: String,
    pub description: Option<String>,
    pub data_type: FieldDataType,
    pub required: bool,
    pub max_length: Option<i32>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub ordinal: i32,
}

impl From<CampingOptionField> for FieldResponse {
    fn from(f: CampingOptionField) -> Self {
        FieldResponse {
            id: f.id,
            camping_option_id: f.camping_option_id,
            display_name: f.display_name,
            description: f.description,
            data_type: f.data_type,
            required: f.required,
            max_length: f.max_length,
            min_value: f.min_value,
            max_value: f.max_value,
            ordinal: f.ordinal,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CampingOptionResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub work_shifts_required: i32,
    /// Cents.
    pub participant_dues: i64,
    /// Cents.
    pub staff_dues: i64,
    /// 0 means unlimited.
    pub max_signups: i32,
    pub current_signups: i64,
    pub is_full: bool,
    pub job_category_ids: Vec<Uuid>,
    pub fields: Vec<FieldResponse>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<CampingOptionDetail> for CampingOptionResponse {
    fn from(d: CampingOptionDetail) -> Self {
        let is_full = d.is_full();
        let o = d.option;
        CampingOptionResponse {
            id: o.id,
            name: o.name,
            description: o.description,
            enabled: o.enabled,
            work_shifts_required: o.work_shifts_required,
            participant_dues: o.participant_dues,
            staff_dues: o.staff_dues,
            max_signups: o.max_signups,
            current_signups: d.current_signups,
            is_full,
            job_category_ids: o.job_category_ids,
            fields: d.fields.into_iter().map(Into::into).collect(),
            created_at: o.created_at,
            updated_at: o.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct CampingOptionBody {
    pub name: Option<String>,
    pub description: Option<String>,
    pub enabled: Option<bool>,
    pub work_shifts_required: Option<i32>,
    pub participant_dues: Option<i64>,
    pub staff_dues: Option<i64>,
    pub max_signups: Option<i32>,
    /// Replaces the linked job categories when present.
    pub job_category_ids: Option<Vec<Uuid>>,
}

impl From<CampingOptionBody> for CampingOptionInput {
    fn from(b: CampingOptionBody) -> Self {
        CampingOptionInput {
            name: b.name,
            description: b.description,
            enabled: b.enabled,
            work_shifts_required: b.work_shifts_required,
            participant_dues: b.participant_dues,
            staff_dues: b.staff_dues,
            max_signups: b.max_signups,
            job_category_ids: b.job_category_ids,
        }
    }
}

/// Keeps "absent" and "null" apart: absent leaves the column alone, null clears it.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct FieldBody {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub data_type: Option<FieldDataType>,
    pub required: Option<bool>,
    #[serde(deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub max_length: Option<Option<i32>>,
    #[serde(deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub min_value: Option<Option<f64>>,
    #[serde(deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub max_value: Option<Option<f64>>,
}

impl From<FieldBody> for FieldInput {
    fn from(b: FieldBody) -> Self {
        FieldInput {
            display_name: b.display_name,
            description: b.description,
            data_type: b.data_type,
            required: b.required,
            max_length: b.max_length,
            min_value: b.min_value,
            max_value: b.max_value,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReorderFieldsBody {
    pub field_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ListOptionsQuery {
    #[serde(default)]
    pub include_disabled: bool,
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/camping-options", get(list_options).post(create_option))
        .route(
            "/camping-options/:id",
            get(get_option).patch(update_option).delete(delete_option),
        )
        .route(
            "/camping-options/:id/fields",
            get(list_fields).post(create_field),
        )
        .route("/camping-options/:id/fields/order", put(reorder_fields))
        .route(
            "/camping-options/:id/fields/:field_id",
            patch(update_field).delete(delete_field),
        )
        .with_state(ctx)
}

#[utoipa::path(get, path = "/api/camping-options", tag = "Camping options",
    params(("include_disabled" = Option<bool>, Query, description = "Staff only: include disabled options")),
    responses((status = 200, body = [CampingOptionResponse])))]
pub async fn list_options(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Query(q): Query<ListOptionsQuery>,
) -> ApiResult<Json<Vec<CampingOptionResponse>>> {
    let actor = authenticate(&ctx, bearer).await?;
    let repo = ctx.camping_option_repo();
    let uc = ListCampingOptions {
        repo: repo.as_ref(),
    };
    let options = uc.execute(&actor, q.include_disabled).await?;
    Ok(Json(options.into_iter().map(Into::into).collect()))
}

#[utoipa::path(post, path = "/api/camping-options", tag = "Camping options", request_body = CampingOptionBody,
    responses((status = 201, body = CampingOptionResponse)))]
pub async fn create_option(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Json(body): Json<CampingOptionBody>,
) -> ApiResult<(StatusCode, Json<CampingOptionResponse>)> {
    let actor = authenticate(&ctx, bearer).await?;
    let repo = ctx.camping_option_repo();
    let categories = ctx.job_category_repo();
    let uc = CreateCampingOption {
        repo: repo.as_ref(),
        categories: categories.as_ref(),
    };
    let option = uc.execute(&actor, body.into()).await?;
    Ok((StatusCode::CREATED, Json(option.into())))
}

#[utoipa::path(get, path = "/api/camping-options/{id}", tag = "Camping options",
    params(("id" = Uuid, Path, description = "Camping option ID")),
    responses((status = 200, body = CampingOptionResponse)))]
pub async fn get_option(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CampingOptionResponse>> {
    let actor = authenticate(&ctx, bearer).await?;
    let repo = ctx.camping_option_repo();
    let uc = GetCampingOption {
        repo: repo.as_ref(),
    };
    Ok(Json(uc.execute(&actor, id).await?.into()))
}

#[utoipa::path(patch, path = "/api/camping-options/{id}", tag = "Camping options", request_body = CampingOptionBody,
    params(("id" = Uuid, Path, description = "Camping option ID")),
    responses((status = 200, body = CampingOptionResponse)))]
pub async fn update_option(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
    Json(body): Json<CampingOptionBody>,
) -> ApiResult<Json<CampingOptionResponse>> {
    let actor = authenticate(&ctx, bearer).await?;
    let repo = ctx.camping_option_repo();
    let categories = ctx.job_category_repo();
    let uc = UpdateCampingOption {
        repo: repo.as_ref(),
        categories: categories.as_ref(),
    };
    Ok(Json(uc.execute(&actor, id, body.into()).await?.into()))
}

#[utoipa::path(delete, path = "/api/camping-options/{id}", tag = "Camping options",
    params(("id" = Uuid, Path, description = "Camping option ID")),
    responses((status = 204)))]
pub async fn delete_option(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let actor = authenticate(&ctx, bearer).await?;
    let repo = ctx.camping_option_repo();
    let uc = DeleteCampingOption {
        repo: repo.as_ref(),
    };
    uc.execute(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(get, path = "/api/camping-options/{id}/fields", tag = "Camping options",
    params(("id" = Uuid, Path, description = "Camping option ID")),
    responses((status = 200, body = [FieldResponse])))]
pub async fn list_fields(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<FieldResponse>>> {
    authenticate(&ctx, bearer).await?;
    let repo = ctx.camping_option_field_repo();
    let options = ctx.camping_option_repo();
    let uc = ListFields {
        repo: repo.as_ref(),
        options: options.as_ref(),
    };
    let fields = uc.execute(id).await?;
    Ok(Json(fields.into_iter().map(Into::into).collect()))
}

#[utoipa::path(post, path = "/api/camping-options/{id}/fields", tag = "Camping options", request_body = FieldBody,
    params(("id" = Uuid, Path, description = "Camping option ID")),
    responses((status = 201, body = FieldResponse)))]
pub async fn create_field(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
    Json(body): Json<FieldBody>,
) -> ApiResult<(StatusCode, Json<FieldResponse>)> {
    let actor = authenticate(&ctx, bearer).await?;
    let repo = ctx.camping_option_field_repo();
    let options = ctx.camping_option_repo();
    let uc = CreateField {
        repo: repo.as_ref(),
        options: options.as_ref(),
    };
    let field = uc.execute(&actor, id, body.into()).await?;
    Ok((StatusCode::CREATED, Json(field.into())))
}

#[utoipa::path(put, path = "/api/camping-options/{id}/fields/order", tag = "Camping options", request_body = ReorderFieldsBody,
    params(("id" = Uuid, Path, description = "Camping option ID")),
    responses((status = 200, body = [FieldResponse])))]
pub async fn reorder_fields(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
    Json(body): Json<ReorderFieldsBody>,
) -> ApiResult<Json<Vec<FieldResponse>>> {
    let actor = authenticate(&ctx, bearer).await?;
    let repo = ctx.camping_option_field_repo();
    let options = ctx.camping_option_repo();
    let uc = ReorderFields {
        repo: repo.as_ref(),
        options: options.as_ref(),
    };
    let fields = uc.execute(&actor, id, body.field_ids).await?;
    Ok(Json(fields.into_iter().map(Into::into).collect()))
}

#[utoipa::path(patch, path = "/api/camping-options/{id}/fields/{field_id}", tag = "Camping options", request_body = FieldBody,
    params(
        ("id" = Uuid, Path, description = "Camping option ID"),
        ("field_id" = Uuid, Path, description = "Field ID")
    ),
    responses((status = 200, body = FieldResponse)))]
pub async fn update_field(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path((id, field_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<FieldBody>,
) -> ApiResult<Json<FieldResponse>> {
    let actor = authenticate(&ctx, bearer).await?;
    let repo = ctx.camping_option_field_repo();
    let uc = UpdateField {
        repo: repo.as_ref(),
    };
    Ok(Json(uc.execute(&actor, id, field_id, body.into()).await?.into()))
}

#[utoipa::path(delete, path = "/api/camping-options/{id}/fields/{field_id}", tag = "Camping options",
    params(
        ("id" = Uuid, Path, description = "Camping option ID"),
        ("field_id" = Uuid, Path, description = "Field ID")
    ),
    responses((status = 204)))]
pub async fn delete_field(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path((id, field_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    let actor = authenticate(&ctx, bearer).await?;
    let repo = ctx.camping_option_field_repo();
    let uc = DeleteField {
        repo: repo.as_ref(),
    };
    uc.execute(&actor, id, field_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
