use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::access::AuthUser;
use crate::application::dto::pagination::{Page, PageRequest};
use crate::application::ports::user_repository::UserFilter;
use crate::application::use_cases::users::create_user::{CreateUser, CreateUserRequest};
use crate::application::use_cases::users::delete_user::DeleteUser;
use crate::application::use_cases::users::get_user::GetUser;
use crate::application::use_cases::users::list_users::ListUsers;
use crate::application::use_cases::users::update_user::{UpdateUser, UpdateUserRequest};
use crate::bootstrap::app_context::AppContext;
use crate::domain::users::user::{User, UserRole};
use crate::presentation::http::auth::{Bearer, authenticate};
use crate::presentation::http::error::ApiResult;

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub playa_name: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub state_province: Option<String>,
    pub country: Option<String>,
    pub emergency_contact: Option<String>,
    pub role: UserRole,
    pub is_email_verified: bool,
    pub allow_registration: bool,
    pub allow_early_registration: bool,
    pub allow_deferred_dues_payment: bool,
    pub allow_no_job: bool,
    /// Only returned to staff and admins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_notes: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl UserResponse {
    pub fn for_viewer(u: User, viewer: &AuthUser) -> Self {
        let internal_notes = if viewer.role.is_staff() {
            u.internal_notes
        } else {
            None
        };
        UserResponse {
            id: u.id,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            playa_name: u.playa_name,
            phone: u.phone,
            city: u.city,
            state_province: u.state_province,
            country: u.country,
            emergency_contact: u.emergency_contact,
            role: u.role,
            is_email_verified: u.is_email_verified,
            allow_registration: u.allow_registration,
            allow_early_registration: u.allow_early_registration,
            allow_deferred_dues_payment: u.allow_deferred_dues_payment,
            allow_no_job: u.allow_no_job,
            internal_notes,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserPage {
    pub items: Vec<UserResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

impl UserPage {
    fn from_page(page: Page<User>, viewer: &AuthUser) -> Self {
        let page = page.map(|u| UserResponse::for_viewer(u, viewer));
        UserPage {
            items: page.items,
            total: page.total,
            limit: page.limit,
            offset: page.offset,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub role: Option<UserRole>,
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserBody {
    pub email: String,
    pub password: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub playa_name: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub state_province: Option<String>,
    pub country: Option<String>,
    pub emergency_contact: Option<String>,
    pub role: Option<UserRole>,
    pub is_email_verified: Option<bool>,
    pub allow_registration: Option<bool>,
    pub allow_early_registration: Option<bool>,
    pub allow_deferred_dues_payment: Option<bool>,
    pub allow_no_job: Option<bool>,
    pub internal_notes: Option<String>,
}

/// Omitted fields are left alone; an empty string clears an optional text field.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct UpdateUserBody {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub playa_name: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub state_province: Option<String>,
    pub country: Option<String>,
    pub emergency_contact: Option<String>,
    pub role: Option<UserRole>,
    pub is_email_verified: Option<bool>,
    pub allow_registration: Option<bool>,
    pub allow_early_registration: Option<bool>,
    pub allow_deferred_dues_payment: Option<bool>,
    pub allow_no_job: Option<bool>,
    pub internal_notes: Option<String>,
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .with_state(ctx)
}

#[utoipa::path(get, path = "/api/users", tag = "Users",
    params(
        ("role" = Option<UserRole>, Query, description = "Filter by role"),
        ("q" = Option<String>, Query, description = "Matches email, names and playa name"),
        ("limit" = Option<i64>, Query, description = "Page size (max 200)"),
        ("offset" = Option<i64>, Query, description = "Rows to skip")
    ),
    responses((status = 200, body = UserPage)))]
pub async fn list_users(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Query(q): Query<ListUsersQuery>,
) -> ApiResult<Json<UserPage>> {
    let actor = authenticate(&ctx, bearer).await?;
    let repo = ctx.user_repo();
    let uc = ListUsers {
        repo: repo.as_ref(),
    };
    let filter = UserFilter {
        role: q.role,
        query: q.q,
    };
    let page = uc
        .execute(&actor, filter, PageRequest::new(q.limit, q.offset))
        .await?;
    Ok(Json(UserPage::from_page(page, &actor)))
}

#[utoipa::path(post, path = "/api/users", tag = "Users", request_body = CreateUserBody,
    responses((status = 201, body = UserResponse)))]
pub async fn create_user(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Json(body): Json<CreateUserBody>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let actor = authenticate(&ctx, bearer).await?;
    let repo = ctx.user_repo();
    let uc = CreateUser {
        repo: repo.as_ref(),
    };
    let req = CreateUserRequest {
        email: body.email,
        password: body.password,
        first_name: body.first_name,
        last_name: body.last_name,
        playa_name: body.playa_name,
        phone: body.phone,
        city: body.city,
        state_province: body.state_province,
        country: body.country,
        emergency_contact: body.emergency_contact,
        role: body.role,
        is_email_verified: body.is_email_verified,
        allow_registration: body.allow_registration,
        allow_early_registration: body.allow_early_registration,
        allow_deferred_dues_payment: body.allow_deferred_dues_payment,
        allow_no_job: body.allow_no_job,
        internal_notes: body.internal_notes,
    };
    let user = uc.execute(&actor, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(UserResponse::for_viewer(user, &actor)),
    ))
}

#[utoipa::path(get, path = "/api/users/{id}", tag = "Users",
    params(("id" = Uuid, Path, description = "User ID")),
    responses((status = 200, body = UserResponse)))]
pub async fn get_user(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    let actor = authenticate(&ctx, bearer).await?;
    let repo = ctx.user_repo();
    let uc = GetUser {
        repo: repo.as_ref(),
    };
    let user = uc.execute(&actor, id).await?;
    Ok(Json(UserResponse::for_viewer(user, &actor)))
}

#[utoipa::path(patch, path = "/api/users/{id}", tag = "Users", request_body = UpdateUserBody,
    params(("id" = Uuid, Path, description = "User ID")),
    responses((status = 200, body = UserResponse)))]
pub async fn update_user(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateUserBody>,
) -> ApiResult<Json<UserResponse>> {
    let actor = authenticate(&ctx, bearer).await?;
    let repo = ctx.user_repo();
    let uc = UpdateUser {
        repo: repo.as_ref(),
    };
    let req = UpdateUserRequest {
        first_name: body.first_name,
        last_name: body.last_name,
        playa_name: body.playa_name,
        phone: body.phone,
        city: body.city,
        state_province: body.state_province,
        country: body.country,
        emergency_contact: body.emergency_contact,
        email: body.email,
        role: body.role,
        is_email_verified: body.is_email_verified,
        allow_registration: body.allow_registration,
        allow_early_registration: body.allow_early_registration,
        allow_deferred_dues_payment: body.allow_deferred_dues_payment,
        allow_no_job: body.allow_no_job,
        internal_notes: body.internal_notes,
    };
    let user = uc.execute(&actor, id, req).await?;
    Ok(Json(UserResponse::for_viewer(user, &actor)))
}

#[utoipa::path(delete, path = "/api/users/{id}", tag = "Users",
    params(("id" = Uuid, Path, description = "User ID")),
    responses((status = 204), (status = 409, body = crate::presentation::http::error::ErrorBody)))]
pub async fn delete_user(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let actor = authenticate(&ctx, bearer).await?;
    let repo = ctx.user_repo();
    let uc = DeleteUser {
        repo: repo.as_ref(),
    };
    uc.execute(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
