use axum::{
    Json, Router,
    extract::{FromRequestParts, State},
    http::{HeaderMap, HeaderValue, StatusCode, header, request::Parts},
    routing::{get, post},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::access::AuthUser;
use crate::application::use_cases::auth::login::{Login, LoginRequest as Credentials};
use crate::application::use_cases::auth::me::GetMe;
use crate::application::use_cases::auth::register::{Register, RegisterRequest as NewAccount};
use crate::bootstrap::app_context::AppContext;
use crate::bootstrap::config::Config;
use crate::domain::users::user::UserRole;
use crate::presentation::http::error::{ApiError, ApiResult};
use crate::presentation::http::users::UserResponse;

const SESSION_COOKIE: &str = "camp_session";

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub expires_in: i64,
    pub user: UserResponse,
}

/// JWT payload. The role is informational; every request reloads the user row.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: UserRole,
    pub iat: u64,
    pub exp: u64,
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .with_state(ctx)
}

#[utoipa::path(post, path = "/api/auth/register", tag = "Auth", request_body = RegisterRequest, security(()), responses(
    (status = 201, body = UserResponse),
    (status = 400, body = crate::presentation::http::error::ErrorBody),
    (status = 409, body = crate::presentation::http::error::ErrorBody)
))]
pub async fn register(
    State(ctx): State<AppContext>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let repo = ctx.user_repo();
    let uc = Register {
        repo: repo.as_ref(),
    };
    let account = NewAccount {
        email: req.email,
        password: req.password,
        first_name: req.first_name,
        last_name: req.last_name,
    };
    let user = uc.execute(&account).await?;
    tracing::info!(user_id = %user.id, "participant_registered_account");
    let viewer = AuthUser::from(&user);
    Ok((
        StatusCode::CREATED,
        Json(UserResponse::for_viewer(user, &viewer)),
    ))
}

#[utoipa::path(post, path = "/api/auth/login", tag = "Auth", request_body = LoginRequest, security(()), responses(
    (status = 200, body = LoginResponse),
    (status = 401, body = crate::presentation::http::error::ErrorBody)
))]
pub async fn login(
    State(ctx): State<AppContext>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<(HeaderMap, Json<LoginResponse>)> {
    let repo = ctx.user_repo();
    let uc = Login {
        repo: repo.as_ref(),
    };
    let credentials = Credentials {
        email: req.email,
        password: req.password,
    };
    let Some(user) = uc.execute(&credentials).await? else {
        tracing::debug!("login_rejected");
        return Err(ApiError::new(
            StatusCode::UNAUTHORIZED,
            "invalid email or password",
        ));
    };
    let token = issue_token(&ctx.cfg, user.id, user.role)?;
    let headers = session_cookie(&token, ctx.cfg.jwt_expires_secs, secure_cookies(&ctx.cfg));
    tracing::info!(user_id = %user.id, role = user.role.as_str(), "user_logged_in");

    let viewer = AuthUser::from(&user);
    Ok((
        headers,
        Json(LoginResponse {
            access_token: token,
            expires_in: ctx.cfg.jwt_expires_secs,
            user: UserResponse::for_viewer(user, &viewer),
        }),
    ))
}

#[utoipa::path(get, path = "/api/auth/me", tag = "Auth", responses(
    (status = 200, body = UserResponse),
    (status = 401, body = crate::presentation::http::error::ErrorBody)
))]
pub async fn me(State(ctx): State<AppContext>, bearer: Bearer) -> ApiResult<Json<UserResponse>> {
    let id = validate_bearer(&ctx.cfg, bearer)?;
    let repo = ctx.user_repo();
    let uc = GetMe {
        repo: repo.as_ref(),
    };
    let user = uc.execute(id).await?.ok_or_else(ApiError::unauthorized)?;
    let viewer = AuthUser::from(&user);
    Ok(Json(UserResponse::for_viewer(user, &viewer)))
}

#[utoipa::path(post, path = "/api/auth/logout", tag = "Auth", security(()), responses((status = 204)))]
pub async fn logout(State(ctx): State<AppContext>) -> (HeaderMap, StatusCode) {
    let headers = session_cookie("", 0, secure_cookies(&ctx.cfg));
    (headers, StatusCode::NO_CONTENT)
}

/// Raw token from `Authorization: Bearer` or, failing that, the session cookie.
pub struct Bearer(pub String);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Bearer
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        token_from_headers(&parts.headers)
            .map(Bearer)
            .ok_or_else(ApiError::unauthorized)
    }
}

fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let from_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string());
    from_header
        .or_else(|| {
            headers
                .get_all(header::COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .find_map(|raw| cookie_value(raw, SESSION_COOKIE))
        })
        .filter(|t| !t.is_empty())
}

pub(crate) fn issue_token(cfg: &Config, user_id: Uuid, role: UserRole) -> Result<String, ApiError> {
    let iat = chrono::Utc::now().timestamp().max(0) as u64;
    let claims = Claims {
        sub: user_id,
        role,
        iat,
        exp: iat + cfg.jwt_expires_secs.max(0) as u64,
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(cfg.jwt_secret_pem.as_bytes()),
    )
    .map_err(|e| ApiError::from(anyhow::anyhow!("failed to sign token: {e}")))
}

pub(crate) fn validate_bearer(cfg: &Config, bearer: Bearer) -> Result<Uuid, ApiError> {
    jsonwebtoken::decode::<Claims>(
        &bearer.0,
        &DecodingKey::from_secret(cfg.jwt_secret_pem.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims.sub)
    .map_err(|_| ApiError::new(StatusCode::UNAUTHORIZED, "invalid or expired token"))
}

/// Resolves the bearer into the calling user; deleted users are rejected.
pub async fn authenticate(ctx: &AppContext, bearer: Bearer) -> Result<AuthUser, ApiError> {
    let id = validate_bearer(&ctx.cfg, bearer)?;
    let user = ctx
        .user_repo()
        .find_by_id(id)
        .await?
        .ok_or_else(ApiError::unauthorized)?;
    Ok(AuthUser::from(&user))
}

fn secure_cookies(cfg: &Config) -> bool {
    cfg.is_production
        || cfg
            .frontend_url
            .as_deref()
            .is_some_and(|u| u.starts_with("https://"))
}

fn cookie_value(raw: &str, name: &str) -> Option<String> {
    raw.split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| k.trim() == name)
        .map(|(_, v)| v.trim().to_string())
}

/// An empty token with max-age 0 clears the cookie.
fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> HeaderMap {
    let mut cookie = format!(
        "{SESSION_COOKIE}={token}; Path=/api; HttpOnly; SameSite=Lax; Max-Age={}",
        max_age_secs.max(0)
    );
    if secure {
        cookie.push_str("; Secure");
    }
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        headers.insert(header::SET_COOKIE, value);
    }
    headers
}
