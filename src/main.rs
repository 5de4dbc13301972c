use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::MatchedPath;
use dotenvy::dotenv;
use http::HeaderValue;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use camp_api::application::ports::notification_port::NotificationPort;
use camp_api::bootstrap::app_context::{AppContext, AppServices};
use camp_api::bootstrap::config::Config;
use camp_api::infrastructure::db::repositories::{
    admin_audit_repository_sqlx::SqlxAdminAuditRepository,
    camping_option_field_repository_sqlx::SqlxCampingOptionFieldRepository,
    camping_option_repository_sqlx::SqlxCampingOptionRepository,
    job_category_repository_sqlx::SqlxJobCategoryRepository,
    job_repository_sqlx::SqlxJobRepository, payment_repository_sqlx::SqlxPaymentRepository,
    registration_repository_sqlx::SqlxRegistrationRepository,
    user_repository_sqlx::SqlxUserRepository,
};
use camp_api::infrastructure::notifications::log_notifier::LogNotifier;
use camp_api::infrastructure::notifications::webhook_notifier::WebhookNotifier;
use camp_api::presentation::http as handlers;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
        paths(
            handlers::auth::register,
            handlers::auth::login,
            handlers::auth::logout,
            handlers::auth::me,
            handlers::users::list_users,
            handlers::users::create_user,
            handlers::users::get_user,
            handlers::users::update_user,
            handlers::users::delete_user,
            handlers::jobs::list_categories,
            handlers::jobs::create_category,
            handlers::jobs::get_category,
            handlers::jobs::update_category,
            handlers::jobs::delete_category,
            handlers::jobs::list_jobs,
            handlers::jobs::create_job,
            handlers::jobs::get_job,
            handlers::jobs::update_job,
            handlers::jobs::delete_job,
            handlers::camping_options::list_options,
            handlers::camping_options::create_option,
            handlers::camping_options::get_option,
            handlers::camping_options::update_option,
            handlers::camping_options::delete_option,
            handlers::camping_options::list_fields,
            handlers::camping_options::create_field,
            handlers::camping_options::reorder_fields,
            handlers::camping_options::update_field,
            handlers::camping_options::delete_field,
            handlers::registrations::create_registration,
            handlers::registrations::list_registrations,
            handlers::registrations::my_registrations,
            handlers::registrations::summary,
            handlers::registrations::get_registration,
            handlers::registrations::update_registration,
            handlers::registrations::delete_registration,
            handlers::registrations::cancel_registration,
            handlers::admin::edit_registration,
            handlers::admin::cancel_registration,
            handlers::admin::list_audit,
            handlers::admin::audit_stats,
            handlers::admin::audit_history,
            handlers::payments::record_payment,
            handlers::payments::list_payments,
            handlers::payments::my_payments,
            handlers::payments::get_payment,
            handlers::payments::update_payment,
            handlers::payments::refund_payment,
            handlers::health::health,
        ),
        components(schemas(
            handlers::error::ErrorBody,
            handlers::auth::RegisterRequest,
            handlers::auth::LoginRequest,
            handlers::auth::LoginResponse,
            handlers::users::UserResponse,
            handlers::users::UserPage,
            handlers::users::CreateUserBody,
            handlers::users::UpdateUserBody,
            handlers::jobs::JobCategoryResponse,
            handlers::jobs::JobCategoryBody,
            handlers::jobs::JobResponse,
            handlers::jobs::JobBody,
            handlers::camping_options::FieldResponse,
            handlers::camping_options::CampingOptionResponse,
            handlers::camping_options::CampingOptionBody,
            handlers::camping_options::FieldBody,
            handlers::camping_options::ReorderFieldsBody,
            handlers::registrations::RegistrationRecord,
            handlers::registrations::RegistrationJobResponse,
            handlers::registrations::RegistrationCampingOptionResponse,
            handlers::registrations::RegistrationResponse,
            handlers::registrations::RegistrationPage,
            handlers::registrations::StatusCount,
            handlers::registrations::RegistrationSummaryResponse,
            handlers::registrations::CampingOptionChoiceBody,
            handlers::registrations::CreateRegistrationBody,
            handlers::registrations::UpdateRegistrationBody,
            handlers::admin::AdminEditBody,
            handlers::admin::AdminCancelBody,
            handlers::admin::AdminCancelResponse,
            handlers::admin::AuditResponse,
            handlers::admin::AuditPage,
            handlers::admin::ActionCount,
            handlers::admin::ActorCountResponse,
            handlers::admin::AuditStatsResponse,
            handlers::payments::PaymentResponse,
            handlers::payments::PaymentPage,
            handlers::payments::RecordPaymentBody,
            handlers::payments::UpdatePaymentBody,
            handlers::payments::RefundBody,
            handlers::health::HealthStatus,
            handlers::health::HealthResponse,
            camp_api::domain::users::user::UserRole,
            camp_api::domain::camping::camping_option::FieldDataType,
            camp_api::domain::registrations::registration::RegistrationStatus,
            camp_api::domain::payments::payment::PaymentStatus,
            camp_api::domain::payments::payment::PaymentProvider,
            camp_api::domain::audit::admin_audit::AuditActionType,
            camp_api::domain::audit::admin_audit::AuditTargetType,
        )),
        tags(
            (name = "Auth", description = "Authentication"),
            (name = "Users", description = "User accounts and roles"),
            (name = "Jobs", description = "Job categories and work shifts"),
            (name = "Camping Options", description = "Camping options and their custom fields"),
            (name = "Registrations", description = "Yearly camp registrations"),
            (name = "Admin", description = "Audited admin overrides"),
            (name = "Payments", description = "Dues payments and refunds"),
            (name = "Health", description = "System health checks")
        )
    )]
struct ApiDoc;

fn build_cors(cfg: &Config) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([
            http::Method::GET,
            http::Method::POST,
            http::Method::PUT,
            http::Method::DELETE,
            http::Method::PATCH,
            http::Method::OPTIONS,
        ])
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION]);
    match cfg.frontend_url.as_deref().map(HeaderValue::from_str) {
        Some(Ok(origin)) => base.allow_origin(origin).allow_credentials(true),
        // Production configs without a usable FRONTEND_URL are rejected at load time.
        _ if cfg.is_production => {
            base.allow_origin(AllowOrigin::exact(HeaderValue::from_static("http://invalid")))
        }
        _ => base
            .allow_origin(AllowOrigin::mirror_request())
            .allow_credentials(true),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "camp_api=debug,axum=info,tower_http=info".into()),
        )
        .init();

    let cfg = Config::from_env()?;
    info!(
        camp = %cfg.camp.camp_name,
        year = cfg.camp.registration_year,
        registration_open = cfg.camp.registration_open,
        early_registration_open = cfg.camp.early_registration_open,
        production = cfg.is_production,
        "Starting camp registration backend"
    );

    // Database
    let pool = camp_api::infrastructure::db::connect_pool(
        &cfg.database_url,
        cfg.database_max_connections,
    )
    .await?;
    camp_api::infrastructure::db::migrate(&pool).await?;

    let notifier: Arc<dyn NotificationPort> = match cfg.notify_webhook_url.as_deref() {
        Some(url) => {
            info!(%url, "notifications_via_webhook");
            Arc::new(WebhookNotifier::new(url)?)
        }
        None => {
            info!("notifications_logged_only");
            Arc::new(LogNotifier)
        }
    };

    let services = AppServices::new(
        pool.clone(),
        Arc::new(SqlxUserRepository::new(pool.clone())),
        Arc::new(SqlxJobCategoryRepository::new(pool.clone())),
        Arc::new(SqlxJobRepository::new(pool.clone())),
        Arc::new(SqlxCampingOptionRepository::new(pool.clone())),
        Arc::new(SqlxCampingOptionFieldRepository::new(pool.clone())),
        Arc::new(SqlxRegistrationRepository::new(pool.clone())),
        Arc::new(SqlxPaymentRepository::new(pool.clone())),
        Arc::new(SqlxAdminAuditRepository::new(pool.clone())),
        notifier,
    );
    let ctx = AppContext::new(cfg.clone(), services);

    let app = Router::new()
        .nest("/api", handlers::health::routes(ctx.clone()))
        .nest("/api/auth", handlers::auth::routes(ctx.clone()))
        .nest("/api", handlers::users::routes(ctx.clone()))
        .nest("/api", handlers::jobs::routes(ctx.clone()))
        .nest("/api", handlers::camping_options::routes(ctx.clone()))
        .nest("/api", handlers::registrations::routes(ctx.clone()))
        .nest("/api", handlers::admin::routes(ctx.clone()))
        .nest("/api", handlers::payments::routes(ctx.clone()))
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", ApiDoc::openapi()))
        .layer(build_cors(&cfg))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &http::Request<_>| {
                let method = req.method().clone();
                let uri = req.uri().clone();
                let matched = req
                    .extensions()
                    .get::<MatchedPath>()
                    .map(|p| p.as_str().to_string())
                    .unwrap_or_default();
                tracing::info_span!("http", %method, %uri, matched_path = %matched)
            }),
        );

    let api_addr = SocketAddr::from(([0, 0, 0, 0], cfg.api_port));
    info!(%api_addr, "HTTP API listening");
    let listener = tokio::net::TcpListener::bind(api_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = ?err, "shutdown_signal_failed");
    }
}
