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
use crate::application::ports::payment_repository::PaymentFilter;
use crate::application::use_cases::payments::payments::{
    GetPayment, ListPayments, MyPayments, UpdatePayment, UpdatePaymentRequest,
};
use crate::application::use_cases::payments::record_payment::{
    RecordPayment, RecordPaymentRequest,
};
use crate::application::use_cases::payments::refund_payment::RefundPayment;
use crate::bootstrap::app_context::AppContext;
use crate::domain::payments::payment::{Payment, PaymentProvider, PaymentStatus};
use crate::presentation::http::auth::{Bearer, authenticate};
use crate::presentation::http::error::ApiResult;

type Timestamp = chrono::DateTime<chrono::Utc>;

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub registration_id: Option<Uuid>,
    /// Minor currency units.
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub provider: PaymentProvider,
    pub provider_ref: Option<String>,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<Payment> for PaymentResponse {
    fn from(p: Payment) -> Self {
        PaymentResponse {
            id: p.id,
            user_id: p.user_id,
            registration_id: p.registration_id,
            amount_cents: p.amount_cents,
            currency: p.currency,
            status: p.status,
            provider: p.provider,
            provider_ref: p.provider_ref,
            notes: p.notes,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentPage {
    pub items: Vec<PaymentResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

impl From<Page<Payment>> for PaymentPage {
    fn from(p: Page<Payment>) -> Self {
        let p = p.map(PaymentResponse::from);
        PaymentPage {
            items: p.items,
            total: p.total,
            limit: p.limit,
            offset: p.offset,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordPaymentBody {
    pub user_id: Uuid,
    pub registration_id: Option<Uuid>,
    pub amount_cents: i64,
    /// Defaults to USD.
    pub currency: Option<String>,
    /// Defaults to COMPLETED.
    pub status: Option<PaymentStatus>,
    /// Defaults to MANUAL.
    pub provider: Option<PaymentProvider>,
    pub provider_ref: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct UpdatePaymentBody {
    pub status: Option<PaymentStatus>,
    /// An empty string clears the reference.
    pub provider_ref: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct RefundBody {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListPaymentsQuery {
    pub user_id: Option<Uuid>,
    pub registration_id: Option<Uuid>,
    pub status: Option<PaymentStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/payments", get(list_payments).post(record_payment))
        .route("/payments/me", get(my_payments))
        .route("/payments/:id", get(get_payment).patch(update_payment))
        .route("/payments/:id/refund", post(refund_payment))
        .with_state(ctx)
}

#[utoipa::path(post, path = "/api/payments", tag = "Payments", request_body = RecordPaymentBody,
    responses(
        (status = 201, body = PaymentResponse),
        (status = 400, body = crate::presentation::http::error::ErrorBody),
        (status = 404, body = crate::presentation::http::error::ErrorBody)
    ))]
pub async fn record_payment(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Json(body): Json<RecordPaymentBody>,
) -> ApiResult<(StatusCode, Json<PaymentResponse>)> {
    let actor = authenticate(&ctx, bearer).await?;
    let payments = ctx.payment_repo();
    let users = ctx.user_repo();
    let registrations = ctx.registration_repo();
    let options = ctx.camping_option_repo();
    let notifier = ctx.notifier();
    let uc = RecordPayment {
        payments: payments.as_ref(),
        users: users.as_ref(),
        registrations: registrations.as_ref(),
        options: options.as_ref(),
        notifier: notifier.as_ref(),
        settings: ctx.camp(),
    };
    let req = RecordPaymentRequest {
        user_id: body.user_id,
        registration_id: body.registration_id,
        amount_cents: body.amount_cents,
        currency: body.currency,
        status: body.status,
        provider: body.provider,
        provider_ref: body.provider_ref,
        notes: body.notes,
    };
    let payment = uc.execute(&actor, req).await?;
    Ok((StatusCode::CREATED, Json(payment.into())))
}

#[utoipa::path(get, path = "/api/payments", tag = "Payments",
    params(
        ("user_id" = Option<Uuid>, Query, description = "Payer"),
        ("registration_id" = Option<Uuid>, Query, description = "Registration"),
        ("status" = Option<PaymentStatus>, Query, description = "Payment status"),
        ("limit" = Option<i64>, Query, description = "Page size (max 200)"),
        ("offset" = Option<i64>, Query, description = "Rows to skip")
    ),
    responses((status = 200, body = PaymentPage)))]
pub async fn list_payments(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Query(q): Query<ListPaymentsQuery>,
) -> ApiResult<Json<PaymentPage>> {
    let actor = authenticate(&ctx, bearer).await?;
    let repo = ctx.payment_repo();
    let uc = ListPayments {
        repo: repo.as_ref(),
    };
    let filter = PaymentFilter {
        user_id: q.user_id,
        registration_id: q.registration_id,
        status: q.status,
    };
    let page = uc
        .execute(&actor, filter, PageRequest::new(q.limit, q.offset))
        .await?;
    Ok(Json(page.into()))
}

#[utoipa::path(get, path = "/api/payments/me", tag = "Payments",
    responses((status = 200, body = [PaymentResponse])))]
pub async fn my_payments(
    State(ctx): State<AppContext>,
    bearer: Bearer,
) -> ApiResult<Json<Vec<PaymentResponse>>> {
    let actor = authenticate(&ctx, bearer).await?;
    let repo = ctx.payment_repo();
    let uc = MyPayments {
        repo: repo.as_ref(),
    };
    let items = uc.execute(&actor).await?;
    Ok(Json(items.into_iter().map(Into::into).collect()))
}

#[utoipa::path(get, path = "/api/payments/{id}", tag = "Payments",
    params(("id" = Uuid, Path, description = "Payment ID")),
    responses((status = 200, body = PaymentResponse)))]
pub async fn get_payment(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PaymentResponse>> {
    let actor = authenticate(&ctx, bearer).await?;
    let repo = ctx.payment_repo();
    let uc = GetPayment {
        repo: repo.as_ref(),
    };
    Ok(Json(uc.execute(&actor, id).await?.into()))
}

#[utoipa::path(patch, path = "/api/payments/{id}", tag = "Payments", request_body = UpdatePaymentBody,
    params(("id" = Uuid, Path, description = "Payment ID")),
    responses((status = 200, body = PaymentResponse)))]
pub async fn update_payment(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdatePaymentBody>,
) -> ApiResult<Json<PaymentResponse>> {
    let actor = authenticate(&ctx, bearer).await?;
    let payments = ctx.payment_repo();
    let users = ctx.user_repo();
    let registrations = ctx.registration_repo();
    let options = ctx.camping_option_repo();
    let notifier = ctx.notifier();
    let uc = UpdatePayment {
        payments: payments.as_ref(),
        users: users.as_ref(),
        registrations: registrations.as_ref(),
        options: options.as_ref(),
        notifier: notifier.as_ref(),
        settings: ctx.camp(),
    };
    let req = UpdatePaymentRequest {
        status: body.status,
        provider_ref: body.provider_ref,
        notes: body.notes,
    };
    Ok(Json(uc.execute(&actor, id, req).await?.into()))
}

#[utoipa::path(post, path = "/api/payments/{id}/refund", tag = "Payments", request_body = RefundBody,
    params(("id" = Uuid, Path, description = "Payment ID")),
    responses(
        (status = 200, body = PaymentResponse),
        (status = 400, body = crate::presentation::http::error::ErrorBody)
    ))]
pub async fn refund_payment(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    Path(id): Path<Uuid>,
    body: Option<Json<RefundBody>>,
) -> ApiResult<Json<PaymentResponse>> {
    let actor = authenticate(&ctx, bearer).await?;
    let reason = body.and_then(|Json(b)| b.reason);
    let payments = ctx.payment_repo();
    let registrations = ctx.registration_repo();
    let users = ctx.user_repo();
    let notifier = ctx.notifier();
    let uc = RefundPayment {
        payments: payments.as_ref(),
        registrations: registrations.as_ref(),
        users: users.as_ref(),
        notifier: notifier.as_ref(),
        settings: ctx.camp(),
    };
    Ok(Json(uc.execute(&actor, id, reason).await?.into()))
}
