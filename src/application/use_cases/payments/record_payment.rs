use uuid::Uuid;

use crate::application::access::{self, AuthUser};
use crate::application::dto::settings::CampSettings;
use crate::application::errors::{ServiceError, ServiceResult};
use crate::application::ports::camping_option_repository::CampingOptionRepository;
use crate::application::ports::notification_port::NotificationPort;
use crate::application::ports::payment_repository::{NewPayment, PaymentRepository};
use crate::application::ports::registration_repository::RegistrationRepository;
use crate::application::ports::user_repository::UserRepository;
use crate::application::services::notifications::{NotificationKind, format_cents, notify_user};
use crate::application::services::validation::optional_text;
use crate::application::use_cases::payments::confirmation::confirm_if_paid;
use crate::domain::payments::payment::{Payment, PaymentProvider, PaymentStatus};
use crate::domain::users::user::User;

pub const DEFAULT_CURRENCY: &str = "USD";

#[derive(Debug, Clone)]
pub struct RecordPaymentRequest {
    pub user_id: Uuid,
    pub registration_id: Option<Uuid>,
    pub amount_cents: i64,
    pub currency: Option<String>,
    pub status: Option<PaymentStatus>,
    pub provider: Option<PaymentProvider>,
    pub provider_ref: Option<String>,
    pub notes: Option<String>,
}

/// Sends PAYMENT_RECEIVED, mentioning the confirmation when the payment settled the dues.
pub(super) async fn announce_payment<N: NotificationPort + ?Sized>(
    notifier: &N,
    settings: &CampSettings,
    owner: &User,
    payment: &Payment,
    year: i32,
    confirmed: bool,
) {
    let mut detail = format!(
        "Amount: {}",
        format_cents(payment.amount_cents, &payment.currency)
    );
    if confirmed {
        detail.push_str("\nYour registration is now confirmed.");
    }
    notify_user(
        notifier,
        settings,
        owner,
        year,
        NotificationKind::PaymentReceived,
        Some(detail),
    )
    .await;
}

pub struct RecordPayment<'a, P, U, R, O, N>
where
    P: PaymentRepository + ?Sized,
    U: UserRepository + ?Sized,
    R: RegistrationRepository + ?Sized,
    O: CampingOptionRepository + ?Sized,
    N: NotificationPort + ?Sized,
{
    pub payments: &'a P,
    pub users: &'a U,
    pub registrations: &'a R,
    pub options: &'a O,
    pub notifier: &'a N,
    pub settings: &'a CampSettings,
}

impl<'a, P, U, R, O, N> RecordPayment<'a, P, U, R, O, N>
where
    P: PaymentRepository + ?Sized,
    U: UserRepository + ?Sized,
    R: RegistrationRepository + ?Sized,
    O: CampingOptionRepository + ?Sized,
    N: NotificationPort + ?Sized,
{
    pub async fn execute(
        &self,
        actor: &AuthUser,
        req: RecordPaymentRequest,
    ) -> ServiceResult<Payment> {
        access::require_admin(actor)?;
        if req.amount_cents <= 0 {
            return Err(ServiceError::bad_request("amount_cents must be greater than zero"));
        }
        if req.status == Some(PaymentStatus::Refunded) {
            return Err(ServiceError::bad_request(
                "refunds are recorded through the refund endpoint",
            ));
        }
        let owner = self
            .users
            .find_by_id(req.user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", req.user_id))?;
        let year = match req.registration_id {
            Some(registration_id) => {
                let detail = self
                    .registrations
                    .get(registration_id)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("Registration", registration_id))?;
                if detail.registration.user_id != owner.id {
                    return Err(ServiceError::bad_request(
                        "registration does not belong to this user",
                    ));
                }
                detail.registration.year
            }
            None => self.settings.registration_year,
        };
        let currency = optional_text(req.currency)
            .map(|c| c.to_uppercase())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

        let payment = self
            .payments
            .create(&NewPayment {
                user_id: owner.id,
                registration_id: req.registration_id,
                amount_cents: req.amount_cents,
                currency,
                status: req.status.unwrap_or(PaymentStatus::Completed),
                provider: req.provider.unwrap_or(PaymentProvider::Manual),
                provider_ref: optional_text(req.provider_ref),
                notes: optional_text(req.notes),
            })
            .await?;
        tracing::info!(
            payment_id = %payment.id,
            user_id = %owner.id,
            amount_cents = payment.amount_cents,
            status = payment.status.as_str(),
            "payment_recorded"
        );

        if payment.status == PaymentStatus::Completed {
            let confirmed = match payment.registration_id {
                Some(registration_id) => confirm_if_paid(
                    self.registrations,
                    self.payments,
                    self.options,
                    registration_id,
                    &owner,
                )
                .await?
                .is_some(),
                None => false,
            };
            announce_payment(self.notifier, self.settings, &owner, &payment, year, confirmed)
                .await;
        }
        Ok(payment)
    }
}
