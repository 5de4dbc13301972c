use serde_json::json;
use uuid::Uuid;

use crate::application::access::{self, AuthUser};
use crate::application::dto::settings::CampSettings;
use crate::application::errors::{ServiceError, ServiceResult};
use crate::application::ports::notification_port::NotificationPort;
use crate::application::ports::payment_repository::PaymentRepository;
use crate::application::ports::registration_repository::RegistrationRepository;
use crate::application::ports::user_repository::UserRepository;
use crate::application::services::notifications::{NotificationKind, format_cents, notify_user};
use crate::application::services::validation::optional_text;
use crate::domain::audit::admin_audit::{AuditActionType, AuditTargetType, NewAdminAudit};
use crate::domain::payments::payment::{Payment, PaymentStatus};

pub struct RefundPayment<'a, P, R, U, N>
where
    P: PaymentRepository + ?Sized,
    R: RegistrationRepository + ?Sized,
    U: UserRepository + ?Sized,
    N: NotificationPort + ?Sized,
{
    pub payments: &'a P,
    pub registrations: &'a R,
    pub users: &'a U,
    pub notifier: &'a N,
    pub settings: &'a CampSettings,
}

impl<'a, P, R, U, N> RefundPayment<'a, P, R, U, N>
where
    P: PaymentRepository + ?Sized,
    R: RegistrationRepository + ?Sized,
    U: UserRepository + ?Sized,
    N: NotificationPort + ?Sized,
{
    pub async fn execute(
        &self,
        actor: &AuthUser,
        id: Uuid,
        reason: Option<String>,
    ) -> ServiceResult<Payment> {
        access::require_admin(actor)?;
        let payment = self
            .payments
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Payment", id))?;
        if payment.status != PaymentStatus::Completed {
            return Err(ServiceError::bad_request(format!(
                "only completed payments can be refunded (status is {})",
                payment.status.as_str()
            )));
        }
        let audit = NewAdminAudit {
            actor_user_id: actor.id,
            action_type: AuditActionType::PaymentRefund,
            target_record_type: AuditTargetType::Payment,
            target_record_id: id,
            old_values: Some(json!({ "status": payment.status })),
            new_values: Some(json!({
                "status": PaymentStatus::Refunded,
                "amount_cents": payment.amount_cents,
                "registration_id": payment.registration_id,
            })),
            reason: optional_text(reason),
            transaction_id: Some(Uuid::new_v4()),
        };
        let refunded = self
            .payments
            .refund(id, &audit)
            .await?
            .ok_or_else(|| ServiceError::bad_request("payment is no longer refundable"))?;
        tracing::info!(payment_id = %id, actor = %actor.id, "payment_refunded");

        let year = match refunded.registration_id {
            Some(registration_id) => self
                .registrations
                .get(registration_id)
                .await?
                .map(|d| d.registration.year),
            None => None,
        }
        .unwrap_or(self.settings.registration_year);
        if let Some(owner) = self.users.find_by_id(refunded.user_id).await? {
            notify_user(
                self.notifier,
                self.settings,
                &owner,
                year,
                NotificationKind::PaymentRefunded,
                Some(format!(
                    "Amount: {}",
                    format_cents(refunded.amount_cents, &refunded.currency)
                )),
            )
            .await;
        }
        Ok(refunded)
    }
}
