use serde_json::json;
use uuid::Uuid;

use crate::application::access::{self, AuthUser};
use crate::application::dto::settings::CampSettings;
use crate::application::errors::{ServiceError, ServiceResult};
use crate::application::ports::notification_port::NotificationPort;
use crate::application::ports::payment_repository::PaymentRepository;
use crate::application::ports::registration_repository::{
    AdminRegistrationCancel, RegistrationRepository,
};
use crate::application::ports::user_repository::UserRepository;
use crate::application::services::notifications::{NotificationKind, format_cents, notify_user};
use crate::application::services::validation::optional_text;
use crate::domain::audit::admin_audit::{AuditActionType, AuditTargetType, NewAdminAudit};
use crate::domain::payments::payment::{Payment, PaymentStatus};
use crate::domain::registrations::registration::{Registration, RegistrationStatus};

#[derive(Debug, Clone, Default)]
pub struct AdminCancelRequest {
    pub reason: Option<String>,
    pub process_refunds: bool,
    pub notify_user: bool,
}

#[derive(Debug, Clone)]
pub struct AdminCancelOutcome {
    pub registration: Registration,
    pub refunded_payments: Vec<Payment>,
}

pub struct CancelRegistration<'a, R, P, U, N>
where
    R: RegistrationRepository + ?Sized,
    P: PaymentRepository + ?Sized,
    U: UserRepository + ?Sized,
    N: NotificationPort + ?Sized,
{
    pub registrations: &'a R,
    pub payments: &'a P,
    pub users: &'a U,
    pub notifier: &'a N,
    pub settings: &'a CampSettings,
}

impl<'a, R, P, U, N> CancelRegistration<'a, R, P, U, N>
where
    R: RegistrationRepository + ?Sized,
    P: PaymentRepository + ?Sized,
    U: UserRepository + ?Sized,
    N: NotificationPort + ?Sized,
{
    pub async fn execute(
        &self,
        actor: &AuthUser,
        id: Uuid,
        req: AdminCancelRequest,
    ) -> ServiceResult<AdminCancelOutcome> {
        access::require_admin(actor)?;
        let current = self
            .registrations
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Registration", id))?
            .registration;
        if current.status == RegistrationStatus::Cancelled {
            return Err(ServiceError::bad_request("registration is already cancelled"));
        }

        let reason = optional_text(req.reason);
        let audit = NewAdminAudit {
            actor_user_id: actor.id,
            action_type: AuditActionType::RegistrationCancel,
            target_record_type: AuditTargetType::Registration,
            target_record_id: id,
            old_values: Some(json!({ "status": current.status })),
            new_values: Some(json!({ "status": RegistrationStatus::Cancelled })),
            reason: reason.clone(),
            transaction_id: Some(Uuid::new_v4()),
        };

        // candidates only; the repository refunds and audits those still COMPLETED
        let refund_payment_ids = if req.process_refunds {
            self.payments
                .list_for_registration(id)
                .await?
                .into_iter()
                .filter(|p| p.status == PaymentStatus::Completed)
                .map(|p| p.id)
                .collect()
        } else {
            Vec::new()
        };

        let (registration, refunded_payments) = self
            .registrations
            .apply_admin_cancel(&AdminRegistrationCancel {
                registration_id: id,
                refund_payment_ids,
                audit,
            })
            .await?;
        tracing::info!(
            registration_id = %id,
            actor = %actor.id,
            refunds = refunded_payments.len(),
            "registration_admin_cancel"
        );

        if req.notify_user {
            if let Some(user) = self.users.find_by_id(registration.user_id).await? {
                let mut lines = Vec::new();
                if let Some(reason) = &reason {
                    lines.push(format!("Reason: {reason}"));
                }
                for payment in &refunded_payments {
                    lines.push(format!(
                        "Refunded: {}",
                        format_cents(payment.amount_cents, &payment.currency)
                    ));
                }
                let detail = (!lines.is_empty()).then(|| lines.join("\n"));
                notify_user(
                    self.notifier,
                    self.settings,
                    &user,
                    registration.year,
                    NotificationKind::RegistrationCancelled,
                    detail,
                )
                .await;
            }
        }
        Ok(AdminCancelOutcome {
            registration,
            refunded_payments,
        })
    }
}
