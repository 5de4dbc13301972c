use uuid::Uuid;

use crate::application::access::{self, AuthUser};
use crate::application::dto::pagination::{Page, PageRequest};
use crate::application::dto::settings::CampSettings;
use crate::application::errors::{ServiceError, ServiceResult};
use crate::application::ports::camping_option_repository::CampingOptionRepository;
use crate::application::ports::notification_port::NotificationPort;
use crate::application::ports::payment_repository::{
    PaymentFilter, PaymentPatch, PaymentRepository,
};
use crate::application::ports::registration_repository::RegistrationRepository;
use crate::application::ports::user_repository::UserRepository;
use crate::application::services::validation::clearable;
use crate::application::use_cases::payments::confirmation::confirm_if_paid;
use crate::application::use_cases::payments::record_payment::announce_payment;
use crate::domain::payments::payment::{Payment, PaymentStatus};

pub struct ListPayments<'a, P: PaymentRepository + ?Sized> {
    pub repo: &'a P,
}

impl<'a, P: PaymentRepository + ?Sized> ListPayments<'a, P> {
    pub async fn execute(
        &self,
        actor: &AuthUser,
        filter: PaymentFilter,
        page: PageRequest,
    ) -> ServiceResult<Page<Payment>> {
        access::require_staff(actor)?;
        let (items, total) = self.repo.list(&filter, page).await?;
        Ok(Page::new(items, total, page))
    }
}

pub struct MyPayments<'a, P: PaymentRepository + ?Sized> {
    pub repo: &'a P,
}

impl<'a, P: PaymentRepository + ?Sized> MyPayments<'a, P> {
    pub async fn execute(&self, actor: &AuthUser) -> ServiceResult<Vec<Payment>> {
        Ok(self.repo.list_for_user(actor.id).await?)
    }
}

pub struct GetPayment<'a, P: PaymentRepository + ?Sized> {
    pub repo: &'a P,
}

impl<'a, P: PaymentRepository + ?Sized> GetPayment<'a, P> {
    pub async fn execute(&self, actor: &AuthUser, id: Uuid) -> ServiceResult<Payment> {
        let payment = self
            .repo
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Payment", id))?;
        access::require_owner_or_staff(actor, payment.user_id)?;
        Ok(payment)
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdatePaymentRequest {
    pub status: Option<PaymentStatus>,
    pub provider_ref: Option<String>,
    pub notes: Option<String>,
}

pub struct UpdatePayment<'a, P, U, R, O, N>
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

impl<'a, P, U, R, O, N> UpdatePayment<'a, P, U, R, O, N>
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
        id: Uuid,
        req: UpdatePaymentRequest,
    ) -> ServiceResult<Payment> {
        access::require_admin(actor)?;
        if req.status == Some(PaymentStatus::Refunded) {
            return Err(ServiceError::bad_request(
                "refunds are recorded through the refund endpoint",
            ));
        }
        let before = self
            .payments
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Payment", id))?;
        let changes_status = req.status.is_some_and(|s| s != before.status);
        if before.status == PaymentStatus::Refunded && changes_status {
            return Err(ServiceError::bad_request(
                "refunded payments cannot change status",
            ));
        }
        let updated = self
            .payments
            .update(
                id,
                &PaymentPatch {
                    status: req.status,
                    provider_ref: clearable(req.provider_ref),
                    notes: clearable(req.notes),
                },
            )
            .await?
            // a refund landed between the read and the write
            .ok_or_else(|| ServiceError::conflict("payment was refunded concurrently"))?;

        let newly_completed =
            before.status != PaymentStatus::Completed && updated.status == PaymentStatus::Completed;
        if newly_completed {
            if let Some(owner) = self.users.find_by_id(updated.user_id).await? {
                let year = match updated.registration_id {
                    Some(registration_id) => self
                        .registrations
                        .get(registration_id)
                        .await?
                        .map(|d| d.registration.year),
                    None => None,
                }
                .unwrap_or(self.settings.registration_year);
                let confirmed = match updated.registration_id {
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
                announce_payment(self.notifier, self.settings, &owner, &updated, year, confirmed)
                    .await;
            }
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{
        InMemoryStore, RecordingNotifier, auth_user, open_settings,
    };
    use crate::application::services::notifications::NotificationKind;
    use crate::domain::registrations::registration::RegistrationStatus;
    use crate::domain::users::user::UserRole;

    #[tokio::test]
    async fn owners_and_staff_read_payments() {
        let store = InMemoryStore::default();
        let me = store.seed_user("me@example.com", UserRole::Participant).await;
        let other = store.seed_user("other@example.com", UserRole::Participant).await;
        let staff = store.seed_user("staff@example.com", UserRole::Staff).await;
        let payment = store.seed_payment(me.id, None, 500, PaymentStatus::Completed).await;

        let get = GetPayment { repo: &store };
        assert!(get.execute(&auth_user(&me), payment.id).await.is_ok());
        assert!(get.execute(&auth_user(&staff), payment.id).await.is_ok());
        assert!(matches!(
            get.execute(&auth_user(&other), payment.id).await.unwrap_err(),
            ServiceError::Forbidden(_)
        ));

        let mine = MyPayments { repo: &store }.execute(&auth_user(&me)).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert!(MyPayments { repo: &store }
            .execute(&auth_user(&other))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let store = InMemoryStore::default();
        let staff = store.seed_user("staff@example.com", UserRole::Staff).await;
        let me = store.seed_user("me@example.com", UserRole::Participant).await;
        store.seed_payment(me.id, None, 500, PaymentStatus::Completed).await;
        store.seed_payment(me.id, None, 700, PaymentStatus::Failed).await;
        let page = ListPayments { repo: &store }
            .execute(
                &auth_user(&staff),
                PaymentFilter {
                    status: Some(PaymentStatus::Failed),
                    ..Default::default()
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].amount_cents, 700);
    }

    #[tokio::test]
    async fn completing_a_payment_confirms_registration() {
        let store = InMemoryStore::default();
        let notifier = RecordingNotifier::default();
        let settings = open_settings();
        let admin = store.seed_user("admin@example.com", UserRole::Admin).await;
        let me = store.seed_user("me@example.com", UserRole::Participant).await;
        let tent = store.seed_option("Tent", 10000, 0, &[]).await;
        let reg = store.seed_registration_with_option(me.id, 2026, tent.id).await;
        store.set_registration_status(reg.id, RegistrationStatus::Pending).await;
        let payment = store
            .seed_payment(me.id, Some(reg.id), 10000, PaymentStatus::Pending)
            .await;

        let updated = UpdatePayment {
            payments: &store,
            users: &store,
            registrations: &store,
            options: &store,
            notifier: &notifier,
            settings: &settings,
        }
        .execute(
            &auth_user(&admin),
            payment.id,
            UpdatePaymentRequest {
                status: Some(PaymentStatus::Completed),
                provider_ref: Some("check #1042".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.provider_ref.as_deref(), Some("check #1042"));
        let detail = RegistrationRepository::get(&store, reg.id).await.unwrap().unwrap();
        assert_eq!(detail.registration.status, RegistrationStatus::Confirmed);
        assert_eq!(notifier.sent()[0].kind, NotificationKind::PaymentReceived);
    }

    #[tokio::test]
    async fn refunded_payments_cannot_be_completed_again() {
        let store = InMemoryStore::default();
        let notifier = RecordingNotifier::default();
        let settings = open_settings();
        let admin = store.seed_user("admin@example.com", UserRole::Admin).await;
        let me = store.seed_user("me@example.com", UserRole::Participant).await;
        let tent = store.seed_option("Tent", 10000, 0, &[]).await;
        let reg = store.seed_registration_with_option(me.id, 2026, tent.id).await;
        store.set_registration_status(reg.id, RegistrationStatus::Pending).await;
        let payment = store
            .seed_payment(me.id, Some(reg.id), 10000, PaymentStatus::Refunded)
            .await;

        let uc = UpdatePayment {
            payments: &store,
            users: &store,
            registrations: &store,
            options: &store,
            notifier: &notifier,
            settings: &settings,
        };
        let err = uc
            .execute(
                &auth_user(&admin),
                payment.id,
                UpdatePaymentRequest {
                    status: Some(PaymentStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));
        let stored = PaymentRepository::get(&store, payment.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Refunded);
        let detail = RegistrationRepository::get(&store, reg.id).await.unwrap().unwrap();
        assert_eq!(detail.registration.status, RegistrationStatus::Pending);
        assert!(notifier.sent().is_empty());

        // notes stay editable
        let noted = uc
            .execute(
                &auth_user(&admin),
                payment.id,
                UpdatePaymentRequest {
                    notes: Some("returned by check".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(noted.status, PaymentStatus::Refunded);
        assert_eq!(noted.notes.as_deref(), Some("returned by check"));
    }
}
