use uuid::Uuid;

use crate::application::access::{self, AuthUser};
use crate::application::dto::settings::CampSettings;
use crate::application::errors::{ServiceError, ServiceResult};
use crate::application::ports::notification_port::NotificationPort;
use crate::application::ports::registration_repository::RegistrationRepository;
use crate::application::ports::user_repository::UserRepository;
use crate::application::services::notifications::{NotificationKind, notify_user};
use crate::application::services::validation::clearable;
use crate::domain::registrations::registration::{Registration, RegistrationStatus};

#[derive(Debug, Clone, Default)]
pub struct UpdateRegistrationRequest {
    pub status: Option<RegistrationStatus>,
    /// Blank clears the notes.
    pub notes: Option<String>,
}

pub struct UpdateRegistration<'a, R: RegistrationRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: RegistrationRepository + ?Sized> UpdateRegistration<'a, R> {
    pub async fn execute(
        &self,
        actor: &AuthUser,
        id: Uuid,
        req: UpdateRegistrationRequest,
    ) -> ServiceResult<Registration> {
        access::require_admin(actor)?;
        self.repo
            .update(id, req.status, clearable(req.notes))
            .await?
            .ok_or_else(|| ServiceError::not_found("Registration", id))
    }
}

pub struct DeleteRegistration<'a, R: RegistrationRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: RegistrationRepository + ?Sized> DeleteRegistration<'a, R> {
    pub async fn execute(&self, actor: &AuthUser, id: Uuid) -> ServiceResult<()> {
        access::require_admin(actor)?;
        if !self.repo.delete(id).await? {
            return Err(ServiceError::not_found("Registration", id));
        }
        tracing::info!(registration_id = %id, actor = %actor.id, "registration_deleted");
        Ok(())
    }
}

/// Lets a participant withdraw their own registration.
pub struct CancelOwnRegistration<'a, R, U, N>
where
    R: RegistrationRepository + ?Sized,
    U: UserRepository + ?Sized,
    N: NotificationPort + ?Sized,
{
    pub repo: &'a R,
    pub users: &'a U,
    pub notifier: &'a N,
    pub settings: &'a CampSettings,
}

impl<'a, R, U, N> CancelOwnRegistration<'a, R, U, N>
where
    R: RegistrationRepository + ?Sized,
    U: UserRepository + ?Sized,
    N: NotificationPort + ?Sized,
{
    pub async fn execute(&self, actor: &AuthUser, id: Uuid) -> ServiceResult<Registration> {
        let detail = self
            .repo
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Registration", id))?;
        let current = detail.registration;
        if current.user_id != actor.id {
            return Err(ServiceError::forbidden(
                "only the owner can cancel this registration",
            ));
        }
        if current.status == RegistrationStatus::Cancelled {
            return Err(ServiceError::bad_request("registration is already cancelled"));
        }
        let cancelled = self
            .repo
            .update(id, Some(RegistrationStatus::Cancelled), None)
            .await?
            .ok_or_else(|| ServiceError::not_found("Registration", id))?;

        if let Some(user) = self.users.find_by_id(actor.id).await? {
            notify_user(
                self.notifier,
                self.settings,
                &user,
                cancelled.year,
                NotificationKind::RegistrationCancelled,
                None,
            )
            .await;
        }
        Ok(cancelled)
    }
}
