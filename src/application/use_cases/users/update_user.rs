use uuid::Uuid;

use crate::application::access::{self, AuthUser};
use crate::application::errors::{ServiceError, ServiceResult};
use crate::application::ports::user_repository::{UserPatch, UserRepository};
use crate::application::services::validation::{clearable, normalize_email, require_text};
use crate::domain::users::user::{User, UserRole};

#[derive(Debug, Clone, Default)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub playa_name: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub state_province: Option<String>,
    pub country: Option<String>,
    pub emergency_contact: Option<String>,
    // admin only
    pub email: Option<String>,
    pub role: Option<UserRole>,
    pub is_email_verified: Option<bool>,
    pub allow_registration: Option<bool>,
    pub allow_early_registration: Option<bool>,
    pub allow_deferred_dues_payment: Option<bool>,
    pub allow_no_job: Option<bool>,
    pub internal_notes: Option<String>,
}

impl UpdateUserRequest {
    fn touches_admin_fields(&self) -> bool {
        self.email.is_some()
            || self.role.is_some()
            || self.is_email_verified.is_some()
            || self.allow_registration.is_some()
            || self.allow_early_registration.is_some()
            || self.allow_deferred_dues_payment.is_some()
            || self.allow_no_job.is_some()
            || self.internal_notes.is_some()
    }
}

pub struct UpdateUser<'a, R: UserRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: UserRepository + ?Sized> UpdateUser<'a, R> {
    pub async fn execute(
        &self,
        actor: &AuthUser,
        id: Uuid,
        req: UpdateUserRequest,
    ) -> ServiceResult<User> {
        let is_admin = actor.role.is_admin();
        if actor.id != id {
            access::require_admin(actor)?;
        }
        if !is_admin && req.touches_admin_fields() {
            return Err(ServiceError::forbidden(
                "only admins can change email, role or registration permissions",
            ));
        }
        if self.repo.find_by_id(id).await?.is_none() {
            return Err(ServiceError::not_found("User", id));
        }

        let email = match req.email.as_deref() {
            Some(raw) => {
                let email = normalize_email(raw)?;
                if let Some(other) = self.repo.find_by_email(&email).await? {
                    if other.id != id {
                        return Err(ServiceError::conflict(format!(
                            "a user with email {email} already exists"
                        )));
                    }
                }
                Some(email)
            }
            None => None,
        };
        let patch = UserPatch {
            email,
            first_name: req
                .first_name
                .as_deref()
                .map(|v| require_text("first_name", v))
                .transpose()?,
            last_name: req
                .last_name
                .as_deref()
                .map(|v| require_text("last_name", v))
                .transpose()?,
            playa_name: clearable(req.playa_name),
            phone: clearable(req.phone),
            city: clearable(req.city),
            state_province: clearable(req.state_province),
            country: clearable(req.country),
            emergency_contact: clearable(req.emergency_contact),
            role: req.role,
            is_email_verified: req.is_email_verified,
            allow_registration: req.allow_registration,
            allow_early_registration: req.allow_early_registration,
            allow_deferred_dues_payment: req.allow_deferred_dues_payment,
            allow_no_job: req.allow_no_job,
            internal_notes: clearable(req.internal_notes),
        };
        // admins editing someone else leave an audit trail written with the change
        let updated = if is_admin && actor.id != id {
            self.repo.update_user_audited(id, &patch, actor.id).await?
        } else {
            self.repo.update_user(id, &patch).await?
        };
        updated.ok_or_else(|| ServiceError::not_found("User", id))
    }
}
