use crate::application::access::{self, AuthUser};
use crate::application::errors::{ServiceError, ServiceResult};
use crate::application::ports::user_repository::{NewUser, UserRepository};
use crate::application::services::validation::{
    normalize_email, optional_text, require_text, validate_password,
};
use crate::application::use_cases::auth::register::hash_password;
use crate::domain::users::user::{User, UserRole};

#[derive(Debug, Clone, Default)]
pub struct CreateUserRequest {
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

pub struct CreateUser<'a, R: UserRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: UserRepository + ?Sized> CreateUser<'a, R> {
    pub async fn execute(&self, actor: &AuthUser, req: CreateUserRequest) -> ServiceResult<User> {
        access::require_admin(actor)?;
        let email = normalize_email(&req.email)?;
        let first_name = require_text("first_name", &req.first_name)?;
        let last_name = require_text("last_name", &req.last_name)?;
        let password_hash = match req.password.as_deref() {
            Some(p) => {
                validate_password(p)?;
                Some(hash_password(p)?)
            }
            None => None,
        };
        if self.repo.find_by_email(&email).await?.is_some() {
            return Err(ServiceError::conflict(format!(
                "a user with email {email} already exists"
            )));
        }
        let user = self
            .repo
            .create_user(&NewUser {
                email,
                password_hash,
                first_name,
                last_name,
                playa_name: optional_text(req.playa_name),
                phone: optional_text(req.phone),
                city: optional_text(req.city),
                state_province: optional_text(req.state_province),
                country: optional_text(req.country),
                emergency_contact: optional_text(req.emergency_contact),
                role: req.role.unwrap_or(UserRole::Participant),
                is_email_verified: req.is_email_verified.unwrap_or(false),
                allow_registration: req.allow_registration.unwrap_or(true),
                allow_early_registration: req.allow_early_registration.unwrap_or(false),
                allow_deferred_dues_payment: req.allow_deferred_dues_payment.unwrap_or(false),
                allow_no_job: req.allow_no_job.unwrap_or(false),
                internal_notes: optional_text(req.internal_notes),
            })
            .await?;
        tracing::info!(user_id = %user.id, actor_id = %actor.id, role = user.role.as_str(), "user_created");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{InMemoryStore, auth_user};

    fn request(email: &str) -> CreateUserRequest {
        CreateUserRequest {
            email: email.into(),
            first_name: "Ranger".into(),
            last_name: "Rick".into(),
            role: Some(UserRole::Staff),
            allow_no_job: Some(true),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn admin_creates_user_without_password() {
        let store = InMemoryStore::default();
        let admin = store.seed_user("admin@example.com", UserRole::Admin).await;
        let user = CreateUser { repo: &store }
            .execute(&auth_user(&admin), request("Ranger@Example.com"))
            .await
            .unwrap();
        assert_eq!(user.email, "ranger@example.com");
        assert_eq!(user.role, UserRole::Staff);
        assert!(user.allow_no_job);
        assert!(user.allow_registration);
    }

    #[tokio::test]
    async fn non_admin_is_forbidden() {
        let store = InMemoryStore::default();
        let staff = store.seed_user("staff@example.com", UserRole::Staff).await;
        let err = CreateUser { repo: &store }
            .execute(&auth_user(&staff), request("ranger@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let store = InMemoryStore::default();
        let admin = store.seed_user("admin@example.com", UserRole::Admin).await;
        let err = CreateUser { repo: &store }
            .execute(&auth_user(&admin), request("ADMIN@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }
}
