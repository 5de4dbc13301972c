use argon2::{
    Argon2,
    password_hash::{PasswordHasher, SaltString},
};
use password_hash::rand_core::OsRng;

use crate::application::errors::{ServiceError, ServiceResult};
use crate::application::ports::user_repository::{NewUser, UserRepository};
use crate::application::services::validation::{normalize_email, require_text, validate_password};
use crate::domain::users::user::{User, UserRole};

pub struct Register<'a, R: UserRepository + ?Sized> {
    pub repo: &'a R,
}

#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();
    Ok(hash)
}

impl<'a, R: UserRepository + ?Sized> Register<'a, R> {
    pub async fn execute(&self, req: &RegisterRequest) -> ServiceResult<User> {
        let email = normalize_email(&req.email)?;
        validate_password(&req.password)?;
        let first_name = require_text("first_name", &req.first_name)?;
        let last_name = require_text("last_name", &req.last_name)?;
        if self.repo.find_by_email(&email).await?.is_some() {
            return Err(ServiceError::conflict(format!(
                "a user with email {email} already exists"
            )));
        }
        let hash = hash_password(&req.password)?;
        let user = self
            .repo
            .create_user(&NewUser {
                email,
                password_hash: Some(hash),
                first_name,
                last_name,
                playa_name: None,
                phone: None,
                city: None,
                state_province: None,
                country: None,
                emergency_contact: None,
                role: UserRole::Participant,
                is_email_verified: false,
                allow_registration: true,
                allow_early_registration: false,
                allow_deferred_dues_payment: false,
                allow_no_job: false,
                internal_notes: None,
            })
            .await?;
        tracing::info!(user_id = %user.id, "user_registered");
        Ok(user)
    }
}
