use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordVerifier},
};

use crate::application::errors::ServiceResult;
use crate::application::ports::user_repository::UserRepository;
use crate::domain::users::user::User;

pub struct Login<'a, R: UserRepository + ?Sized> {
    pub repo: &'a R,
}

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl<'a, R: UserRepository + ?Sized> Login<'a, R> {
    /// `None` when the email is unknown or the password does not match.
    pub async fn execute(&self, req: &LoginRequest) -> ServiceResult<Option<User>> {
        let email = req.email.trim().to_lowercase();
        let creds = match self.repo.find_credentials_by_email(&email).await? {
            Some(c) => c,
            None => return Ok(None),
        };
        let Some(hash) = creds.password_hash else {
            return Ok(None);
        };
        let parsed = PasswordHash::new(&hash).map_err(|e| anyhow::anyhow!(e.to_string()))?;
        if Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed)
            .is_ok()
        {
            Ok(Some(creds.user))
        } else {
            Ok(None)
        }
    }
}
