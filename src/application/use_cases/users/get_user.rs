use uuid::Uuid;

use crate::application::access::{self, AuthUser};
use crate::application::errors::{ServiceError, ServiceResult};
use crate::application::ports::user_repository::UserRepository;
use crate::domain::users::user::User;

pub struct GetUser<'a, R: UserRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: UserRepository + ?Sized> GetUser<'a, R> {
    pub async fn execute(&self, actor: &AuthUser, id: Uuid) -> ServiceResult<User> {
        access::require_owner_or_staff(actor, id)?;
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", id))
    }
}
