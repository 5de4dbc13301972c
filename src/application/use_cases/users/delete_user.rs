use uuid::Uuid;

use crate::application::access::{self, AuthUser};
use crate::application::errors::{ServiceError, ServiceResult};
use crate::application::ports::user_repository::UserRepository;

pub struct DeleteUser<'a, R: UserRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: UserRepository + ?Sized> DeleteUser<'a, R> {
    pub async fn execute(&self, actor: &AuthUser, id: Uuid) -> ServiceResult<()> {
        access::require_admin(actor)?;
        if actor.id == id {
            return Err(ServiceError::bad_request("you cannot delete your own account"));
        }
        if self.repo.find_by_id(id).await?.is_none() {
            return Err(ServiceError::not_found("User", id));
        }
        if self.repo.count_dependents(id).await? > 0 {
            return Err(ServiceError::conflict(
                "user has registrations or payments and cannot be deleted",
            ));
        }
        let deleted = self.repo.delete_user(id).await?;
        if !deleted {
            return Err(ServiceError::not_found("User", id));
        }
        tracing::info!(user_id = %id, actor_id = %actor.id, "user_deleted");
        Ok(())
    }
}
