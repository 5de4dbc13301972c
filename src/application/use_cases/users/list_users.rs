use crate::application::access::{self, AuthUser};
use crate::application::dto::pagination::{Page, PageRequest};
use crate::application::errors::ServiceResult;
use crate::application::ports::user_repository::{UserFilter, UserRepository};
use crate::domain::users::user::User;

pub struct ListUsers<'a, R: UserRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: UserRepository + ?Sized> ListUsers<'a, R> {
    pub async fn execute(
        &self,
        actor: &AuthUser,
        filter: UserFilter,
        page: PageRequest,
    ) -> ServiceResult<Page<User>> {
        access::require_staff(actor)?;
        let filter = UserFilter {
            query: filter.query.filter(|q| !q.trim().is_empty()),
            ..filter
        };
        let (items, total) = self.repo.list_users(&filter, page).await?;
        Ok(Page::new(items, total, page))
    }
}
