use async_trait::async_trait;
use uuid::Uuid;

use crate::application::dto::pagination::PageRequest;
use crate::domain::users::user::{User, UserRole};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub playa_name: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub state_province: Option<String>,
    pub country: Option<String>,
    pub emergency_contact: Option<String>,
    pub role: UserRole,
    pub is_email_verified: bool,
    pub allow_registration: bool,
    pub allow_early_registration: bool,
    pub allow_deferred_dues_payment: bool,
    pub allow_no_job: bool,
    pub internal_notes: Option<String>,
}

/// Column updates; `None` leaves a column untouched, `Some(None)` clears a nullable one.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub playa_name: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub city: Option<Option<String>>,
    pub state_province: Option<Option<String>>,
    pub country: Option<Option<String>>,
    pub emergency_contact: Option<Option<String>>,
    pub role: Option<UserRole>,
    pub is_email_verified: Option<bool>,
    pub allow_registration: Option<bool>,
    pub allow_early_registration: Option<bool>,
    pub allow_deferred_dues_payment: Option<bool>,
    pub allow_no_job: Option<bool>,
    pub internal_notes: Option<Option<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<UserRole>,
    pub query: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: Option<String>,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: &NewUser) -> anyhow::Result<User>;
    /// Case-insensitive.
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> anyhow::Result<Option<UserCredentials>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn list_users(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> anyhow::Result<(Vec<User>, i64)>;
    async fn update_user(&self, id: Uuid, patch: &UserPatch) -> anyhow::Result<Option<User>>;
    /// Applies an admin's edit and, when any field changed, records a USER_UPDATE audit
    /// of the changed fields in the same transaction.
    async fn update_user_audited(
        &self,
        id: Uuid,
        patch: &UserPatch,
        actor_user_id: Uuid,
    ) -> anyhow::Result<Option<User>>;
    async fn delete_user(&self, id: Uuid) -> anyhow::Result<bool>;
    /// Registrations plus payments owned by the user.
    async fn count_dependents(&self, id: Uuid) -> anyhow::Result<i64>;
}
