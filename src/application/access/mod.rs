use uuid::Uuid;

use crate::application::errors::{ServiceError, ServiceResult};
use crate::domain::users::user::{User, UserRole};

/// The authenticated caller. Presentation builds it from the bearer token and user row.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        AuthUser {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Capability {
    None,
    Owner,
    Staff,
    Admin,
}

pub fn resolve(actor: &AuthUser, owner_id: Option<Uuid>) -> Capability {
    match actor.role {
        UserRole::Admin => Capability::Admin,
        UserRole::Staff => Capability::Staff,
        UserRole::Participant if owner_id == Some(actor.id) => Capability::Owner,
        UserRole::Participant => Capability::None,
    }
}

pub fn require_admin(actor: &AuthUser) -> ServiceResult<()> {
    if actor.role.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::forbidden("admin role required"))
    }
}

pub fn require_staff(actor: &AuthUser) -> ServiceResult<()> {
    if actor.role.is_staff() {
        Ok(())
    } else {
        Err(ServiceError::forbidden("staff role required"))
    }
}

/// The record's owner, staff and admins pass.
pub fn require_owner_or_staff(actor: &AuthUser, owner_id: Uuid) -> ServiceResult<()> {
    if actor.id == owner_id || resolve(actor, Some(owner_id)) >= Capability::Owner {
        Ok(())
    } else {
        Err(ServiceError::forbidden(
            "you do not have access to this record",
        ))
    }
}
