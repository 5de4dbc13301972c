use uuid::Uuid;

/// Raised by repositories when a unique constraint rejects a write.
#[derive(thiserror::Error, Debug)]
#[error("duplicate value violates unique constraint {constraint}")]
pub struct DuplicateKey {
    pub constraint: String,
}

/// Raised by repositories when a row is still referenced by another table.
#[derive(thiserror::Error, Debug)]
#[error("row is still referenced ({constraint})")]
pub struct StillReferenced {
    pub constraint: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<anyhow::Error> for ServiceError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(dup) = err.downcast_ref::<DuplicateKey>() {
            return ServiceError::Conflict(dup.to_string());
        }
        if let Some(referenced) = err.downcast_ref::<StillReferenced>() {
            return ServiceError::Conflict(referenced.to_string());
        }
        ServiceError::Internal(err)
    }
}

impl ServiceError {
    pub fn not_found(entity: &str, id: Uuid) -> Self {
        ServiceError::NotFound(format!("{entity} with ID {id} not found"))
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        ServiceError::BadRequest(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        ServiceError::Conflict(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ServiceError::Forbidden(msg.into())
    }
}
