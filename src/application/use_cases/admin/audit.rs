use uuid::Uuid;

use crate::application::access::{self, AuthUser};
use crate::application::dto::pagination::{Page, PageRequest};
use crate::application::errors::{ServiceError, ServiceResult};
use crate::application::ports::admin_audit_repository::{
    AdminAuditRepository, AuditFilter, AuditStats,
};
use crate::domain::audit::admin_audit::{AdminAudit, AuditTargetType};

type Timestamp = chrono::DateTime<chrono::Utc>;

fn check_range(from: Option<Timestamp>, to: Option<Timestamp>) -> ServiceResult<()> {
    match (from, to) {
        (Some(from), Some(to)) if from > to => {
            Err(ServiceError::bad_request("from must not be after to"))
        }
        _ => Ok(()),
    }
}

pub struct ListAudit<'a, A: AdminAuditRepository + ?Sized> {
    pub repo: &'a A,
}

impl<'a, A: AdminAuditRepository + ?Sized> ListAudit<'a, A> {
    pub async fn execute(
        &self,
        actor: &AuthUser,
        filter: AuditFilter,
        page: PageRequest,
    ) -> ServiceResult<Page<AdminAudit>> {
        access::require_admin(actor)?;
        check_range(filter.from, filter.to)?;
        let (items, total) = self.repo.list(&filter, page).await?;
        Ok(Page::new(items, total, page))
    }
}

pub struct AuditHistory<'a, A: AdminAuditRepository + ?Sized> {
    pub repo: &'a A,
}

impl<'a, A: AdminAuditRepository + ?Sized> AuditHistory<'a, A> {
    pub async fn execute(
        &self,
        actor: &AuthUser,
        target_type: AuditTargetType,
        target_id: Uuid,
    ) -> ServiceResult<Vec<AdminAudit>> {
        access::require_admin(actor)?;
        Ok(self.repo.history(target_type, target_id).await?)
    }
}

pub struct GetAuditStats<'a, A: AdminAuditRepository + ?Sized> {
    pub repo: &'a A,
}

impl<'a, A: AdminAuditRepository + ?Sized> GetAuditStats<'a, A> {
    pub async fn execute(
        &self,
        actor: &AuthUser,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> ServiceResult<AuditStats> {
        access::require_admin(actor)?;
        check_range(from, to)?;
        Ok(self.repo.stats(from, to).await?)
    }
}
