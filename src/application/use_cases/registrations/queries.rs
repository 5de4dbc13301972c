use uuid::Uuid;

use crate::application::access::{self, AuthUser};
use crate::application::dto::pagination::{Page, PageRequest};
use crate::application::errors::{ServiceError, ServiceResult};
use crate::application::ports::registration_repository::{
    RegistrationFilter, RegistrationRepository,
};
use crate::domain::registrations::registration::{RegistrationDetail, RegistrationStatus};

pub struct GetRegistration<'a, R: RegistrationRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: RegistrationRepository + ?Sized> GetRegistration<'a, R> {
    pub async fn execute(&self, actor: &AuthUser, id: Uuid) -> ServiceResult<RegistrationDetail> {
        let detail = self
            .repo
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Registration", id))?;
        access::require_owner_or_staff(actor, detail.registration.user_id)?;
        Ok(detail)
    }
}

pub struct MyRegistrations<'a, R: RegistrationRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: RegistrationRepository + ?Sized> MyRegistrations<'a, R> {
    pub async fn execute(&self, actor: &AuthUser) -> ServiceResult<Vec<RegistrationDetail>> {
        Ok(self.repo.list_for_user(actor.id).await?)
    }
}

pub struct ListRegistrations<'a, R: RegistrationRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: RegistrationRepository + ?Sized> ListRegistrations<'a, R> {
    pub async fn execute(
        &self,
        actor: &AuthUser,
        filter: RegistrationFilter,
        page: PageRequest,
    ) -> ServiceResult<Page<RegistrationDetail>> {
        access::require_staff(actor)?;
        let (items, total) = self.repo.list(&filter, page).await?;
        Ok(Page::new(items, total, page))
    }
}

#[derive(Debug, Clone)]
pub struct RegistrationSummary {
    pub year: i32,
    pub total: i64,
    /// One entry per status, zero counts included.
    pub by_status: Vec<(RegistrationStatus, i64)>,
}

pub struct SummarizeRegistrations<'a, R: RegistrationRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: RegistrationRepository + ?Sized> SummarizeRegistrations<'a, R> {
    pub async fn execute(&self, actor: &AuthUser, year: i32) -> ServiceResult<RegistrationSummary> {
        access::require_staff(actor)?;
        let counts = self.repo.count_by_status(year).await?;
        let by_status: Vec<(RegistrationStatus, i64)> = RegistrationStatus::ALL
            .iter()
            .map(|status| {
                let n = counts
                    .iter()
                    .find(|(s, _)| s == status)
                    .map(|(_, n)| *n)
                    .unwrap_or(0);
                (*status, n)
            })
            .collect();
        Ok(RegistrationSummary {
            year,
            total: by_status.iter().map(|(_, n)| n).sum(),
            by_status,
        })
    }
}
