use uuid::Uuid;

use crate::application::access::{self, AuthUser};
use crate::application::errors::{ServiceError, ServiceResult};
use crate::application::ports::job_category_repository::{
    JobCategoryPatch, JobCategoryRepository, NewJobCategory,
};
use crate::application::services::validation::require_text;
use crate::domain::jobs::job::JobCategory;

#[derive(Debug, Clone, Default)]
pub struct JobCategoryInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub staff_only: Option<bool>,
    pub always_required: Option<bool>,
}

pub struct ListJobCategories<'a, R: JobCategoryRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: JobCategoryRepository + ?Sized> ListJobCategories<'a, R> {
    pub async fn execute(&self) -> ServiceResult<Vec<JobCategory>> {
        Ok(self.repo.list().await?)
    }
}

pub struct GetJobCategory<'a, R: JobCategoryRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: JobCategoryRepository + ?Sized> GetJobCategory<'a, R> {
    pub async fn execute(&self, id: Uuid) -> ServiceResult<JobCategory> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Job category", id))
    }
}

pub struct CreateJobCategory<'a, R: JobCategoryRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: JobCategoryRepository + ?Sized> CreateJobCategory<'a, R> {
    pub async fn execute(
        &self,
        actor: &AuthUser,
        input: JobCategoryInput,
    ) -> ServiceResult<JobCategory> {
        access::require_admin(actor)?;
        let name = require_text("name", input.name.as_deref().unwrap_or_default())?;
        let category = self
            .repo
            .create(&NewJobCategory {
                name,
                description: input.description.unwrap_or_default().trim().to_string(),
                staff_only: input.staff_only.unwrap_or(false),
                always_required: input.always_required.unwrap_or(false),
            })
            .await?;
        Ok(category)
    }
}

pub struct UpdateJobCategory<'a, R: JobCategoryRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: JobCategoryRepository + ?Sized> UpdateJobCategory<'a, R> {
    pub async fn execute(
        &self,
        actor: &AuthUser,
        id: Uuid,
        input: JobCategoryInput,
    ) -> ServiceResult<JobCategory> {
        access::require_admin(actor)?;
        let patch = JobCategoryPatch {
            name: input
                .name
                .as_deref()
                .map(|n| require_text("name", n))
                .transpose()?,
            description: input.description.map(|d| d.trim().to_string()),
            staff_only: input.staff_only,
            always_required: input.always_required,
        };
        self.repo
            .update(id, &patch)
            .await?
            .ok_or_else(|| ServiceError::not_found("Job category", id))
    }
}

pub struct DeleteJobCategory<'a, R: JobCategoryRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: JobCategoryRepository + ?Sized> DeleteJobCategory<'a, R> {
    pub async fn execute(&self, actor: &AuthUser, id: Uuid) -> ServiceResult<()> {
        access::require_admin(actor)?;
        if self.repo.get(id).await?.is_none() {
            return Err(ServiceError::not_found("Job category", id));
        }
        let jobs = self.repo.count_jobs(id).await?;
        if jobs > 0 {
            return Err(ServiceError::conflict(format!(
                "job category still has {jobs} job(s)"
            )));
        }
        self.repo.delete(id).await?;
        Ok(())
    }
}
