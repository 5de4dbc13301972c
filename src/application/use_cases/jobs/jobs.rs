use uuid::Uuid;

use crate::application::access::{self, AuthUser};
use crate::application::errors::{ServiceError, ServiceResult};
use crate::application::ports::job_category_repository::JobCategoryRepository;
use crate::application::ports::job_repository::{JobFilter, JobPatch, JobRepository, NewJob};
use crate::application::services::validation::require_text;
use crate::domain::jobs::job::{Job, JobCategory, JobWithCount};

type Timestamp = chrono::DateTime<chrono::Utc>;

#[derive(Debug, Clone, Default)]
pub struct JobInput {
    pub name: Option<String>,
    pub location: Option<String>,
    pub category_id: Option<Uuid>,
    pub start_time: Option<Timestamp>,
    pub end_time: Option<Timestamp>,
    pub max_registrations: Option<i32>,
}

fn check_schedule(
    start: Option<Timestamp>,
    end: Option<Timestamp>,
    max_registrations: i32,
) -> ServiceResult<()> {
    if max_registrations <= 0 {
        return Err(ServiceError::bad_request(
            "max_registrations must be greater than zero",
        ));
    }
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(ServiceError::bad_request("end_time must not precede start_time"));
        }
    }
    Ok(())
}

async fn load_category<C: JobCategoryRepository + ?Sized>(
    categories: &C,
    id: Uuid,
) -> ServiceResult<JobCategory> {
    categories
        .get(id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Job category", id))
}

pub struct ListJobs<'a, R: JobRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: JobRepository + ?Sized> ListJobs<'a, R> {
    pub async fn execute(
        &self,
        actor: &AuthUser,
        category_id: Option<Uuid>,
    ) -> ServiceResult<Vec<JobWithCount>> {
        let filter = JobFilter {
            category_id,
            include_staff_only: actor.role.is_staff(),
        };
        Ok(self.repo.list(&filter).await?)
    }
}

pub struct GetJob<'a, R: JobRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: JobRepository + ?Sized> GetJob<'a, R> {
    pub async fn execute(&self, id: Uuid) -> ServiceResult<JobWithCount> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Job", id))
    }
}

pub struct CreateJob<'a, R, C>
where
    R: JobRepository + ?Sized,
    C: JobCategoryRepository + ?Sized,
{
    pub repo: &'a R,
    pub categories: &'a C,
}

impl<'a, R, C> CreateJob<'a, R, C>
where
    R: JobRepository + ?Sized,
    C: JobCategoryRepository + ?Sized,
{
    pub async fn execute(&self, actor: &AuthUser, input: JobInput) -> ServiceResult<Job> {
        access::require_admin(actor)?;
        let name = require_text("name", input.name.as_deref().unwrap_or_default())?;
        let category_id = input
            .category_id
            .ok_or_else(|| ServiceError::bad_request("category_id is required"))?;
        let max_registrations = input
            .max_registrations
            .ok_or_else(|| ServiceError::bad_request("max_registrations is required"))?;
        check_schedule(input.start_time, input.end_time, max_registrations)?;
        let category = load_category(self.categories, category_id).await?;
        let job = self
            .repo
            .create(&NewJob {
                name,
                location: input.location.unwrap_or_default().trim().to_string(),
                category_id,
                start_time: input.start_time,
                end_time: input.end_time,
                max_registrations,
                staff_only: category.staff_only,
                always_required: category.always_required,
            })
            .await?;
        Ok(job)
    }
}

pub struct UpdateJob<'a, R, C>
where
    R: JobRepository + ?Sized,
    C: JobCategoryRepository + ?Sized,
{
    pub repo: &'a R,
    pub categories: &'a C,
}

impl<'a, R, C> UpdateJob<'a, R, C>
where
    R: JobRepository + ?Sized,
    C: JobCategoryRepository + ?Sized,
{
    pub async fn execute(&self, actor: &AuthUser, id: Uuid, input: JobInput) -> ServiceResult<Job> {
        access::require_admin(actor)?;
        let existing = self
            .repo
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Job", id))?
            .job;
        check_schedule(
            input.start_time.or(existing.start_time),
            input.end_time.or(existing.end_time),
            input.max_registrations.unwrap_or(existing.max_registrations),
        )?;
        let category =
            load_category(self.categories, input.category_id.unwrap_or(existing.category_id))
                .await?;
        let patch = JobPatch {
            name: input
                .name
                .as_deref()
                .map(|n| require_text("name", n))
                .transpose()?,
            location: input.location.map(|l| l.trim().to_string()),
            category_id: input.category_id,
            start_time: input.start_time.map(Some),
            end_time: input.end_time.map(Some),
            max_registrations: input.max_registrations,
            staff_only: Some(category.staff_only),
            always_required: Some(category.always_required),
        };
        self.repo
            .update(id, &patch)
            .await?
            .ok_or_else(|| ServiceError::not_found("Job", id))
    }
}

pub struct DeleteJob<'a, R: JobRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: JobRepository + ?Sized> DeleteJob<'a, R> {
    pub async fn execute(&self, actor: &AuthUser, id: Uuid) -> ServiceResult<()> {
        access::require_admin(actor)?;
        if self.repo.get(id).await?.is_none() {
            return Err(ServiceError::not_found("Job", id));
        }
        if self.repo.count_registrations(id).await? > 0 {
            return Err(ServiceError::conflict(
                "job is referenced by registrations and cannot be deleted",
            ));
        }
        self.repo.delete(id).await?;
        Ok(())
    }
}
