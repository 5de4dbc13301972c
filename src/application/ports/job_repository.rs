use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::jobs::job::{Job, JobWithCount};

#[derive(Debug, Clone)]
pub struct NewJob {
    pub name: String,
    pub location: String,
    pub category_id: Uuid,
    pub start_time: Option<chrono::DateTime<chrono::Utc>>,
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
    pub max_registrations: i32,
    pub staff_only: bool,
    pub always_required: bool,
}

#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    pub name: Option<String>,
    pub location: Option<String>,
    pub category_id: Option<Uuid>,
    pub start_time: Option<Option<chrono::DateTime<chrono::Utc>>>,
    pub end_time: Option<Option<chrono::DateTime<chrono::Utc>>>,
    pub max_registrations: Option<i32>,
    pub staff_only: Option<bool>,
    pub always_required: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub category_id: Option<Uuid>,
    pub include_staff_only: bool,
}

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn create(&self, job: &NewJob) -> anyhow::Result<Job>;
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<JobWithCount>>;
    async fn get_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<JobWithCount>>;
    async fn list(&self, filter: &JobFilter) -> anyhow::Result<Vec<JobWithCount>>;
    async fn update(&self, id: Uuid, patch: &JobPatch) -> anyhow::Result<Option<Job>>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
    /// Registrations of any status referencing the job.
    async fn count_registrations(&self, id: Uuid) -> anyhow::Result<i64>;
}
