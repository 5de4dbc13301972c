use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::jobs::job::JobCategory;

#[derive(Debug, Clone)]
pub struct NewJobCategory {
    pub name: String,
    pub description: String,
    pub staff_only: bool,
    pub always_required: bool,
}

#[derive(Debug, Clone, Default)]
pub struct JobCategoryPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub staff_only: Option<bool>,
    pub always_required: Option<bool>,
}

#[async_trait]
pub trait JobCategoryRepository: Send + Sync {
    async fn create(&self, category: &NewJobCategory) -> anyhow::Result<JobCategory>;
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<JobCategory>>;
    async fn get_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<JobCategory>>;
    async fn list(&self) -> anyhow::Result<Vec<JobCategory>>;
    /// Also copies `staff_only` / `always_required` onto the category's jobs.
    async fn update(
        &self,
        id: Uuid,
        patch: &JobCategoryPatch,
    ) -> anyhow::Result<Option<JobCategory>>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
    async fn count_jobs(&self, id: Uuid) -> anyhow::Result<i64>;
}
