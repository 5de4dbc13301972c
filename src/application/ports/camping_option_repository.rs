use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::camping::camping_option::{CampingOption, CampingOptionDetail};

#[derive(Debug, Clone)]
pub struct NewCampingOption {
    pub name: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub work_shifts_required: i32,
    pub participant_dues: i64,
    pub staff_dues: i64,
    pub max_signups: i32,
    pub job_category_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct CampingOptionPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub enabled: Option<bool>,
    pub work_shifts_required: Option<i32>,
    pub participant_dues: Option<i64>,
    pub staff_dues: Option<i64>,
    pub max_signups: Option<i32>,
    /// Replaces the whole category set when present.
    pub job_category_ids: Option<Vec<Uuid>>,
}

#[async_trait]
pub trait CampingOptionRepository: Send + Sync {
    async fn create(&self, option: &NewCampingOption) -> anyhow::Result<CampingOption>;
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<CampingOptionDetail>>;
    async fn get_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<CampingOptionDetail>>;
    async fn list(&self, include_disabled: bool) -> anyhow::Result<Vec<CampingOptionDetail>>;
    async fn update(
        &self,
        id: Uuid,
        patch: &CampingOptionPatch,
    ) -> anyhow::Result<Option<CampingOption>>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
    /// Registrations of any status linked to the option.
    async fn count_registrations(&self, id: Uuid) -> anyhow::Result<i64>;
}
