use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::camping::camping_option::{CampingOptionField, FieldDataType};

#[derive(Debug, Clone)]
pub struct NewCampingOptionField {
    pub camping_option_id: Uuid,
    pub display_name: String,
    pub description: Option<String>,
    pub data_type: FieldDataType,
    pub required: bool,
    pub max_length: Option<i32>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct CampingOptionFieldPatch {
    pub display_name: Option<String>,
    pub description: Option<Option<String>>,
    pub data_type: Option<FieldDataType>,
    pub required: Option<bool>,
    pub max_length: Option<Option<i32>>,
    pub min_value: Option<Option<f64>>,
    pub max_value: Option<Option<f64>>,
}

#[async_trait]
pub trait CampingOptionFieldRepository: Send + Sync {
    /// Ordered by ordinal.
    async fn list(&self, camping_option_id: Uuid) -> anyhow::Result<Vec<CampingOptionField>>;
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<CampingOptionField>>;
    /// Appends the field after the option's current last ordinal.
    async fn create(&self, field: &NewCampingOptionField) -> anyhow::Result<CampingOptionField>;
    async fn update(
        &self,
        id: Uuid,
        patch: &CampingOptionFieldPatch,
    ) -> anyhow::Result<Option<CampingOptionField>>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
    /// Rewrites ordinals to the position of each id in `ordered_ids`.
    async fn reorder(&self, camping_option_id: Uuid, ordered_ids: &[Uuid]) -> anyhow::Result<()>;
}
