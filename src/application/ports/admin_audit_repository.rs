use async_trait::async_trait;
use uuid::Uuid;

use crate::application::dto::pagination::PageRequest;
use crate::domain::audit::admin_audit::{
    AdminAudit, AuditActionType, AuditTargetType, NewAdminAudit,
};

#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub actor_user_id: Option<Uuid>,
    pub action_type: Option<AuditActionType>,
    pub target_record_type: Option<AuditTargetType>,
    pub target_record_id: Option<Uuid>,
    pub from: Option<chrono::DateTime<chrono::Utc>>,
    pub to: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone)]
pub struct ActorCount {
    pub actor_user_id: Uuid,
    pub actor_email: Option<String>,
    pub count: i64,
}

#[derive(Debug, Clone)]
pub struct AuditStats {
    pub total: i64,
    pub by_action: Vec<(AuditActionType, i64)>,
    pub by_actor: Vec<ActorCount>,
}

#[async_trait]
pub trait AdminAuditRepository: Send + Sync {
    async fn record(&self, entry: &NewAdminAudit) -> anyhow::Result<AdminAudit>;
    /// Newest first.
    async fn list(
        &self,
        filter: &AuditFilter,
        page: PageRequest,
    ) -> anyhow::Result<(Vec<AdminAudit>, i64)>;
    /// Oldest first.
    async fn history(
        &self,
        target_type: AuditTargetType,
        target_id: Uuid,
    ) -> anyhow::Result<Vec<AdminAudit>>;
    /// Grouped counts, largest first.
    async fn stats(
        &self,
        from: Option<chrono::DateTime<chrono::Utc>>,
        to: Option<chrono::DateTime<chrono::Utc>>,
    ) -> anyhow::Result<AuditStats>;
}
