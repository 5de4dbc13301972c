use async_trait::async_trait;
use uuid::Uuid;

use crate::application::dto::pagination::PageRequest;
use crate::domain::audit::admin_audit::NewAdminAudit;
use crate::domain::payments::payment::{Payment, PaymentProvider, PaymentStatus};

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub user_id: Uuid,
    pub registration_id: Option<Uuid>,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub provider: PaymentProvider,
    pub provider_ref: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PaymentPatch {
    pub status: Option<PaymentStatus>,
    pub provider_ref: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    pub user_id: Option<Uuid>,
    pub registration_id: Option<Uuid>,
    pub status: Option<PaymentStatus>,
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create(&self, payment: &NewPayment) -> anyhow::Result<Payment>;
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Payment>>;
    async fn list(
        &self,
        filter: &PaymentFilter,
        page: PageRequest,
    ) -> anyhow::Result<(Vec<Payment>, i64)>;
    async fn list_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Payment>>;
    async fn list_for_registration(&self, registration_id: Uuid) -> anyhow::Result<Vec<Payment>>;
    async fn update(&self, id: Uuid, patch: &PaymentPatch) -> anyhow::Result<Option<Payment>>;
    /// Marks a COMPLETED payment REFUNDED and writes the audit row in the same transaction.
    /// `None` when the payment is missing or not COMPLETED.
    async fn refund(&self, id: Uuid, audit: &NewAdminAudit) -> anyhow::Result<Option<Payment>>;
}
