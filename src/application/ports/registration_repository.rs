use async_trait::async_trait;
use uuid::Uuid;

use crate::application::dto::pagination::PageRequest;
use crate::domain::audit::admin_audit::NewAdminAudit;
use crate::domain::payments::payment::Payment;
use crate::domain::registrations::registration::{
    Registration, RegistrationDetail, RegistrationStatus,
};

#[derive(Debug, Clone)]
pub struct NewCampingOptionSignup {
    pub camping_option_id: Uuid,
    pub field_values: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct NewRegistration {
    pub user_id: Uuid,
    pub year: i32,
    pub status: RegistrationStatus,
    pub job_ids: Vec<Uuid>,
    pub camping_options: Vec<NewCampingOptionSignup>,
}

#[derive(Debug, Clone, Default)]
pub struct RegistrationFilter {
    pub year: Option<i32>,
    pub status: Option<RegistrationStatus>,
    pub user_id: Option<Uuid>,
}

/// Everything one admin edit writes, applied atomically.
#[derive(Debug, Clone)]
pub struct AdminRegistrationEdit {
    pub registration_id: Uuid,
    pub status: Option<RegistrationStatus>,
    pub notes: Option<Option<String>>,
    pub add_job_ids: Vec<Uuid>,
    pub remove_job_ids: Vec<Uuid>,
    pub add_camping_option_ids: Vec<Uuid>,
    pub remove_camping_option_ids: Vec<Uuid>,
    pub audits: Vec<NewAdminAudit>,
}

/// Everything one admin cancellation writes, applied atomically.
#[derive(Debug, Clone)]
pub struct AdminRegistrationCancel {
    pub registration_id: Uuid,
    /// COMPLETED payments to mark REFUNDED.
    pub refund_payment_ids: Vec<Uuid>,
    /// REGISTRATION_CANCEL row. Each payment actually refunded gets a PAYMENT_REFUND row
    /// derived from it.
    pub audit: NewAdminAudit,
}

#[async_trait]
pub trait RegistrationRepository: Send + Sync {
    async fn find_for_user_year(
        &self,
        user_id: Uuid,
        year: i32,
    ) -> anyhow::Result<Option<Registration>>;
    /// Inserts the registration with its job and camping option links in one transaction.
    async fn create(&self, registration: &NewRegistration) -> anyhow::Result<RegistrationDetail>;
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<RegistrationDetail>>;
    /// Newest year first.
    async fn list_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<RegistrationDetail>>;
    async fn list(
        &self,
        filter: &RegistrationFilter,
        page: PageRequest,
    ) -> anyhow::Result<(Vec<RegistrationDetail>, i64)>;
    async fn update(
        &self,
        id: Uuid,
        status: Option<RegistrationStatus>,
        notes: Option<Option<String>>,
    ) -> anyhow::Result<Option<Registration>>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
    async fn count_by_status(&self, year: i32) -> anyhow::Result<Vec<(RegistrationStatus, i64)>>;
    async fn apply_admin_edit(
        &self,
        edit: &AdminRegistrationEdit,
    ) -> anyhow::Result<RegistrationDetail>;
    /// Returns the cancelled registration and the payments that were refunded.
    async fn apply_admin_cancel(
        &self,
        cancel: &AdminRegistrationCancel,
    ) -> anyhow::Result<(Registration, Vec<Payment>)>;
}
