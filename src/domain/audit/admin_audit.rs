use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::payments::payment::{Payment, PaymentStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditActionType {
    RegistrationEdit,
    RegistrationCancel,
    WorkShiftAdd,
    WorkShiftRemove,
    CampingOptionAdd,
    CampingOptionRemove,
    PaymentRefund,
    UserUpdate,
}

impl AuditActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditActionType::RegistrationEdit => "REGISTRATION_EDIT",
            AuditActionType::RegistrationCancel => "REGISTRATION_CANCEL",
            AuditActionType::WorkShiftAdd => "WORK_SHIFT_ADD",
            AuditActionType::WorkShiftRemove => "WORK_SHIFT_REMOVE",
            AuditActionType::CampingOptionAdd => "CAMPING_OPTION_ADD",
            AuditActionType::CampingOptionRemove => "CAMPING_OPTION_REMOVE",
            AuditActionType::PaymentRefund => "PAYMENT_REFUND",
            AuditActionType::UserUpdate => "USER_UPDATE",
        }
    }
}

impl FromStr for AuditActionType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REGISTRATION_EDIT" => Ok(AuditActionType::RegistrationEdit),
            "REGISTRATION_CANCEL" => Ok(AuditActionType::RegistrationCancel),
            "WORK_SHIFT_ADD" => Ok(AuditActionType::WorkShiftAdd),
            "WORK_SHIFT_REMOVE" => Ok(AuditActionType::WorkShiftRemove),
            "CAMPING_OPTION_ADD" => Ok(AuditActionType::CampingOptionAdd),
            "CAMPING_OPTION_REMOVE" => Ok(AuditActionType::CampingOptionRemove),
            "PAYMENT_REFUND" => Ok(AuditActionType::PaymentRefund),
            "USER_UPDATE" => Ok(AuditActionType::UserUpdate),
            other => anyhow::bail!("unknown audit action type: {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditTargetType {
    Registration,
    User,
    Payment,
    CampingOption,
    Job,
}

impl AuditTargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditTargetType::Registration => "REGISTRATION",
            AuditTargetType::User => "USER",
            AuditTargetType::Payment => "PAYMENT",
            AuditTargetType::CampingOption => "CAMPING_OPTION",
            AuditTargetType::Job => "JOB",
        }
    }
}

impl FromStr for AuditTargetType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REGISTRATION" => Ok(AuditTargetType::Registration),
            "USER" => Ok(AuditTargetType::User),
            "PAYMENT" => Ok(AuditTargetType::Payment),
            "CAMPING_OPTION" => Ok(AuditTargetType::CampingOption),
            "JOB" => Ok(AuditTargetType::Job),
            other => anyhow::bail!("unknown audit target type: {other}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdminAudit {
    pub id: Uuid,
    pub actor_user_id: Uuid,
    pub action_type: AuditActionType,
    pub target_record_type: AuditTargetType,
    pub target_record_id: Uuid,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub reason: Option<String>,
    /// Shared by every row written by one multi-step admin operation.
    pub transaction_id: Option<Uuid>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Audit row before it has been persisted.
#[derive(Debug, Clone)]
pub struct NewAdminAudit {
    pub actor_user_id: Uuid,
    pub action_type: AuditActionType,
    pub target_record_type: AuditTargetType,
    pub target_record_id: Uuid,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub reason: Option<String>,
    pub transaction_id: Option<Uuid>,
}

impl NewAdminAudit {
    /// PAYMENT_REFUND row for a payment refunded as part of this entry's operation.
    pub fn refund_of(&self, payment: &Payment) -> NewAdminAudit {
        NewAdminAudit {
            actor_user_id: self.actor_user_id,
            action_type: AuditActionType::PaymentRefund,
            target_record_type: AuditTargetType::Payment,
            target_record_id: payment.id,
            old_values: Some(json!({ "status": PaymentStatus::Completed })),
            new_values: Some(json!({
                "status": PaymentStatus::Refunded,
                "amount_cents": payment.amount_cents,
                "registration_id": payment.registration_id,
            })),
            reason: self.reason.clone(),
            transaction_id: self.transaction_id,
        }
    }
}
