use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::application::access::{self, AuthUser};
use crate::application::dto::settings::CampSettings;
use crate::application::errors::{ServiceError, ServiceResult};
use crate::application::ports::camping_option_repository::CampingOptionRepository;
use crate::application::ports::job_repository::JobRepository;
use crate::application::ports::notification_port::NotificationPort;
use crate::application::ports::registration_repository::{
    AdminRegistrationEdit, RegistrationRepository,
};
use crate::application::ports::user_repository::UserRepository;
use crate::application::services::notifications::{NotificationKind, notify_user};
use crate::application::services::validation::{clearable, optional_text};
use crate::domain::audit::admin_audit::{AuditActionType, AuditTargetType, NewAdminAudit};
use crate::domain::registrations::registration::{RegistrationDetail, RegistrationStatus};

#[derive(Debug, Clone, Default)]
pub struct AdminEditRequest {
    pub status: Option<RegistrationStatus>,
    /// Replaces the job set when present.
    pub job_ids: Option<Vec<Uuid>>,
    /// Replaces the camping option set when present.
    pub camping_option_ids: Option<Vec<Uuid>>,
    pub notes: Option<String>,
    pub reason: Option<String>,
    pub notify_user: bool,
}

/// Set difference in both directions, keeping the order of `wanted`.
fn diff_ids(current: &[Uuid], wanted: &[Uuid]) -> (Vec<Uuid>, Vec<Uuid>) {
    let current_set: HashSet<Uuid> = current.iter().copied().collect();
    let wanted_set: HashSet<Uuid> = wanted.iter().copied().collect();
    let added = wanted
        .iter()
        .copied()
        .filter(|id| !current_set.contains(id))
        .collect();
    let removed = current
        .iter()
        .copied()
        .filter(|id| !wanted_set.contains(id))
        .collect();
    (added, removed)
}

fn dedup(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Admin override of a registration. Capacity rules are not applied.
pub struct EditRegistration<'a, R, J, O, U, N>
where
    R: RegistrationRepository + ?Sized,
    J: JobRepository + ?Sized,
    O: CampingOptionRepository + ?Sized,
    U: UserRepository + ?Sized,
    N: NotificationPort + ?Sized,
{
    pub registrations: &'a R,
    pub jobs: &'a J,
    pub options: &'a O,
    pub users: &'a U,
    pub notifier: &'a N,
    pub settings: &'a CampSettings,
}

impl<'a, R, J, O, U, N> EditRegistration<'a, R, J, O, U, N>
where
    R: RegistrationRepository + ?Sized,
    J: JobRepository + ?Sized,
    O: CampingOptionRepository + ?Sized,
    U: UserRepository + ?Sized,
    N: NotificationPort + ?Sized,
{
    pub async fn execute(
        &self,
        actor: &AuthUser,
        id: Uuid,
        req: AdminEditRequest,
    ) -> ServiceResult<RegistrationDetail> {
        access::require_admin(actor)?;
        let current = self
            .registrations
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Registration", id))?;
        let transaction_id = Uuid::new_v4();
        let reason = optional_text(req.reason.clone());
        let audit = |action_type: AuditActionType,
                     old_values: Option<Value>,
                     new_values: Option<Value>| NewAdminAudit {
            actor_user_id: actor.id,
            action_type,
            target_record_type: AuditTargetType::Registration,
            target_record_id: id,
            old_values,
            new_values,
            reason: reason.clone(),
            transaction_id: Some(transaction_id),
        };
        let mut audits = Vec::new();

        let status = req.status.filter(|s| *s != current.registration.status);
        let notes = clearable(req.notes.clone()).filter(|n| *n != current.registration.notes);
        if status.is_some() || notes.is_some() {
            let mut old_values = Map::new();
            let mut new_values = Map::new();
            if let Some(new_status) = status {
                old_values.insert("status".into(), json!(current.registration.status));
                new_values.insert("status".into(), json!(new_status));
            }
            if let Some(new_notes) = &notes {
                old_values.insert("notes".into(), json!(current.registration.notes));
                new_values.insert("notes".into(), json!(new_notes));
            }
            audits.push(audit(
                AuditActionType::RegistrationEdit,
                Some(Value::Object(old_values)),
                Some(Value::Object(new_values)),
            ));
        }

        let (add_job_ids, remove_job_ids) = match req.job_ids.as_deref() {
            Some(wanted) => {
                let wanted = dedup(wanted);
                let names = self.job_names(&wanted).await?;
                let (added, removed) = diff_ids(&current.job_ids(), &wanted);
                for job_id in &added {
                    let snapshot = json!({ "job_id": job_id, "job_name": names.get(job_id) });
                    audits.push(audit(AuditActionType::WorkShiftAdd, None, Some(snapshot)));
                }
                for job_id in &removed {
                    let name = current
                        .jobs
                        .iter()
                        .find(|j| j.job_id == *job_id)
                        .map(|j| j.job_name.clone());
                    let snapshot = json!({ "job_id": job_id, "job_name": name });
                    audits.push(audit(AuditActionType::WorkShiftRemove, Some(snapshot), None));
                }
                (added, removed)
            }
            None => (Vec::new(), Vec::new()),
        };

        let (add_camping_option_ids, remove_camping_option_ids) =
            match req.camping_option_ids.as_deref() {
                Some(wanted) => {
                    let wanted = dedup(wanted);
                    let names = self.option_names(&wanted).await?;
                    let (added, removed) = diff_ids(&current.camping_option_ids(), &wanted);
                    for option_id in &added {
                        let snapshot = json!({
                            "camping_option_id": option_id,
                            "camping_option_name": names.get(option_id),
                        });
                        audits.push(audit(AuditActionType::CampingOptionAdd, None, Some(snapshot)));
                    }
                    for option_id in &removed {
                        let signup = current
                            .camping_options
                            .iter()
                            .find(|c| c.camping_option_id == *option_id);
                        let snapshot = json!({
                            "camping_option_id": option_id,
                            "camping_option_name": signup.map(|c| c.camping_option_name.clone()),
                            "field_values": signup.map(|c| c.field_values.clone()),
                        });
                        audits.push(audit(
                            AuditActionType::CampingOptionRemove,
                            Some(snapshot),
                            None,
                        ));
                    }
                    (added, removed)
                }
                None => (Vec::new(), Vec::new()),
            };

        if audits.is_empty() {
            return Ok(current);
        }
        let updated = self
            .registrations
            .apply_admin_edit(&AdminRegistrationEdit {
                registration_id: id,
                status,
                notes,
                add_job_ids,
                remove_job_ids,
                add_camping_option_ids,
                remove_camping_option_ids,
                audits,
            })
            .await?;
        tracing::info!(
            registration_id = %id,
            actor = %actor.id,
            transaction_id = %transaction_id,
            "registration_admin_edit"
        );

        if req.notify_user {
            if let Some(user) = self.users.find_by_id(updated.registration.user_id).await? {
                notify_user(
                    self.notifier,
                    self.settings,
                    &user,
                    updated.registration.year,
                    NotificationKind::RegistrationModified,
                    reason.map(|r| format!("Reason: {r}")),
                )
                .await;
            }
        }
        Ok(updated)
    }

    async fn job_names(&self, ids: &[Uuid]) -> ServiceResult<HashMap<Uuid, String>> {
        let found: HashMap<Uuid, String> = self
            .jobs
            .get_many(ids)
            .await?
            .into_iter()
            .map(|j| (j.job.id, j.job.name))
            .collect();
        if let Some(missing) = ids.iter().find(|id| !found.contains_key(id)) {
            return Err(ServiceError::not_found("Job", *missing));
        }
        Ok(found)
    }

    async fn option_names(&self, ids: &[Uuid]) -> ServiceResult<HashMap<Uuid, String>> {
        let found: HashMap<Uuid, String> = self
            .options
            .get_many(ids)
            .await?
            .into_iter()
            .map(|d| (d.option.id, d.option.name))
            .collect();
        if let Some(missing) = ids.iter().find(|id| !found.contains_key(id)) {
            return Err(ServiceError::not_found("Camping option", *missing));
        }
        Ok(found)
    }
}
