use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::application::access::AuthUser;
use crate::application::dto::pagination::PageRequest;
use crate::application::dto::settings::CampSettings;
use crate::application::errors::{DuplicateKey, StillReferenced};
use crate::application::ports::admin_audit_repository::{
    ActorCount, AdminAuditRepository, AuditFilter, AuditStats,
};
use crate::application::ports::camping_option_field_repository::{
    CampingOptionFieldPatch, CampingOptionFieldRepository, NewCampingOptionField,
};
use crate::application::ports::camping_option_repository::{
    CampingOptionPatch, CampingOptionRepository, NewCampingOption,
};
use crate::application::ports::job_category_repository::{
    JobCategoryPatch, JobCategoryRepository, NewJobCategory,
};
use crate::application::ports::job_repository::{JobFilter, JobPatch, JobRepository, NewJob};
use crate::application::ports::notification_port::NotificationPort;
use crate::application::ports::payment_repository::{
    NewPayment, PaymentFilter, PaymentPatch, PaymentRepository,
};
use crate::application::ports::registration_repository::{
    AdminRegistrationCancel, AdminRegistrationEdit, NewCampingOptionSignup, NewRegistration,
    RegistrationFilter, RegistrationRepository,
};
use crate::application::ports::user_repository::{
    NewUser, UserCredentials, UserFilter, UserPatch, UserRepository,
};
use crate::application::services::notifications::Notification;
use crate::domain::audit::admin_audit::{AdminAudit, AuditActionType, AuditTargetType, NewAdminAudit};
use crate::domain::camping::camping_option::{
    CampingOption, CampingOptionDetail, CampingOptionField, FieldDataType,
};
use crate::domain::jobs::job::{Job, JobCategory, JobWithCount};
use crate::domain::payments::payment::{Payment, PaymentProvider, PaymentStatus};
use crate::domain::registrations::registration::{
    CampingOptionRegistration, Registration, RegistrationDetail, RegistrationJobLink,
    RegistrationStatus,
};
use crate::domain::users::user::{User, UserRole};

pub fn sample_user(email: &str, role: UserRole) -> User {
    let now = Utc::now();
    let local = email.split('@').next().unwrap_or(email);
    User {
        id: Uuid::new_v4(),
        email: email.to_lowercase(),
        first_name: local.to_string(),
        last_name: "Tester".into(),
        playa_name: None,
        phone: None,
        city: None,
        state_province: None,
        country: None,
        emergency_contact: None,
        role,
        is_email_verified: false,
        allow_registration: true,
        allow_early_registration: false,
        allow_deferred_dues_payment: false,
        allow_no_job: false,
        internal_notes: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn auth_user(user: &User) -> AuthUser {
    AuthUser::from(user)
}

/// Registration open for 2026.
pub fn open_settings() -> CampSettings {
    CampSettings {
        camp_name: "Camp".into(),
        registration_year: 2026,
        registration_open: true,
        early_registration_open: false,
    }
}

fn page_slice<T: Clone>(items: &[T], page: PageRequest) -> Vec<T> {
    items
        .iter()
        .skip(page.offset as usize)
        .take(page.limit as usize)
        .cloned()
        .collect()
}

fn duplicate(constraint: &str) -> anyhow::Error {
    anyhow::Error::new(DuplicateKey {
        constraint: constraint.into(),
    })
}

#[derive(Default)]
struct State {
    users: Vec<(User, Option<String>)>,
    categories: Vec<JobCategory>,
    jobs: Vec<Job>,
    options: Vec<CampingOption>,
    fields: Vec<CampingOptionField>,
    registrations: Vec<Registration>,
    /// (registration_id, job_id)
    registration_jobs: Vec<(Uuid, Uuid)>,
    /// (registration_id, camping_option_id, field_values)
    signups: Vec<(Uuid, Uuid, Value)>,
    payments: Vec<Payment>,
    /// Insertion order.
    audits: Vec<AdminAudit>,
}

impl State {
    fn occupying(&self, registration_id: Uuid) -> bool {
        self.registrations
            .iter()
            .any(|r| r.id == registration_id && r.status.occupies_capacity())
    }

    fn job_with_count(&self, job: &Job) -> JobWithCount {
        let registration_count = self
            .registration_jobs
            .iter()
            .filter(|(reg, job_id)| *job_id == job.id && self.occupying(*reg))
            .count() as i64;
        JobWithCount {
            job: job.clone(),
            registration_count,
        }
    }

    fn option_detail(&self, option: &CampingOption) -> CampingOptionDetail {
        let mut fields: Vec<CampingOptionField> = self
            .fields
            .iter()
            .filter(|f| f.camping_option_id == option.id)
            .cloned()
            .collect();
        fields.sort_by_key(|f| f.ordinal);
        let current_signups = self
            .signups
            .iter()
            .filter(|(reg, option_id, _)| *option_id == option.id && self.occupying(*reg))
            .count() as i64;
        CampingOptionDetail {
            option: option.clone(),
            fields,
            current_signups,
        }
    }

    fn registration_detail(&self, registration: &Registration) -> RegistrationDetail {
        let jobs = self
            .registration_jobs
            .iter()
            .filter(|(reg, _)| *reg == registration.id)
            .filter_map(|(_, job_id)| self.jobs.iter().find(|j| j.id == *job_id))
            .map(|job| RegistrationJobLink {
                job_id: job.id,
                job_name: job.name.clone(),
                category_id: job.category_id,
                start_time: job.start_time,
                end_time: job.end_time,
            })
            .collect();
        let camping_options = self
            .signups
            .iter()
            .filter(|(reg, _, _)| *reg == registration.id)
            .filter_map(|(_, option_id, values)| {
                self.options
                    .iter()
                    .find(|o| o.id == *option_id)
                    .map(|o| CampingOptionRegistration {
                        camping_option_id: o.id,
                        camping_option_name: o.name.clone(),
                        field_values: values.clone(),
                    })
            })
            .collect();
        RegistrationDetail {
            registration: registration.clone(),
            jobs,
            camping_options,
        }
    }

    fn patch_user(&mut self, id: Uuid, patch: &UserPatch) -> anyhow::Result<Option<User>> {
        if let Some(email) = &patch.email {
            if self
                .users
                .iter()
                .any(|(u, _)| u.id != id && u.email.eq_ignore_ascii_case(email))
            {
                return Err(duplicate("users_email_lower_idx"));
            }
        }
        let Some((user, _)) = self.users.iter_mut().find(|(u, _)| u.id == id) else {
            return Ok(None);
        };
        if let Some(v) = &patch.email {
            user.email = v.clone();
        }
        if let Some(v) = &patch.first_name {
            user.first_name = v.clone();
        }
        if let Some(v) = &patch.last_name {
            user.last_name = v.clone();
        }
        if let Some(v) = &patch.playa_name {
            user.playa_name = v.clone();
        }
        if let Some(v) = &patch.phone {
            user.phone = v.clone();
        }
        if let Some(v) = &patch.city {
            user.city = v.clone();
        }
        if let Some(v) = &patch.state_province {
            user.state_province = v.clone();
        }
        if let Some(v) = &patch.country {
            user.country = v.clone();
        }
        if let Some(v) = &patch.emergency_contact {
            user.emergency_contact = v.clone();
        }
        if let Some(v) = patch.role {
            user.role = v;
        }
        if let Some(v) = patch.is_email_verified {
            user.is_email_verified = v;
        }
        if let Some(v) = patch.allow_registration {
            user.allow_registration = v;
        }
        if let Some(v) = patch.allow_early_registration {
            user.allow_early_registration = v;
        }
        if let Some(v) = patch.allow_deferred_dues_payment {
            user.allow_deferred_dues_payment = v;
        }
        if let Some(v) = patch.allow_no_job {
            user.allow_no_job = v;
        }
        if let Some(v) = &patch.internal_notes {
            user.internal_notes = v.clone();
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    fn push_audit(&mut self, entry: &NewAdminAudit) -> AdminAudit {
        let audit = AdminAudit {
            id: Uuid::new_v4(),
            actor_user_id: entry.actor_user_id,
            action_type: entry.action_type,
            target_record_type: entry.target_record_type,
            target_record_id: entry.target_record_id,
            old_values: entry.old_values.clone(),
            new_values: entry.new_values.clone(),
            reason: entry.reason.clone(),
            transaction_id: entry.transaction_id,
            created_at: Utc::now(),
        };
        self.audits.push(audit.clone());
        audit
    }

    fn set_registration_status(
        &mut self,
        id: Uuid,
        status: Option<RegistrationStatus>,
        notes: Option<Option<String>>,
    ) -> Option<Registration> {
        let reg = self.registrations.iter_mut().find(|r| r.id == id)?;
        if let Some(status) = status {
            reg.status = status;
        }
        if let Some(notes) = notes {
            reg.notes = notes;
        }
        reg.updated_at = Utc::now();
        Some(reg.clone())
    }
}

/// Implements every repository port over plain vectors.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub async fn seed_user(&self, email: &str, role: UserRole) -> User {
        let user = sample_user(email, role);
        self.lock().users.push((user.clone(), None));
        user
    }

    pub async fn seed_category(
        &self,
        name: &str,
        staff_only: bool,
        always_required: bool,
    ) -> JobCategory {
        JobCategoryRepository::create(
            self,
            &NewJobCategory {
                name: name.into(),
                description: String::new(),
                staff_only,
                always_required,
            },
        )
        .await
        .unwrap()
    }

    /// Copies the category flags like the job use cases do.
    pub async fn seed_job(&self, category_id: Uuid, name: &str, max_registrations: i32) -> Job {
        let category = JobCategoryRepository::get(self, category_id)
            .await
            .unwrap()
            .unwrap();
        JobRepository::create(
            self,
            &NewJob {
                name: name.into(),
                location: "Camp".into(),
                category_id,
                start_time: None,
                end_time: None,
                max_registrations,
                staff_only: category.staff_only,
                always_required: category.always_required,
            },
        )
        .await
        .unwrap()
    }

    /// Enabled option with `participant_dues` and no staff dues.
    pub async fn seed_option(
        &self,
        name: &str,
        participant_dues: i64,
        max_signups: i32,
        job_category_ids: &[Uuid],
    ) -> CampingOption {
        CampingOptionRepository::create(
            self,
            &NewCampingOption {
                name: name.into(),
                description: None,
                enabled: true,
                work_shifts_required: 0,
                participant_dues,
                staff_dues: 0,
                max_signups,
                job_category_ids: job_category_ids.to_vec(),
            },
        )
        .await
        .unwrap()
    }

    pub async fn set_option_enabled(&self, id: Uuid, enabled: bool) {
        CampingOptionRepository::update(
            self,
            id,
            &CampingOptionPatch {
                enabled: Some(enabled),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    }

    pub async fn set_work_shifts_required(&self, id: Uuid, work_shifts_required: i32) {
        CampingOptionRepository::update(
            self,
            id,
            &CampingOptionPatch {
                work_shifts_required: Some(work_shifts_required),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    }

    pub async fn seed_field(
        &self,
        camping_option_id: Uuid,
        display_name: &str,
        data_type: FieldDataType,
        required: bool,
    ) -> CampingOptionField {
        CampingOptionFieldRepository::create(
            self,
            &NewCampingOptionField {
                camping_option_id,
                display_name: display_name.into(),
                description: None,
                data_type,
                required,
                max_length: None,
                min_value: None,
                max_value: None,
            },
        )
        .await
        .unwrap()
    }

    async fn seed_confirmed(
        &self,
        user_id: Uuid,
        year: i32,
        job_ids: Vec<Uuid>,
        option_ids: Vec<Uuid>,
    ) -> Registration {
        RegistrationRepository::create(
            self,
            &NewRegistration {
                user_id,
                year,
                status: RegistrationStatus::Confirmed,
                job_ids,
                camping_options: option_ids
                    .into_iter()
                    .map(|camping_option_id| NewCampingOptionSignup {
                        camping_option_id,
                        field_values: json!({}),
                    })
                    .collect(),
            },
        )
        .await
        .unwrap()
        .registration
    }

    /// CONFIRMED registration without links.
    pub async fn seed_registration(&self, user_id: Uuid, year: i32) -> Registration {
        self.seed_confirmed(user_id, year, Vec::new(), Vec::new()).await
    }

    pub async fn seed_registration_with_job(
        &self,
        user_id: Uuid,
        year: i32,
        job_id: Uuid,
    ) -> Registration {
        self.seed_confirmed(user_id, year, vec![job_id], Vec::new()).await
    }

    pub async fn seed_registration_with_option(
        &self,
        user_id: Uuid,
        year: i32,
        camping_option_id: Uuid,
    ) -> Registration {
        self.seed_confirmed(user_id, year, Vec::new(), vec![camping_option_id])
            .await
    }

    pub async fn set_registration_status(&self, id: Uuid, status: RegistrationStatus) {
        self.lock().set_registration_status(id, Some(status), None);
    }

    pub async fn seed_payment(
        &self,
        user_id: Uuid,
        registration_id: Option<Uuid>,
        amount_cents: i64,
        status: PaymentStatus,
    ) -> Payment {
        PaymentRepository::create(
            self,
            &NewPayment {
                user_id,
                registration_id,
                amount_cents,
                currency: "USD".into(),
                status,
                provider: PaymentProvider::Manual,
                provider_ref: None,
                notes: None,
            },
        )
        .await
        .unwrap()
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create_user(&self, user: &NewUser) -> anyhow::Result<User> {
        let mut state = self.lock();
        if state
            .users
            .iter()
            .any(|(u, _)| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(duplicate("users_email_lower_idx"));
        }
        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            playa_name: user.playa_name.clone(),
            phone: user.phone.clone(),
            city: user.city.clone(),
            state_province: user.state_province.clone(),
            country: user.country.clone(),
            emergency_contact: user.emergency_contact.clone(),
            role: user.role,
            is_email_verified: user.is_email_verified,
            allow_registration: user.allow_registration,
            allow_early_registration: user.allow_early_registration,
            allow_deferred_dues_payment: user.allow_deferred_dues_payment,
            allow_no_job: user.allow_no_job,
            internal_notes: user.internal_notes.clone(),
            created_at: now,
            updated_at: now,
        };
        state
            .users
            .push((created.clone(), user.password_hash.clone()));
        Ok(created)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|(u, _)| u.email.eq_ignore_ascii_case(email))
            .map(|(u, _)| u.clone()))
    }

    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> anyhow::Result<Option<UserCredentials>> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|(u, _)| u.email.eq_ignore_ascii_case(email))
            .map(|(u, hash)| UserCredentials {
                user: u.clone(),
                password_hash: hash.clone(),
            }))
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|(u, _)| u.id == id)
            .map(|(u, _)| u.clone()))
    }

    async fn list_users(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> anyhow::Result<(Vec<User>, i64)> {
        let query = filter.query.as_ref().map(|q| q.to_lowercase());
        let mut users: Vec<User> = self
            .lock()
            .users
            .iter()
            .map(|(u, _)| u.clone())
            .filter(|u| filter.role.is_none_or(|role| u.role == role))
            .filter(|u| match &query {
                Some(q) => [
                    Some(&u.email),
                    Some(&u.first_name),
                    Some(&u.last_name),
                    u.playa_name.as_ref(),
                ]
                .into_iter()
                .flatten()
                .any(|v| v.to_lowercase().contains(q.as_str())),
                None => true,
            })
            .collect();
        users.sort_by(|a, b| {
            (a.last_name.as_str(), a.first_name.as_str())
                .cmp(&(b.last_name.as_str(), b.first_name.as_str()))
        });
        Ok((page_slice(&users, page), users.len() as i64))
    }

    async fn update_user(&self, id: Uuid, patch: &UserPatch) -> anyhow::Result<Option<User>> {
        self.lock().patch_user(id, patch)
    }

    async fn update_user_audited(
        &self,
        id: Uuid,
        patch: &UserPatch,
        actor_user_id: Uuid,
    ) -> anyhow::Result<Option<User>> {
        let mut state = self.lock();
        let Some(before) = state.users.iter().find(|(u, _)| u.id == id).map(|(u, _)| u.clone())
        else {
            return Ok(None);
        };
        let Some(after) = state.patch_user(id, patch)? else {
            return Ok(None);
        };
        if let Some((old_values, new_values)) = after.changes_since(&before) {
            state.push_audit(&NewAdminAudit {
                actor_user_id,
                action_type: AuditActionType::UserUpdate,
                target_record_type: AuditTargetType::User,
                target_record_id: id,
                old_values: Some(old_values),
                new_values: Some(new_values),
                reason: None,
                transaction_id: None,
            });
        }
        Ok(Some(after))
    }

    async fn delete_user(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut state = self.lock();
        let before = state.users.len();
        state.users.retain(|(u, _)| u.id != id);
        Ok(state.users.len() != before)
    }

    async fn count_dependents(&self, id: Uuid) -> anyhow::Result<i64> {
        let state = self.lock();
        let registrations = state.registrations.iter().filter(|r| r.user_id == id).count();
        let payments = state.payments.iter().filter(|p| p.user_id == id).count();
        Ok((registrations + payments) as i64)
    }
}

#[async_trait]
impl JobCategoryRepository for InMemoryStore {
    async fn create(&self, category: &NewJobCategory) -> anyhow::Result<JobCategory> {
        let mut state = self.lock();
        if state.categories.iter().any(|c| c.name == category.name) {
            return Err(duplicate("job_categories_name_key"));
        }
        let now = Utc::now();
        let created = JobCategory {
            id: Uuid::new_v4(),
            name: category.name.clone(),
            description: category.description.clone(),
            staff_only: category.staff_only,
            always_required: category.always_required,
            created_at: now,
            updated_at: now,
        };
        state.categories.push(created.clone());
        Ok(created)
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<JobCategory>> {
        Ok(self.lock().categories.iter().find(|c| c.id == id).cloned())
    }

    async fn get_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<JobCategory>> {
        Ok(self
            .lock()
            .categories
            .iter()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn list(&self) -> anyhow::Result<Vec<JobCategory>> {
        let mut categories = self.lock().categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn update(
        &self,
        id: Uuid,
        patch: &JobCategoryPatch,
    ) -> anyhow::Result<Option<JobCategory>> {
        let mut state = self.lock();
        if let Some(name) = &patch.name {
            if state.categories.iter().any(|c| c.id != id && c.name == *name) {
                return Err(duplicate("job_categories_name_key"));
            }
        }
        let Some(category) = state.categories.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        if let Some(v) = &patch.name {
            category.name = v.clone();
        }
        if let Some(v) = &patch.description {
            category.description = v.clone();
        }
        if let Some(v) = patch.staff_only {
            category.staff_only = v;
        }
        if let Some(v) = patch.always_required {
            category.always_required = v;
        }
        category.updated_at = Utc::now();
        let updated = category.clone();
        for job in state.jobs.iter_mut().filter(|j| j.category_id == id) {
            job.staff_only = updated.staff_only;
            job.always_required = updated.always_required;
        }
        Ok(Some(updated))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut state = self.lock();
        if state.jobs.iter().any(|j| j.category_id == id) {
            return Err(anyhow::Error::new(StillReferenced {
                constraint: "jobs_category_id_fkey".into(),
            }));
        }
        let before = state.categories.len();
        state.categories.retain(|c| c.id != id);
        Ok(state.categories.len() != before)
    }

    async fn count_jobs(&self, id: Uuid) -> anyhow::Result<i64> {
        Ok(self
            .lock()
            .jobs
            .iter()
            .filter(|j| j.category_id == id)
            .count() as i64)
    }
}

#[async_trait]
impl JobRepository for InMemoryStore {
    async fn create(&self, job: &NewJob) -> anyhow::Result<Job> {
        let now = Utc::now();
        let created = Job {
            id: Uuid::new_v4(),
            name: job.name.clone(),
            location: job.location.clone(),
            category_id: job.category_id,
            start_time: job.start_time,
            end_time: job.end_time,
            max_registrations: job.max_registrations,
            staff_only: job.staff_only,
            always_required: job.always_required,
            created_at: now,
            updated_at: now,
        };
        self.lock().jobs.push(created.clone());
        Ok(created)
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<JobWithCount>> {
        let state = self.lock();
        Ok(state
            .jobs
            .iter()
            .find(|j| j.id == id)
            .map(|j| state.job_with_count(j)))
    }

    async fn get_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<JobWithCount>> {
        let state = self.lock();
        Ok(state
            .jobs
            .iter()
            .filter(|j| ids.contains(&j.id))
            .map(|j| state.job_with_count(j))
            .collect())
    }

    async fn list(&self, filter: &JobFilter) -> anyhow::Result<Vec<JobWithCount>> {
        let state = self.lock();
        let mut jobs: Vec<JobWithCount> = state
            .jobs
            .iter()
            .filter(|j| filter.category_id.is_none_or(|c| j.category_id == c))
            .filter(|j| filter.include_staff_only || !j.staff_only)
            .map(|j| state.job_with_count(j))
            .collect();
        jobs.sort_by(|a, b| {
            (a.job.start_time, &a.job.name).cmp(&(b.job.start_time, &b.job.name))
        });
        Ok(jobs)
    }

    async fn update(&self, id: Uuid, patch: &JobPatch) -> anyhow::Result<Option<Job>> {
        let mut state = self.lock();
        let Some(job) = state.jobs.iter_mut().find(|j| j.id == id) else {
            return Ok(None);
        };
        if let Some(v) = &patch.name {
            job.name = v.clone();
        }
        if let Some(v) = &patch.location {
            job.location = v.clone();
        }
        if let Some(v) = patch.category_id {
            job.category_id = v;
        }
        if let Some(v) = patch.start_time {
            job.start_time = v;
        }
        if let Some(v) = patch.end_time {
            job.end_time = v;
        }
        if let Some(v) = patch.max_registrations {
            job.max_registrations = v;
        }
        if let Some(v) = patch.staff_only {
            job.staff_only = v;
        }
        if let Some(v) = patch.always_required {
            job.always_required = v;
        }
        job.updated_at = Utc::now();
        Ok(Some(job.clone()))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut state = self.lock();
        let before = state.jobs.len();
        state.jobs.retain(|j| j.id != id);
        Ok(state.jobs.len() != before)
    }

    async fn count_registrations(&self, id: Uuid) -> anyhow::Result<i64> {
        Ok(self
            .lock()
            .registration_jobs
            .iter()
            .filter(|(_, job_id)| *job_id == id)
            .count() as i64)
    }
}

#[async_trait]
impl CampingOptionRepository for InMemoryStore {
    async fn create(&self, option: &NewCampingOption) -> anyhow::Result<CampingOption> {
        let mut state = self.lock();
        if state.options.iter().any(|o| o.name == option.name) {
            return Err(duplicate("camping_options_name_key"));
        }
        let now = Utc::now();
        let created = CampingOption {
            id: Uuid::new_v4(),
            name: option.name.clone(),
            description: option.description.clone(),
            enabled: option.enabled,
            work_shifts_required: option.work_shifts_required,
            participant_dues: option.participant_dues,
            staff_dues: option.staff_dues,
            max_signups: option.max_signups,
            job_category_ids: option.job_category_ids.clone(),
            created_at: now,
            updated_at: now,
        };
        state.options.push(created.clone());
        Ok(created)
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<CampingOptionDetail>> {
        let state = self.lock();
        Ok(state
            .options
            .iter()
            .find(|o| o.id == id)
            .map(|o| state.option_detail(o)))
    }

    async fn get_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<CampingOptionDetail>> {
        let state = self.lock();
        Ok(state
            .options
            .iter()
            .filter(|o| ids.contains(&o.id))
            .map(|o| state.option_detail(o))
            .collect())
    }

    async fn list(&self, include_disabled: bool) -> anyhow::Result<Vec<CampingOptionDetail>> {
        let state = self.lock();
        let mut options: Vec<CampingOptionDetail> = state
            .options
            .iter()
            .filter(|o| include_disabled || o.enabled)
            .map(|o| state.option_detail(o))
            .collect();
        options.sort_by(|a, b| a.option.name.cmp(&b.option.name));
        Ok(options)
    }

    async fn update(
        &self,
        id: Uuid,
        patch: &CampingOptionPatch,
    ) -> anyhow::Result<Option<CampingOption>> {
        let mut state = self.lock();
        if let Some(name) = &patch.name {
            if state.options.iter().any(|o| o.id != id && o.name == *name) {
                return Err(duplicate("camping_options_name_key"));
            }
        }
        let Some(option) = state.options.iter_mut().find(|o| o.id == id) else {
            return Ok(None);
        };
        if let Some(v) = &patch.name {
            option.name = v.clone();
        }
        if let Some(v) = &patch.description {
            option.description = v.clone();
        }
        if let Some(v) = patch.enabled {
            option.enabled = v;
        }
        if let Some(v) = patch.work_shifts_required {
            option.work_shifts_required = v;
        }
        if let Some(v) = patch.participant_dues {
            option.participant_dues = v;
        }
        if let Some(v) = patch.staff_dues {
            option.staff_dues = v;
        }
        if let Some(v) = patch.max_signups {
            option.max_signups = v;
        }
        if let Some(v) = &patch.job_category_ids {
            option.job_category_ids = v.clone();
        }
        option.updated_at = Utc::now();
        Ok(Some(option.clone()))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut state = self.lock();
        let before = state.options.len();
        state.options.retain(|o| o.id != id);
        state.fields.retain(|f| f.camping_option_id != id);
        Ok(state.options.len() != before)
    }

    async fn count_registrations(&self, id: Uuid) -> anyhow::Result<i64> {
        Ok(self
            .lock()
            .signups
            .iter()
            .filter(|(_, option_id, _)| *option_id == id)
            .count() as i64)
    }
}

#[async_trait]
impl CampingOptionFieldRepository for InMemoryStore {
    async fn list(&self, camping_option_id: Uuid) -> anyhow::Result<Vec<CampingOptionField>> {
        let mut fields: Vec<CampingOptionField> = self
            .lock()
            .fields
            .iter()
            .filter(|f| f.camping_option_id == camping_option_id)
            .cloned()
            .collect();
        fields.sort_by_key(|f| f.ordinal);
        Ok(fields)
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<CampingOptionField>> {
        Ok(self.lock().fields.iter().find(|f| f.id == id).cloned())
    }

    async fn create(&self, field: &NewCampingOptionField) -> anyhow::Result<CampingOptionField> {
        let mut state = self.lock();
        let ordinal = state
            .fields
            .iter()
            .filter(|f| f.camping_option_id == field.camping_option_id)
            .map(|f| f.ordinal + 1)
            .max()
            .unwrap_or(0);
        let now = Utc::now();
        let created = CampingOptionField {
            id: Uuid::new_v4(),
            camping_option_id: field.camping_option_id,
            display_name: field.display_name.clone(),
            description: field.description.clone(),
            data_type: field.data_type,
            required: field.required,
            max_length: field.max_length,
            min_value: field.min_value,
            max_value: field.max_value,
            ordinal,
            created_at: now,
            updated_at: now,
        };
        state.fields.push(created.clone());
        Ok(created)
    }

    async fn update(
        &self,
        id: Uuid,
        patch: &CampingOptionFieldPatch,
    ) -> anyhow::Result<Option<CampingOptionField>> {
        let mut state = self.lock();
        let Some(field) = state.fields.iter_mut().find(|f| f.id == id) else {
            return Ok(None);
        };
        if let Some(v) = &patch.display_name {
            field.display_name = v.clone();
        }
        if let Some(v) = &patch.description {
            field.description = v.clone();
        }
        if let Some(v) = patch.data_type {
            field.data_type = v;
        }
        if let Some(v) = patch.required {
            field.required = v;
        }
        if let Some(v) = patch.max_length {
            field.max_length = v;
        }
        if let Some(v) = patch.min_value {
            field.min_value = v;
        }
        if let Some(v) = patch.max_value {
            field.max_value = v;
        }
        field.updated_at = Utc::now();
        Ok(Some(field.clone()))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut state = self.lock();
        let before = state.fields.len();
        state.fields.retain(|f| f.id != id);
        Ok(state.fields.len() != before)
    }

    async fn reorder(&self, camping_option_id: Uuid, ordered_ids: &[Uuid]) -> anyhow::Result<()> {
        let mut state = self.lock();
        for (position, id) in ordered_ids.iter().enumerate() {
            if let Some(field) = state
                .fields
                .iter_mut()
                .find(|f| f.id == *id && f.camping_option_id == camping_option_id)
            {
                field.ordinal = position as i32;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RegistrationRepository for InMemoryStore {
    async fn find_for_user_year(
        &self,
        user_id: Uuid,
        year: i32,
    ) -> anyhow::Result<Option<Registration>> {
        Ok(self
            .lock()
            .registrations
            .iter()
            .find(|r| r.user_id == user_id && r.year == year)
            .cloned())
    }

    async fn create(&self, registration: &NewRegistration) -> anyhow::Result<RegistrationDetail> {
        let mut state = self.lock();
        if state
            .registrations
            .iter()
            .any(|r| r.user_id == registration.user_id && r.year == registration.year)
        {
            return Err(duplicate("registrations_user_id_year_key"));
        }
        let now = Utc::now();
        let created = Registration {
            id: Uuid::new_v4(),
            user_id: registration.user_id,
            year: registration.year,
            status: registration.status,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        state.registrations.push(created.clone());
        for job_id in &registration.job_ids {
            state.registration_jobs.push((created.id, *job_id));
        }
        for signup in &registration.camping_options {
            state.signups.push((
                created.id,
                signup.camping_option_id,
                signup.field_values.clone(),
            ));
        }
        Ok(state.registration_detail(&created))
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<RegistrationDetail>> {
        let state = self.lock();
        Ok(state
            .registrations
            .iter()
            .find(|r| r.id == id)
            .map(|r| state.registration_detail(r)))
    }

    async fn list_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<RegistrationDetail>> {
        let state = self.lock();
        let mut mine: Vec<RegistrationDetail> = state
            .registrations
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| state.registration_detail(r))
            .collect();
        mine.sort_by(|a, b| b.registration.year.cmp(&a.registration.year));
        Ok(mine)
    }

    async fn list(
        &self,
        filter: &RegistrationFilter,
        page: PageRequest,
    ) -> anyhow::Result<(Vec<RegistrationDetail>, i64)> {
        let state = self.lock();
        let matching: Vec<RegistrationDetail> = state
            .registrations
            .iter()
            .filter(|r| filter.year.is_none_or(|y| r.year == y))
            .filter(|r| filter.status.is_none_or(|s| r.status == s))
            .filter(|r| filter.user_id.is_none_or(|u| r.user_id == u))
            .map(|r| state.registration_detail(r))
            .collect();
        Ok((page_slice(&matching, page), matching.len() as i64))
    }

    async fn update(
        &self,
        id: Uuid,
        status: Option<RegistrationStatus>,
        notes: Option<Option<String>>,
    ) -> anyhow::Result<Option<Registration>> {
        Ok(self.lock().set_registration_status(id, status, notes))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut state = self.lock();
        let before = state.registrations.len();
        state.registrations.retain(|r| r.id != id);
        state.registration_jobs.retain(|(reg, _)| *reg != id);
        state.signups.retain(|(reg, _, _)| *reg != id);
        for payment in state.payments.iter_mut() {
            if payment.registration_id == Some(id) {
                payment.registration_id = None;
            }
        }
        Ok(state.registrations.len() != before)
    }

    async fn count_by_status(&self, year: i32) -> anyhow::Result<Vec<(RegistrationStatus, i64)>> {
        let mut counts: HashMap<RegistrationStatus, i64> = HashMap::new();
        for r in self.lock().registrations.iter().filter(|r| r.year == year) {
            *counts.entry(r.status).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }

    async fn apply_admin_edit(
        &self,
        edit: &AdminRegistrationEdit,
    ) -> anyhow::Result<RegistrationDetail> {
        let mut state = self.lock();
        let id = edit.registration_id;
        let registration = state
            .set_registration_status(id, edit.status, edit.notes.clone())
            .ok_or_else(|| anyhow::anyhow!("registration {id} not found"))?;
        state
            .registration_jobs
            .retain(|(reg, job)| *reg != id || !edit.remove_job_ids.contains(job));
        for job_id in &edit.add_job_ids {
            state.registration_jobs.push((id, *job_id));
        }
        state
            .signups
            .retain(|(reg, option, _)| *reg != id || !edit.remove_camping_option_ids.contains(option));
        for option_id in &edit.add_camping_option_ids {
            state.signups.push((id, *option_id, json!({})));
        }
        for audit in &edit.audits {
            state.push_audit(audit);
        }
        Ok(state.registration_detail(&registration))
    }

    async fn apply_admin_cancel(
        &self,
        cancel: &AdminRegistrationCancel,
    ) -> anyhow::Result<(Registration, Vec<Payment>)> {
        let mut state = self.lock();
        let registration = state
            .set_registration_status(
                cancel.registration_id,
                Some(RegistrationStatus::Cancelled),
                None,
            )
            .ok_or_else(|| anyhow::anyhow!("registration {} not found", cancel.registration_id))?;
        let mut refunded = Vec::new();
        for payment in state.payments.iter_mut() {
            if cancel.refund_payment_ids.contains(&payment.id)
                && payment.status == PaymentStatus::Completed
            {
                payment.status = PaymentStatus::Refunded;
                payment.updated_at = Utc::now();
                refunded.push(payment.clone());
            }
        }
        state.push_audit(&cancel.audit);
        for payment in &refunded {
            state.push_audit(&cancel.audit.refund_of(payment));
        }
        Ok((registration, refunded))
    }
}

#[async_trait]
impl PaymentRepository for InMemoryStore {
    async fn create(&self, payment: &NewPayment) -> anyhow::Result<Payment> {
        let now = Utc::now();
        let created = Payment {
            id: Uuid::new_v4(),
            user_id: payment.user_id,
            registration_id: payment.registration_id,
            amount_cents: payment.amount_cents,
            currency: payment.currency.clone(),
            status: payment.status,
            provider: payment.provider,
            provider_ref: payment.provider_ref.clone(),
            notes: payment.notes.clone(),
            created_at: now,
            updated_at: now,
        };
        self.lock().payments.push(created.clone());
        Ok(created)
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Payment>> {
        Ok(self.lock().payments.iter().find(|p| p.id == id).cloned())
    }

    async fn list(
        &self,
        filter: &PaymentFilter,
        page: PageRequest,
    ) -> anyhow::Result<(Vec<Payment>, i64)> {
        let mut matching: Vec<Payment> = self
            .lock()
            .payments
            .iter()
            .filter(|p| filter.user_id.is_none_or(|u| p.user_id == u))
            .filter(|p| filter.registration_id.is_none_or(|r| p.registration_id == Some(r)))
            .filter(|p| filter.status.is_none_or(|s| p.status == s))
            .cloned()
            .collect();
        matching.reverse();
        Ok((page_slice(&matching, page), matching.len() as i64))
    }

    async fn list_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Payment>> {
        Ok(self
            .lock()
            .payments
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_for_registration(&self, registration_id: Uuid) -> anyhow::Result<Vec<Payment>> {
        Ok(self
            .lock()
            .payments
            .iter()
            .filter(|p| p.registration_id == Some(registration_id))
            .cloned()
            .collect())
    }

    async fn update(&self, id: Uuid, patch: &PaymentPatch) -> anyhow::Result<Option<Payment>> {
        let mut state = self.lock();
        let Some(payment) = state.payments.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if patch.status.is_some() && payment.status == PaymentStatus::Refunded {
            return Ok(None);
        }
        if let Some(v) = patch.status {
            payment.status = v;
        }
        if let Some(v) = &patch.provider_ref {
            payment.provider_ref = v.clone();
        }
        if let Some(v) = &patch.notes {
            payment.notes = v.clone();
        }
        payment.updated_at = Utc::now();
        Ok(Some(payment.clone()))
    }

    async fn refund(&self, id: Uuid, audit: &NewAdminAudit) -> anyhow::Result<Option<Payment>> {
        let mut state = self.lock();
        let Some(payment) = state
            .payments
            .iter_mut()
            .find(|p| p.id == id && p.status == PaymentStatus::Completed)
        else {
            return Ok(None);
        };
        payment.status = PaymentStatus::Refunded;
        payment.updated_at = Utc::now();
        let refunded = payment.clone();
        state.push_audit(audit);
        Ok(Some(refunded))
    }
}

#[async_trait]
impl AdminAuditRepository for InMemoryStore {
    async fn record(&self, entry: &NewAdminAudit) -> anyhow::Result<AdminAudit> {
        Ok(self.lock().push_audit(entry))
    }

    async fn list(
        &self,
        filter: &AuditFilter,
        page: PageRequest,
    ) -> anyhow::Result<(Vec<AdminAudit>, i64)> {
        let matching: Vec<AdminAudit> = self
            .lock()
            .audits
            .iter()
            .rev()
            .filter(|a| filter.actor_user_id.is_none_or(|v| a.actor_user_id == v))
            .filter(|a| filter.action_type.is_none_or(|v| a.action_type == v))
            .filter(|a| filter.target_record_type.is_none_or(|v| a.target_record_type == v))
            .filter(|a| filter.target_record_id.is_none_or(|v| a.target_record_id == v))
            .filter(|a| filter.from.is_none_or(|v| a.created_at >= v))
            .filter(|a| filter.to.is_none_or(|v| a.created_at <= v))
            .cloned()
            .collect();
        Ok((page_slice(&matching, page), matching.len() as i64))
    }

    async fn history(
        &self,
        target_type: AuditTargetType,
        target_id: Uuid,
    ) -> anyhow::Result<Vec<AdminAudit>> {
        Ok(self
            .lock()
            .audits
            .iter()
            .filter(|a| a.target_record_type == target_type && a.target_record_id == target_id)
            .cloned()
            .collect())
    }

    async fn stats(
        &self,
        from: Option<chrono::DateTime<Utc>>,
        to: Option<chrono::DateTime<Utc>>,
    ) -> anyhow::Result<AuditStats> {
        let state = self.lock();
        let rows: Vec<&AdminAudit> = state
            .audits
            .iter()
            .filter(|a| from.is_none_or(|v| a.created_at >= v))
            .filter(|a| to.is_none_or(|v| a.created_at <= v))
            .collect();
        let mut by_action: HashMap<AuditActionType, i64> = HashMap::new();
        let mut by_actor: HashMap<Uuid, i64> = HashMap::new();
        for row in &rows {
            *by_action.entry(row.action_type).or_default() += 1;
            *by_actor.entry(row.actor_user_id).or_default() += 1;
        }
        let mut by_action: Vec<(AuditActionType, i64)> = by_action.into_iter().collect();
        by_action.sort_by(|a, b| b.1.cmp(&a.1));
        let mut by_actor: Vec<ActorCount> = by_actor
            .into_iter()
            .map(|(actor_user_id, count)| ActorCount {
                actor_user_id,
                actor_email: state
                    .users
                    .iter()
                    .find(|(u, _)| u.id == actor_user_id)
                    .map(|(u, _)| u.email.clone()),
                count,
            })
            .collect();
        by_actor.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(AuditStats {
            total: rows.len() as i64,
            by_action,
            by_actor,
        })
    }
}

/// Captures notifications; `failing()` records the attempt and then errors.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationPort for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(notification.clone());
        if self.fail {
            anyhow::bail!("delivery failed");
        }
        Ok(())
    }
}
