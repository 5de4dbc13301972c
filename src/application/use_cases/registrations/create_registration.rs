use std::collections::{HashMap, HashSet};

use serde_json::Value;
use uuid::Uuid;

use crate::application::access::AuthUser;
use crate::application::dto::settings::CampSettings;
use crate::application::errors::{ServiceError, ServiceResult};
use crate::application::ports::camping_option_repository::CampingOptionRepository;
use crate::application::ports::job_category_repository::JobCategoryRepository;
use crate::application::ports::job_repository::JobRepository;
use crate::application::ports::notification_port::NotificationPort;
use crate::application::ports::registration_repository::{
    NewCampingOptionSignup, NewRegistration, RegistrationRepository,
};
use crate::application::ports::user_repository::UserRepository;
use crate::application::services::notifications::{NotificationKind, format_cents, notify_user};
use crate::application::services::validation::validate_field_values;
use crate::domain::camping::camping_option::CampingOptionDetail;
use crate::domain::jobs::job::JobWithCount;
use crate::domain::registrations::registration::{
    RegistrationDetail, RegistrationStatus, StatusInputs, initial_status,
};

#[derive(Debug, Clone)]
pub struct CampingOptionChoice {
    pub camping_option_id: Uuid,
    pub field_values: Option<Value>,
}

#[derive(Debug, Clone, Default)]
pub struct CreateRegistrationRequest {
    pub year: Option<i32>,
    pub job_ids: Vec<Uuid>,
    pub camping_options: Vec<CampingOptionChoice>,
}

/// Registers the calling user for a camp year.
///
/// Checks run in a fixed order so the first failing rule decides the error:
/// year, open window, existing registration, camping options and their custom
/// fields, jobs, work shift requirements, then capacity.
pub struct CreateRegistration<'a, U, R, O, J, C, N>
where
    U: UserRepository + ?Sized,
    R: RegistrationRepository + ?Sized,
    O: CampingOptionRepository + ?Sized,
    J: JobRepository + ?Sized,
    C: JobCategoryRepository + ?Sized,
    N: NotificationPort + ?Sized,
{
    pub users: &'a U,
    pub registrations: &'a R,
    pub options: &'a O,
    pub jobs: &'a J,
    pub categories: &'a C,
    pub notifier: &'a N,
    pub settings: &'a CampSettings,
}

impl<'a, U, R, O, J, C, N> CreateRegistration<'a, U, R, O, J, C, N>
where
    U: UserRepository + ?Sized,
    R: RegistrationRepository + ?Sized,
    O: CampingOptionRepository + ?Sized,
    J: JobRepository + ?Sized,
    C: JobCategoryRepository + ?Sized,
    N: NotificationPort + ?Sized,
{
    pub async fn execute(
        &self,
        actor: &AuthUser,
        req: CreateRegistrationRequest,
    ) -> ServiceResult<RegistrationDetail> {
        let user = self
            .users
            .find_by_id(actor.id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", actor.id))?;

        let year = req.year.unwrap_or(self.settings.registration_year);
        if year != self.settings.registration_year {
            return Err(ServiceError::bad_request(format!(
                "registration is only available for {}",
                self.settings.registration_year
            )));
        }
        if !self
            .settings
            .registration_open_for(user.allow_registration, user.allow_early_registration)
        {
            return Err(ServiceError::forbidden("registration is not open"));
        }
        if self
            .registrations
            .find_for_user_year(user.id, year)
            .await?
            .is_some()
        {
            return Err(ServiceError::conflict(format!(
                "you already have a registration for {year}"
            )));
        }

        let (options, signups) = self.load_camping_options(&req.camping_options).await?;
        let jobs = self.load_jobs(actor, &req.job_ids, &options).await?;
        if !user.allow_no_job {
            self.check_work_shifts(&options, &jobs).await?;
        }

        let any_camping_option_full = options.iter().any(|o| o.is_full());
        if !any_camping_option_full {
            if let Some(full) = jobs.iter().find(|j| j.is_full()) {
                return Err(ServiceError::bad_request(format!(
                    "job full: {}",
                    full.job.name
                )));
            }
        }
        let dues_cents: i64 = options
            .iter()
            .map(|o| o.option.dues_for(user.role.is_staff()))
            .sum();
        let status = initial_status(StatusInputs {
            any_camping_option_full,
            dues_cents,
            allow_deferred_dues_payment: user.allow_deferred_dues_payment,
        });

        let detail = self
            .registrations
            .create(&NewRegistration {
                user_id: user.id,
                year,
                status,
                job_ids: jobs.iter().map(|j| j.job.id).collect(),
                camping_options: signups,
            })
            .await?;
        tracing::info!(
            registration_id = %detail.registration.id,
            user_id = %user.id,
            status = status.as_str(),
            "registration_created"
        );

        let (kind, detail_text) = match status {
            RegistrationStatus::Waitlisted => (NotificationKind::RegistrationWaitlisted, None),
            RegistrationStatus::Pending => (
                NotificationKind::RegistrationPending,
                Some(format!("Dues owed: {}", format_cents(dues_cents, "USD"))),
            ),
            _ => (NotificationKind::RegistrationConfirmed, None),
        };
        notify_user(self.notifier, self.settings, &user, year, kind, detail_text).await;
        Ok(detail)
    }

    async fn load_camping_options(
        &self,
        choices: &[CampingOptionChoice],
    ) -> ServiceResult<(Vec<CampingOptionDetail>, Vec<NewCampingOptionSignup>)> {
        let mut seen = HashSet::new();
        if !choices.iter().all(|c| seen.insert(c.camping_option_id)) {
            return Err(ServiceError::bad_request(
                "each camping option may only be selected once",
            ));
        }
        let ids: Vec<Uuid> = choices.iter().map(|c| c.camping_option_id).collect();
        let mut found: HashMap<Uuid, CampingOptionDetail> = self
            .options
            .get_many(&ids)
            .await?
            .into_iter()
            .map(|d| (d.option.id, d))
            .collect();

        let mut options = Vec::with_capacity(choices.len());
        for choice in choices {
            let detail = found
                .remove(&choice.camping_option_id)
                .ok_or_else(|| ServiceError::not_found("Camping option", choice.camping_option_id))?;
            if !detail.option.enabled {
                return Err(ServiceError::bad_request(format!(
                    "camping option {} is not available",
                    detail.option.name
                )));
            }
            options.push(detail);
        }

        // field values only once every option resolved
        let signups = options
            .iter()
            .zip(choices)
            .map(|(detail, choice)| -> ServiceResult<NewCampingOptionSignup> {
                Ok(NewCampingOptionSignup {
                    camping_option_id: detail.option.id,
                    field_values: validate_field_values(&detail.fields, choice.field_values.as_ref())?,
                })
            })
            .collect::<ServiceResult<Vec<_>>>()?;
        Ok((options, signups))
    }

    async fn load_jobs(
        &self,
        actor: &AuthUser,
        job_ids: &[Uuid],
        options: &[CampingOptionDetail],
    ) -> ServiceResult<Vec<JobWithCount>> {
        let mut seen = HashSet::new();
        let unique: Vec<Uuid> = job_ids.iter().copied().filter(|id| seen.insert(*id)).collect();
        let mut found: HashMap<Uuid, JobWithCount> = self
            .jobs
            .get_many(&unique)
            .await?
            .into_iter()
            .map(|j| (j.job.id, j))
            .collect();
        let linked: HashSet<Uuid> = options
            .iter()
            .flat_map(|o| o.option.job_category_ids.iter().copied())
            .collect();

        let mut jobs = Vec::with_capacity(unique.len());
        for id in unique {
            let job = found
                .remove(&id)
                .ok_or_else(|| ServiceError::not_found("Job", id))?;
            if job.job.staff_only && !actor.role.is_staff() {
                return Err(ServiceError::forbidden(format!(
                    "job {} is reserved for staff",
                    job.job.name
                )));
            }
            if !options.is_empty() && !linked.contains(&job.job.category_id) {
                return Err(ServiceError::bad_request(format!(
                    "job {} is not available for the selected camping options",
                    job.job.name
                )));
            }
            jobs.push(job);
        }
        Ok(jobs)
    }

    async fn check_work_shifts(
        &self,
        options: &[CampingOptionDetail],
        jobs: &[JobWithCount],
    ) -> ServiceResult<()> {
        let required = options
            .iter()
            .map(|o| o.option.work_shifts_required)
            .max()
            .unwrap_or(0);
        if (jobs.len() as i64) < i64::from(required) {
            return Err(ServiceError::bad_request(format!(
                "at least {required} work shifts are required"
            )));
        }

        let mut seen = HashSet::new();
        let category_ids: Vec<Uuid> = options
            .iter()
            .flat_map(|o| o.option.job_category_ids.iter().copied())
            .filter(|id| seen.insert(*id))
            .collect();
        if category_ids.is_empty() {
            return Ok(());
        }
        let categories = self.categories.get_many(&category_ids).await?;
        for category in categories.iter().filter(|c| c.always_required) {
            if !jobs.iter().any(|j| j.job.category_id == category.id) {
                return Err(ServiceError::bad_request(format!(
                    "a shift in {} is required",
                    category.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::user_repository::UserPatch;
    use crate::application::test_support::{
        InMemoryStore, RecordingNotifier, auth_user, open_settings,
    };
    use crate::domain::camping::camping_option::FieldDataType;
    use crate::domain::users::user::{User, UserRole};
    use serde_json::json;

    struct Fixture {
        store: InMemoryStore,
        notifier: RecordingNotifier,
        settings: CampSettings,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: InMemoryStore::default(),
                notifier: RecordingNotifier::default(),
                settings: open_settings(),
            }
        }

        async fn register(
            &self,
            user: &User,
            req: CreateRegistrationRequest,
        ) -> ServiceResult<RegistrationDetail> {
            CreateRegistration {
                users: &self.store,
                registrations: &self.store,
                options: &self.store,
                jobs: &self.store,
                categories: &self.store,
                notifier: &self.notifier,
                settings: &self.settings,
            }
            .execute(&auth_user(user), req)
            .await
        }
    }

    fn choose(id: Uuid) -> CampingOptionChoice {
        CampingOptionChoice {
            camping_option_id: id,
            field_values: None,
        }
    }

    #[tokio::test]
    async fn free_option_is_confirmed() {
        let fx = Fixture::new();
        let me = fx.store.seed_user("me@example.com", UserRole::Participant).await;
        let tent = fx.store.seed_option("Tent", 0, 0, &[]).await;
        let detail = fx
            .register(
                &me,
                CreateRegistrationRequest {
                    camping_options: vec![choose(tent.id)],
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(detail.registration.status, RegistrationStatus::Confirmed);
        assert_eq!(detail.registration.year, 2026);
        assert_eq!(detail.camping_option_ids(), vec![tent.id]);
        let sent = fx.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, NotificationKind::RegistrationConfirmed);
    }

    #[tokio::test]
    async fn owed_dues_leave_registration_pending() {
        let fx = Fixture::new();
        let me = fx.store.seed_user("me@example.com", UserRole::Participant).await;
        let tent = fx.store.seed_option("Tent", 25000, 0, &[]).await;
        let detail = fx
            .register(
                &me,
                CreateRegistrationRequest {
                    camping_options: vec![choose(tent.id)],
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(detail.registration.status, RegistrationStatus::Pending);
        assert_eq!(fx.notifier.sent()[0].kind, NotificationKind::RegistrationPending);
        assert!(fx.notifier.sent()[0].body.contains("250.00 USD"));
    }

    #[tokio::test]
    async fn full_option_waitlists() {
        let fx = Fixture::new();
        let other = fx.store.seed_user("other@example.com", UserRole::Participant).await;
        let me = fx.store.seed_user("me@example.com", UserRole::Participant).await;
        let tent = fx.store.seed_option("Tent", 0, 1, &[]).await;
        fx.store.seed_registration_with_option(other.id, 2026, tent.id).await;
        let detail = fx
            .register(
                &me,
                CreateRegistrationRequest {
                    camping_options: vec![choose(tent.id)],
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(detail.registration.status, RegistrationStatus::Waitlisted);
    }

    #[tokio::test]
    async fn other_year_is_rejected() {
        let fx = Fixture::new();
        let me = fx.store.seed_user("me@example.com", UserRole::Participant).await;
        let err = fx
            .register(
                &me,
                CreateRegistrationRequest {
                    year: Some(2025),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));
    }

    #[tokio::test]
    async fn closed_registration_allows_early_users_only() {
        let mut fx = Fixture::new();
        fx.settings.registration_open = false;
        fx.settings.early_registration_open = true;
        let me = fx.store.seed_user("me@example.com", UserRole::Participant).await;
        let err = fx.register(&me, Default::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let early = UserRepository::update_user(
            &fx.store,
            me.id,
            &UserPatch {
                allow_early_registration: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
        assert!(fx.register(&early, Default::default()).await.is_ok());
    }

    #[tokio::test]
    async fn second_registration_conflicts() {
        let fx = Fixture::new();
        let me = fx.store.seed_user("me@example.com", UserRole::Participant).await;
        fx.register(&me, Default::default()).await.unwrap();
        let err = fx.register(&me, Default::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn duplicate_or_disabled_options_are_rejected() {
        let fx = Fixture::new();
        let me = fx.store.seed_user("me@example.com", UserRole::Participant).await;
        let tent = fx.store.seed_option("Tent", 0, 0, &[]).await;
        let err = fx
            .register(
                &me,
                CreateRegistrationRequest {
                    camping_options: vec![choose(tent.id), choose(tent.id)],
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));

        fx.store.set_option_enabled(tent.id, false).await;
        let err = fx
            .register(
                &me,
                CreateRegistrationRequest {
                    camping_options: vec![choose(tent.id)],
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));

        let err = fx
            .register(
                &me,
                CreateRegistrationRequest {
                    camping_options: vec![choose(Uuid::new_v4())],
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn custom_field_values_are_validated_and_stored() {
        let fx = Fixture::new();
        let me = fx.store.seed_user("me@example.com", UserRole::Participant).await;
        let rv = fx.store.seed_option("RV", 0, 0, &[]).await;
        let length = fx
            .store
            .seed_field(rv.id, "Length", FieldDataType::Integer, true)
            .await;

        let err = fx
            .register(
                &me,
                CreateRegistrationRequest {
                    camping_options: vec![choose(rv.id)],
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));

        let values = json!({ length.id.to_string(): 30 });
        let detail = fx
            .register(
                &me,
                CreateRegistrationRequest {
                    camping_options: vec![CampingOptionChoice {
                        camping_option_id: rv.id,
                        field_values: Some(values.clone()),
                    }],
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(detail.camping_options[0].field_values, values);
    }

    #[tokio::test]
    async fn unknown_option_wins_over_missing_field_values() {
        let fx = Fixture::new();
        let me = fx.store.seed_user("me@example.com", UserRole::Participant).await;
        let rv = fx.store.seed_option("RV", 0, 0, &[]).await;
        fx.store
            .seed_field(rv.id, "Length", FieldDataType::Integer, true)
            .await;

        let err = fx
            .register(
                &me,
                CreateRegistrationRequest {
                    camping_options: vec![choose(rv.id), choose(Uuid::new_v4())],
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn staff_only_jobs_need_staff() {
        let fx = Fixture::new();
        let me = fx.store.seed_user("me@example.com", UserRole::Participant).await;
        let staff = fx.store.seed_user("staff@example.com", UserRole::Staff).await;
        let leads = fx.store.seed_category("Leads", true, false).await;
        let job = fx.store.seed_job(leads.id, "Shift lead", 5).await;
        let req = CreateRegistrationRequest {
            job_ids: vec![job.id],
            ..Default::default()
        };
        let err = fx.register(&me, req.clone()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        assert!(fx.register(&staff, req).await.is_ok());
    }

    #[tokio::test]
    async fn jobs_must_match_option_categories() {
        let fx = Fixture::new();
        let me = fx.store.seed_user("me@example.com", UserRole::Participant).await;
        let kitchen = fx.store.seed_category("Kitchen", false, false).await;
        let gate = fx.store.seed_category("Gate", false, false).await;
        let tent = fx.store.seed_option("Tent", 0, 0, &[kitchen.id]).await;
        let gate_shift = fx.store.seed_job(gate.id, "Gate shift", 5).await;
        let err = fx
            .register(
                &me,
                CreateRegistrationRequest {
                    job_ids: vec![gate_shift.id],
                    camping_options: vec![choose(tent.id)],
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));
    }

    #[tokio::test]
    async fn work_shift_minimum_and_required_categories() {
        let fx = Fixture::new();
        let me = fx.store.seed_user("me@example.com", UserRole::Participant).await;
        let kitchen = fx.store.seed_category("Kitchen", false, false).await;
        let cleanup = fx.store.seed_category("Cleanup", false, true).await;
        let tent = fx
            .store
            .seed_option("Tent", 0, 0, &[kitchen.id, cleanup.id])
            .await;
        fx.store.set_work_shifts_required(tent.id, 2).await;
        let breakfast = fx.store.seed_job(kitchen.id, "Breakfast", 5).await;
        let dinner = fx.store.seed_job(kitchen.id, "Dinner", 5).await;
        let sweep = fx.store.seed_job(cleanup.id, "Sweep", 5).await;

        let too_few = CreateRegistrationRequest {
            job_ids: vec![breakfast.id, breakfast.id],
            camping_options: vec![choose(tent.id)],
            ..Default::default()
        };
        assert!(matches!(
            fx.register(&me, too_few).await.unwrap_err(),
            ServiceError::BadRequest(_)
        ));

        let missing_cleanup = CreateRegistrationRequest {
            job_ids: vec![breakfast.id, dinner.id],
            camping_options: vec![choose(tent.id)],
            ..Default::default()
        };
        assert!(matches!(
            fx.register(&me, missing_cleanup).await.unwrap_err(),
            ServiceError::BadRequest(_)
        ));

        let ok = CreateRegistrationRequest {
            job_ids: vec![breakfast.id, sweep.id],
            camping_options: vec![choose(tent.id)],
            ..Default::default()
        };
        let detail = fx.register(&me, ok).await.unwrap();
        assert_eq!(detail.jobs.len(), 2);
    }

    #[tokio::test]
    async fn allow_no_job_skips_shift_requirements() {
        let fx = Fixture::new();
        let me = fx.store.seed_user("me@example.com", UserRole::Participant).await;
        let tent = fx.store.seed_option("Tent", 0, 0, &[]).await;
        fx.store.set_work_shifts_required(tent.id, 3).await;
        UserRepository::update_user(
            &fx.store,
            me.id,
            &UserPatch {
                allow_no_job: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let req = CreateRegistrationRequest {
            camping_options: vec![choose(tent.id)],
            ..Default::default()
        };
        assert!(fx.register(&me, req).await.is_ok());
    }

    #[tokio::test]
    async fn full_job_is_rejected_unless_waitlisted() {
        let fx = Fixture::new();
        let other = fx.store.seed_user("other@example.com", UserRole::Participant).await;
        let me = fx.store.seed_user("me@example.com", UserRole::Participant).await;
        let kitchen = fx.store.seed_category("Kitchen", false, false).await;
        let job = fx.store.seed_job(kitchen.id, "Breakfast", 1).await;
        fx.store.seed_registration_with_job(other.id, 2026, job.id).await;

        let req = CreateRegistrationRequest {
            job_ids: vec![job.id],
            ..Default::default()
        };
        let err = fx.register(&me, req).await.unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(ref msg) if msg.starts_with("job full")));
    }

    #[tokio::test]
    async fn staff_pay_staff_dues() {
        let fx = Fixture::new();
        let staff = fx.store.seed_user("staff@example.com", UserRole::Staff).await;
        let tent = fx.store.seed_option("Tent", 25000, 0, &[]).await;
        let detail = fx
            .register(
                &staff,
                CreateRegistrationRequest {
                    camping_options: vec![choose(tent.id)],
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        // seeded options carry no staff dues
        assert_eq!(detail.registration.status, RegistrationStatus::Confirmed);
    }
}
