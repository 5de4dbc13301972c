use std::sync::Arc;

use sqlx::PgPool;

use crate::application::dto::settings::CampSettings;
use crate::application::ports::admin_audit_repository::AdminAuditRepository;
use crate::application::ports::camping_option_field_repository::CampingOptionFieldRepository;
use crate::application::ports::camping_option_repository::CampingOptionRepository;
use crate::application::ports::job_category_repository::JobCategoryRepository;
use crate::application::ports::job_repository::JobRepository;
use crate::application::ports::notification_port::NotificationPort;
use crate::application::ports::payment_repository::PaymentRepository;
use crate::application::ports::registration_repository::RegistrationRepository;
use crate::application::ports::user_repository::UserRepository;
use crate::bootstrap::config::Config;

#[derive(Clone)]
pub struct AppContext {
    pub cfg: Config,
    services: Arc<AppServices>,
}

#[derive(Clone)]
pub struct AppServices {
    pool: PgPool,
    user_repo: Arc<dyn UserRepository>,
    job_category_repo: Arc<dyn JobCategoryRepository>,
    job_repo: Arc<dyn JobRepository>,
    camping_option_repo: Arc<dyn CampingOptionRepository>,
    camping_option_field_repo: Arc<dyn CampingOptionFieldRepository>,
    registration_repo: Arc<dyn RegistrationRepository>,
    payment_repo: Arc<dyn PaymentRepository>,
    admin_audit_repo: Arc<dyn AdminAuditRepository>,
    notifier: Arc<dyn NotificationPort>,
}

impl AppServices {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: PgPool,
        user_repo: Arc<dyn UserRepository>,
        job_category_repo: Arc<dyn JobCategoryRepository>,
        job_repo: Arc<dyn JobRepository>,
        camping_option_repo: Arc<dyn CampingOptionRepository>,
        camping_option_field_repo: Arc<dyn CampingOptionFieldRepository>,
        registration_repo: Arc<dyn RegistrationRepository>,
        payment_repo: Arc<dyn PaymentRepository>,
        admin_audit_repo: Arc<dyn AdminAuditRepository>,
        notifier: Arc<dyn NotificationPort>,
    ) -> Self {
        Self {
            pool,
            user_repo,
            job_category_repo,
            job_repo,
            camping_option_repo,
            camping_option_field_repo,
            registration_repo,
            payment_repo,
            admin_audit_repo,
            notifier,
        }
    }
}

impl AppContext {
    pub fn new(cfg: Config, services: AppServices) -> Self {
        Self {
            cfg,
            services: Arc::new(services),
        }
    }

    pub fn camp(&self) -> &CampSettings {
        &self.cfg.camp
    }

    pub fn pool(&self) -> &PgPool {
        &self.services.pool
    }

    pub fn user_repo(&self) -> Arc<dyn UserRepository> {
        self.services.user_repo.clone()
    }

    pub fn job_category_repo(&self) -> Arc<dyn JobCategoryRepository> {
        self.services.job_category_repo.clone()
    }

    pub fn job_repo(&self) -> Arc<dyn JobRepository> {
        self.services.job_repo.clone()
    }

    pub fn camping_option_repo(&self) -> Arc<dyn CampingOptionRepository> {
        self.services.camping_option_repo.clone()
    }

    pub fn camping_option_field_repo(&self) -> Arc<dyn CampingOptionFieldRepository> {
        self.services.camping_option_field_repo.clone()
    }

    pub fn registration_repo(&self) -> Arc<dyn RegistrationRepository> {
        self.services.registration_repo.clone()
    }

    pub fn payment_repo(&self) -> Arc<dyn PaymentRepository> {
        self.services.payment_repo.clone()
    }

    pub fn admin_audit_repo(&self) -> Arc<dyn AdminAuditRepository> {
        self.services.admin_audit_repo.clone()
    }

    pub fn notifier(&self) -> Arc<dyn NotificationPort> {
        self.services.notifier.clone()
    }
}
