use std::collections::HashSet;

use uuid::Uuid;

use crate::application::access::{self, AuthUser};
use crate::application::errors::{ServiceError, ServiceResult};
use crate::application::ports::camping_option_repository::{
    CampingOptionPatch, CampingOptionRepository, NewCampingOption,
};
use crate::application::ports::job_category_repository::JobCategoryRepository;
use crate::application::services::validation::{clearable, optional_text, require_text};
use crate::domain::camping::camping_option::CampingOptionDetail;

#[derive(Debug, Clone, Default)]
pub struct CampingOptionInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub enabled: Option<bool>,
    pub work_shifts_required: Option<i32>,
    pub participant_dues: Option<i64>,
    pub staff_dues: Option<i64>,
    pub max_signups: Option<i32>,
    pub job_category_ids: Option<Vec<Uuid>>,
}

impl CampingOptionInput {
    fn check_amounts(&self) -> ServiceResult<()> {
        let negative = self.work_shifts_required.is_some_and(|v| v < 0)
            || self.participant_dues.is_some_and(|v| v < 0)
            || self.staff_dues.is_some_and(|v| v < 0)
            || self.max_signups.is_some_and(|v| v < 0);
        if negative {
            return Err(ServiceError::bad_request(
                "work_shifts_required, dues and max_signups must not be negative",
            ));
        }
        Ok(())
    }
}

/// De-duplicates the ids and checks every category exists.
async fn resolve_categories<C: JobCategoryRepository + ?Sized>(
    categories: &C,
    ids: &[Uuid],
) -> ServiceResult<Vec<Uuid>> {
    let mut seen = HashSet::new();
    let unique: Vec<Uuid> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
    let found = categories.get_many(&unique).await?;
    if let Some(missing) = unique.iter().find(|id| !found.iter().any(|c| c.id == **id)) {
        return Err(ServiceError::not_found("Job category", *missing));
    }
    Ok(unique)
}

pub struct ListCampingOptions<'a, R: CampingOptionRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: CampingOptionRepository + ?Sized> ListCampingOptions<'a, R> {
    pub async fn execute(
        &self,
        actor: &AuthUser,
        include_disabled: bool,
    ) -> ServiceResult<Vec<CampingOptionDetail>> {
        let include_disabled = include_disabled && actor.role.is_staff();
        Ok(self.repo.list(include_disabled).await?)
    }
}

pub struct GetCampingOption<'a, R: CampingOptionRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: CampingOptionRepository + ?Sized> GetCampingOption<'a, R> {
    pub async fn execute(&self, actor: &AuthUser, id: Uuid) -> ServiceResult<CampingOptionDetail> {
        match self.repo.get(id).await? {
            Some(detail) if detail.option.enabled || actor.role.is_staff() => Ok(detail),
            _ => Err(ServiceError::not_found("Camping option", id)),
        }
    }
}

pub struct CreateCampingOption<'a, R, C>
where
    R: CampingOptionRepository + ?Sized,
    C: JobCategoryRepository + ?Sized,
{
    pub repo: &'a R,
    pub categories: &'a C,
}

impl<'a, R, C> CreateCampingOption<'a, R, C>
where
    R: CampingOptionRepository + ?Sized,
    C: JobCategoryRepository + ?Sized,
{
    pub async fn execute(
        &self,
        actor: &AuthUser,
        input: CampingOptionInput,
    ) -> ServiceResult<CampingOptionDetail> {
        access::require_admin(actor)?;
        input.check_amounts()?;
        let name = require_text("name", input.name.as_deref().unwrap_or_default())?;
        let job_category_ids = resolve_categories(
            self.categories,
            input.job_category_ids.as_deref().unwrap_or_default(),
        )
        .await?;
        let option = self
            .repo
            .create(&NewCampingOption {
                name,
                description: optional_text(input.description),
                enabled: input.enabled.unwrap_or(true),
                work_shifts_required: input.work_shifts_required.unwrap_or(0),
                participant_dues: input.participant_dues.unwrap_or(0),
                staff_dues: input.staff_dues.unwrap_or(0),
                max_signups: input.max_signups.unwrap_or(0),
                job_category_ids,
            })
            .await?;
        tracing::info!(camping_option_id = %option.id, "camping_option_created");
        self.repo
            .get(option.id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Camping option", option.id))
    }
}

pub struct UpdateCampingOption<'a, R, C>
where
    R: CampingOptionRepository + ?Sized,
    C: JobCategoryRepository + ?Sized,
{
    pub repo: &'a R,
    pub categories: &'a C,
}

impl<'a, R, C> UpdateCampingOption<'a, R, C>
where
    R: CampingOptionRepository + ?Sized,
    C: JobCategoryRepository + ?Sized,
{
    pub async fn execute(
        &self,
        actor: &AuthUser,
        id: Uuid,
        input: CampingOptionInput,
    ) -> ServiceResult<CampingOptionDetail> {
        access::require_admin(actor)?;
        input.check_amounts()?;
        let job_category_ids = match input.job_category_ids.as_deref() {
            Some(ids) => Some(resolve_categories(self.categories, ids).await?),
            None => None,
        };
        let patch = CampingOptionPatch {
            name: input
                .name
                .as_deref()
                .map(|n| require_text("name", n))
                .transpose()?,
            description: clearable(input.description),
            enabled: input.enabled,
            work_shifts_required: input.work_shifts_required,
            participant_dues: input.participant_dues,
            staff_dues: input.staff_dues,
            max_signups: input.max_signups,
            job_category_ids,
        };
        self.repo
            .update(id, &patch)
            .await?
            .ok_or_else(|| ServiceError::not_found("Camping option", id))?;
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Camping option", id))
    }
}

pub struct DeleteCampingOption<'a, R: CampingOptionRepository + ?Sized> {
    pub repo: &'a R,
}

impl<'a, R: CampingOptionRepository + ?Sized> DeleteCampingOption<'a, R> {
    pub async fn execute(&self, actor: &AuthUser, id: Uuid) -> ServiceResult<()> {
        access::require_admin(actor)?;
        if self.repo.get(id).await?.is_none() {
            return Err(ServiceError::not_found("Camping option", id));
        }
        if self.repo.count_registrations(id).await? > 0 {
            return Err(ServiceError::conflict(
                "camping option has registrations and cannot be deleted",
            ));
        }
        self.repo.delete(id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{InMemoryStore, auth_user};
    use crate::domain::users::user::UserRole;

    #[tokio::test]
    async fn create_links_existing_categories() {
        let store = InMemoryStore::default();
        let admin = store.seed_user("admin@example.com", UserRole::Admin).await;
        let kitchen = store.seed_category("Kitchen", false, false).await;
        let detail = CreateCampingOption {
            repo: &store,
            categories: &store,
        }
        .execute(
            &auth_user(&admin),
            CampingOptionInput {
                name: Some("Tent".into()),
                participant_dues: Some(15000),
                job_category_ids: Some(vec![kitchen.id, kitchen.id]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(detail.option.job_category_ids, vec![kitchen.id]);
        assert!(detail.option.enabled);
        assert_eq!(detail.current_signups, 0);
    }

    #[tokio::test]
    async fn unknown_category_is_not_found() {
        let store = InMemoryStore::default();
        let admin = store.seed_user("admin@example.com", UserRole::Admin).await;
        let err = CreateCampingOption {
            repo: &store,
            categories: &store,
        }
        .execute(
            &auth_user(&admin),
            CampingOptionInput {
                name: Some("Tent".into()),
                job_category_ids: Some(vec![Uuid::new_v4()]),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn negative_dues_are_rejected() {
        let store = InMemoryStore::default();
        let admin = store.seed_user("admin@example.com", UserRole::Admin).await;
        let err = CreateCampingOption {
            repo: &store,
            categories: &store,
        }
        .execute(
            &auth_user(&admin),
            CampingOptionInput {
                name: Some("Tent".into()),
                staff_dues: Some(-1),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));
    }

    #[tokio::test]
    async fn disabled_options_hidden_from_participants() {
        let store = InMemoryStore::default();
        let me = store.seed_user("me@example.com", UserRole::Participant).await;
        let staff = store.seed_user("staff@example.com", UserRole::Staff).await;
        store.seed_option("Tent", 0, 0, &[]).await;
        let hidden = store.seed_option("Yurt", 0, 0, &[]).await;
        store.set_option_enabled(hidden.id, false).await;

        let list = ListCampingOptions { repo: &store };
        assert_eq!(list.execute(&auth_user(&me), true).await.unwrap().len(), 1);
        assert_eq!(list.execute(&auth_user(&staff), true).await.unwrap().len(), 2);
        assert_eq!(list.execute(&auth_user(&staff), false).await.unwrap().len(), 1);

        let get = GetCampingOption { repo: &store };
        assert!(matches!(
            get.execute(&auth_user(&me), hidden.id).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
        assert!(get.execute(&auth_user(&staff), hidden.id).await.is_ok());
    }

    #[tokio::test]
    async fn update_replaces_categories() {
        let store = InMemoryStore::default();
        let admin = store.seed_user("admin@example.com", UserRole::Admin).await;
        let kitchen = store.seed_category("Kitchen", false, false).await;
        let gate = store.seed_category("Gate", false, false).await;
        let option = store.seed_option("Tent", 0, 0, &[kitchen.id]).await;
        let detail = UpdateCampingOption {
            repo: &store,
            categories: &store,
        }
        .execute(
            &auth_user(&admin),
            option.id,
            CampingOptionInput {
                job_category_ids: Some(vec![gate.id]),
                max_signups: Some(20),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(detail.option.job_category_ids, vec![gate.id]);
        assert_eq!(detail.option.max_signups, 20);
    }

    #[tokio::test]
    async fn delete_with_registrations_conflicts() {
        let store = InMemoryStore::default();
        let admin = store.seed_user("admin@example.com", UserRole::Admin).await;
        let me = store.seed_user("me@example.com", UserRole::Participant).await;
        let option = store.seed_option("Tent", 0, 0, &[]).await;
        store.seed_registration_with_option(me.id, 2026, option.id).await;
        let err = DeleteCampingOption { repo: &store }
            .execute(&auth_user(&admin), option.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }
}
