use std::collections::HashSet;

use uuid::Uuid;

use crate::application::access::{self, AuthUser};
use crate::application::errors::{ServiceError, ServiceResult};
use crate::application::ports::camping_option_field_repository::{
    CampingOptionFieldPatch, CampingOptionFieldRepository, NewCampingOptionField,
};
use crate::application::ports::camping_option_repository::CampingOptionRepository;
use crate::application::services::validation::{clearable, optional_text, require_text};
use crate::domain::camping::camping_option::{CampingOptionField, FieldDataType};

#[derive(Debug, Clone, Default)]
pub struct FieldInput {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub data_type: Option<FieldDataType>,
    pub required: Option<bool>,
    pub max_length: Option<Option<i32>>,
    pub min_value: Option<Option<f64>>,
    pub max_value: Option<Option<f64>>,
}

fn check_constraints(
    max_length: Option<i32>,
    min_value: Option<f64>,
    max_value: Option<f64>,
) -> ServiceResult<()> {
    if max_length.is_some_and(|len| len <= 0) {
        return Err(ServiceError::bad_request("max_length must be greater than 0"));
    }
    if let (Some(min), Some(max)) = (min_value, max_value) {
        if min > max {
            return Err(ServiceError::bad_request(
                "min_value must not be greater than max_value",
            ));
        }
    }
    Ok(())
}

async fn ensure_option<O: CampingOptionRepository + ?Sized>(
    options: &O,
    option_id: Uuid,
) -> ServiceResult<()> {
    match options.get(option_id).await? {
        Some(_) => Ok(()),
        None => Err(ServiceError::not_found("Camping option", option_id)),
    }
}

/// Loads a field and checks it belongs to the option in the path.
async fn load_field<F: CampingOptionFieldRepository + ?Sized>(
    fields: &F,
    option_id: Uuid,
    field_id: Uuid,
) -> ServiceResult<CampingOptionField> {
    match fields.get(field_id).await? {
        Some(field) if field.camping_option_id == option_id => Ok(field),
        _ => Err(ServiceError::not_found("Camping option field", field_id)),
    }
}

pub struct ListFields<'a, F, O>
where
    F: CampingOptionFieldRepository + ?Sized,
    O: CampingOptionRepository + ?Sized,
{
    pub repo: &'a F,
    pub options: &'a O,
}

impl<'a, F, O> ListFields<'a, F, O>
where
    F: CampingOptionFieldRepository + ?Sized,
    O: CampingOptionRepository + ?Sized,
{
    pub async fn execute(&self, option_id: Uuid) -> ServiceResult<Vec<CampingOptionField>> {
        ensure_option(self.options, option_id).await?;
        Ok(self.repo.list(option_id).await?)
    }
}

pub struct CreateField<'a, F, O>
where
    F: CampingOptionFieldRepository + ?Sized,
    O: CampingOptionRepository + ?Sized,
{
    pub repo: &'a F,
    pub options: &'a O,
}

impl<'a, F, O> CreateField<'a, F, O>
where
    F: CampingOptionFieldRepository + ?Sized,
    O: CampingOptionRepository + ?Sized,
{
    pub async fn execute(
        &self,
        actor: &AuthUser,
        option_id: Uuid,
        input: FieldInput,
    ) -> ServiceResult<CampingOptionField> {
        access::require_admin(actor)?;
        ensure_option(self.options, option_id).await?;
        let display_name =
            require_text("display_name", input.display_name.as_deref().unwrap_or_default())?;
        let data_type = input
            .data_type
            .ok_or_else(|| ServiceError::bad_request("data_type is required"))?;
        let max_length = input.max_length.flatten();
        let min_value = input.min_value.flatten();
        let max_value = input.max_value.flatten();
        check_constraints(max_length, min_value, max_value)?;

        let field = self
            .repo
            .create(&NewCampingOptionField {
                camping_option_id: option_id,
                display_name,
                description: optional_text(input.description),
                data_type,
                required: input.required.unwrap_or(false),
                max_length,
                min_value,
                max_value,
            })
            .await?;
        Ok(field)
    }
}

pub struct UpdateField<'a, F: CampingOptionFieldRepository + ?Sized> {
    pub repo: &'a F,
}

impl<'a, F: CampingOptionFieldRepository + ?Sized> UpdateField<'a, F> {
    pub async fn execute(
        &self,
        actor: &AuthUser,
        option_id: Uuid,
        field_id: Uuid,
        input: FieldInput,
    ) -> ServiceResult<CampingOptionField> {
        access::require_admin(actor)?;
        let current = load_field(self.repo, option_id, field_id).await?;
        check_constraints(
            input.max_length.unwrap_or(current.max_length),
            input.min_value.unwrap_or(current.min_value),
            input.max_value.unwrap_or(current.max_value),
        )?;
        let patch = CampingOptionFieldPatch {
            display_name: input
                .display_name
                .as_deref()
                .map(|n| require_text("display_name", n))
                .transpose()?,
            description: clearable(input.description),
            data_type: input.data_type,
            required: input.required,
            max_length: input.max_length,
            min_value: input.min_value,
            max_value: input.max_value,
        };
        self.repo
            .update(field_id, &patch)
            .await?
            .ok_or_else(|| ServiceError::not_found("Camping option field", field_id))
    }
}

pub struct DeleteField<'a, F: CampingOptionFieldRepository + ?Sized> {
    pub repo: &'a F,
}

impl<'a, F: CampingOptionFieldRepository + ?Sized> DeleteField<'a, F> {
    pub async fn execute(&self, actor: &AuthUser, option_id: Uuid, field_id: Uuid) -> ServiceResult<()> {
        access::require_admin(actor)?;
        load_field(self.repo, option_id, field_id).await?;
        self.repo.delete(field_id).await?;
        Ok(())
    }
}

pub struct ReorderFields<'a, F, O>
where
    F: CampingOptionFieldRepository + ?Sized,
    O: CampingOptionRepository + ?Sized,
{
    pub repo: &'a F,
    pub options: &'a O,
}

impl<'a, F, O> ReorderFields<'a, F, O>
where
    F: CampingOptionFieldRepository + ?Sized,
    O: CampingOptionRepository + ?Sized,
{
    pub async fn execute(
        &self,
        actor: &AuthUser,
        option_id: Uuid,
        field_ids: Vec<Uuid>,
    ) -> ServiceResult<Vec<CampingOptionField>> {
        access::require_admin(actor)?;
        ensure_option(self.options, option_id).await?;
        let current: HashSet<Uuid> = self
            .repo
            .list(option_id)
            .await?
            .into_iter()
            .map(|f| f.id)
            .collect();
        let requested: HashSet<Uuid> = field_ids.iter().copied().collect();
        if requested.len() != field_ids.len() || requested != current {
            return Err(ServiceError::bad_request(
                "field_ids must list every field of the camping option exactly once",
            ));
        }
        self.repo.reorder(option_id, &field_ids).await?;
        Ok(self.repo.list(option_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{InMemoryStore, auth_user};
    use crate::domain::users::user::UserRole;

    #[tokio::test]
    async fn new_fields_are_appended() {
        let store = InMemoryStore::default();
        let admin = store.seed_user("admin@example.com", UserRole::Admin).await;
        let option = store.seed_option("RV", 0, 0, &[]).await;
        let create = CreateField {
            repo: &store,
            options: &store,
        };
        for name in ["Vehicle length", "Plate"] {
            create
                .execute(
                    &auth_user(&admin),
                    option.id,
                    FieldInput {
                        display_name: Some(name.into()),
                        data_type: Some(FieldDataType::String),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
        }
        let fields = ListFields {
            repo: &store,
            options: &store,
        }
        .execute(option.id)
        .await
        .unwrap();
        let ordinals: Vec<i32> = fields.iter().map(|f| f.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1]);
        assert_eq!(fields[1].display_name, "Plate");
    }

    #[tokio::test]
    async fn inverted_range_is_rejected() {
        let store = InMemoryStore::default();
        let admin = store.seed_user("admin@example.com", UserRole::Admin).await;
        let option = store.seed_option("RV", 0, 0, &[]).await;
        let err = CreateField {
            repo: &store,
            options: &store,
        }
        .execute(
            &auth_user(&admin),
            option.id,
            FieldInput {
                display_name: Some("Length".into()),
                data_type: Some(FieldDataType::Integer),
                min_value: Some(Some(40.0)),
                max_value: Some(Some(10.0)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));
    }

    #[tokio::test]
    async fn update_checks_merged_range() {
        let store = InMemoryStore::default();
        let admin = store.seed_user("admin@example.com", UserRole::Admin).await;
        let option = store.seed_option("RV", 0, 0, &[]).await;
        let field = store
            .seed_field(option.id, "Length", FieldDataType::Integer, true)
            .await;
        let update = UpdateField { repo: &store };
        update
            .execute(
                &auth_user(&admin),
                option.id,
                field.id,
                FieldInput {
                    max_value: Some(Some(10.0)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let err = update
            .execute(
                &auth_user(&admin),
                option.id,
                field.id,
                FieldInput {
                    min_value: Some(Some(20.0)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));
    }

    #[tokio::test]
    async fn field_of_another_option_is_not_found() {
        let store = InMemoryStore::default();
        let admin = store.seed_user("admin@example.com", UserRole::Admin).await;
        let rv = store.seed_option("RV", 0, 0, &[]).await;
        let tent = store.seed_option("Tent", 0, 0, &[]).await;
        let field = store
            .seed_field(rv.id, "Length", FieldDataType::Integer, true)
            .await;
        let err = DeleteField { repo: &store }
            .execute(&auth_user(&admin), tent.id, field.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn reorder_requires_exact_field_set() {
        let store = InMemoryStore::default();
        let admin = store.seed_user("admin@example.com", UserRole::Admin).await;
        let option = store.seed_option("RV", 0, 0, &[]).await;
        let a = store.seed_field(option.id, "A", FieldDataType::String, false).await;
        let b = store.seed_field(option.id, "B", FieldDataType::String, false).await;
        let reorder = ReorderFields {
            repo: &store,
            options: &store,
        };

        let err = reorder
            .execute(&auth_user(&admin), option.id, vec![b.id])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));
        let err = reorder
            .execute(&auth_user(&admin), option.id, vec![b.id, b.id])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));

        let fields = reorder
            .execute(&auth_user(&admin), option.id, vec![b.id, a.id])
            .await
            .unwrap();
        let ids: Vec<Uuid> = fields.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
        assert_eq!(fields[0].ordinal, 0);
    }

    #[tokio::test]
    async fn participants_cannot_add_fields() {
        let store = InMemoryStore::default();
        let me = store.seed_user("me@example.com", UserRole::Participant).await;
        let option = store.seed_option("RV", 0, 0, &[]).await;
        let err = CreateField {
            repo: &store,
            options: &store,
        }
        .execute(&auth_user(&me), option.id, FieldInput::default())
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }
}
