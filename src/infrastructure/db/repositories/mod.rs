pub mod admin_audit_repository_sqlx;
pub mod camping_option_field_repository_sqlx;
pub mod camping_option_repository_sqlx;
pub mod job_category_repository_sqlx;
pub mod job_repository_sqlx;
pub mod payment_repository_sqlx;
pub mod registration_repository_sqlx;
pub mod user_repository_sqlx;
