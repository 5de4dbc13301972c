pub mod admin_audit_repository;
pub mod camping_option_field_repository;
pub mod camping_option_repository;
pub mod job_category_repository;
pub mod job_repository;
pub mod notification_port;
pub mod payment_repository;
pub mod registration_repository;
pub mod user_repository;
