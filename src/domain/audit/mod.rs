pub mod admin_audit;
