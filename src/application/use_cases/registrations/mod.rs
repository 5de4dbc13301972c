pub mod create_registration;
pub mod queries;
pub mod update_registration;
