pub mod notifications;
pub mod validation;
