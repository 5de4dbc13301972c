pub mod audit;
pub mod cancel_registration;
pub mod edit_registration;
