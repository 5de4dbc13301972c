pub mod admin;
pub mod auth;
pub mod camping_options;
pub mod jobs;
pub mod payments;
pub mod registrations;
pub mod users;
