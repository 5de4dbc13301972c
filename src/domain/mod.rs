pub mod audit;
pub mod camping;
pub mod jobs;
pub mod payments;
pub mod registrations;
pub mod users;
