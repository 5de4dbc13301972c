pub mod pagination;
pub mod settings;
