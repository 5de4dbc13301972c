pub mod fields;
pub mod options;
