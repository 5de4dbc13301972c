pub mod access;
pub mod dto;
pub mod errors;
pub mod ports;
pub mod services;
pub mod use_cases;

#[cfg(test)]
pub mod test_support;
