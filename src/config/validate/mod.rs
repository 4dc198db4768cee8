//! Configuration validation

mod error;
mod validator;


pub use error::ValidationError;
pub use validator::validate_config;
