//! Authentication module for devcloud.
//!
//! This module provides password hashing, input validation, account
//! creation and credential checks.

mod login;
mod password;
mod registration;
pub mod validation;

pub use login::authenticate;
pub use password::{CredentialHasher, PasswordError};
pub use registration::{create_user, RegistrationError, RegistrationRequest};
pub use validation::ValidationError;
