//! devcloud - per-user scoped cloud disk
//!
//! Lets authenticated users browse, upload, download and manage files
//! inside a storage root on the server, over a JSON Web API.

pub mod auth;
pub mod cloud;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod web;

pub use auth::{
    authenticate, create_user, CredentialHasher, PasswordError, RegistrationError,
    RegistrationRequest, ValidationError,
};
pub use cloud::{CloudError, ScopedFileBrowser};
pub use config::Config;
pub use db::{Database, NewUser, StorageRootRepository, User, UserRepository, UserUpdate};
pub use error::{DevcloudError, Result};
