//! API handlers for the devcloud Web API.

pub mod auth;
pub mod cloud;
pub mod device;
pub mod user;

pub use auth::*;
pub use cloud::*;
pub use device::*;
pub use user::*;
