//! Web API module for devcloud.
//!
//! JSON REST API over the scoped file browser, with JWT sessions carried
//! in a bearer header or an HttpOnly cookie.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::{create_router, RouterConfig};
pub use server::WebServer;
