//! HTTP handlers for account-service.

pub mod auth;
pub mod members;
pub mod org;

pub use auth::*;
pub use members::*;
pub use org::*;
