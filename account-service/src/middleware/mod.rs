pub mod auth;
pub mod client_info;

pub use auth::{AuthUser, MaybeAuthUser};
