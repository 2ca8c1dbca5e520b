//! Services layer for account-service.
//!
//! Registration, login, session refresh and organization membership, plus
//! the token issuer they share.

pub mod account;
pub mod error;
pub mod membership;
pub mod session;

pub use account::{
    AccountService, LoginOutcome, RefreshOutcome, RegisterInput, RegisterOutcome,
    SlugAvailability,
};
pub use error::ServiceError;
pub use membership::{MembershipService, NewMember};
pub use session::{
    AccessTokenClaims, ClientInfo, IssuedSession, RefreshTokenClaims, SessionIssuer, TokenPair,
    TokenType, ACCESS_COOKIE, REFRESH_COOKIE, REFRESH_COOKIE_PATH,
};
