pub mod membership;
pub mod organization;
pub mod role;
pub mod session;
pub mod user;

pub use membership::{Member, Membership, MembershipStatus};
pub use organization::Organization;
pub use role::{Role, RoleAssignment, RoleScope, ADMIN_ROLE, MEMBER_ROLE, SEEDED_ROLES};
pub use session::Session;
pub use user::{User, UserResponse, UserState};
