//! Session tokens and role-based authorization.

pub mod rbac;
pub mod roles;
pub mod store;
pub mod token;

pub use rbac::{authorize, RoleRequirement};
pub use roles::{effective_role, Role, RoleScope, SYSTEM_ROLES};
pub use store::{AgencyRoleStore, MainRoleStore, RoleStore};
pub use token::{Claims, SessionIdentity, TokenCodec, TOKEN_AUDIENCE, TOKEN_ISSUER};
