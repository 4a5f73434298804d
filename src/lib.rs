//! Agency core: multi-tenant database routing, session tokens, and
//! role-hierarchy RBAC for the agency-management backend.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod registry;
pub mod response;
pub mod routes;
pub mod state;

pub use auth::{Claims, Role, RoleRequirement, SessionIdentity, TokenCodec};
pub use config::ServerConfig;
pub use db::{parse_database_url, DatabaseUrl, PoolManager, PoolSettings};
pub use error::{AppError, ConfigError};
pub use extractors::{AgencyDbHeader, AuthUser};
pub use middleware::{base_layers, protect_agency, protect_system, RateLimitState};
pub use registry::{
    ensure_database_exists, ensure_registry_tables, AgencyRecord, AgencyRegistry, NewAgency,
};
pub use response::{success_created, success_many, success_one};
pub use routes::{common_routes, common_routes_with_ready};
pub use state::AppState;
