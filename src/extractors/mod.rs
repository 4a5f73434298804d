//! Request extractors.

pub mod agency;
pub mod auth;

pub use agency::{AgencyDbHeader, AGENCY_DB_HEADER};
pub use auth::AuthUser;
