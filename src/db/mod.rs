//! Database routing layer: URL parsing, the pool manager, error
//! classification.

pub mod classify;
pub mod pool;
pub mod url;

pub use classify::{DbError, DbErrorKind};
pub use pool::{PoolManager, PoolSettings};
pub use url::{canonical_database_url, parse_database_url, DatabaseUrl};
