//! Classification of driver errors into a closed set of kinds.
//!
//! Classification happens exactly once, at the data-access boundary
//! (`From<sqlx::Error>`); upper layers switch on [`DbErrorKind`] and never
//! inspect SQLSTATE codes or message text themselves.

use thiserror::Error;

/// Closed set of database failure kinds the rest of the crate switches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorKind {
    /// The physical database for a tenant does not exist (3D000).
    TenantNotFound,
    /// Expected table or column is missing (42P01 / 42703). Points at a
    /// tenant database that was provisioned but not migrated.
    SchemaMismatch,
    /// All pooled connections checked out and the acquire timeout elapsed.
    PoolExhausted,
    /// Connection-level failure worth retrying (server down, too many
    /// connections, I/O error, closed pool).
    TransientFailure,
    /// Unique constraint violated (23505). A lost create race, surfaced as
    /// a conflict rather than a server error.
    UniqueViolation,
    /// Query succeeded but matched no row.
    RowNotFound,
    Other,
}

#[derive(Error, Debug)]
#[error("database: {source}")]
pub struct DbError {
    pub kind: DbErrorKind,
    #[source]
    pub source: sqlx::Error,
}

impl From<sqlx::Error> for DbError {
    fn from(source: sqlx::Error) -> Self {
        let kind = classify(&source);
        DbError { kind, source }
    }
}

/// SQLSTATE classes: 3D000 invalid_catalog_name, 42P01 undefined_table,
/// 42703 undefined_column, 53300 too_many_connections, 57P03 cannot_connect_now,
/// 08xxx connection exceptions.
fn classify(err: &sqlx::Error) -> DbErrorKind {
    match err {
        sqlx::Error::PoolTimedOut => DbErrorKind::PoolExhausted,
        sqlx::Error::PoolClosed | sqlx::Error::Io(_) => DbErrorKind::TransientFailure,
        sqlx::Error::RowNotFound => DbErrorKind::RowNotFound,
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some("3D000") => DbErrorKind::TenantNotFound,
            Some("42P01") | Some("42703") => DbErrorKind::SchemaMismatch,
            Some("23505") => DbErrorKind::UniqueViolation,
            Some("53300") | Some("57P03") => DbErrorKind::TransientFailure,
            Some(code) if code.starts_with("08") => DbErrorKind::TransientFailure,
            _ => DbErrorKind::Other,
        },
        _ => DbErrorKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    #[derive(Debug)]
    struct FakePgError(&'static str);

    impl std::fmt::Display for FakePgError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "sqlstate {}", self.0)
        }
    }

    impl std::error::Error for FakePgError {}

    impl sqlx::error::DatabaseError for FakePgError {
        fn message(&self) -> &str {
            "server error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.0))
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::Other
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }
    }

    fn server_error(sqlstate: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(FakePgError(sqlstate)))
    }

    #[test]
    fn sqlstates_map_to_their_kinds() {
        assert_eq!(classify(&server_error("3D000")), DbErrorKind::TenantNotFound);
        assert_eq!(classify(&server_error("42P01")), DbErrorKind::SchemaMismatch);
        assert_eq!(classify(&server_error("53300")), DbErrorKind::TransientFailure);
        assert_eq!(classify(&server_error("08006")), DbErrorKind::TransientFailure);
        assert_eq!(classify(&server_error("22003")), DbErrorKind::Other);
    }

    #[test]
    fn unique_violation_is_a_conflict_not_a_server_error() {
        assert_eq!(classify(&server_error("23505")), DbErrorKind::UniqueViolation);
    }

    #[test]
    fn pool_timeout_classifies_as_exhausted() {
        assert_eq!(classify(&sqlx::Error::PoolTimedOut), DbErrorKind::PoolExhausted);
    }

    #[test]
    fn row_not_found_is_distinct_from_transient() {
        assert_eq!(classify(&sqlx::Error::RowNotFound), DbErrorKind::RowNotFound);
        assert_eq!(classify(&sqlx::Error::PoolClosed), DbErrorKind::TransientFailure);
    }

    #[test]
    fn io_errors_are_transient() {
        let err = sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        ));
        assert_eq!(classify(&err), DbErrorKind::TransientFailure);
    }
}
