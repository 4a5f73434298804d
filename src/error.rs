//! Typed errors, stable machine-readable codes, and HTTP envelope mapping.

use crate::db::classify::DbError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Startup configuration errors. These are fatal: the process refuses to
/// start rather than running insecurely.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("signing secret too short: {got} bytes, need at least {min}")]
    WeakSecret { got: usize, min: usize },
    #[error("invalid value for {var}: {message}")]
    InvalidVar { var: &'static str, message: String },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// No Authorization header (or not a Bearer token) on a protected route.
    #[error("missing authentication token")]
    MissingToken,
    /// Signature, expiry, issuer, audience or payload-shape failure. The
    /// message never says which check failed.
    #[error("invalid or expired token")]
    InvalidToken,
    /// Agency-scoped route reached without an agency bound into the token.
    #[error("no agency context for this request")]
    NoAgencyContext,
    /// X-Agency-Database header disagrees with the token's agency claim.
    #[error("agency context does not match session")]
    AgencyMismatch,
    /// User holds zero roles in the relevant scope.
    #[error("no roles assigned in this scope")]
    NoRoles,
    /// User holds roles, but the effective role is not authorized.
    #[error("insufficient role for this operation")]
    InsufficientRole,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("agency not found: {0}")]
    AgencyNotFound(String),
    #[error("agency is deactivated: {0}")]
    AgencyInactive(String),
    #[error("rate limit exceeded")]
    RateLimited { retry_after_secs: u64 },
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Db(DbError::from(e))
    }
}

impl AppError {
    /// Stable machine-readable code carried in every error response.
    pub fn code(&self) -> &'static str {
        use crate::db::classify::DbErrorKind;
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::MissingToken => "AUTH_MISSING_TOKEN",
            AppError::InvalidToken => "AUTH_INVALID_TOKEN",
            AppError::NoAgencyContext => "RBAC_NO_AGENCY_CONTEXT",
            AppError::AgencyMismatch => "RBAC_AGENCY_MISMATCH",
            AppError::NoRoles => "RBAC_NO_ROLES",
            AppError::InsufficientRole => "RBAC_INSUFFICIENT_ROLE",
            AppError::Forbidden(_) => "RBAC_FORBIDDEN",
            AppError::AgencyNotFound(_) => "AGENCY_NOT_FOUND",
            AppError::AgencyInactive(_) => "AGENCY_INACTIVE",
            AppError::RateLimited { .. } => "RATE_LIMITED",
            AppError::Db(e) => match e.kind {
                DbErrorKind::PoolExhausted => "POOL_EXHAUSTED",
                DbErrorKind::TransientFailure => "DB_UNAVAILABLE",
                DbErrorKind::TenantNotFound => "TENANT_DB_MISSING",
                DbErrorKind::SchemaMismatch => "SCHEMA_MISMATCH",
                DbErrorKind::UniqueViolation => "CONFLICT",
                DbErrorKind::RowNotFound => "NOT_FOUND",
                DbErrorKind::Other => "DATABASE_ERROR",
            },
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Conflict(_) => "CONFLICT",
            AppError::BadRequest(_) => "BAD_REQUEST",
        }
    }

    pub fn status(&self) -> StatusCode {
        use crate::db::classify::DbErrorKind;
        match self {
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::MissingToken | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::NoAgencyContext
            | AppError::AgencyMismatch
            | AppError::NoRoles
            | AppError::InsufficientRole
            | AppError::Forbidden(_)
            | AppError::AgencyInactive(_) => StatusCode::FORBIDDEN,
            AppError::AgencyNotFound(_) | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Db(e) => match e.kind {
                DbErrorKind::PoolExhausted
                | DbErrorKind::TransientFailure
                | DbErrorKind::TenantNotFound => StatusCode::SERVICE_UNAVAILABLE,
                DbErrorKind::RowNotFound => StatusCode::NOT_FOUND,
                DbErrorKind::UniqueViolation => StatusCode::CONFLICT,
                DbErrorKind::SchemaMismatch | DbErrorKind::Other => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: ErrorDetail,
    pub message: String,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// True when APP_ENV=production. Internal details are suppressed there.
fn is_production() -> bool {
    std::env::var("APP_ENV").map(|v| v == "production").unwrap_or(false)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        // 5xx messages may carry internal detail (sqlx text etc.); replace
        // with a generic message in production.
        let message = if status.is_server_error() && is_production() {
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        let retry_after = match &self {
            AppError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };

        let body = ErrorBody {
            success: false,
            error: ErrorDetail {
                code: code.to_string(),
                message: message.clone(),
                details: None,
            },
            message,
        };
        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            if let Ok(v) = axum::http::HeaderValue::from_str(&secs.to_string()) {
                response
                    .headers_mut()
                    .insert(axum::http::header::RETRY_AFTER, v);
            }
        }
        response
    }
}
