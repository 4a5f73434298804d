//! Extract the optional per-request agency database header.

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Header carrying the client's claimed agency database. Optional; when
/// present it must match the token's claim (see
/// `middleware::require_agency_context`).
pub const AGENCY_DB_HEADER: &str = "X-Agency-Database";

/// Extractor for the optional `X-Agency-Database` header.
#[derive(Clone, Debug)]
pub struct AgencyDbHeader(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for AgencyDbHeader
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(AGENCY_DB_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Ok(AgencyDbHeader(value))
    }
}
