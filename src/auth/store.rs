//! Role lookups against the main or an agency database.
//!
//! The two implementations differ only in which rows count: system roles
//! live in the main database with agency_id NULL; agency roles live inside
//! the agency's own database. Rows with unknown role names are skipped with
//! a warning rather than failing the lookup.

use crate::auth::roles::Role;
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::PgPool;
use std::str::FromStr;

#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn roles_for_user(&self, user_id: i64) -> Result<Vec<Role>, AppError>;
}

/// System-level roles from the main database.
pub struct MainRoleStore {
    pool: PgPool,
}

impl MainRoleStore {
    pub fn new(pool: PgPool) -> Self {
        MainRoleStore { pool }
    }
}

#[async_trait]
impl RoleStore for MainRoleStore {
    async fn roles_for_user(&self, user_id: i64) -> Result<Vec<Role>, AppError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT role FROM user_roles WHERE user_id = $1 AND agency_id IS NULL")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(parse_roles(user_id, rows))
    }
}

/// Tenant-scoped roles from one agency's database.
pub struct AgencyRoleStore {
    pool: PgPool,
}

impl AgencyRoleStore {
    pub fn new(pool: PgPool) -> Self {
        AgencyRoleStore { pool }
    }
}

#[async_trait]
impl RoleStore for AgencyRoleStore {
    async fn roles_for_user(&self, user_id: i64) -> Result<Vec<Role>, AppError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT role FROM user_roles WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(parse_roles(user_id, rows))
    }
}

fn parse_roles(user_id: i64, rows: Vec<(String,)>) -> Vec<Role> {
    let mut roles = Vec::with_capacity(rows.len());
    for (name,) in rows {
        match Role::from_str(&name) {
            Ok(role) => roles.push(role),
            Err(_) => {
                tracing::warn!(user_id, role = %name, "unknown role name in user_roles, skipping");
            }
        }
    }
    roles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_role_rows_are_skipped() {
        let roles = parse_roles(
            7,
            vec![
                ("hr".to_string(),),
                ("wizard".to_string(),),
                ("employee".to_string(),),
            ],
        );
        assert_eq!(roles, vec![Role::Hr, Role::Employee]);
    }
}
