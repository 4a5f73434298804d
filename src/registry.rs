//! Tenant registry: agency records in the main database, provisioning and
//! teardown of per-agency databases.

use crate::db::pool::{is_valid_database_name, PoolManager};
use crate::db::url::parse_database_url;
use crate::error::AppError;
use sqlx::ConnectOptions;
use sqlx::PgPool;
use std::str::FromStr;

/// One row of the `agencies` table. Active agencies are never deleted while
/// sessions may reference them; deactivation is a soft delete via
/// `is_active`.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct AgencyRecord {
    pub id: i64,
    pub name: String,
    pub domain: Option<String>,
    pub database_name: String,
    pub is_active: bool,
    pub subscription_plan: String,
    pub max_users: i32,
    pub owner_user_id: Option<i64>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct NewAgency {
    pub name: String,
    pub domain: Option<String>,
    pub database_name: String,
    pub subscription_plan: String,
    pub max_users: i32,
    pub owner_user_id: Option<i64>,
}

/// Registry operations against the main database.
#[derive(Clone)]
pub struct AgencyRegistry {
    main: PgPool,
}

impl AgencyRegistry {
    pub fn new(main: PgPool) -> Self {
        AgencyRegistry { main }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<AgencyRecord>, AppError> {
        let rec = sqlx::query_as::<_, AgencyRecord>(
            "SELECT id, name, domain, database_name, is_active, subscription_plan, max_users, owner_user_id \
             FROM agencies WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.main)
        .await?;
        Ok(rec)
    }

    pub async fn find_by_database(&self, database_name: &str) -> Result<Option<AgencyRecord>, AppError> {
        let rec = sqlx::query_as::<_, AgencyRecord>(
            "SELECT id, name, domain, database_name, is_active, subscription_plan, max_users, owner_user_id \
             FROM agencies WHERE database_name = $1",
        )
        .bind(database_name)
        .fetch_optional(&self.main)
        .await?;
        Ok(rec)
    }

    pub async fn list(&self) -> Result<Vec<AgencyRecord>, AppError> {
        let recs = sqlx::query_as::<_, AgencyRecord>(
            "SELECT id, name, domain, database_name, is_active, subscription_plan, max_users, owner_user_id \
             FROM agencies ORDER BY id",
        )
        .fetch_all(&self.main)
        .await?;
        Ok(recs)
    }

    /// Resolve an agency id to its database name. Unknown and deactivated
    /// agencies fail distinctly.
    pub async fn database_for(&self, agency_id: i64) -> Result<String, AppError> {
        let rec = self
            .find_by_id(agency_id)
            .await?
            .ok_or_else(|| AppError::AgencyNotFound(agency_id.to_string()))?;
        if !rec.is_active {
            return Err(AppError::AgencyInactive(rec.name));
        }
        Ok(rec.database_name)
    }

    /// Provision a tenant: insert the registry row, create the physical
    /// database, and lay down its schema through the pool manager.
    pub async fn create(
        &self,
        agency: &NewAgency,
        pools: &PoolManager,
    ) -> Result<AgencyRecord, AppError> {
        if !is_valid_database_name(&agency.database_name) {
            return Err(AppError::Validation(format!(
                "invalid database name: {}",
                agency.database_name
            )));
        }
        if self.find_by_database(&agency.database_name).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "database name already registered: {}",
                agency.database_name
            )));
        }

        let rec = sqlx::query_as::<_, AgencyRecord>(
            "INSERT INTO agencies (name, domain, database_name, is_active, subscription_plan, max_users, owner_user_id) \
             VALUES ($1, $2, $3, TRUE, $4, $5, $6) \
             RETURNING id, name, domain, database_name, is_active, subscription_plan, max_users, owner_user_id",
        )
        .bind(&agency.name)
        .bind(&agency.domain)
        .bind(&agency.database_name)
        .bind(&agency.subscription_plan)
        .bind(agency.max_users)
        .bind(agency.owner_user_id)
        .fetch_one(&self.main)
        .await?;

        // CREATE DATABASE cannot run inside a transaction; a failure here
        // leaves the row in place and the call can be retried.
        let exists: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
                .bind(&agency.database_name)
                .fetch_one(&self.main)
                .await?;
        if !exists.0 {
            sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&agency.database_name)))
                .execute(&self.main)
                .await?;
        }

        let agency_pool = pools.agency_pool(&agency.database_name)?;
        ensure_agency_tables(&agency_pool).await?;

        tracing::info!(agency_id = rec.id, database = %rec.database_name, "agency provisioned");
        Ok(rec)
    }

    /// Soft delete. Existing sessions keep routing to the agency database
    /// until their tokens expire; new logins are refused.
    pub async fn deactivate(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE agencies SET is_active = FALSE WHERE id = $1")
            .bind(id)
            .execute(&self.main)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::AgencyNotFound(id.to_string()));
        }
        tracing::info!(agency_id = id, "agency deactivated");
        Ok(())
    }

    /// Admin-triggered deletion: drop the registry row and close the live
    /// pool. The physical database is left for operators to archive or drop.
    pub async fn remove(&self, id: i64, pools: &PoolManager) -> Result<(), AppError> {
        let rec = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::AgencyNotFound(id.to_string()))?;
        sqlx::query("DELETE FROM agencies WHERE id = $1")
            .bind(id)
            .execute(&self.main)
            .await?;
        pools.evict(&rec.database_name).await;
        tracing::info!(agency_id = id, database = %rec.database_name, "agency removed");
        Ok(())
    }
}

/// Create the main database's registry tables if missing.
pub async fn ensure_registry_tables(pool: &PgPool) -> Result<(), AppError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS agencies (
            id BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL,
            domain TEXT,
            database_name TEXT NOT NULL UNIQUE,
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            subscription_plan TEXT NOT NULL DEFAULT 'starter',
            max_users INTEGER NOT NULL DEFAULT 25,
            owner_user_id BIGINT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    // System roles: agency_id IS NULL.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_roles (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL,
            role TEXT NOT NULL,
            agency_id BIGINT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (user_id, role, agency_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create an agency database's role table if missing. Called after
/// provisioning and safe to repeat.
pub async fn ensure_agency_tables(pool: &PgPool) -> Result<(), AppError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_roles (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL,
            role TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (user_id, role)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Ensure the database in `database_url` exists; create it if not. Connects
/// to the default `postgres` database to run CREATE DATABASE. Call before
/// creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let parsed = parse_database_url(database_url).ok_or_else(|| {
        AppError::BadRequest("DATABASE_URL is not a parseable connection string".into())
    })?;
    if parsed.database.is_empty() || parsed.database == "postgres" {
        return Ok(());
    }
    let mut admin = parsed.clone();
    admin.database = "postgres".into();
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin.canonical())
        .map_err(|e| AppError::BadRequest(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(&parsed.database)
            .fetch_one(&mut conn)
            .await?;
    if !exists.0 {
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&parsed.database)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn quote_ident(name: &str) -> String {
    // Quoted identifiers escape a double quote by doubling it.
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("acme_db"), "\"acme_db\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
