//! Role-hierarchy authorization decisions.
//!
//! The decision procedure: pick the scope from the route's allowed roles
//! (system-level routes check the main database first, falling back to the
//! agency database for super-admins acting without explicit agency context),
//! fetch the user's roles from that scope, reduce to the effective role
//! (minimum rank), then grant when the effective role is in the allowed set
//! or, with `allow_higher` (the default), outranks one of them. Denials are
//! audit-logged with full context.

use crate::auth::roles::{effective_role, Role, RoleScope};
use crate::auth::store::{AgencyRoleStore, MainRoleStore, RoleStore};
use crate::auth::token::Claims;
use crate::db::pool::PoolManager;
use crate::error::AppError;

/// Role set a route accepts.
#[derive(Debug, Clone)]
pub struct RoleRequirement {
    pub allowed: Vec<Role>,
    /// When set, a role with a numerically lower rank than any allowed role
    /// also passes. Default.
    pub allow_higher: bool,
}

impl RoleRequirement {
    /// Allowed roles, higher authority also accepted.
    pub fn at_least(allowed: impl IntoIterator<Item = Role>) -> Self {
        RoleRequirement {
            allowed: allowed.into_iter().collect(),
            allow_higher: true,
        }
    }

    /// Exactly these roles, no hierarchy escalation.
    pub fn exactly(allowed: impl IntoIterator<Item = Role>) -> Self {
        RoleRequirement {
            allowed: allowed.into_iter().collect(),
            allow_higher: false,
        }
    }

    /// System scope only when every allowed role is system-level; a mixed
    /// set is an agency route that some system roles happen to satisfy.
    pub fn scope(&self) -> RoleScope {
        if !self.allowed.is_empty() && self.allowed.iter().all(|r| r.is_system_level()) {
            RoleScope::System
        } else {
            RoleScope::Agency
        }
    }

    pub fn satisfied_by(&self, effective: Role) -> bool {
        if self.allowed.contains(&effective) {
            return true;
        }
        self.allow_higher && self.allowed.iter().any(|a| effective.rank() <= a.rank())
    }
}

/// Pure grant/deny decision over an already-fetched role set.
pub fn decide(roles: &[Role], requirement: &RoleRequirement) -> Result<Role, AppError> {
    let effective = effective_role(roles).ok_or(AppError::NoRoles)?;
    if requirement.satisfied_by(effective) {
        Ok(effective)
    } else {
        Err(AppError::InsufficientRole)
    }
}

/// Fetch roles for `claims` in the requirement's scope.
///
/// System scope queries the main database; when that returns nothing and the
/// token carries an agency database, the agency store is consulted so a
/// tenant-scoped admin can reach system routes its roles allow. Agency scope
/// requires the token's agency database; ambiguity denies rather than
/// defaulting.
pub async fn roles_in_scope(
    pools: &PoolManager,
    claims: &Claims,
    scope: RoleScope,
) -> Result<Vec<Role>, AppError> {
    match scope {
        RoleScope::System => {
            let main = MainRoleStore::new(pools.main_pool());
            let roles = main.roles_for_user(claims.user_id).await?;
            if !roles.is_empty() {
                return Ok(roles);
            }
            match &claims.agency_database {
                Some(db) => {
                    let store = AgencyRoleStore::new(pools.agency_pool(db)?);
                    store.roles_for_user(claims.user_id).await
                }
                None => Ok(roles),
            }
        }
        RoleScope::Agency => {
            let db = claims
                .agency_database
                .as_deref()
                .ok_or(AppError::NoAgencyContext)?;
            let store = AgencyRoleStore::new(pools.agency_pool(db)?);
            store.roles_for_user(claims.user_id).await
        }
    }
}

/// Full authorization check for one request. Returns the effective role on
/// grant; denials carry their distinct error and are logged for audit.
pub async fn authorize(
    pools: &PoolManager,
    claims: &Claims,
    requirement: &RoleRequirement,
    path: &str,
    method: &str,
) -> Result<Role, AppError> {
    let scope = requirement.scope();
    let roles = match roles_in_scope(pools, claims, scope).await {
        Ok(roles) => roles,
        Err(err) => {
            // Missing agency context is an authorization denial, not an
            // infrastructure failure, and gets the same audit trail.
            if matches!(err, AppError::NoAgencyContext) {
                tracing::warn!(
                    user_id = claims.user_id,
                    email = %claims.email,
                    agency_id = ?claims.agency_id,
                    code = err.code(),
                    path,
                    method,
                    "access denied"
                );
            }
            return Err(err);
        }
    };
    match decide(&roles, requirement) {
        Ok(effective) => {
            tracing::debug!(
                user_id = claims.user_id,
                effective = %effective,
                path,
                method,
                "access granted"
            );
            Ok(effective)
        }
        Err(err) => {
            let required: Vec<&str> = requirement.allowed.iter().map(|r| r.as_str()).collect();
            tracing::warn!(
                user_id = claims.user_id,
                email = %claims.email,
                agency_id = ?claims.agency_id,
                required = ?required,
                effective = ?effective_role(&roles).map(Role::as_str),
                code = err.code(),
                path,
                method,
                "access denied"
            );
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn employee_denied_where_hr_required() {
        let req = RoleRequirement::at_least([Role::Hr]);
        let err = decide(&[Role::Employee], &req).unwrap_err();
        assert!(matches!(err, AppError::InsufficientRole));
    }

    #[test]
    fn super_admin_granted_where_admin_required() {
        let req = RoleRequirement::at_least([Role::Admin]);
        assert_eq!(decide(&[Role::SuperAdmin], &req).unwrap(), Role::SuperAdmin);
    }

    #[test]
    fn zero_roles_is_a_distinct_denial() {
        let req = RoleRequirement::at_least([Role::Hr]);
        assert!(matches!(decide(&[], &req).unwrap_err(), AppError::NoRoles));
    }

    #[test]
    fn exact_match_without_escalation() {
        let req = RoleRequirement::exactly([Role::Accountant]);
        assert_eq!(decide(&[Role::Accountant], &req).unwrap(), Role::Accountant);
        // Cfo outranks accountant but escalation is off for this route.
        assert!(matches!(
            decide(&[Role::Cfo], &req).unwrap_err(),
            AppError::InsufficientRole
        ));
    }

    #[test]
    fn effective_role_is_the_strongest_held() {
        let req = RoleRequirement::at_least([Role::Manager]);
        // Holds intern and director; director (rank 8) is effective and
        // outranks manager (rank 10).
        assert_eq!(
            decide(&[Role::Intern, Role::Director], &req).unwrap(),
            Role::Director
        );
    }

    #[test]
    fn scope_selection() {
        assert_eq!(
            RoleRequirement::at_least([Role::SuperAdmin, Role::Admin]).scope(),
            RoleScope::System
        );
        assert_eq!(
            RoleRequirement::at_least([Role::Hr]).scope(),
            RoleScope::Agency
        );
        // Mixed sets are agency-scoped.
        assert_eq!(
            RoleRequirement::at_least([Role::Admin, Role::Manager]).scope(),
            RoleScope::Agency
        );
    }
}
