//! Role names and their fixed authority ordering.
//!
//! The hierarchy is a static total order: rank 1 (`super_admin`) outranks
//! everything, rank 22 (`intern`) outranks nothing. Ranks are ordinal only;
//! no arithmetic beyond comparison is meaningful.

use crate::error::AppError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Ceo,
    Coo,
    Cfo,
    Cto,
    Vp,
    Director,
    SeniorManager,
    Manager,
    Hr,
    TeamLead,
    ProjectManager,
    SeniorEmployee,
    Accountant,
    Recruiter,
    Sales,
    Marketing,
    Support,
    Employee,
    Contractor,
    Intern,
}

/// Roles that are checked against the main database (agency_id IS NULL).
pub const SYSTEM_ROLES: &[Role] = &[Role::SuperAdmin, Role::Admin, Role::Ceo];

impl Role {
    /// Ordinal authority rank; lower means more authority.
    pub fn rank(self) -> u8 {
        match self {
            Role::SuperAdmin => 1,
            Role::Admin => 2,
            Role::Ceo => 3,
            Role::Coo => 4,
            Role::Cfo => 5,
            Role::Cto => 6,
            Role::Vp => 7,
            Role::Director => 8,
            Role::SeniorManager => 9,
            Role::Manager => 10,
            Role::Hr => 11,
            Role::TeamLead => 12,
            Role::ProjectManager => 13,
            Role::SeniorEmployee => 14,
            Role::Accountant => 15,
            Role::Recruiter => 16,
            Role::Sales => 17,
            Role::Marketing => 18,
            Role::Support => 19,
            Role::Employee => 20,
            Role::Contractor => 21,
            Role::Intern => 22,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::Ceo => "ceo",
            Role::Coo => "coo",
            Role::Cfo => "cfo",
            Role::Cto => "cto",
            Role::Vp => "vp",
            Role::Director => "director",
            Role::SeniorManager => "senior_manager",
            Role::Manager => "manager",
            Role::Hr => "hr",
            Role::TeamLead => "team_lead",
            Role::ProjectManager => "project_manager",
            Role::SeniorEmployee => "senior_employee",
            Role::Accountant => "accountant",
            Role::Recruiter => "recruiter",
            Role::Sales => "sales",
            Role::Marketing => "marketing",
            Role::Support => "support",
            Role::Employee => "employee",
            Role::Contractor => "contractor",
            Role::Intern => "intern",
        }
    }

    /// Whether this role is resolved against the main database rather than
    /// an agency database.
    pub fn is_system_level(self) -> bool {
        SYSTEM_ROLES.contains(&self)
    }

    /// True when `self` has at least the authority of `other`.
    pub fn at_least(self, other: Role) -> bool {
        self.rank() <= other.rank()
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let role = match s.to_lowercase().as_str() {
            "super_admin" => Role::SuperAdmin,
            "admin" => Role::Admin,
            "ceo" => Role::Ceo,
            "coo" => Role::Coo,
            "cfo" => Role::Cfo,
            "cto" => Role::Cto,
            "vp" => Role::Vp,
            "director" => Role::Director,
            "senior_manager" => Role::SeniorManager,
            "manager" => Role::Manager,
            "hr" => Role::Hr,
            "team_lead" => Role::TeamLead,
            "project_manager" => Role::ProjectManager,
            "senior_employee" => Role::SeniorEmployee,
            "accountant" => Role::Accountant,
            "recruiter" => Role::Recruiter,
            "sales" => Role::Sales,
            "marketing" => Role::Marketing,
            "support" => Role::Support,
            "employee" => Role::Employee,
            "contractor" => Role::Contractor,
            "intern" => Role::Intern,
            _ => return Err(AppError::BadRequest(format!("unknown role: {}", s))),
        };
        Ok(role)
    }
}

/// Which database a role lookup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleScope {
    /// Main database; system roles carry agency_id NULL.
    System,
    /// The agency database bound into the session token.
    Agency,
}

/// Reduce a role set to the single highest-authority role (minimum rank).
/// `None` when the user holds no roles in the scope.
pub fn effective_role(roles: &[Role]) -> Option<Role> {
    roles.iter().copied().min_by_key(|r| r.rank())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn hierarchy_is_a_total_order_over_22_roles() {
        let all = [
            Role::SuperAdmin,
            Role::Admin,
            Role::Ceo,
            Role::Coo,
            Role::Cfo,
            Role::Cto,
            Role::Vp,
            Role::Director,
            Role::SeniorManager,
            Role::Manager,
            Role::Hr,
            Role::TeamLead,
            Role::ProjectManager,
            Role::SeniorEmployee,
            Role::Accountant,
            Role::Recruiter,
            Role::Sales,
            Role::Marketing,
            Role::Support,
            Role::Employee,
            Role::Contractor,
            Role::Intern,
        ];
        let mut ranks: Vec<u8> = all.iter().map(|r| r.rank()).collect();
        ranks.sort_unstable();
        assert_eq!(ranks, (1..=22).collect::<Vec<u8>>());
    }

    #[test]
    fn super_admin_outranks_intern() {
        assert!(Role::SuperAdmin.at_least(Role::Intern));
        assert!(!Role::Intern.at_least(Role::SuperAdmin));
        assert!(Role::Manager.at_least(Role::Manager));
    }

    #[test]
    fn hr_outranks_employee() {
        assert!(Role::Hr.rank() < Role::Employee.rank());
        assert!(!Role::Employee.at_least(Role::Hr));
    }

    #[test]
    fn effective_role_picks_minimum_rank() {
        assert_eq!(
            effective_role(&[Role::Employee, Role::Hr, Role::Intern]),
            Some(Role::Hr)
        );
        assert_eq!(effective_role(&[]), None);
    }

    #[test]
    fn round_trips_through_strings() {
        for s in ["super_admin", "hr", "team_lead", "intern"] {
            assert_eq!(Role::from_str(s).unwrap().as_str(), s);
        }
        assert!(Role::from_str("wizard").is_err());
    }

    #[test]
    fn system_roles_are_the_fixed_trio() {
        assert!(Role::SuperAdmin.is_system_level());
        assert!(Role::Admin.is_system_level());
        assert!(Role::Ceo.is_system_level());
        assert!(!Role::Coo.is_system_level());
        assert!(!Role::Employee.is_system_level());
    }
}
