//! Branch scoping for staff accounts.
//!
//! Apartment managers only see and change records of their own branch;
//! super admins see every branch and may narrow to one.

use db::models::profile::{Profile, UserRole};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("You do not have permission to perform this action")]
    Forbidden,
    #[error("Record belongs to another branch")]
    OtherBranch,
    #[error("Your account is not assigned to a branch")]
    MissingBranch,
    #[error("A branch must be specified")]
    BranchRequired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchScope {
    All,
    Branch(String),
}

impl BranchScope {
    /// Scope of a staff profile; tenants have none.
    pub fn for_profile(profile: &Profile) -> Result<Self, AccessError> {
        match profile.role {
            UserRole::SuperAdmin => Ok(BranchScope::All),
            UserRole::ApartmentManager => profile
                .branch
                .clone()
                .filter(|b| !b.trim().is_empty())
                .map(BranchScope::Branch)
                .ok_or(AccessError::MissingBranch),
            UserRole::Tenant => Err(AccessError::Forbidden),
        }
    }

    /// `None` means no branch filter.
    pub fn filter(&self) -> Option<&str> {
        match self {
            BranchScope::All => None,
            BranchScope::Branch(branch) => Some(branch.as_str()),
        }
    }

    pub fn allows(&self, branch: &str) -> bool {
        match self {
            BranchScope::All => true,
            BranchScope::Branch(own) => own == branch,
        }
    }

    pub fn ensure(&self, branch: &str) -> Result<(), AccessError> {
        if self.allows(branch) {
            Ok(())
        } else {
            Err(AccessError::OtherBranch)
        }
    }

    /// Apply an optional `?branch=` request filter.
    pub fn narrow(self, requested: Option<&str>) -> Result<Self, AccessError> {
        match (self, requested.map(str::trim).filter(|b| !b.is_empty())) {
            (scope, None) => Ok(scope),
            (BranchScope::All, Some(branch)) => Ok(BranchScope::Branch(branch.to_string())),
            (BranchScope::Branch(own), Some(branch)) if own == branch => Ok(BranchScope::Branch(own)),
            (BranchScope::Branch(_), Some(_)) => Err(AccessError::OtherBranch),
        }
    }

    /// Concrete branch for creating a record.
    pub fn resolve(&self, requested: Option<&str>) -> Result<String, AccessError> {
        match self.clone().narrow(requested)? {
            BranchScope::Branch(branch) => Ok(branch),
            BranchScope::All => Err(AccessError::BranchRequired),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn profile(role: UserRole, branch: Option<&str>) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            email: "staff@example.com".into(),
            first_name: "Staff".into(),
            last_name: "Member".into(),
            contact_number: None,
            role,
            branch: branch.map(str::to_string),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn manager_is_limited_to_own_branch() {
        let scope = BranchScope::for_profile(&profile(UserRole::ApartmentManager, Some("cainta"))).unwrap();
        assert_eq!(scope.filter(), Some("cainta"));
        assert!(scope.allows("cainta"));
        assert_eq!(scope.ensure("cubao"), Err(AccessError::OtherBranch));
        assert_eq!(scope.clone().narrow(Some("cubao")), Err(AccessError::OtherBranch));
        assert_eq!(scope.resolve(None).unwrap(), "cainta");
    }

    #[test]
    fn super_admin_may_narrow() {
        let scope = BranchScope::for_profile(&profile(UserRole::SuperAdmin, None)).unwrap();
        assert_eq!(scope.filter(), None);
        assert_eq!(
            scope.clone().narrow(Some("cubao")).unwrap(),
            BranchScope::Branch("cubao".into())
        );
        assert_eq!(scope.resolve(None), Err(AccessError::BranchRequired));
    }

    #[test]
    fn tenants_and_unassigned_managers_have_no_scope() {
        assert_eq!(
            BranchScope::for_profile(&profile(UserRole::Tenant, Some("cainta"))),
            Err(AccessError::Forbidden)
        );
        assert_eq!(
            BranchScope::for_profile(&profile(UserRole::ApartmentManager, None)),
            Err(AccessError::MissingBranch)
        );
    }
}
