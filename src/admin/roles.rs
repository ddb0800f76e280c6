/// Admin roles and the rules for changing them
use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Account role levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Registered, awaiting approval
    Pending,
    /// Can manage content
    Admin,
    /// Full access, approves registrations and manages admins
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Pending => "pending",
            Role::Admin => "admin",
            Role::SuperAdmin => "superadmin",
        }
    }

    /// Check if this role can perform actions requiring another role
    pub fn can_act_as(&self, required: Role) -> bool {
        self >= &required
    }

    /// Whether the role grants access to the back-office at all
    pub fn is_active(&self) -> bool {
        self.can_act_as(Role::Admin)
    }
}

impl FromStr for Role {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Role::Pending),
            "admin" => Ok(Role::Admin),
            "superadmin" => Ok(Role::SuperAdmin),
            _ => Err(ApiError::Validation(format!("Invalid role: {}", s))),
        }
    }
}

/// Check a role change requested by `actor_id` against `target`
pub fn check_role_change(
    actor_id: &str,
    actor_role: Role,
    target_id: &str,
    new_role: Role,
) -> ApiResult<()> {
    if !actor_role.can_act_as(Role::SuperAdmin) {
        return Err(ApiError::Authorization(
            "Requires superadmin role".to_string(),
        ));
    }
    if actor_id == target_id {
        return Err(ApiError::Validation(
            "You cannot change your own role".to_string(),
        ));
    }
    if new_role == Role::Pending {
        return Err(ApiError::Validation(
            "Role must be admin or superadmin".to_string(),
        ));
    }
    Ok(())
}

/// Check whether `actor` may delete `target`
pub fn check_deletion(
    actor_id: &str,
    actor_role: Role,
    target_id: &str,
    target_role: Role,
) -> ApiResult<()> {
    if !actor_role.can_act_as(Role::SuperAdmin) {
        return Err(ApiError::Authorization(
            "Requires superadmin role".to_string(),
        ));
    }
    if actor_id == target_id {
        return Err(ApiError::Validation(
            "You cannot delete your own account".to_string(),
        ));
    }
    if target_role == Role::SuperAdmin {
        return Err(ApiError::Authorization(
            "Superadmin accounts cannot be deleted".to_string(),
        ));
    }
    Ok(())
}
