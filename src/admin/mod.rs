/// Admin role model and role-change policy
pub mod roles;

pub use roles::{check_deletion, check_role_change, Role};
