//! The single capability check every command goes through.

/// What the platform tells us about the member issuing a command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerPermissions {
    pub administrator: bool,
    pub role_names: Vec<String>,
}

pub trait PermissionCheck: Send + Sync {
    fn is_privileged(&self, caller: &CallerPermissions) -> bool;
}

/// Administrators, or members holding the configured DJ role.
#[derive(Debug, Clone)]
pub struct RolePermissionCheck {
    role_name: String,
}

impl RolePermissionCheck {
    pub fn new(role_name: impl Into<String>) -> Self {
        Self {
            role_name: role_name.into(),
        }
    }

    pub fn role_name(&self) -> &str {
        &self.role_name
    }
}

impl Default for RolePermissionCheck {
    fn default() -> Self {
        Self::new("DJ")
    }
}

impl PermissionCheck for RolePermissionCheck {
    fn is_privileged(&self, caller: &CallerPermissions) -> bool {
        caller.administrator || caller.role_names.iter().any(|r| *r == self.role_name)
    }
}
