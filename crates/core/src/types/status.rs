//! Order status and user role.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Role assigned to a user registered without an explicit one.
pub const DEFAULT_ROLE: &str = "Customer";

/// Order lifecycle status.
///
/// Orders are append-only, so every stored order carries the status it was
/// created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[default]
    Processing,
}

impl OrderStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "Processing",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's role.
///
/// Roles are free-form strings; only the default is meaningful to this
/// service. Blank input falls back to [`DEFAULT_ROLE`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    /// Build a role from optional caller input.
    #[must_use]
    pub fn from_input(input: Option<&str>) -> Self {
        match input.map(str::trim) {
            Some(role) if !role.is_empty() => Self(role.to_owned()),
            _ => Self::default(),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Role {
    fn default() -> Self {
        Self(DEFAULT_ROLE.to_owned())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_default_is_processing() {
        assert_eq!(OrderStatus::default(), OrderStatus::Processing);
        assert_eq!(
            serde_json::to_string(&OrderStatus::Processing).unwrap(),
            "\"Processing\""
        );
    }

    #[test]
    fn test_role_defaults_to_customer() {
        assert_eq!(Role::from_input(None).as_str(), "Customer");
        assert_eq!(Role::from_input(Some("   ")).as_str(), "Customer");
        assert_eq!(Role::from_input(Some("Admin")).as_str(), "Admin");
    }
}
