use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Role;

/// How a role reached a user. The distinction is informational: a role grants
/// identically through any source, the label only records the closest path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleSource {
    Direct,
    GroupDirect,
    GroupInherited,
}

impl RoleSource {
    /// Lower ranks win when the same role is reachable through several paths.
    pub fn rank(&self) -> u8 {
        match self {
            RoleSource::Direct => 0,
            RoleSource::GroupDirect => 1,
            RoleSource::GroupInherited => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleSource::Direct => "direct",
            RoleSource::GroupDirect => "group_direct",
            RoleSource::GroupInherited => "group_inherited",
        }
    }
}

/// A resolved role for one user in one organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveRole {
    pub role: Role,
    pub source: RoleSource,
    /// Group the grant was found on, when source is group-based.
    pub group_id: Option<Uuid>,
    pub group_name: Option<String>,
    /// Group ids from the member's group up to the granting group.
    pub inheritance_path: Vec<Uuid>,
    /// Hops between the member's group and the granting group; 0 for direct
    /// and group-direct grants.
    pub distance: u32,
}

impl EffectiveRole {
    pub fn direct(role: Role) -> Self {
        Self {
            role,
            source: RoleSource::Direct,
            group_id: None,
            group_name: None,
            inheritance_path: Vec::new(),
            distance: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_precedence_order() {
        assert!(RoleSource::Direct.rank() < RoleSource::GroupDirect.rank());
        assert!(RoleSource::GroupDirect.rank() < RoleSource::GroupInherited.rank());
    }

    #[test]
    fn test_source_labels() {
        assert_eq!(RoleSource::Direct.as_str(), "direct");
        assert_eq!(RoleSource::GroupDirect.as_str(), "group_direct");
        assert_eq!(RoleSource::GroupInherited.as_str(), "group_inherited");
    }
}
