use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::{Group, Organization};

/// One node of an organization's group tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupNode {
    pub group: Group,
    pub children: Vec<GroupNode>,
}

/// Composite hierarchy view for one organization: chain to the root, direct
/// children, and the org's group tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationHierarchy {
    pub organization: Organization,
    /// Nearest ancestor first, root last.
    pub parent_chain: Vec<Organization>,
    pub children: Vec<Organization>,
    pub groups: Vec<GroupNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationStats {
    pub organization_id: Uuid,
    pub child_count: i64,
    pub group_count: i64,
    pub user_count: i64,
    pub generated_at: DateTime<Utc>,
}

/// Build a group tree from a flat list. Groups whose parent is missing from
/// the list surface as roots rather than being dropped.
pub fn build_group_tree(groups: Vec<Group>) -> Vec<GroupNode> {
    let present: std::collections::HashSet<Uuid> = groups.iter().map(|g| g.id).collect();

    let mut children_map: HashMap<Uuid, Vec<Group>> = HashMap::new();
    let mut roots: Vec<Group> = Vec::new();

    for group in groups {
        match group.parent_id {
            Some(parent_id) if present.contains(&parent_id) => {
                children_map.entry(parent_id).or_default().push(group);
            }
            _ => roots.push(group),
        }
    }

    fn build_subtree(group: Group, children_map: &HashMap<Uuid, Vec<Group>>) -> GroupNode {
        let group_id = group.id;
        let children = children_map
            .get(&group_id)
            .map(|children| {
                children
                    .iter()
                    .cloned()
                    .map(|child| build_subtree(child, children_map))
                    .collect()
            })
            .unwrap_or_default();

        GroupNode { group, children }
    }

    roots
        .into_iter()
        .map(|group| build_subtree(group, &children_map))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(org: Uuid, name: &str, parent: Option<Uuid>) -> Group {
        Group::new(org, name.to_string(), None, parent)
    }

    #[test]
    fn test_build_group_tree_nests_children() {
        let org = Uuid::new_v4();
        let root = group(org, "engineering", None);
        let child = group(org, "backend", Some(root.id));
        let grandchild = group(org, "storage", Some(child.id));

        let tree = build_group_tree(vec![grandchild, root.clone(), child]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].group.id, root.id);
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].children.len(), 1);
    }

    #[test]
    fn test_orphan_becomes_root() {
        let org = Uuid::new_v4();
        let orphan = group(org, "stranded", Some(Uuid::new_v4()));
        let tree = build_group_tree(vec![orphan.clone()]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].group.id, orphan.id);
    }
}
