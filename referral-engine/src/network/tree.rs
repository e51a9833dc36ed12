//! Nested tree construction for reporting

use super::ReferralNetwork;
use shared::models::{Account, TreeNode};
use std::collections::HashSet;

impl ReferralNetwork {
    /// Build the nested view rooted at `root_id`
    ///
    /// Recomputed from the current accounts on every call. Dangling child
    /// ids are omitted, and an account already on the path is never expanded
    /// twice, so a corrupted cycle cannot recurse forever.
    pub fn build_tree(&self, root_id: &str) -> Option<TreeNode> {
        let root = self.get(root_id)?;
        let mut visited = HashSet::new();
        Some(self.build_node(root, &mut visited))
    }

    fn build_node<'a>(&'a self, account: &'a Account, visited: &mut HashSet<&'a str>) -> TreeNode {
        visited.insert(account.id.as_str());

        let mut children = Vec::with_capacity(account.referrals.len());
        for child in self.children(&account.id) {
            if visited.contains(child.id.as_str()) {
                tracing::warn!(
                    parent_id = %account.id,
                    child_id = %child.id,
                    "Referral cycle detected while building tree, branch skipped"
                );
                continue;
            }
            children.push(self.build_node(child, visited));
        }

        TreeNode {
            id: account.id.clone(),
            username: account.username.clone(),
            name: account.name.clone(),
            points: account.points,
            task1_completed: account.task1_completed,
            task2_completed: account.task2_completed,
            children,
        }
    }
}
