//! Content-signature discovery of dashboard blocks.
//!
//! The page tree is externally editable and block ids are not stable across
//! runs, so the dashboard re-identifies its blocks every run by matching
//! static signatures against each block's text probe. The scan is read-only
//! and safe to repeat.

use notion::Block;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, warn};

/// Semantic roles the dashboard manages inside the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    AgeCounter,
    SeasonCounter,
    SettingsToggle,
}

/// A content-matching rule binding a role to a block without a stored id.
#[derive(Debug, Clone)]
pub struct Signature {
    pub role: Role,
    tokens: &'static [&'static str],
}

impl Signature {
    pub const fn new(role: Role, tokens: &'static [&'static str]) -> Self {
        Self { role, tokens }
    }

    /// True when the probe string contains any of the signature's tokens.
    pub fn matches(&self, probe: &str) -> bool {
        self.tokens.iter().any(|token| probe.contains(token))
    }
}

/// The signatures for the fixed set of managed blocks.
pub fn default_signatures() -> Vec<Signature> {
    vec![
        Signature::new(Role::AgeCounter, &["Age:", "D+"]),
        Signature::new(Role::SeasonCounter, &["Season:"]),
        Signature::new(Role::SettingsToggle, &["Settings"]),
    ]
}

/// Read seam between the engine and the remote tree. The real client
/// fetches over the network; tests drive everything from an in-memory tree.
#[allow(async_fn_in_trait)]
pub trait BlockSource {
    /// Fetch every direct child of a node, following pagination.
    async fn children_of(&self, block_id: &str) -> Result<Vec<Block>, notion::Error>;

    /// Retrieve a single block.
    async fn block(&self, block_id: &str) -> Result<Block, notion::Error>;
}

impl BlockSource for notion::Notion {
    async fn children_of(&self, block_id: &str) -> Result<Vec<Block>, notion::Error> {
        self.list_all_children(block_id).await
    }

    async fn block(&self, block_id: &str) -> Result<Block, notion::Error> {
        self.retrieve_block(block_id).await
    }
}

/// Breadth-first scan of the tree under `root_id`, binding roles to block
/// ids by first match.
///
/// A node cannot satisfy a role that is already resolved, but one node may
/// satisfy several roles. The all-roles-resolved check runs only after a
/// dequeued node's complete child list has been classified; this batch
/// granularity decides which sibling wins a contested role and is load
/// bearing. A failed child fetch skips that subtree and the scan continues;
/// a visited set guards against cycles the remote tree may expose.
pub async fn scan<S: BlockSource>(
    source: &S,
    root_id: &str,
    signatures: &[Signature],
) -> HashMap<Role, String> {
    let total_roles = signatures
        .iter()
        .map(|s| s.role)
        .collect::<HashSet<_>>()
        .len();

    let mut resolved: HashMap<Role, String> = HashMap::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = VecDeque::new();

    visited.insert(root_id.to_string());
    queue.push_back(root_id.to_string());

    while let Some(node_id) = queue.pop_front() {
        let children = match source.children_of(&node_id).await {
            Ok(children) => children,
            Err(e) => {
                warn!(node = %node_id, error = %e, "child fetch failed, skipping subtree");
                continue;
            }
        };

        for child in &children {
            let probe = child.probe_text();
            for signature in signatures {
                if !resolved.contains_key(&signature.role) && signature.matches(&probe) {
                    debug!(role = ?signature.role, block = %child.id, "role resolved");
                    resolved.insert(signature.role, child.id.clone());
                }
            }
            if child.has_children && visited.insert(child.id.clone()) {
                queue.push_back(child.id.clone());
            }
        }

        if resolved.len() == total_roles {
            break;
        }
    }

    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TreeSource;

    #[tokio::test]
    async fn test_scan_resolves_all_roles() {
        let mut tree = TreeSource::new();
        tree.add("page", "b1", "paragraph", "Some note", false);
        tree.add("page", "b2", "callout", "Age: 10 years (D+3653)", false);
        tree.add("page", "b3", "callout", "Season: Autumn no. 11", false);
        tree.add("page", "b4", "toggle", "⚙️ Settings", true);

        let roles = scan(&tree, "page", &default_signatures()).await;
        assert_eq!(roles.get(&Role::AgeCounter).map(String::as_str), Some("b2"));
        assert_eq!(
            roles.get(&Role::SeasonCounter).map(String::as_str),
            Some("b3")
        );
        assert_eq!(
            roles.get(&Role::SettingsToggle).map(String::as_str),
            Some("b4")
        );
    }

    #[tokio::test]
    async fn test_scan_first_sibling_wins() {
        let mut tree = TreeSource::new();
        tree.add("page", "first", "callout", "Age: old text", false);
        tree.add("page", "second", "callout", "Age: newer text", false);

        let roles = scan(&tree, "page", &default_signatures()).await;
        assert_eq!(
            roles.get(&Role::AgeCounter).map(String::as_str),
            Some("first")
        );
    }

    #[tokio::test]
    async fn test_scan_one_node_may_claim_several_roles() {
        let mut tree = TreeSource::new();
        tree.add(
            "page",
            "combined",
            "callout",
            "Age: D+1 and Season: Spring no. 1",
            false,
        );

        let roles = scan(&tree, "page", &default_signatures()).await;
        assert_eq!(
            roles.get(&Role::AgeCounter).map(String::as_str),
            Some("combined")
        );
        assert_eq!(
            roles.get(&Role::SeasonCounter).map(String::as_str),
            Some("combined")
        );
        assert!(!roles.contains_key(&Role::SettingsToggle));
    }

    #[tokio::test]
    async fn test_scan_terminates_on_cycle() {
        let mut tree = TreeSource::new();
        // "a" lists the root among its own children.
        tree.add("page", "a", "toggle", "nothing here", true);
        tree.add("a", "page", "page", "still nothing", true);

        let roles = scan(&tree, "page", &default_signatures()).await;
        assert!(roles.is_empty());
        // The root is never re-dequeued.
        assert_eq!(tree.fetches(), vec!["page".to_string(), "a".to_string()]);
    }

    #[tokio::test]
    async fn test_scan_skips_failed_subtree_and_continues() {
        let mut tree = TreeSource::new();
        tree.add("page", "broken", "toggle", "container", true);
        tree.add("page", "ok", "toggle", "container", true);
        tree.add("broken", "hidden", "callout", "Age: unreachable", false);
        tree.add("ok", "found", "callout", "Age: reachable (D+9)", false);
        tree.failing.insert("broken".to_string());

        let roles = scan(&tree, "page", &default_signatures()).await;
        assert_eq!(
            roles.get(&Role::AgeCounter).map(String::as_str),
            Some("found")
        );
    }

    #[tokio::test]
    async fn test_scan_stops_after_batch_once_all_resolved() {
        let mut tree = TreeSource::new();
        tree.add("page", "b1", "callout", "Age: D+1", false);
        tree.add("page", "b2", "callout", "Season: Winter no. 1", false);
        tree.add("page", "b3", "toggle", "Settings", false);
        tree.add("page", "deep", "toggle", "container", true);
        tree.add("deep", "never", "callout", "Age: should not be fetched", false);

        let roles = scan(&tree, "page", &default_signatures()).await;
        assert_eq!(roles.len(), 3);
        // All roles resolved in the first batch; "deep" stays queued, unvisited.
        assert_eq!(tree.fetch_count(), 1);
    }
}
