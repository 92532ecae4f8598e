//! Read-side operations over a built forest.
//!
//! A forest is immutable between rebuilds, so everything here borrows
//! `&OrgForest` and can run concurrently. All walks are iterative with
//! explicit stacks — forests reach ~100k nodes and the declared depth of
//! imported data is untrusted.

use crate::{
    tree::{OrgForest, OrgNode},
    types::{NodeId, UserId},
};

/// Free-text search: case-insensitive substring match, OR across user id,
/// kanji name, kana name and mail address. Full-forest scan.
pub fn search(forest: &OrgForest, query: &str) -> Vec<NodeId> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    forest
        .nodes
        .iter()
        .enumerate()
        .filter(|(_, node)| matches_query(node, &needle))
        .map(|(id, _)| id)
        .collect()
}

fn matches_query(node: &OrgNode, needle: &str) -> bool {
    let fields = [
        Some(node.user.user_id.as_str()),
        node.user.kanji_last_name.as_deref(),
        node.user.kanji_first_name.as_deref(),
        node.user.kana_last_name.as_deref(),
        node.user.kana_first_name.as_deref(),
        node.user.mail_address.as_deref(),
    ];
    fields
        .into_iter()
        .flatten()
        .any(|f| f.to_lowercase().contains(needle))
}

/// Search with an arbitrary predicate. Full-forest scan.
pub fn find_by<F>(forest: &OrgForest, mut predicate: F) -> Vec<NodeId>
where
    F: FnMut(&OrgNode) -> bool,
{
    forest
        .nodes
        .iter()
        .enumerate()
        .filter(|(_, node)| predicate(node))
        .map(|(id, _)| id)
        .collect()
}

/// Root-to-target chain of user ids, used to decide which nodes a lazy
/// UI must expand. O(depth) via parent pointers; the builder guarantees
/// those are acyclic. Returns `None` for an unknown id.
pub fn path_to(forest: &OrgForest, target_id: &str) -> Option<Vec<UserId>> {
    let mut cur = forest.lookup(target_id)?;
    let mut path = vec![forest.node(cur).user_id().clone()];
    while let Some(parent) = forest.node(cur).parent {
        path.push(forest.node(parent).user_id().clone());
        cur = parent;
    }
    path.reverse();
    Some(path)
}

/// Re-root the view at an arbitrary member's downline. The returned
/// index shares the forest — no copying.
pub fn subtree_root(forest: &OrgForest, user_id: &str) -> Option<NodeId> {
    forest.lookup(user_id)
}

/// Number of nodes in the subtree, including `node` itself.
pub fn descendant_count(forest: &OrgForest, node: NodeId) -> usize {
    let mut count = 0;
    let mut stack = vec![node];
    while let Some(id) = stack.pop() {
        count += 1;
        stack.extend(&forest.node(id).children);
    }
    count
}

/// Ancestor chain of a member, immediate parent first, at most `max`
/// entries. This is the reward engine's input: tier t pays the chain's
/// element t-1. An unknown id or a root yields an empty chain.
pub fn ancestor_chain(forest: &OrgForest, user_id: &str, max: usize) -> Vec<UserId> {
    let mut chain = Vec::new();
    let Some(mut cur) = forest.lookup(user_id) else {
        return chain;
    };
    while chain.len() < max {
        match forest.node(cur).parent {
            Some(parent) => {
                chain.push(forest.node(parent).user_id().clone());
                cur = parent;
            }
            None => break,
        }
    }
    chain
}

/// One page of a node's children, for incremental expansion. The portal
/// shows five at a time; callers pass their own window.
pub fn children_page(forest: &OrgForest, node: NodeId, offset: usize, limit: usize) -> &[NodeId] {
    let children = &forest.node(node).children;
    let start = offset.min(children.len());
    let end = offset.saturating_add(limit).min(children.len());
    &children[start..end]
}
