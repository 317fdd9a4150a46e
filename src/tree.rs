// src/tree.rs

//! Materialized-path comment threads.
//!
//! Every comment stores a dot-delimited `path` built from its ancestors'
//! index tokens, so sorting rows by `path` yields a depth-first traversal of
//! the thread. This module assigns paths on write, selects depth-bounded
//! windows on read and reassembles the flat rows into a reply forest.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::vote::VoteRecord;

/// Separator between the segments of a materialized path.
pub const PATH_SEPARATOR: char = '.';

/// The parent being replied to, as seen at write time.
#[derive(Debug, Clone, Copy)]
pub struct ParentRef<'a> {
    pub path: &'a str,
    pub depth: i64,
}

/// Location of a new comment inside its thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathAssignment {
    pub path: String,
    pub depth: i64,
}

/// Computes the `path` and `depth` of a new comment.
///
/// Top-level comments use their own token as the whole path. The caller owns
/// uniqueness of `index_id`; nothing is deduplicated here.
pub fn assign_path(parent: Option<ParentRef<'_>>, index_id: &str) -> PathAssignment {
    match parent {
        Some(parent) => PathAssignment {
            path: format!("{}{}{}", parent.path, PATH_SEPARATOR, index_id),
            depth: parent.depth + 1,
        },
        None => PathAssignment {
            path: index_id.to_string(),
            depth: 0,
        },
    }
}

/// Nesting level encoded by a path (`"a1"` is 0, `"a1.b2"` is 1).
pub fn path_depth(path: &str) -> i64 {
    path.matches(PATH_SEPARATOR).count() as i64
}

/// A depth-bounded slice of a thread, optionally rooted at a subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthWindow {
    root: Option<String>,
    base_depth: i64,
    max_depth: i64,
}

/// Builds the window used to fetch a thread.
///
/// Without a root the whole thread is windowed from depth 0. With a root the
/// window starts at the root's own depth, so `max_depth = 1` returns the root
/// and its direct replies.
pub fn select_window(root_path: Option<&str>, max_depth: i64) -> DepthWindow {
    let root = root_path.filter(|p| !p.is_empty()).map(str::to_string);
    let base_depth = root.as_deref().map(path_depth).unwrap_or(0);

    DepthWindow {
        root,
        base_depth,
        max_depth: max_depth.max(0),
    }
}

impl DepthWindow {
    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    pub fn base_depth(&self) -> i64 {
        self.base_depth
    }

    /// Deepest absolute depth included in the window.
    pub fn limit_depth(&self) -> i64 {
        self.base_depth + self.max_depth
    }

    /// Whether a row at `path`/`depth` falls inside the window.
    pub fn contains(&self, path: &str, depth: i64) -> bool {
        if depth > self.limit_depth() {
            return false;
        }
        match &self.root {
            None => true,
            Some(root) => {
                path == root
                    || (path.len() > root.len()
                        && path.starts_with(root.as_str())
                        && path[root.len()..].starts_with(PATH_SEPARATOR))
            }
        }
    }
}

/// A row that can be placed in a reply forest.
pub trait TreeRow {
    fn id(&self) -> i64;
    fn parent_id(&self) -> Option<i64>;
}

/// A row together with its direct replies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode<T> {
    #[serde(flatten)]
    pub item: T,
    pub children: Vec<TreeNode<T>>,
}

impl<T> TreeNode<T> {
    /// Number of nodes in this subtree, including this one.
    pub fn subtree_len(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }
}

/// Reassembles flat rows into a forest of reply trees.
///
/// Rows whose parent is absent from `rows` (deleted, or outside the fetch
/// window) are promoted to roots. Children keep the order in which they
/// appear in `rows`; callers pass rows sorted by `path` so siblings come out
/// in reply order. Every row appears exactly once in the output.
pub fn build_forest<T: TreeRow>(rows: Vec<T>) -> Vec<TreeNode<T>> {
    let n = rows.len();

    let mut index: HashMap<i64, usize> = HashMap::with_capacity(n);
    for (i, row) in rows.iter().enumerate() {
        index.entry(row.id()).or_insert(i);
    }

    let mut parent_of: Vec<Option<usize>> = vec![None; n];
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut roots: Vec<usize> = Vec::new();
    let mut promoted = 0usize;

    for (i, row) in rows.iter().enumerate() {
        let parent = row.parent_id().and_then(|pid| index.get(&pid).copied());
        match parent {
            Some(p) if p != i => {
                parent_of[i] = Some(p);
                children[p].push(i);
            }
            _ => {
                if let Some(pid) = row.parent_id() {
                    promoted += 1;
                    tracing::debug!(
                        id = row.id(),
                        parent_id = pid,
                        "Parent not in result set, promoting to root"
                    );
                }
                roots.push(i);
            }
        }
    }

    if promoted > 0 {
        tracing::debug!(promoted, total = n, "Promoted orphaned comments to roots");
    }

    let mut slots: Vec<Option<T>> = rows.into_iter().map(Some).collect();
    let mut built: Vec<Option<TreeNode<T>>> = (0..n).map(|_| None).collect();
    let mut visited = vec![false; n];

    for &root in &roots {
        assemble(root, &children, &mut slots, &mut built, &mut visited);
    }

    // Anything left is caught in a parent cycle. Break the cycle at the first
    // unvisited row so nothing is lost.
    for i in 0..n {
        if visited[i] {
            continue;
        }
        tracing::warn!("Comment parent cycle detected, promoting row {} to root", i);
        if let Some(p) = parent_of[i] {
            children[p].retain(|&c| c != i);
        }
        roots.push(i);
        assemble(i, &children, &mut slots, &mut built, &mut visited);
    }

    roots.into_iter().filter_map(|i| built[i].take()).collect()
}

/// Builds the subtree under `root` bottom-up with an explicit stack.
fn assemble<T>(
    root: usize,
    children: &[Vec<usize>],
    slots: &mut [Option<T>],
    built: &mut [Option<TreeNode<T>>],
    visited: &mut [bool],
) {
    let mut stack = vec![(root, false)];
    visited[root] = true;

    while let Some((i, expanded)) = stack.pop() {
        if expanded {
            let kids = children[i].iter().filter_map(|&c| built[c].take()).collect();
            if let Some(item) = slots[i].take() {
                built[i] = Some(TreeNode {
                    item,
                    children: kids,
                });
            }
            continue;
        }

        stack.push((i, true));
        for &c in children[i].iter().rev() {
            if !visited[c] {
                visited[c] = true;
                stack.push((c, false));
            }
        }
    }
}

/// Net score of a comment as seen by one viewer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteTally {
    pub sum_vote: i64,
    pub current_vote: Option<i64>,
}

impl VoteTally {
    /// Sums every vote and picks out the viewer's own, if any.
    pub fn tally<'a, I>(votes: I, viewer: Option<i64>) -> Self
    where
        I: IntoIterator<Item = &'a VoteRecord>,
    {
        let mut tally = VoteTally::default();
        for vote in votes {
            tally.sum_vote += vote.value;
            if viewer == Some(vote.user_id) {
                tally.current_vote = Some(vote.value);
            }
        }
        tally
    }
}
