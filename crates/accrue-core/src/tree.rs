//! The unlock tree and reset propagation.
//!
//! A [`Tree`] arranges [`TreeNode`]s in rows (row 0 is the lowest tier) plus
//! optional side nodes outside the rows, and connects them with directed
//! [`Branch`]es. Resetting a node (a prestige) cascades to other nodes
//! according to the tree's [`ResetPropagation`] policy, which is reactive and
//! can change at runtime:
//!
//! - [`ResetPropagation::Default`]: every row below the resetting node's
//!   row, nearest row first, regardless of branches.
//! - [`ResetPropagation::OneWayBranched`]: breadth-first along branches
//!   leaving the frontier; each node is reset at most once, even when it is
//!   reachable along several paths.
//! - [`ResetPropagation::None`]: nothing.
//!
//! The resetting node itself is never reset by propagation. After the
//! policy has run, the tree's `on_reset` hook sees the resetting node id.
//!
//! # Example
//!
//! ```
//! use accrue_core::prelude::*;
//!
//! let rt = Runtime::new();
//! let node = |id: &str| TreeNode::new(&rt, id, TreeNodeOptions::default());
//! let tree = Tree::new(
//!     &rt,
//!     TreeOptions {
//!         rows: vec![vec![node("a"), node("b")], vec![node("c")]],
//!         ..Default::default()
//!     },
//! )
//! .unwrap();
//!
//! assert_eq!(tree.reset("c"), vec!["a", "b"]);
//! assert!(tree.reset("a").is_empty());
//! ```

use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use accrue_reactive::prelude::*;

use crate::features::reset::Reset;
use crate::BuildError;

// ---------------------------------------------------------------------------
// Visibility
// ---------------------------------------------------------------------------

/// Display state of a feature. Only [`Visibility::None`] removes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Visible,
    /// Takes up space but is not shown.
    Hidden,
    None,
}

impl Visibility {
    /// `Visible` when `condition` holds, `None` otherwise.
    pub fn when(condition: bool) -> Self {
        if condition {
            Visibility::Visible
        } else {
            Visibility::None
        }
    }

    /// `true` for anything but [`Visibility::None`].
    pub fn is_shown(self) -> bool {
        self != Visibility::None
    }
}

impl From<Visibility> for Computable<Visibility> {
    fn from(value: Visibility) -> Self {
        Computable::Constant(value)
    }
}

// ---------------------------------------------------------------------------
// Nodes and branches
// ---------------------------------------------------------------------------

/// Construction options for a [`TreeNode`].
pub struct TreeNodeOptions {
    pub visibility: Computable<Visibility>,
    pub can_click: Computable<bool>,
    pub reset: Option<Reset>,
}

impl Default for TreeNodeOptions {
    /// Visible, clickable, no reset.
    fn default() -> Self {
        Self {
            visibility: Computable::constant(Visibility::Visible),
            can_click: Computable::constant(true),
            reset: None,
        }
    }
}

/// One node of the tree, normally one per layer.
#[derive(Clone)]
pub struct TreeNode {
    id: String,
    visibility: Derived<Visibility>,
    can_click: Derived<bool>,
    reset: Option<Reset>,
}

impl TreeNode {
    pub fn new(rt: &Runtime, id: impl Into<String>, options: TreeNodeOptions) -> Self {
        let id = id.into();
        Self {
            visibility: rt.resolve(format!("tree.{id}.visibility"), options.visibility),
            can_click: rt.resolve(format!("tree.{id}.can_click"), options.can_click),
            reset: options.reset,
            id,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility.get()
    }

    pub fn can_click(&self) -> bool {
        self.can_click.get()
    }

    pub fn reset_handle(&self) -> Option<&Reset> {
        self.reset.as_ref()
    }

    /// Run this node's reset, if it has one.
    fn run_reset(&self) -> bool {
        match &self.reset {
            Some(reset) => {
                reset.reset();
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeNode")
            .field("id", &self.id)
            .field("has_reset", &self.reset.is_some())
            .finish()
    }
}

/// A directed edge: resetting `start` may reset `end`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Branch {
    pub start: String,
    pub end: String,
}

impl Branch {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}

/// Reset propagation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResetPropagation {
    #[default]
    Default,
    OneWayBranched,
    None,
}

impl From<ResetPropagation> for Computable<ResetPropagation> {
    fn from(value: ResetPropagation) -> Self {
        Computable::Constant(value)
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

type ResetHook = Box<dyn Fn(&str)>;

/// Construction options for a [`Tree`].
pub struct TreeOptions {
    pub rows: Vec<Vec<TreeNode>>,
    /// Nodes outside the rows; only reached through branches.
    pub side_nodes: Vec<TreeNode>,
    pub branches: Vec<Branch>,
    pub reset_propagation: Computable<ResetPropagation>,
    /// Runs after propagation with the resetting node id.
    pub on_reset: Option<ResetHook>,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            side_nodes: Vec::new(),
            branches: Vec::new(),
            reset_propagation: Computable::constant(ResetPropagation::Default),
            on_reset: None,
        }
    }
}

struct TreeInner {
    rows: Vec<Vec<TreeNode>>,
    side_nodes: Vec<TreeNode>,
    branches: Vec<Branch>,
    propagation: Derived<ResetPropagation>,
    on_reset: Option<ResetHook>,
}

/// The unlock tree. Cheap to clone; clones share the same nodes.
#[derive(Clone)]
pub struct Tree {
    inner: Rc<TreeInner>,
}

impl Tree {
    /// Build a tree, validating node ids and branch endpoints.
    ///
    /// # Errors
    ///
    /// - [`BuildError::DuplicateTreeNode`] when an id is placed twice.
    /// - [`BuildError::UnknownTreeNode`] when a branch names a node that is
    ///   not part of the tree.
    pub fn new(rt: &Runtime, options: TreeOptions) -> Result<Self, BuildError> {
        let mut seen = HashSet::new();
        for node in options.rows.iter().flatten().chain(&options.side_nodes) {
            if !seen.insert(node.id.as_str()) {
                return Err(BuildError::DuplicateTreeNode {
                    node: node.id.clone(),
                });
            }
        }
        for branch in &options.branches {
            for end in [&branch.start, &branch.end] {
                if !seen.contains(end.as_str()) {
                    return Err(BuildError::UnknownTreeNode { node: end.clone() });
                }
            }
        }

        let propagation = rt.resolve("tree.reset_propagation", options.reset_propagation);
        Ok(Self {
            inner: Rc::new(TreeInner {
                rows: options.rows,
                side_nodes: options.side_nodes,
                branches: options.branches,
                propagation,
                on_reset: options.on_reset,
            }),
        })
    }

    // -- accessors ----------------------------------------------------------

    pub fn rows(&self) -> &[Vec<TreeNode>] {
        &self.inner.rows
    }

    pub fn side_nodes(&self) -> &[TreeNode] {
        &self.inner.side_nodes
    }

    pub fn branches(&self) -> &[Branch] {
        &self.inner.branches
    }

    pub fn propagation(&self) -> ResetPropagation {
        self.inner.propagation.get()
    }

    /// Every node, rows first, then side nodes.
    pub fn nodes(&self) -> impl Iterator<Item = &TreeNode> {
        self.inner.rows.iter().flatten().chain(&self.inner.side_nodes)
    }

    pub fn node(&self, id: &str) -> Option<&TreeNode> {
        self.nodes().find(|node| node.id == id)
    }

    /// Row index of `id`, `None` for side nodes and unknown ids.
    pub fn row_of(&self, id: &str) -> Option<usize> {
        self.inner
            .rows
            .iter()
            .position(|row| row.iter().any(|node| node.id == id))
    }

    // -- reset --------------------------------------------------------------

    /// Propagate a reset from `resetting`, then run the `on_reset` hook.
    ///
    /// Returns the ids of the nodes that were reached, in reset order.
    pub fn reset(&self, resetting: &str) -> Vec<String> {
        let propagation = self.propagation();
        let reached = match propagation {
            ResetPropagation::Default => self.propagate_rows(resetting),
            ResetPropagation::OneWayBranched => self.propagate_branches(resetting),
            ResetPropagation::None => Vec::new(),
        };
        tracing::debug!(
            node = resetting,
            policy = ?propagation,
            reached = reached.len(),
            "tree reset propagated"
        );
        if let Some(hook) = &self.inner.on_reset {
            hook(resetting);
        }
        reached
    }

    fn propagate_rows(&self, resetting: &str) -> Vec<String> {
        let Some(row) = self.row_of(resetting) else {
            return Vec::new();
        };
        let mut reached = Vec::new();
        for lower in self.inner.rows[..row].iter().rev() {
            for node in lower {
                node.run_reset();
                reached.push(node.id.clone());
            }
        }
        reached
    }

    fn propagate_branches(&self, resetting: &str) -> Vec<String> {
        let mut visited: HashSet<&str> = HashSet::from([resetting]);
        let mut frontier: Vec<&str> = vec![resetting];
        let mut reached = Vec::new();

        while !frontier.is_empty() {
            let mut next: Vec<&str> = Vec::new();
            for branch in &self.inner.branches {
                let end = branch.end.as_str();
                if frontier.contains(&branch.start.as_str())
                    && !visited.contains(end)
                    && !next.contains(&end)
                {
                    next.push(end);
                }
            }
            for &id in &next {
                visited.insert(id);
                if let Some(node) = self.node(id) {
                    node.run_reset();
                }
                reached.push(id.to_string());
            }
            frontier = next;
        }
        reached
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("rows", &self.inner.rows)
            .field("side_nodes", &self.inner.side_nodes)
            .field("branches", &self.inner.branches)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
