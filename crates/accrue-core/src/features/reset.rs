//! Layer resets and reset buttons.
//!
//! A [`Reset`] restores every persistent field of its target layers and then
//! runs an optional hook. Tree nodes hold one each; propagation calls it.
//!
//! A [`ResetButton`] is the prestige action: purchase through a conversion,
//! then propagate a reset through the tree from the button's node.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use accrue_num::BigNum;
use accrue_reactive::prelude::*;

use crate::conversion::Conversion;
use crate::tree::Tree;
use crate::BuildError;

/// Construction options for a [`Reset`].
#[derive(Default)]
pub struct ResetOptions {
    /// Layer ids whose persistent fields are reset.
    pub targets: Vec<String>,
    /// Runs after the targets were reset.
    pub on_reset: Option<Box<dyn Fn()>>,
}

impl ResetOptions {
    pub fn targets<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
            on_reset: None,
        }
    }
}

struct ResetInner {
    label: String,
    rt: Runtime,
    targets: Vec<String>,
    on_reset: Option<Box<dyn Fn()>>,
    invocations: Cell<u64>,
}

/// Restores layers to their initial state. Clones share one counter.
#[derive(Clone)]
pub struct Reset {
    inner: Rc<ResetInner>,
}

impl Reset {
    pub fn new(rt: &Runtime, label: impl Into<String>, options: ResetOptions) -> Self {
        Self {
            inner: Rc::new(ResetInner {
                label: label.into(),
                rt: rt.clone(),
                targets: options.targets,
                on_reset: options.on_reset,
                invocations: Cell::new(0),
            }),
        }
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn targets(&self) -> &[String] {
        &self.inner.targets
    }

    /// How many times [`Reset::reset`] ran.
    pub fn invocations(&self) -> u64 {
        self.inner.invocations.get()
    }

    pub fn reset(&self) {
        let mut changed = 0;
        for target in &self.inner.targets {
            match self.inner.rt.reset_owner(target) {
                Ok(count) => changed += count,
                Err(err) => {
                    tracing::warn!(
                        reset = %self.inner.label,
                        layer = %target,
                        error = %err,
                        "layer reset failed -- skipping"
                    );
                }
            }
        }
        if let Some(hook) = &self.inner.on_reset {
            hook();
        }
        self.inner.invocations.set(self.inner.invocations.get() + 1);
        tracing::debug!(reset = %self.inner.label, changed, "reset applied");
    }
}

impl fmt::Debug for Reset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reset")
            .field("label", &self.inner.label)
            .field("targets", &self.inner.targets)
            .field("invocations", &self.invocations())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ResetButton
// ---------------------------------------------------------------------------

/// Prestige button: convert, then reset the tree from `node`.
#[derive(Clone)]
pub struct ResetButton {
    conversion: Conversion,
    tree: Tree,
    node: String,
}

impl ResetButton {
    /// # Errors
    ///
    /// [`BuildError::UnknownTreeNode`] when `node` is not in `tree`.
    pub fn new(conversion: Conversion, tree: Tree, node: impl Into<String>) -> Result<Self, BuildError> {
        let node = node.into();
        if tree.node(&node).is_none() {
            return Err(BuildError::UnknownTreeNode { node });
        }
        Ok(Self {
            conversion,
            tree,
            node,
        })
    }

    pub fn conversion(&self) -> &Conversion {
        &self.conversion
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn can_click(&self) -> bool {
        let node_clickable = self
            .tree
            .node(&self.node)
            .is_some_and(|node| node.can_click());
        node_clickable && self.conversion.can_purchase()
    }

    /// `"Reset for +10 Flame Particles"` style label for the host UI.
    pub fn label(&self) -> String {
        let gain = self.conversion.gain();
        format!(
            "Reset for +{} {}",
            self.conversion.actual_gain().format_whole(),
            gain.name()
        )
    }

    /// Purchase, then propagate the reset.
    ///
    /// Returns the granted amount, or `None` when the button could not be
    /// clicked.
    pub fn click(&self) -> Option<BigNum> {
        if !self.can_click() {
            return None;
        }
        let granted = self.conversion.purchase();
        self.tree.reset(&self.node);
        Some(granted)
    }
}

impl fmt::Debug for ResetButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResetButton")
            .field("conversion", &self.conversion.label())
            .field("node", &self.node)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::{ConversionKind, ConversionOptions, Spend};
    use crate::resource::Resource;
    use crate::scaling::Polynomial;
    use crate::tree::{TreeNode, TreeNodeOptions, TreeOptions};

    #[test]
    fn reset_restores_targets_and_runs_hook() {
        let rt = Runtime::new();
        let points = rt.persistent("f", "points", BigNum::ZERO).unwrap();
        let other = rt.persistent("l", "points", BigNum::ZERO).unwrap();
        let hook_runs = Rc::new(Cell::new(0));

        let reset = Reset::new(
            &rt,
            "f.reset",
            ResetOptions {
                targets: vec!["f".into()],
                on_reset: Some({
                    let hook_runs = Rc::clone(&hook_runs);
                    Box::new(move || hook_runs.set(hook_runs.get() + 1))
                }),
            },
        );

        points.set(BigNum::from(9));
        other.set(BigNum::from(9));
        reset.reset();

        assert_eq!(points.get(), BigNum::ZERO);
        assert_eq!(other.get(), BigNum::from(9));
        assert_eq!(hook_runs.get(), 1);
        assert_eq!(reset.invocations(), 1);
        assert_eq!(reset.clone().invocations(), 1);
    }

    #[test]
    fn unknown_target_is_a_no_op() {
        let rt = Runtime::new();
        let reset = Reset::new(&rt, "ghost.reset", ResetOptions::targets(["ghost"]));
        reset.reset();
        assert_eq!(reset.invocations(), 1);
        assert_eq!(reset.targets(), ["ghost".to_string()]);
    }

    #[test]
    fn reset_button_converts_then_propagates() {
        let rt = Runtime::new();
        let particles_signal = rt.persistent("main", "particles", BigNum::from(10_000)).unwrap();
        let particles = Resource::new(particles_signal, "particles");
        let flame = Resource::new(
            rt.persistent("f", "points", BigNum::ZERO).unwrap(),
            "Flame Particles",
        );
        let life = rt.persistent("l", "points", BigNum::from(3)).unwrap();

        let conversion = Conversion::new(
            &rt,
            "f.conversion",
            ConversionOptions::new(
                particles.clone(),
                flame.clone(),
                Polynomial::new(&rt, 10, BigNum::ONE / 3.0),
            )
            .kind(ConversionKind::Cumulative)
            .spend(Spend::All),
        )
        .unwrap();

        let node = |id: &str, target: &str| {
            TreeNode::new(
                &rt,
                id,
                TreeNodeOptions {
                    reset: Some(Reset::new(&rt, format!("{id}.reset"), ResetOptions::targets([target]))),
                    ..Default::default()
                },
            )
        };
        let tree = Tree::new(
            &rt,
            TreeOptions {
                rows: vec![vec![node("l", "l")], vec![node("f", "f")]],
                ..Default::default()
            },
        )
        .unwrap();

        let button = ResetButton::new(conversion, tree, "f").unwrap();
        life.set(BigNum::from(7));
        assert!(button.can_click());
        assert_eq!(button.label(), "Reset for +10 Flame Particles");

        assert_eq!(button.click(), Some(BigNum::from(10)));
        assert_eq!(flame.value(), BigNum::from(10));
        assert_eq!(particles.value(), BigNum::ZERO);
        // Life sits in the row below and was reset to its initial value.
        assert_eq!(life.get(), BigNum::from(3));

        assert!(!button.can_click());
        assert_eq!(button.click(), None);
    }

    #[test]
    fn reset_button_requires_known_node() {
        let rt = Runtime::new();
        let base = Resource::new(rt.signal("b", BigNum::ZERO), "b");
        let gain = Resource::new(rt.signal("g", BigNum::ZERO), "g");
        let conversion = Conversion::new(
            &rt,
            "c",
            ConversionOptions::new(base, gain, Polynomial::new(&rt, 1, 1)),
        )
        .unwrap();
        let tree = Tree::new(&rt, TreeOptions::default()).unwrap();
        assert_eq!(
            ResetButton::new(conversion, tree, "x").unwrap_err(),
            BuildError::UnknownTreeNode { node: "x".into() }
        );
    }
}
