//! Lightning: the second-row layer with four exclusive modes.

use accrue_core::prelude::*;

use crate::best_of;
use crate::layers::advancements::Advancements;
use crate::layers::main::Main;

/// Mode A: flat particle gain.
pub const MODE_ADD: u32 = 0;
/// Mode B: particle gain multiplier.
pub const MODE_MULTIPLY: u32 = 1;
/// Mode C: Flame, Life and Aqua gain multiplier.
pub const MODE_ELEMENTS: u32 = 2;
/// Mode D: particle gain multiplier that grows with the particles held.
pub const MODE_DISTANCE: u32 = 3;

/// Best Lightning Particles needed to show each mode.
const MODE_UNLOCKS: [f64; 4] = [1.0, 1.0, 2.0, 5.0];

pub struct Lightning {
    pub layer: Layer,
    pub points: Resource,
    /// The selected mode; exactly one is active at a time.
    pub mode: Signal<u32>,
    /// Effect of each mode, indexed by mode.
    pub effects: [Derived<BigNum>; 4],
    /// Mode selectors, indexed by mode.
    pub modes: Vec<Clickable>,
    pub conversion: Conversion,
    pub tree_node: TreeNode,
}

impl Lightning {
    pub(crate) fn build(layer: Layer, main: &Main, advancements: &Advancements) -> Result<Self, BuildError> {
        let rt = layer.runtime().clone();
        let points = layer.tracked_resource("points", "Lightning Particles", 0)?;
        let mode = layer.persistent("mode", MODE_ADD)?;

        let conversion = Conversion::new(
            &rt,
            "li.conversion",
            ConversionOptions::new(
                main.particles.clone(),
                points.clone(),
                Polynomial::new(&rt, 2.5e3, 0.25),
            )
            .kind(ConversionKind::Cumulative)
            .spend(Spend::All),
        )?;

        let effects = {
            let l = points.clone();
            let add = layer.derived("effects.add", move || (l.value() + 1.0).log2() * 2.0);

            let l = points.clone();
            let multiply = layer.derived("effects.multiply", move || {
                let ret = (l.value() + 1.0).sqrt();
                if ret >= 100.0 {
                    ret.log(100) * 100.0
                } else {
                    ret
                }
            });

            let l = points.clone();
            let elements = layer.derived("effects.elements", move || {
                ((l.value() + 1.0).log(3) + 1.0).sqrt()
            });

            let l = points.clone();
            let particles = main.particles.clone();
            let distance = layer.derived("effects.distance", move || {
                ((l.value() + 1.0).log10() * (particles.value() + 1.0).sqrt() + 1.0).log10() + 1.0
            });

            [add, multiply, elements, distance]
        };

        let modes = MODE_UNLOCKS
            .iter()
            .zip(0u32..)
            .map(|(&unlock, index)| {
                let visibility = {
                    let points = points.clone();
                    Computable::function(move || Visibility::when(best_of(&points) >= unlock))
                };
                let can_click = {
                    let mode = mode.clone();
                    Computable::function(move || mode.get() != index)
                };
                let select = {
                    let mode = mode.clone();
                    move || mode.set(index)
                };
                Clickable::new(
                    &layer,
                    &format!("mode_{index}"),
                    ClickableOptions::on_click(select)
                        .can_click(can_click)
                        .visibility(visibility),
                )
            })
            .collect();

        let unlocked = advancements.unlock_lightning.earned_signal().clone();
        let visibility = {
            let unlocked = unlocked.clone();
            Computable::function(move || {
                if unlocked.get() {
                    Visibility::Visible
                } else {
                    Visibility::Hidden
                }
            })
        };
        let reset = Reset::new(&rt, "li.reset", ResetOptions::targets(["li"]));
        let tree_node = TreeNode::new(
            &rt,
            "li",
            TreeNodeOptions {
                visibility,
                can_click: unlocked.into(),
                reset: Some(reset),
            },
        );

        Ok(Self {
            layer,
            points,
            mode,
            effects,
            modes,
            conversion,
            tree_node,
        })
    }

    pub fn mode(&self) -> u32 {
        self.mode.get()
    }
}

impl std::fmt::Debug for Lightning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lightning")
            .field("points", &self.points.value_untracked())
            .field("mode", &self.mode.get_untracked())
            .finish_non_exhaustive()
    }
}
