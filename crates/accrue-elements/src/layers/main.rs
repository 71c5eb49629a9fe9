//! The main layer: particles and the unlock tree.

use accrue_core::prelude::*;

use crate::layers::aqua::Aqua;
use crate::layers::flame::Flame;
use crate::layers::life::Life;
use crate::layers::lightning::{Lightning, MODE_ADD, MODE_DISTANCE, MODE_MULTIPLY};

/// Particles every non-first-row reset starts over from.
pub const STARTING_PARTICLES: u32 = 10;

pub struct Main {
    pub layer: Layer,
    pub particles: Resource,
    /// Flat particles per second before multipliers.
    pub base_gain: Derived<BigNum>,
    pub particle_gain: Derived<BigNum>,
}

impl Main {
    /// Create the particle resource and declare the gain deriveds; they are
    /// defined by [`Main::define_gain`] once every layer exists.
    pub(crate) fn declare(layer: Layer) -> Result<Self, BuildError> {
        let particles = layer.tracked_resource("particles", "particles", STARTING_PARTICLES)?;
        let base_gain = layer.runtime().declare_derived("main.base_gain");
        let particle_gain = layer.runtime().declare_derived("main.particle_gain");
        Ok(Self {
            layer,
            particles,
            base_gain,
            particle_gain,
        })
    }

    pub(crate) fn define_gain(
        &self,
        flame: &Flame,
        life: &Life,
        aqua: &Aqua,
        lightning: &Lightning,
    ) -> Result<(), BuildError> {
        {
            let hot_start = flame.upgrades[0].clone();
            let hot_start_effect = flame.upgrade_effects[0].clone();
            let life_flat = life.buyable_effects[0].clone();
            let bubbles = aqua.bubbles.clone();
            let mode = lightning.mode.clone();
            let mode_a = lightning.effects[MODE_ADD as usize].clone();
            self.base_gain.define(move || {
                let mut gain = BigNum::ZERO;
                if hot_start.bought() {
                    gain += hot_start_effect.get();
                }
                gain += life_flat.get();
                gain += bubbles.get().floor();
                if mode.get() == MODE_ADD {
                    gain += mode_a.get();
                }
                gain
            })?;
        }

        let base_gain = self.base_gain.clone();
        let flame_boost = flame.upgrades[1].clone();
        let flame_boost_effect = flame.upgrade_effects[1].clone();
        let life_mult = life.buyable_effects[1].clone();
        let mode = lightning.mode.clone();
        let mode_b = lightning.effects[MODE_MULTIPLY as usize].clone();
        let mode_d = lightning.effects[MODE_DISTANCE as usize].clone();
        self.particle_gain.define(move || {
            let mut gain = base_gain.get();
            if flame_boost.bought() {
                gain *= flame_boost_effect.get();
            }
            gain *= life_mult.get();
            match mode.get() {
                MODE_MULTIPLY => gain *= mode_b.get(),
                MODE_DISTANCE => gain *= mode_d.get(),
                _ => {}
            }
            gain
        })?;
        Ok(())
    }

    /// Particles grow by `particle_gain` per second.
    pub(crate) fn register_generation(&self, game: &mut Game) {
        let particles = self.particles.clone();
        let gain = self.particle_gain.clone();
        game.add_tick_handler("main.particles", move |dt| {
            particles.add(gain.get() * dt);
        });
    }

    /// Default propagation over `rows`; resetting a first-row node empties
    /// the particles, anything else restarts them at [`STARTING_PARTICLES`].
    pub(crate) fn build_tree(
        &self,
        rt: &Runtime,
        rows: Vec<Vec<TreeNode>>,
        side_nodes: Vec<TreeNode>,
    ) -> Result<Tree, BuildError> {
        let first_row: Vec<String> = rows
            .first()
            .map(|row| row.iter().map(|node| node.id().to_string()).collect())
            .unwrap_or_default();
        let particles = self.particles.clone();
        let on_reset = move |resetting: &str| {
            let restart = if first_row.iter().any(|id| id == resetting) {
                BigNum::ZERO
            } else {
                BigNum::from(STARTING_PARTICLES)
            };
            particles.set(restart);
            particles.reset_trackers();
        };

        Tree::new(
            rt,
            TreeOptions {
                rows,
                side_nodes,
                on_reset: Some(Box::new(on_reset)),
                ..Default::default()
            },
        )
    }
}

impl std::fmt::Debug for Main {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Main")
            .field("particles", &self.particles.value_untracked())
            .finish_non_exhaustive()
    }
}
