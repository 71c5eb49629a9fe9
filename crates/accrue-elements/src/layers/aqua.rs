//! Aqua: a first-row layer that fills a bubble bar over time.
//!
//! Aqua Particles charge the bubble time; whole bubbles add flat particle
//! gain and charge the wave time, and every whole wave halves the Aqua
//! reset requirement.

use accrue_core::prelude::*;

use crate::layers::advancements::Advancements;
use crate::layers::flame::Flame;
use crate::layers::life::Life;
use crate::layers::lightning::Lightning;
use crate::layers::main::Main;
use crate::layers::{element_gain_steps, element_tick};

/// Wave time gained per whole bubble per second.
const WAVE_RATE: f64 = 0.1;

pub struct Aqua {
    pub layer: Layer,
    pub points: Resource,
    /// Seconds spent in the current Aqua run.
    pub time: Signal<f64>,
    pub bubble_time: Signal<BigNum>,
    pub wave_time: Signal<BigNum>,
    /// `log10(bubble_time + 1)`
    pub bubbles: Derived<BigNum>,
    /// `log10(wave_time + 1)`
    pub waves: Derived<BigNum>,
    pub bubble_speed: Derived<BigNum>,
    /// Particles for the first Aqua Particle, `10 / 2^floor(waves)`.
    pub requirement: Derived<BigNum>,
    pub conversion: Conversion,
    pub tree_node: TreeNode,
}

impl Aqua {
    pub(crate) fn build(
        game: &mut Game,
        layer: Layer,
        main: &Main,
        flame: &Flame,
        life: &Life,
        advancements: &Advancements,
        lightning: &Lightning,
    ) -> Result<Self, BuildError> {
        let rt = layer.runtime().clone();
        let points = layer.tracked_resource("points", "Aqua Particles", 0)?;
        let time = layer.persistent("time", 0.0)?;
        let bubble_time = layer.persistent("bubble_time", BigNum::ZERO)?;
        let wave_time = layer.persistent("wave_time", BigNum::ZERO)?;

        let bubbles = {
            let bubble_time = bubble_time.clone();
            layer.derived("bubbles", move || (bubble_time.get() + 1.0).log10())
        };
        let waves = {
            let wave_time = wave_time.clone();
            layer.derived("waves", move || (wave_time.get() + 1.0).log10())
        };
        let bubble_speed = {
            let liquid_fire = flame.upgrades[2].clone();
            let liquid_fire_effect = flame.upgrade_effects[2].clone();
            let life_speed = life.buyable_effects[4].clone();
            layer.derived("bubble_speed", move || {
                let mut speed = BigNum::ONE;
                if liquid_fire.bought() {
                    speed *= liquid_fire_effect.get();
                }
                speed * life_speed.get()
            })
        };
        let requirement = {
            let waves = waves.clone();
            layer.derived("requirement", move || {
                BigNum::TEN / BigNum::TWO.pow(waves.get().floor())
            })
        };

        let steps = element_gain_steps(&layer, &time, lightning, advancements);
        let conversion = Conversion::new(
            &rt,
            "a.conversion",
            ConversionOptions::new(
                main.particles.clone(),
                points.clone(),
                Polynomial::new(&rt, &requirement, 1.0 / 3.0),
            )
            .gain_modifier(SequentialModifier::new(steps))
            .kind(ConversionKind::Cumulative)
            .spend(Spend::All),
        )?;

        {
            let points = points.clone();
            let bubble_time = bubble_time.clone();
            let wave_time = wave_time.clone();
            let bubbles = bubbles.clone();
            let speed = bubble_speed.clone();
            let conversion = conversion.clone();
            let time = time.clone();
            let passive = advancements.passive_generation.earned_signal().clone();
            game.add_tick_handler("a.bubbles", move |dt| {
                let charge = points.value_untracked() * speed.get() * dt;
                bubble_time.update(|t| *t + charge);
                let waves = bubbles.get().floor() * dt * WAVE_RATE;
                wave_time.update(|t| *t + waves);
                element_tick(&conversion, &time, &passive, dt);
            });
        }

        let reset = Reset::new(&rt, "a.reset", ResetOptions::targets(["a"]));
        let tree_node = TreeNode::new(
            &rt,
            "a",
            TreeNodeOptions {
                reset: Some(reset),
                ..Default::default()
            },
        );

        Ok(Self {
            layer,
            points,
            time,
            bubble_time,
            wave_time,
            bubbles,
            waves,
            bubble_speed,
            requirement,
            conversion,
            tree_node,
        })
    }
}

impl std::fmt::Debug for Aqua {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aqua")
            .field("points", &self.points.value_untracked())
            .field("bubble_time", &self.bubble_time.get_untracked())
            .field("wave_time", &self.wave_time.get_untracked())
            .finish_non_exhaustive()
    }
}
