//! Layer bodies.
//!
//! Each module builds one layer from its declared shell. Bodies receive the
//! handles of the layers they read; the read graph may contain cycles across
//! layers as long as no single derived depends on itself.

pub mod advancements;
pub mod aqua;
pub mod flame;
pub mod life;
pub mod lightning;
pub mod main;

use accrue_core::prelude::*;

use crate::layers::advancements::{Advancements, EARLY_BOOST_SECONDS};
use crate::layers::lightning::{Lightning, MODE_ELEMENTS};

/// Gain steps shared by the first-row conversions: Lightning Mode C and the
/// early-run boost from the fifth advancement.
pub(crate) fn element_gain_steps(
    layer: &Layer,
    time: &Signal<f64>,
    lightning: &Lightning,
    advancements: &Advancements,
) -> Vec<Modifier> {
    let rt = layer.runtime();
    let id = layer.id();

    let mode_c = {
        let mode = lightning.mode.clone();
        Computable::function(move || mode.get() == MODE_ELEMENTS)
    };
    let early = {
        let earned = advancements.early_boost.earned_signal().clone();
        let time = time.clone();
        Computable::function(move || earned.get() && time.get() <= EARLY_BOOST_SECONDS)
    };

    vec![
        Modifier::multiplicative(
            rt,
            &lightning.effects[MODE_ELEMENTS as usize],
            format!("{id}: lightning mode C"),
            mode_c,
        ),
        Modifier::multiplicative(rt, 3, format!("{id}: early advancement"), early),
    ]
}

/// Tick work common to Flame, Life and Aqua: passive generation once the
/// milestone is earned, and the time spent in the current run.
pub(crate) fn element_tick(
    conversion: &Conversion,
    time: &Signal<f64>,
    passive: &Signal<bool>,
    dt: f64,
) {
    if passive.get_untracked() {
        conversion.passive_generation(1, dt);
    }
    time.update(|t| t + dt);
}
