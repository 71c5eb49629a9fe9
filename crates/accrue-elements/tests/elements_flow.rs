//! Integration tests for the Elements layer set.
//!
//! Each test builds a fresh game and drives it the way a player (or the
//! headless runner) would: ticks, purchases, clicks and prestiges. State is
//! sometimes seeded directly through the persistent signals to reach late
//! features without simulating the whole climb.

use accrue_core::prelude::*;
use accrue_elements::layers::lightning::{MODE_ADD, MODE_DISTANCE, MODE_MULTIPLY};
use accrue_elements::{Elements, LAYER_IDS};

fn build() -> Elements {
    Elements::build(GameConfig::default()).unwrap()
}

fn approx(actual: BigNum, expected: f64) -> bool {
    actual.approx_eq(BigNum::from(expected), 1e-9)
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

#[test]
fn layers_are_declared_in_order() {
    let elements = build();
    let ids: Vec<&str> = elements.game.layers().iter().map(Layer::id).collect();
    assert_eq!(ids, LAYER_IDS);
    assert_eq!(
        elements.game.handler_names(),
        ["l.generation", "f.generation", "a.bubbles", "main.particles"]
    );
    assert_eq!(elements.game.milestones().len(), 4);
}

#[test]
fn fresh_game_has_ten_particles_and_no_gain() {
    let elements = build();
    assert_eq!(elements.main.particles.value(), BigNum::from(10));
    assert_eq!(elements.main.particle_gain.get(), BigNum::ZERO);
    assert_eq!(elements.lightning.mode(), MODE_ADD);
    assert_eq!(elements.tree.node("li").unwrap().visibility(), Visibility::Hidden);
    assert!(elements.reset_button("f").unwrap().can_click());
    assert!(!elements.reset_button("li").unwrap().can_click());
    assert!(!elements.reset_button("adv").unwrap().can_click());
    assert!(elements.reset_button("main").is_none());
}

// ---------------------------------------------------------------------------
// Resets
// ---------------------------------------------------------------------------

#[test]
fn first_row_reset_empties_particles() {
    let elements = build();
    let button = elements.reset_button("f").unwrap();
    assert_eq!(button.label(), "Reset for +1 Flame Particles");
    assert_eq!(button.click(), Some(BigNum::ONE));

    assert_eq!(elements.flame.points.value(), BigNum::ONE);
    assert_eq!(elements.main.particles.value(), BigNum::ZERO);
    assert_eq!(elements.main.particles.best(), Some(BigNum::ZERO));
    assert_eq!(elements.main.particles.total(), Some(BigNum::ZERO));
    // Nothing below row 0, so no layer was reset.
    assert!(elements.tree.nodes().all(|node| node
        .reset_handle()
        .map_or(true, |reset| reset.invocations() == 0)));
}

#[test]
fn side_reset_restarts_particles_and_resets_nothing() {
    let elements = build();
    elements.flame.points.set(BigNum::from(3));
    elements.life.buyables[0].amount_signal().set(BigNum::from(125));
    assert_eq!(elements.main.particle_gain.get(), BigNum::from(125));

    let button = elements.reset_button("adv").unwrap();
    assert_eq!(button.click(), Some(BigNum::ONE));

    assert_eq!(elements.advancements.points.value(), BigNum::ONE);
    assert_eq!(elements.main.particles.value(), BigNum::from(10));
    assert_eq!(elements.flame.points.value(), BigNum::from(3));
    assert_eq!(elements.life.buyables[0].amount(), BigNum::from(125));
    // The read-only base is untouched and the next advancement is further.
    assert_eq!(elements.main.particle_gain.get(), BigNum::from(125));
    assert!(!button.can_click());
}

#[test]
fn lightning_reset_clears_the_first_row() {
    let elements = build();
    elements.advancements.points.set(BigNum::ONE);
    assert!(elements.advancements.unlock_lightning.update());
    assert_eq!(elements.tree.node("li").unwrap().visibility(), Visibility::Visible);

    elements.flame.points.set(BigNum::from(3));
    elements.life.buyables[1].amount_signal().set(BigNum::from(2));
    elements.aqua.bubble_time.set(BigNum::from(99));
    elements.main.particles.set(BigNum::from(2500));

    let button = elements.reset_button("li").unwrap();
    assert_eq!(button.click(), Some(BigNum::ONE));

    assert_eq!(elements.lightning.points.value(), BigNum::ONE);
    assert_eq!(elements.flame.points.value(), BigNum::ZERO);
    assert_eq!(elements.life.buyables[1].amount(), BigNum::ZERO);
    assert_eq!(elements.aqua.bubble_time.get(), BigNum::ZERO);
    assert_eq!(elements.main.particles.value(), BigNum::from(10));
    assert!(elements.advancements.unlock_lightning.earned());
    for id in ["f", "l", "a"] {
        let reset = elements.tree.node(id).unwrap().reset_handle().unwrap();
        assert_eq!(reset.invocations(), 1, "layer {id}");
    }
}

// ---------------------------------------------------------------------------
// Milestones and passive generation
// ---------------------------------------------------------------------------

#[test]
fn advancement_milestones_are_earned_on_tick() {
    let mut elements = build();
    elements.advancements.points.set(BigNum::from(4));

    let report = elements.update(1.0).unwrap();
    assert_eq!(
        report.milestones_earned,
        ["adv.unlock_lightning", "adv.passive_generation"]
    );
    assert!(!elements.advancements.early_boost.earned());

    let report = elements.update(1.0).unwrap();
    assert!(report.milestones_earned.is_empty());
}

#[test]
fn passive_generation_follows_the_milestone() {
    let mut elements = build();
    elements.main.particles.set(BigNum::from(1000));
    elements.advancements.points.set(BigNum::from(4));

    // Earned at the end of this tick; no generation yet.
    elements.update(1.0).unwrap();
    assert_eq!(elements.flame.points.value(), BigNum::ZERO);

    elements.update(1.0).unwrap();
    assert_eq!(elements.flame.points.value(), BigNum::from(4));
    assert_eq!(elements.life.points.value(), BigNum::from(4));
    assert_eq!(elements.aqua.points.value(), BigNum::from(4));
    assert_eq!(elements.main.particles.value(), BigNum::from(1000));
}

#[test]
fn early_boost_triples_gain_for_two_minutes() {
    let mut elements = build();
    elements.main.particles.set(BigNum::from(1000));
    elements.advancements.points.set(BigNum::from(5));
    elements.update(1.0).unwrap();
    assert!(elements.advancements.early_boost.earned());

    // floor(3 * (1000 / 10)^(1/3)) = 13, and 10 * (13 / 3)^3 <= 1000.
    assert_eq!(elements.flame.conversion.current_gain(), BigNum::from(13));

    elements.flame.time.set(121.0);
    assert_eq!(elements.flame.conversion.current_gain(), BigNum::from(4));
    // Life still runs on its own clock.
    assert_eq!(elements.life.conversion.current_gain(), BigNum::from(13));
}

// ---------------------------------------------------------------------------
// Upgrades, buyables and modes
// ---------------------------------------------------------------------------

#[test]
fn flame_upgrades_unlock_in_sequence() {
    let elements = build();
    let [hot_start, heat_speed, liquid_fire] = [0, 1, 2].map(|i| elements.flame.upgrades[i].clone());
    assert_eq!(
        [hot_start.id(), heat_speed.id(), liquid_fire.id()],
        ["f.hot_start", "f.heat_speed", "f.liquid_fire"]
    );
    assert_eq!(hot_start.visibility(), Visibility::None);

    elements.flame.points.set(BigNum::from(36));
    assert_eq!(hot_start.visibility(), Visibility::Visible);
    assert_eq!(heat_speed.visibility(), Visibility::None);
    assert!(!heat_speed.purchase());

    assert!(hot_start.purchase());
    assert!(heat_speed.purchase());
    assert!(liquid_fire.purchase());
    assert_eq!(elements.flame.points.value(), BigNum::ZERO);

    // log20(1) + 1 = 1 at zero Flame Particles.
    assert_eq!(elements.main.particle_gain.get(), BigNum::ONE);
    assert_eq!(elements.aqua.bubble_speed.get(), BigNum::ONE);
}

#[test]
fn life_buyables_feed_particle_gain() {
    let elements = build();
    elements.life.points.set(BigNum::from(40));
    let first = &elements.life.buyables[0];
    let second = &elements.life.buyables[1];
    assert_eq!(second.visibility(), Visibility::None);

    // 3^0 + 3^1 + 3^2 = 13
    assert!(first.purchase());
    assert!(first.purchase());
    assert!(first.purchase());
    assert_eq!(first.amount(), BigNum::from(3));
    assert_eq!(elements.life.points.value(), BigNum::from(27));
    assert_eq!(elements.main.particle_gain.get(), BigNum::from(3));

    // 4^(0^1.2) * 10 = 10
    assert_eq!(second.visibility(), Visibility::Visible);
    assert_eq!(second.cost(), Some(BigNum::from(10)));
    assert!(second.purchase());
    assert_eq!(elements.main.particle_gain.get(), BigNum::from(6));

    assert_eq!(elements.life.buyables[3].visibility(), Visibility::None);
}

#[test]
fn lightning_modes_are_exclusive() {
    let elements = build();
    elements.life.buyables[0].amount_signal().set(BigNum::from(10));
    elements.lightning.points.set(BigNum::from(5));
    let modes = &elements.lightning.modes;

    // Mode A is active from the start: 10 + 2 * log2(6).
    assert!(!modes[0].can_click());
    assert!(approx(
        elements.main.particle_gain.get(),
        10.0 + 2.0 * 6f64.log2()
    ));

    assert!(modes[1].click());
    assert_eq!(elements.lightning.mode(), MODE_MULTIPLY);
    assert!(!modes[1].can_click());
    assert!(approx(elements.main.particle_gain.get(), 10.0 * 6f64.sqrt()));

    assert!(modes[3].click());
    assert_eq!(elements.lightning.mode(), MODE_DISTANCE);
    let distance = (6f64.log10() * 11f64.sqrt() + 1.0).log10() + 1.0;
    assert!(approx(elements.main.particle_gain.get(), 10.0 * distance));
}

#[test]
fn lightning_modes_unlock_with_best() {
    let elements = build();
    let shown = |elements: &Elements| -> Vec<bool> {
        elements
            .lightning
            .modes
            .iter()
            .map(|mode| mode.visibility().is_shown())
            .collect()
    };
    assert_eq!(shown(&elements), [false, false, false, false]);
    elements.lightning.points.set(BigNum::from(2));
    assert_eq!(shown(&elements), [true, true, true, false]);
    // Best, not current, gates the modes.
    elements.lightning.points.set(BigNum::ZERO);
    assert_eq!(shown(&elements), [true, true, true, false]);
}

// ---------------------------------------------------------------------------
// Aqua
// ---------------------------------------------------------------------------

#[test]
fn aqua_fills_bubbles_and_waves() {
    let mut elements = build();
    elements.aqua.points.set(BigNum::from(10));
    elements.update(1.0).unwrap();

    assert_eq!(elements.aqua.bubble_time.get(), BigNum::from(10));
    assert_eq!(elements.aqua.bubbles.get().floor(), BigNum::ONE);
    assert!(approx(elements.aqua.wave_time.get(), 0.1));
    // One whole bubble is one particle per second, already this tick.
    assert_eq!(elements.main.particles.value(), BigNum::from(11));
}

#[test]
fn waves_lower_the_aqua_requirement() {
    let elements = build();
    assert_eq!(elements.aqua.requirement.get(), BigNum::from(10));
    elements.aqua.wave_time.set(BigNum::from(9));
    assert_eq!(elements.aqua.requirement.get(), BigNum::from(5));

    elements.main.particles.set(BigNum::from(5));
    assert_eq!(elements.aqua.conversion.current_gain(), BigNum::ONE);
}

// ---------------------------------------------------------------------------
// Ticks and saves
// ---------------------------------------------------------------------------

#[test]
fn zero_update_changes_nothing() {
    let mut elements = build();
    elements.reset_button("f").unwrap().click();
    elements.flame.upgrades[0].purchase();
    elements.update(3.0).unwrap();

    let before = elements.game.capture_snapshot();
    let report = elements.update(0.0).unwrap();
    assert_eq!(report, TickReport::default());
    assert_eq!(elements.game.capture_snapshot(), before);
}

#[test]
fn save_round_trips_into_a_fresh_game() {
    let mut elements = build();
    elements.reset_button("f").unwrap().click();
    elements.flame.upgrades[0].purchase();
    elements.update(30.0).unwrap();
    elements.life.points.set(BigNum::from(9));
    let text = elements.game.capture_snapshot().to_json().unwrap();

    let mut restored = build();
    let snapshot = SaveSnapshot::from_json(&text).unwrap();
    restored.game.restore_snapshot(&snapshot).unwrap();

    assert_eq!(restored.game.state_hash(), elements.game.state_hash());
    assert_eq!(restored.main.particles.value(), BigNum::from(30));
    assert!(restored.flame.upgrades[0].bought());
    assert_eq!(restored.main.particle_gain.get(), BigNum::ONE);
    assert_eq!(restored.life.points.value(), BigNum::from(9));
    assert_eq!(restored.game.time_played(), 30.0);
}

#[test]
fn tampered_save_is_rejected() {
    let mut elements = build();
    let mut value = serde_json::to_value(elements.game.capture_snapshot()).unwrap();
    value["fields"]["main"]["particles"] = serde_json::json!("1e100");

    let err = elements.game.restore_json(value, |_, _| {}).unwrap_err();
    assert!(matches!(err, GameError::HashMismatch { .. }));
    assert_eq!(elements.main.particles.value(), BigNum::from(10));
}
