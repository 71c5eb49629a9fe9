//! Accrue Elements -- a small elemental incremental game.
//!
//! Particles accumulate on the main layer. Three first-row layers (Flame,
//! Life, Aqua) convert particles into their own currency and feed particle
//! gain back through upgrades, buyables and the bubble bar. Lightning sits in
//! the second row and offers four mutually exclusive modes. Advancements is a
//! side layer that grants milestones for reaching particle-gain thresholds.
//!
//! Every layer is declared before any body is built; bodies then reference
//! each other's handles freely. The main layer's gain deriveds are declared
//! up front and defined last, once every layer it reads exists.
//!
//! # Example
//!
//! ```
//! use accrue_core::prelude::*;
//! use accrue_elements::Elements;
//!
//! let mut elements = Elements::build(GameConfig::default()).unwrap();
//! assert_eq!(elements.main.particles.value(), BigNum::from(10));
//!
//! // 10 particles buy one Flame Particle.
//! let flame = elements.reset_button("f").unwrap();
//! assert_eq!(flame.click(), Some(BigNum::ONE));
//! assert_eq!(elements.main.particles.value(), BigNum::ZERO);
//!
//! // "A Hot Start" generates one particle per second.
//! assert!(elements.flame.upgrades[0].purchase());
//! elements.update(5.0).unwrap();
//! assert_eq!(elements.main.particles.value(), BigNum::from(5));
//! ```

#![deny(unsafe_code)]

pub mod layers;

use std::collections::BTreeMap;

use accrue_core::prelude::*;

use crate::layers::advancements::Advancements;
use crate::layers::aqua::Aqua;
use crate::layers::flame::Flame;
use crate::layers::life::Life;
use crate::layers::lightning::Lightning;
use crate::layers::main::Main;

/// Layer ids, in declaration order.
pub const LAYER_IDS: [&str; 6] = ["main", "f", "l", "a", "li", "adv"];

/// The assembled game.
pub struct Elements {
    pub game: Game,
    pub main: Main,
    pub flame: Flame,
    pub life: Life,
    pub aqua: Aqua,
    pub lightning: Lightning,
    pub advancements: Advancements,
    pub tree: Tree,
    reset_buttons: BTreeMap<String, ResetButton>,
}

impl Elements {
    /// Declare every layer, build the bodies and wire the tree.
    ///
    /// # Errors
    ///
    /// Any [`BuildError`] from the layer bodies; these indicate a content
    /// bug and the host should abort.
    pub fn build(config: GameConfig) -> Result<Self, BuildError> {
        let mut game = Game::new(config);

        // Phase 1: shells.
        let main_layer = game.declare_layer("main", "Tree")?;
        let flame_layer = game.declare_layer("f", "Flame")?;
        let life_layer = game.declare_layer("l", "Life")?;
        let aqua_layer = game.declare_layer("a", "Aqua")?;
        let lightning_layer = game.declare_layer("li", "Lightning")?;
        let advancements_layer = game.declare_layer("adv", "Advancements")?;

        // Phase 2: bodies, each after the layers it reads.
        let main = Main::declare(main_layer)?;
        let advancements = Advancements::build(&mut game, advancements_layer, &main)?;
        let lightning = Lightning::build(lightning_layer, &main, &advancements)?;
        let life = Life::build(&mut game, life_layer, &main, &advancements, &lightning)?;
        let flame = Flame::build(&mut game, flame_layer, &main, &advancements, &life, &lightning)?;
        let aqua = Aqua::build(
            &mut game,
            aqua_layer,
            &main,
            &flame,
            &life,
            &advancements,
            &lightning,
        )?;
        main.define_gain(&flame, &life, &aqua, &lightning)?;
        main.register_generation(&mut game);

        // Phase 3: the tree and its reset buttons.
        let tree = main.build_tree(
            game.runtime(),
            vec![
                vec![
                    flame.tree_node.clone(),
                    life.tree_node.clone(),
                    aqua.tree_node.clone(),
                ],
                vec![lightning.tree_node.clone()],
            ],
            vec![advancements.tree_node.clone()],
        )?;
        game.add_tree(tree.clone());

        let mut reset_buttons = BTreeMap::new();
        for (id, conversion) in [
            ("f", &flame.conversion),
            ("l", &life.conversion),
            ("a", &aqua.conversion),
            ("li", &lightning.conversion),
            ("adv", &advancements.conversion),
        ] {
            let button = ResetButton::new(conversion.clone(), tree.clone(), id)?;
            reset_buttons.insert(id.to_string(), button);
        }

        tracing::debug!(
            layers = game.layers().len(),
            handlers = game.handler_names().len(),
            milestones = game.milestones().len(),
            "elements built"
        );

        Ok(Self {
            game,
            main,
            flame,
            life,
            aqua,
            lightning,
            advancements,
            tree,
            reset_buttons,
        })
    }

    /// The prestige button of a converting layer (`f`, `l`, `a`, `li`, `adv`).
    pub fn reset_button(&self, layer: &str) -> Option<&ResetButton> {
        self.reset_buttons.get(layer)
    }

    pub fn reset_buttons(&self) -> impl Iterator<Item = (&str, &ResetButton)> {
        self.reset_buttons.iter().map(|(id, button)| (id.as_str(), button))
    }

    pub fn update(&mut self, delta: f64) -> Result<TickReport, GameError> {
        self.game.update(delta)
    }
}

impl std::fmt::Debug for Elements {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Elements")
            .field("game", &self.game)
            .field("particles", &self.main.particles)
            .finish_non_exhaustive()
    }
}

/// Best amount of a tracked resource; the current amount otherwise.
pub(crate) fn best_of(resource: &Resource) -> BigNum {
    resource.best().unwrap_or_else(|| resource.value())
}
