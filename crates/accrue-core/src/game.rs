//! The game: layer registry and variable-timestep tick driver.
//!
//! A [`Game`] owns the reactive [`Runtime`], the ordered list of declared
//! layers, tick handlers, milestones and trees. Each call to
//! [`Game::update`]:
//!
//! 1. Validates the real-time delta and scales it by `dev_speed`.
//! 2. Splits the effective delta into equal sub-ticks of at most
//!    `max_tick_length` seconds.
//! 3. Per sub-tick, runs every tick handler in registration order, then
//!    evaluates the registered milestones, then advances the tick counter and
//!    time played.
//!
//! Handlers read the *current* values: a handler sees whatever earlier
//! handlers in the same sub-tick wrote. With a fixed handler order and no
//! other mutation source, the same deltas from the same state produce the same
//! state.
//!
//! # Example
//!
//! ```
//! use accrue_core::prelude::*;
//!
//! let mut game = Game::new(GameConfig::default());
//! let main = game.declare_layer("main", "Tree").unwrap();
//! let points = main.resource("points", "points", 0).unwrap();
//!
//! game.add_tick_handler("generate", move |dt| points.add(BigNum::from(dt * 2.0)));
//!
//! for _ in 0..10 {
//!     game.update(0.05).unwrap();
//! }
//! assert_eq!(game.tick_count(), 10);
//! ```

use std::time::{Duration, Instant};

use accrue_reactive::prelude::*;

use crate::features::milestone::Milestone;
use crate::layer::Layer;
use crate::tree::Tree;
use crate::{BuildError, GameError};

/// Upper bound on sub-ticks per update; longer deltas are truncated.
const MAX_SUB_TICKS: u64 = 10_000;

// ---------------------------------------------------------------------------
// GameConfig
// ---------------------------------------------------------------------------

/// Configuration for the tick driver and save format.
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    /// Multiplier applied to every real-time delta. `0.0` pauses the game.
    /// Must be finite and non-negative.
    pub dev_speed: f64,
    /// Longest single sub-tick in seconds. Must be positive and finite.
    pub max_tick_length: f64,
    /// Longest offline catch-up in seconds. Must be non-negative.
    pub offline_limit: f64,
    /// Save format version written into snapshots.
    pub version: String,
}

impl Default for GameConfig {
    /// Real-time speed, one-hour sub-ticks, one hour of offline progress,
    /// save version `"0.1"`.
    fn default() -> Self {
        Self {
            dev_speed: 1.0,
            max_tick_length: 3600.0,
            offline_limit: 3600.0,
            version: "0.1".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// TickDiagnostics / TickReport
// ---------------------------------------------------------------------------

/// Timing diagnostics for the last sub-tick.
#[derive(Debug, Clone, Default)]
pub struct TickDiagnostics {
    /// Wall-clock time per handler (in order of execution).
    pub handler_times: Vec<(String, Duration)>,
    /// Total time for the sub-tick (handlers + milestones).
    pub total_time: Duration,
}

/// What one [`Game::update`] or [`Game::apply_offline`] call did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Effective seconds simulated (after `dev_speed` and truncation).
    pub delta: f64,
    /// Number of sub-ticks run.
    pub sub_ticks: u64,
    /// Ids of milestones earned during this call, in order.
    pub milestones_earned: Vec<String>,
}

// ---------------------------------------------------------------------------
// Tick handlers
// ---------------------------------------------------------------------------

/// A handler invoked once per sub-tick with the sub-tick length in seconds.
pub type TickHandler = Box<dyn FnMut(f64)>;

/// A named handler in the registry.
struct RegisteredHandler {
    name: String,
    func: TickHandler,
}

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

/// Layer registry plus tick driver.
pub struct Game {
    rt: Runtime,
    config: GameConfig,
    layers: Vec<Layer>,
    handlers: Vec<RegisteredHandler>,
    milestones: Vec<Milestone>,
    trees: Vec<Tree>,
    tick_counter: u64,
    time_played: f64,
    last_diagnostics: TickDiagnostics,
}

impl Game {
    /// Create a game with a fresh runtime.
    ///
    /// # Panics
    ///
    /// Panics if `config` holds an out-of-range value.
    pub fn new(config: GameConfig) -> Self {
        assert!(
            config.dev_speed >= 0.0 && config.dev_speed.is_finite(),
            "dev_speed must be non-negative and finite, got {}",
            config.dev_speed
        );
        assert!(
            config.max_tick_length > 0.0 && config.max_tick_length.is_finite(),
            "max_tick_length must be positive and finite, got {}",
            config.max_tick_length
        );
        assert!(
            config.offline_limit >= 0.0,
            "offline_limit must be non-negative, got {}",
            config.offline_limit
        );
        Self {
            rt: Runtime::new(),
            config,
            layers: Vec::new(),
            handlers: Vec::new(),
            milestones: Vec::new(),
            trees: Vec::new(),
            tick_counter: 0,
            time_played: 0.0,
            last_diagnostics: TickDiagnostics::default(),
        }
    }

    // -- layers -------------------------------------------------------------

    /// Declare a layer shell. Bodies are built afterwards, so every body can
    /// hold handles into every declared layer.
    ///
    /// # Errors
    ///
    /// [`BuildError::DuplicateLayer`] when `id` was already declared.
    pub fn declare_layer(&mut self, id: &str, name: &str) -> Result<Layer, BuildError> {
        if self.layers.iter().any(|l| l.id() == id) {
            return Err(BuildError::DuplicateLayer { id: id.to_string() });
        }
        let layer = Layer::new(self.rt.clone(), id, name);
        self.layers.push(layer.clone());
        tracing::debug!(layer = id, name, "layer declared");
        Ok(layer)
    }

    pub fn layer(&self, id: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id() == id)
    }

    /// Layers in declaration order.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    // -- tick handlers ------------------------------------------------------

    /// Register a handler to run every sub-tick, after every handler
    /// registered before it.
    ///
    /// # Panics
    ///
    /// Panics if a handler with the same name is already registered.
    pub fn add_tick_handler(&mut self, name: &str, func: impl FnMut(f64) + 'static) {
        assert!(
            !self.handlers.iter().any(|h| h.name == name),
            "duplicate handler name: {name:?}"
        );
        self.handlers.push(RegisteredHandler {
            name: name.to_owned(),
            func: Box::new(func),
        });
    }

    /// Handler names in execution order.
    pub fn handler_names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name.as_str()).collect()
    }

    // -- milestones and trees -----------------------------------------------

    /// Evaluate `milestone` after every sub-tick with a positive delta.
    pub fn add_milestone(&mut self, milestone: Milestone) {
        self.milestones.push(milestone);
    }

    pub fn milestones(&self) -> &[Milestone] {
        &self.milestones
    }

    pub fn add_tree(&mut self, tree: Tree) {
        self.trees.push(tree);
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    // -- driving ------------------------------------------------------------

    /// Advance the game by `delta` real-time seconds.
    ///
    /// A zero effective delta (including a paused `dev_speed`) runs nothing
    /// and leaves every signal untouched.
    ///
    /// # Errors
    ///
    /// [`GameError::InvalidDelta`] when `delta` is negative or not finite.
    pub fn update(&mut self, delta: f64) -> Result<TickReport, GameError> {
        if !delta.is_finite() || delta < 0.0 {
            return Err(GameError::InvalidDelta { delta });
        }
        Ok(self.advance(delta * self.config.dev_speed))
    }

    /// Catch up on `seconds` spent offline, clamped to `offline_limit`.
    ///
    /// `dev_speed` does not apply.
    ///
    /// # Errors
    ///
    /// [`GameError::InvalidDelta`] when `seconds` is negative or NaN.
    pub fn apply_offline(&mut self, seconds: f64) -> Result<TickReport, GameError> {
        if seconds.is_nan() || seconds < 0.0 {
            return Err(GameError::InvalidDelta { delta: seconds });
        }
        let clamped = seconds.min(self.config.offline_limit);
        tracing::info!(
            offline = seconds,
            applied = clamped,
            limit = self.config.offline_limit,
            "applying offline progress"
        );
        Ok(self.advance(clamped))
    }

    fn advance(&mut self, effective: f64) -> TickReport {
        if effective <= 0.0 {
            return TickReport::default();
        }

        let max = self.config.max_tick_length;
        let mut sub_ticks = (effective / max).ceil().max(1.0);
        let mut total = effective;
        if sub_ticks > MAX_SUB_TICKS as f64 {
            sub_ticks = MAX_SUB_TICKS as f64;
            total = max * sub_ticks;
            tracing::warn!(
                requested = effective,
                applied = total,
                "delta exceeds the sub-tick budget -- truncating"
            );
        }
        let sub_ticks = sub_ticks as u64;
        let step = total / sub_ticks as f64;

        let mut report = TickReport {
            delta: total,
            sub_ticks,
            milestones_earned: Vec::new(),
        };
        for _ in 0..sub_ticks {
            self.sub_tick(step, &mut report.milestones_earned);
        }
        report
    }

    fn sub_tick(&mut self, dt: f64, earned: &mut Vec<String>) {
        let tick_start = Instant::now();
        let mut handler_times = Vec::with_capacity(self.handlers.len());

        for handler in &mut self.handlers {
            let start = Instant::now();
            (handler.func)(dt);
            let elapsed = start.elapsed();
            tracing::trace!(handler = %handler.name, ?elapsed, "tick handler ran");
            handler_times.push((handler.name.clone(), elapsed));
        }

        for milestone in &self.milestones {
            if milestone.update() {
                earned.push(milestone.id().to_string());
            }
        }

        self.tick_counter += 1;
        self.time_played += dt;

        self.last_diagnostics = TickDiagnostics {
            handler_times,
            total_time: tick_start.elapsed(),
        };
    }

    // -- accessors ----------------------------------------------------------

    /// Sub-ticks executed so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    /// Effective seconds simulated so far.
    pub fn time_played(&self) -> f64 {
        self.time_played
    }

    pub(crate) fn set_progress(&mut self, tick_counter: u64, time_played: f64) {
        self.tick_counter = tick_counter;
        self.time_played = time_played;
    }

    /// Diagnostics from the last sub-tick (timing per handler).
    pub fn last_diagnostics(&self) -> &TickDiagnostics {
        &self.last_diagnostics
    }

    pub fn runtime(&self) -> &Runtime {
        &self.rt
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("layers", &self.layers)
            .field("handlers", &self.handler_names())
            .field("tick_counter", &self.tick_counter)
            .field("time_played", &self.time_played)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
