//! Save snapshots with BLAKE3 hashing.
//!
//! Provides [`SaveSnapshot`] -- a serializable representation of the full
//! game state (every persistent field, tick counter, time played, save
//! version) with a BLAKE3 content hash for integrity verification.
//!
//! # Usage
//!
//! ```
//! use accrue_core::prelude::*;
//!
//! let mut game = Game::new(GameConfig::default());
//! let main = game.declare_layer("main", "Tree").unwrap();
//! let points = main.resource("points", "points", 0).unwrap();
//! {
//!     let points = points.clone();
//!     game.add_tick_handler("points", move |dt| points.add(BigNum::from(dt)));
//! }
//! game.update(10.0).unwrap();
//!
//! let snapshot = game.capture_snapshot();
//! assert_eq!(snapshot.tick_counter, 1);
//! assert_eq!(snapshot.hash.len(), 64); // BLAKE3 hex digest
//!
//! game.update(10.0).unwrap();
//! assert_eq!(points.value(), BigNum::from(20));
//!
//! game.restore_snapshot(&snapshot).unwrap();
//! assert_eq!(points.value(), BigNum::from(10));
//! assert_eq!(game.tick_count(), 1);
//! ```
//!
//! # What Is NOT Serialized
//!
//! - **Tick handlers** and **derived values** -- rebuilt by the host's layer
//!   construction code; deriveds recompute from the restored signals.
//! - **Diagnostics** -- per-tick timing is transient.

use serde::{Deserialize, Serialize};

use accrue_reactive::prelude::GraphSnapshot;

use crate::game::Game;
use crate::GameError;

// ---------------------------------------------------------------------------
// SaveSnapshot
// ---------------------------------------------------------------------------

/// A serializable snapshot of the full game state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveSnapshot {
    /// Save format version, from [`GameConfig::version`](crate::game::GameConfig::version).
    pub version: String,
    /// Sub-ticks executed at the time of capture.
    pub tick_counter: u64,
    /// Effective seconds played at the time of capture.
    pub time_played: f64,
    /// Every persistent field, by owner and path.
    pub fields: GraphSnapshot,
    /// BLAKE3 hex digest (64 lowercase hex chars) of the other fields.
    pub hash: String,
}

impl SaveSnapshot {
    /// Build a snapshot and hash it.
    pub fn new(version: String, tick_counter: u64, time_played: f64, fields: GraphSnapshot) -> Self {
        let hash = compute_hash(&version, tick_counter, time_played, &fields);
        Self {
            version,
            tick_counter,
            time_played,
            fields,
            hash,
        }
    }

    /// The hash recomputed from the snapshot's data.
    pub fn recompute_hash(&self) -> String {
        compute_hash(&self.version, self.tick_counter, self.time_played, &self.fields)
    }

    /// Whether the recorded hash matches the data.
    pub fn verify(&self) -> bool {
        self.recompute_hash() == self.hash
    }

    pub fn to_json(&self) -> Result<String, GameError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, GameError> {
        Ok(serde_json::from_str(text)?)
    }
}

// ---------------------------------------------------------------------------
// Hashing helpers
// ---------------------------------------------------------------------------

/// BLAKE3 hex digest of the canonical JSON of the hashable state.
///
/// `GraphSnapshot` stores `BTreeMap`s, so the byte stream is stable.
fn compute_hash(version: &str, tick_counter: u64, time_played: f64, fields: &GraphSnapshot) -> String {
    #[derive(Serialize)]
    struct HashableState<'a> {
        version: &'a str,
        tick_counter: u64,
        time_played: f64,
        fields: &'a GraphSnapshot,
    }

    let hashable = HashableState {
        version,
        tick_counter,
        time_played,
        fields,
    };

    let json_bytes = serde_json::to_vec(&hashable)
        .expect("SaveSnapshot state should always be JSON-serializable");

    blake3::hash(&json_bytes).to_hex().to_string()
}

// ---------------------------------------------------------------------------
// Game snapshot/restore methods
// ---------------------------------------------------------------------------

impl Game {
    /// Capture every persistent field plus the tick metadata.
    pub fn capture_snapshot(&self) -> SaveSnapshot {
        SaveSnapshot::new(
            self.config().version.clone(),
            self.tick_count(),
            self.time_played(),
            self.runtime().capture_snapshot(),
        )
    }

    /// Restore a previously captured snapshot.
    ///
    /// The hash is verified and every field is decoded before anything is
    /// written; on error the game is left untouched. Registered fields absent
    /// from the snapshot return to their initial values.
    ///
    /// # Errors
    ///
    /// [`GameError::HashMismatch`] for corrupted or tampered snapshots, and
    /// [`GameError::Reactive`] for unknown or undecodable fields.
    pub fn restore_snapshot(&mut self, snapshot: &SaveSnapshot) -> Result<(), GameError> {
        let recomputed = snapshot.recompute_hash();
        if recomputed != snapshot.hash {
            return Err(GameError::HashMismatch {
                recorded: snapshot.hash.clone(),
                recomputed,
            });
        }

        self.runtime().restore_snapshot(&snapshot.fields)?;
        self.set_progress(snapshot.tick_counter, snapshot.time_played);

        tracing::debug!(
            version = %snapshot.version,
            tick_counter = snapshot.tick_counter,
            fields = snapshot.fields.field_count(),
            "snapshot restored"
        );
        Ok(())
    }

    /// Load a save from its raw JSON tree.
    ///
    /// When the save's `version` differs from the configured one, `migrate`
    /// receives that version and the tree before parsing; the hash is then
    /// recomputed, since a migrated tree no longer matches its recorded
    /// digest. Saves of the current version are verified as-is.
    ///
    /// # Errors
    ///
    /// [`GameError::Json`] when the (migrated) tree is not a snapshot, plus
    /// every error of [`Game::restore_snapshot`].
    pub fn restore_json<F>(&mut self, mut value: serde_json::Value, migrate: F) -> Result<(), GameError>
    where
        F: FnOnce(&str, &mut serde_json::Value),
    {
        let saved_version = value
            .get("version")
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned);

        let migrated = match saved_version {
            Some(version) if version != self.config().version => {
                tracing::info!(
                    from = %version,
                    to = %self.config().version,
                    "migrating save"
                );
                migrate(&version, &mut value);
                true
            }
            _ => false,
        };

        let mut snapshot: SaveSnapshot = serde_json::from_value(value)?;
        if migrated {
            snapshot.version = self.config().version.clone();
            snapshot.hash = snapshot.recompute_hash();
        }
        self.restore_snapshot(&snapshot)
    }

    /// The BLAKE3 hash of the current state, equivalent to
    /// `capture_snapshot().hash`.
    pub fn state_hash(&self) -> String {
        self.capture_snapshot().hash
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameConfig;
    use crate::resource::Resource;
    use accrue_num::BigNum;
    use accrue_reactive::prelude::{ReactiveError, Signal};

    fn setup() -> (Game, Resource, Signal<bool>) {
        let mut game = Game::new(GameConfig::default());
        let main = game.declare_layer("main", "Tree").unwrap();
        let flame = game.declare_layer("f", "Flame").unwrap();
        let particles = main.resource("particles", "particles", 10).unwrap();
        let unlocked = flame.persistent("unlocked", false).unwrap();
        {
            let particles = particles.clone();
            game.add_tick_handler("particles", move |dt| particles.add(BigNum::from(dt)));
        }
        (game, particles, unlocked)
    }

    // -- 1. Capture ---------------------------------------------------------

    #[test]
    fn capture_records_fields_and_progress() {
        let (mut game, _particles, unlocked) = setup();
        unlocked.set(true);
        game.update(5.0).unwrap();

        let snap = game.capture_snapshot();
        assert_eq!(snap.version, "0.1");
        assert_eq!(snap.tick_counter, 1);
        assert_eq!(snap.time_played, 5.0);
        assert_eq!(snap.fields.get("main", "particles"), Some(&serde_json::json!("15")));
        assert_eq!(snap.fields.get("f", "unlocked"), Some(&serde_json::json!(true)));
        assert!(snap.verify());
    }

    #[test]
    fn identical_states_hash_identically() {
        let (mut a, ..) = setup();
        let (mut b, ..) = setup();
        a.update(7.0).unwrap();
        b.update(7.0).unwrap();
        assert_eq!(a.state_hash(), b.state_hash());

        b.update(1.0).unwrap();
        assert_ne!(a.state_hash(), b.state_hash());
    }

    // -- 2. Restore ---------------------------------------------------------

    #[test]
    fn restore_round_trips_through_json() {
        let (mut game, particles, unlocked) = setup();
        unlocked.set(true);
        game.update(5.0).unwrap();
        let text = game.capture_snapshot().to_json().unwrap();

        game.update(100.0).unwrap();
        unlocked.set(false);

        let snap = SaveSnapshot::from_json(&text).unwrap();
        game.restore_snapshot(&snap).unwrap();
        assert_eq!(particles.value(), BigNum::from(15));
        assert!(unlocked.get());
        assert_eq!(game.tick_count(), 1);
        assert_eq!(game.time_played(), 5.0);
    }

    #[test]
    fn tampered_snapshot_is_rejected_untouched() {
        let (mut game, particles, _unlocked) = setup();
        let mut snap = game.capture_snapshot();
        snap.fields
            .owners
            .get_mut("main")
            .unwrap()
            .insert("particles".into(), serde_json::json!("1e100"));

        particles.set(BigNum::from(42));
        let err = game.restore_snapshot(&snap).unwrap_err();
        assert!(matches!(err, GameError::HashMismatch { .. }));
        assert_eq!(particles.value(), BigNum::from(42));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let (mut game, ..) = setup();
        let mut fields = game.runtime().capture_snapshot();
        fields
            .owners
            .entry("ghost".into())
            .or_default()
            .insert("points".into(), serde_json::json!("1"));
        let snap = SaveSnapshot::new("0.1".into(), 0, 0.0, fields);
        let err = game.restore_snapshot(&snap).unwrap_err();
        assert!(matches!(
            err,
            GameError::Reactive(ReactiveError::UnknownField { .. })
        ));
    }

    // -- 3. Migration -------------------------------------------------------

    #[test]
    fn older_saves_are_migrated_before_loading() {
        let (mut game, particles, _unlocked) = setup();
        let old = SaveSnapshot::new(
            "0.0".into(),
            3,
            30.0,
            serde_json::from_value(serde_json::json!({"main": {"points": "77"}})).unwrap(),
        );
        let value = serde_json::to_value(&old).unwrap();

        let mut seen = None;
        game.restore_json(value, |version, tree| {
            seen = Some(version.to_string());
            let main = &mut tree["fields"]["main"];
            let points = main["points"].take();
            main.as_object_mut().unwrap().remove("points");
            main["particles"] = points;
        })
        .unwrap();

        assert_eq!(seen.as_deref(), Some("0.0"));
        assert_eq!(particles.value(), BigNum::from(77));
        assert_eq!(game.tick_count(), 3);
    }

    #[test]
    fn current_saves_skip_migration() {
        let (mut game, ..) = setup();
        let value = serde_json::to_value(game.capture_snapshot()).unwrap();
        let mut called = false;
        game.restore_json(value, |_, _| called = true).unwrap();
        assert!(!called);
    }
}
