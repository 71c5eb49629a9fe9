//! Persistent fields, per-owner resets and graph snapshots.
//!
//! A persistent field is an ordinary signal that is additionally registered
//! under `(owner, path)`, where the owner is normally a layer id. The
//! registry remembers how to (de)serialize each field, which gives three
//! operations:
//!
//! - [`Runtime::reset_owner`] restores every field of one owner to its
//!   initial value (the building block of prestige resets).
//! - [`Runtime::capture_snapshot`] serializes every field into a
//!   [`GraphSnapshot`].
//! - [`Runtime::restore_snapshot`] validates a snapshot completely before
//!   writing any field, so a bad snapshot leaves the graph untouched.

use std::any::Any;
use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::node::NodeId;
use crate::runtime::Runtime;
use crate::signal::Signal;
use crate::ReactiveError;

// ---------------------------------------------------------------------------
// Snapshot type
// ---------------------------------------------------------------------------

/// Serialized values of every persistent field, grouped by owner.
///
/// `BTreeMap`s keep the serialized form deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphSnapshot {
    pub owners: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
}

impl GraphSnapshot {
    /// The serialized value of one field.
    pub fn get(&self, owner: &str, path: &str) -> Option<&serde_json::Value> {
        self.owners.get(owner)?.get(path)
    }

    /// Total number of fields across all owners.
    pub fn field_count(&self) -> usize {
        self.owners.values().map(BTreeMap::len).sum()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

type SerializeFn = fn(&dyn Any) -> Result<serde_json::Value, String>;
type DeserializeFn = fn(&serde_json::Value) -> Result<Box<dyn Any>, String>;

pub(crate) struct PersistentEntry {
    node: NodeId,
    serialize: SerializeFn,
    deserialize: DeserializeFn,
}

#[derive(Default)]
pub(crate) struct PersistRegistry {
    owners: BTreeMap<String, BTreeMap<String, PersistentEntry>>,
}

impl PersistRegistry {
    #[cfg(test)]
    pub(crate) fn contains_node(&self, id: NodeId) -> bool {
        self.owners
            .values()
            .flat_map(BTreeMap::values)
            .any(|entry| entry.node == id)
    }
}

fn serialize_value<T: Serialize + 'static>(value: &dyn Any) -> Result<serde_json::Value, String> {
    let value = value
        .downcast_ref::<T>()
        .ok_or_else(|| "stored value has an unexpected type".to_string())?;
    serde_json::to_value(value).map_err(|e| e.to_string())
}

fn deserialize_value<T: DeserializeOwned + 'static>(
    value: &serde_json::Value,
) -> Result<Box<dyn Any>, String> {
    serde_json::from_value::<T>(value.clone())
        .map(|v| Box::new(v) as Box<dyn Any>)
        .map_err(|e| e.to_string())
}

// ---------------------------------------------------------------------------
// Runtime API
// ---------------------------------------------------------------------------

impl Runtime {
    /// Create a signal registered as persistent field `owner.path`.
    ///
    /// # Errors
    ///
    /// [`ReactiveError::DuplicateField`] when the key is already taken.
    pub fn persistent<T>(
        &self,
        owner: &str,
        path: &str,
        initial: T,
    ) -> Result<Signal<T>, ReactiveError>
    where
        T: Clone + PartialEq + Serialize + DeserializeOwned + 'static,
    {
        let taken = self
            .graph()
            .borrow()
            .persist
            .owners
            .get(owner)
            .is_some_and(|fields| fields.contains_key(path));
        if taken {
            return Err(ReactiveError::DuplicateField {
                owner: owner.to_string(),
                path: path.to_string(),
            });
        }

        let signal = self.signal(format!("{owner}.{path}"), initial);
        self.graph()
            .borrow_mut()
            .persist
            .owners
            .entry(owner.to_string())
            .or_default()
            .insert(
                path.to_string(),
                PersistentEntry {
                    node: signal.id(),
                    serialize: serialize_value::<T>,
                    deserialize: deserialize_value::<T>,
                },
            );
        Ok(signal)
    }

    /// Owners with at least one persistent field, in sorted order.
    pub fn owners(&self) -> Vec<String> {
        self.graph().borrow().persist.owners.keys().cloned().collect()
    }

    /// Field paths registered for `owner`, in sorted order.
    pub fn persistent_paths(&self, owner: &str) -> Vec<String> {
        self.graph()
            .borrow()
            .persist
            .owners
            .get(owner)
            .map(|fields| fields.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Set every persistent field of `owner` back to its initial value.
    ///
    /// Returns the number of fields whose value actually changed.
    pub fn reset_owner(&self, owner: &str) -> Result<usize, ReactiveError> {
        let nodes: Vec<NodeId> = self
            .graph()
            .borrow()
            .persist
            .owners
            .get(owner)
            .map(|fields| fields.values().map(|e| e.node).collect())
            .unwrap_or_default();

        let mut changed = 0;
        for node in nodes {
            if self.graph().borrow_mut().reset_node(node)? {
                changed += 1;
            }
        }
        tracing::debug!(owner, changed, "persistent fields reset");
        Ok(changed)
    }

    /// Serialize every persistent field.
    ///
    /// A field that fails to serialize is skipped with a warning.
    pub fn capture_snapshot(&self) -> GraphSnapshot {
        let graph = self.graph().borrow();
        let mut snapshot = GraphSnapshot::default();
        for (owner, fields) in &graph.persist.owners {
            let mut values = BTreeMap::new();
            for (path, entry) in fields {
                let serialized = graph
                    .node(entry.node)
                    .map_err(|e| e.to_string())
                    .and_then(|node| {
                        node.value
                            .as_ref()
                            .ok_or_else(|| "field has no value".to_string())
                    })
                    .and_then(|value| (entry.serialize)(value.as_ref()));
                match serialized {
                    Ok(value) => {
                        values.insert(path.clone(), value);
                    }
                    Err(details) => {
                        tracing::warn!(
                            owner = %owner,
                            path = %path,
                            details = %details,
                            "persistent field could not be serialized -- skipping in snapshot"
                        );
                    }
                }
            }
            snapshot.owners.insert(owner.clone(), values);
        }
        snapshot
    }

    /// Write every field of `snapshot` back into the graph.
    ///
    /// Registered fields missing from the snapshot are reset to their
    /// initial value, so the result does not depend on the state before the
    /// call.
    ///
    /// # Errors
    ///
    /// Returns [`ReactiveError::UnknownField`] or
    /// [`ReactiveError::Deserialize`] before anything is written.
    pub fn restore_snapshot(&self, snapshot: &GraphSnapshot) -> Result<(), ReactiveError> {
        // 1. Pre-validate and deserialize everything up front.
        let mut writes: Vec<(NodeId, Box<dyn Any>)> = Vec::with_capacity(snapshot.field_count());
        let mut missing: Vec<NodeId> = Vec::new();
        {
            let graph = self.graph().borrow();
            for (owner, values) in &snapshot.owners {
                for (path, value) in values {
                    let entry = graph
                        .persist
                        .owners
                        .get(owner)
                        .and_then(|fields| fields.get(path))
                        .ok_or_else(|| ReactiveError::UnknownField {
                            owner: owner.clone(),
                            path: path.clone(),
                        })?;
                    let decoded =
                        (entry.deserialize)(value).map_err(|details| ReactiveError::Deserialize {
                            owner: owner.clone(),
                            path: path.clone(),
                            details,
                        })?;
                    writes.push((entry.node, decoded));
                }
            }
            for (owner, fields) in &graph.persist.owners {
                for (path, entry) in fields {
                    if snapshot.get(owner, path).is_none() {
                        missing.push(entry.node);
                    }
                }
            }
        }

        // 2. Apply.
        for (node, value) in writes {
            self.graph().borrow_mut().write(node, value)?;
        }
        for node in missing {
            self.graph().borrow_mut().reset_node(node)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use accrue_num::BigNum;

    fn setup() -> (Runtime, Signal<BigNum>, Signal<bool>, Signal<BigNum>) {
        let rt = Runtime::new();
        let points = rt.persistent("flame", "points", BigNum::ZERO).unwrap();
        let unlocked = rt.persistent("flame", "unlocked", false).unwrap();
        let particles = rt.persistent("main", "particles", BigNum::from(10)).unwrap();
        (rt, points, unlocked, particles)
    }

    #[test]
    fn duplicate_field_is_rejected() {
        let (rt, ..) = setup();
        assert_eq!(
            rt.persistent("flame", "points", BigNum::ONE).unwrap_err(),
            ReactiveError::DuplicateField {
                owner: "flame".into(),
                path: "points".into()
            }
        );
    }

    #[test]
    fn reset_owner_touches_only_that_owner() {
        let (rt, points, unlocked, particles) = setup();
        points.set(BigNum::from(50));
        unlocked.set(true);
        particles.set(BigNum::from(99));

        assert_eq!(rt.reset_owner("flame").unwrap(), 2);
        assert_eq!(points.get(), BigNum::ZERO);
        assert!(!unlocked.get());
        assert_eq!(particles.get(), BigNum::from(99));
        assert_eq!(rt.reset_owner("nobody").unwrap(), 0);
    }

    #[test]
    fn snapshot_uses_sorted_owner_and_path_keys() {
        let (rt, points, ..) = setup();
        points.set(BigNum::from_parts(1.5, 400.0));
        let snap = rt.capture_snapshot();
        assert_eq!(rt.owners(), vec!["flame".to_string(), "main".to_string()]);
        assert_eq!(snap.field_count(), 3);
        assert_eq!(snap.get("flame", "points"), Some(&serde_json::json!("1.5e400")));

        let text = serde_json::to_string(&snap).unwrap();
        assert_eq!(
            text,
            r#"{"flame":{"points":"1.5e400","unlocked":false},"main":{"particles":"10"}}"#
        );
    }

    #[test]
    fn restore_round_trips_and_resets_missing_fields() {
        let (rt, points, unlocked, particles) = setup();
        points.set(BigNum::from(7));
        let mut snap = rt.capture_snapshot();
        snap.owners.get_mut("main").unwrap().clear();

        points.set(BigNum::from(1000));
        unlocked.set(true);
        particles.set(BigNum::from(5));

        rt.restore_snapshot(&snap).unwrap();
        assert_eq!(points.get(), BigNum::from(7));
        assert!(!unlocked.get());
        assert_eq!(particles.get(), BigNum::from(10));
    }

    #[test]
    fn invalid_snapshot_changes_nothing() {
        let (rt, points, ..) = setup();
        points.set(BigNum::from(3));

        let mut snap = rt.capture_snapshot();
        snap.owners
            .get_mut("flame")
            .unwrap()
            .insert("points".into(), serde_json::json!("1.0e5"));
        snap.owners
            .get_mut("flame")
            .unwrap()
            .insert("unlocked".into(), serde_json::json!("not a bool"));
        assert!(matches!(
            rt.restore_snapshot(&snap),
            Err(ReactiveError::Deserialize { .. })
        ));
        assert_eq!(points.get(), BigNum::from(3));

        let mut unknown = GraphSnapshot::default();
        unknown
            .owners
            .entry("ghost".into())
            .or_default()
            .insert("x".into(), serde_json::json!(1));
        assert!(matches!(
            rt.restore_snapshot(&unknown),
            Err(ReactiveError::UnknownField { .. })
        ));
    }

    #[test]
    fn restore_marks_dependents_dirty() {
        let (rt, points, ..) = setup();
        let doubled = {
            let points = points.clone();
            rt.derived("doubled", move || points.get() * 2.0)
        };
        assert_eq!(doubled.get(), BigNum::ZERO);

        let mut snap = rt.capture_snapshot();
        snap.owners
            .get_mut("flame")
            .unwrap()
            .insert("points".into(), serde_json::json!("21"));
        rt.restore_snapshot(&snap).unwrap();
        assert_eq!(doubled.get(), BigNum::from(42));
    }
}
