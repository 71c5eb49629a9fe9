//! Clickables: buttons with an arbitrary effect.

use std::fmt;
use std::rc::Rc;

use accrue_reactive::prelude::*;

use crate::layer::Layer;
use crate::tree::Visibility;

/// Construction options for a [`Clickable`].
pub struct ClickableOptions {
    pub can_click: Computable<bool>,
    pub visibility: Computable<Visibility>,
    pub on_click: Option<Rc<dyn Fn()>>,
}

impl Default for ClickableOptions {
    fn default() -> Self {
        Self {
            can_click: Computable::constant(true),
            visibility: Computable::constant(Visibility::Visible),
            on_click: None,
        }
    }
}

impl ClickableOptions {
    pub fn on_click(hook: impl Fn() + 'static) -> Self {
        Self {
            on_click: Some(Rc::new(hook)),
            ..Default::default()
        }
    }

    pub fn can_click(mut self, can_click: impl Into<Computable<bool>>) -> Self {
        self.can_click = can_click.into();
        self
    }

    pub fn visibility(mut self, visibility: impl Into<Computable<Visibility>>) -> Self {
        self.visibility = visibility.into();
        self
    }
}

#[derive(Clone)]
pub struct Clickable {
    id: String,
    can_click: Derived<bool>,
    visibility: Derived<Visibility>,
    on_click: Option<Rc<dyn Fn()>>,
}

impl Clickable {
    pub fn new(layer: &Layer, id: &str, options: ClickableOptions) -> Self {
        Self {
            id: format!("{}.{id}", layer.id()),
            can_click: layer.resolve(&format!("clickables.{id}.can_click"), options.can_click),
            visibility: layer.resolve(&format!("clickables.{id}.visibility"), options.visibility),
            on_click: options.on_click,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility.get()
    }

    pub fn can_click(&self) -> bool {
        self.visibility.get() == Visibility::Visible && self.can_click.get()
    }

    /// Run the click hook when clickable.
    pub fn click(&self) -> bool {
        if !self.can_click() {
            return false;
        }
        if let Some(hook) = &self.on_click {
            hook();
        }
        tracing::debug!(clickable = %self.id, "clicked");
        true
    }
}

impl fmt::Debug for Clickable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clickable").field("id", &self.id).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Game, GameConfig};

    #[test]
    fn click_runs_hook_when_allowed() {
        let mut game = Game::new(GameConfig::default());
        let layer = game.declare_layer("e", "Lightning").unwrap();
        let mode = layer.persistent("mode", 0_u32).unwrap();

        let selectors: Vec<Clickable> = (0..4_u32)
            .map(|i| {
                let mode_for_click = mode.clone();
                let mode_for_check = mode.clone();
                Clickable::new(
                    &layer,
                    &format!("mode{i}"),
                    ClickableOptions::on_click(move || mode_for_click.set(i))
                        .can_click(Computable::function(move || mode_for_check.get() != i)),
                )
            })
            .collect();

        assert!(!selectors[0].can_click());
        assert!(selectors[2].click());
        assert_eq!(mode.get(), 2);
        assert!(!selectors[2].click());
        assert!(selectors[0].click());
        assert_eq!(mode.get(), 0);
    }

    #[test]
    fn hidden_clickables_do_nothing() {
        let mut game = Game::new(GameConfig::default());
        let layer = game.declare_layer("e", "Lightning").unwrap();
        let hidden = Clickable::new(
            &layer,
            "hidden",
            ClickableOptions::default().visibility(Visibility::Hidden),
        );
        assert!(!hidden.click());
    }
}
