//! Layer activation.
//!
//! The map offers a fixed set of overlay layers. The engine only runs while at
//! least one of them is enabled: the first layer switched on activates it and
//! the last one switched off deactivates it. Toggles that leave "any layer
//! enabled" unchanged do nothing.

use std::fmt;
use std::str::FromStr;

/// Overlay layers the map can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    Nodes,
    Links,
}

impl Layer {
    pub const ALL: [Layer; 2] = [Layer::Nodes, Layer::Links];
    pub const COUNT: usize = Self::ALL.len();

    fn index(self) -> usize {
        match self {
            Layer::Nodes => 0,
            Layer::Links => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Layer::Nodes => "nodes",
            Layer::Links => "links",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Layer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nodes" => Ok(Layer::Nodes),
            "links" => Ok(Layer::Links),
            other => Err(format!(
                "unknown layer '{}', expected 'nodes' or 'links'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivationState {
    #[default]
    Inactive,
    Active,
}

/// Result of a layer toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Activated,
    Deactivated,
    Unchanged,
}

/// Callbacks run on activation state changes.
pub trait ActivationHooks {
    /// Subscribe to viewport changes and seed the first cycle.
    fn activate(&mut self);

    /// Unsubscribe from viewport changes. In-flight requests are left alone.
    fn deactivate(&mut self);
}

/// Per-layer enable flags plus the derived activation state.
#[derive(Debug, Clone, Default)]
pub struct LayerActivation {
    enabled: [bool; Layer::COUNT],
    state: ActivationState,
}

impl LayerActivation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable a layer, running `hooks` if the aggregate changes.
    pub fn set_layer<H: ActivationHooks>(
        &mut self,
        layer: Layer,
        enabled: bool,
        hooks: &mut H,
    ) -> Transition {
        self.enabled[layer.index()] = enabled;

        match (self.state, self.any_enabled()) {
            (ActivationState::Inactive, true) => {
                self.state = ActivationState::Active;
                hooks.activate();
                Transition::Activated
            }
            (ActivationState::Active, false) => {
                self.state = ActivationState::Inactive;
                hooks.deactivate();
                Transition::Deactivated
            }
            _ => Transition::Unchanged,
        }
    }

    pub fn is_enabled(&self, layer: Layer) -> bool {
        self.enabled[layer.index()]
    }

    pub fn any_enabled(&self) -> bool {
        self.enabled.iter().any(|&e| e)
    }

    pub fn state(&self) -> ActivationState {
        self.state
    }

    /// Enabled layers in declaration order.
    pub fn enabled_layers(&self) -> impl Iterator<Item = Layer> + '_ {
        Layer::ALL.into_iter().filter(|l| self.is_enabled(*l))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingHooks {
        activations: usize,
        deactivations: usize,
    }

    impl ActivationHooks for CountingHooks {
        fn activate(&mut self) {
            self.activations += 1;
        }

        fn deactivate(&mut self) {
            self.deactivations += 1;
        }
    }

    #[test]
    fn test_initially_inactive() {
        let layers = LayerActivation::new();
        assert_eq!(layers.state(), ActivationState::Inactive);
        assert!(!layers.any_enabled());
    }

    #[test]
    fn test_first_enable_activates() {
        let mut layers = LayerActivation::new();
        let mut hooks = CountingHooks::default();

        let t = layers.set_layer(Layer::Nodes, true, &mut hooks);
        assert_eq!(t, Transition::Activated);
        assert_eq!(layers.state(), ActivationState::Active);
        assert_eq!(hooks.activations, 1);
    }

    #[test]
    fn test_second_enable_is_noop() {
        let mut layers = LayerActivation::new();
        let mut hooks = CountingHooks::default();

        layers.set_layer(Layer::Nodes, true, &mut hooks);
        let t = layers.set_layer(Layer::Links, true, &mut hooks);
        assert_eq!(t, Transition::Unchanged);
        assert_eq!(hooks.activations, 1);
    }

    #[test]
    fn test_last_disable_deactivates() {
        let mut layers = LayerActivation::new();
        let mut hooks = CountingHooks::default();

        layers.set_layer(Layer::Nodes, true, &mut hooks);
        layers.set_layer(Layer::Links, true, &mut hooks);
        assert_eq!(
            layers.set_layer(Layer::Nodes, false, &mut hooks),
            Transition::Unchanged
        );
        assert_eq!(
            layers.set_layer(Layer::Links, false, &mut hooks),
            Transition::Deactivated
        );
        assert_eq!(hooks.deactivations, 1);
        assert_eq!(layers.state(), ActivationState::Inactive);
    }

    #[test]
    fn test_disabling_while_inactive_is_noop() {
        let mut layers = LayerActivation::new();
        let mut hooks = CountingHooks::default();

        let t = layers.set_layer(Layer::Links, false, &mut hooks);
        assert_eq!(t, Transition::Unchanged);
        assert_eq!(hooks.deactivations, 0);
    }

    #[test]
    fn test_enabled_layers() {
        let mut layers = LayerActivation::new();
        let mut hooks = CountingHooks::default();
        layers.set_layer(Layer::Links, true, &mut hooks);

        assert!(layers.is_enabled(Layer::Links));
        assert!(!layers.is_enabled(Layer::Nodes));
        assert_eq!(layers.enabled_layers().collect::<Vec<_>>(), vec![Layer::Links]);
    }

    #[test]
    fn test_layer_parse() {
        assert_eq!("nodes".parse::<Layer>().unwrap(), Layer::Nodes);
        assert_eq!("Links".parse::<Layer>().unwrap(), Layer::Links);
        assert!("ways".parse::<Layer>().is_err());
        assert_eq!(Layer::Nodes.to_string(), "nodes");
    }
}
