//! Fan hotkey state machine
//!
//! Handles transitions between Unbound, Bound and Learning based on key
//! edges from the hook and explicit learn/clear requests from the menu.

use tracing::{debug, info};

use crate::hotkey::{KeyDirection, KeyEdge, VirtualKey};

/// The three possible states of the fan hotkey
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyState {
    /// No binding, key events are inert
    Unbound,
    /// Armed; `held` tracks the physical press of `key` for debouncing
    Bound { key: VirtualKey, held: bool },
    /// Capturing the next non-modifier key; `previous` is restored on Escape
    Learning { previous: Option<VirtualKey> },
}

impl Default for HotkeyState {
    fn default() -> Self {
        Self::Unbound
    }
}

impl std::fmt::Display for HotkeyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HotkeyState::Unbound => write!(f, "Unbound"),
            HotkeyState::Bound { key, .. } => write!(f, "Bound({})", key.code()),
            HotkeyState::Learning { .. } => write!(f, "Learning"),
        }
    }
}

/// What the agent must do after a key edge was processed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyOutcome {
    /// Nothing to do
    Ignored,
    /// A fresh press of the bound key: toggle the fan
    Toggle,
    /// Learning finished with a new binding that must be persisted
    Captured(VirtualKey),
    /// Learning was cancelled with Escape
    Cancelled,
}

/// The state machine that owns the fan hotkey binding
#[derive(Debug, Default)]
pub struct HotkeyMachine {
    state: HotkeyState,
}

impl HotkeyMachine {
    /// Create a state machine from the binding loaded at startup
    pub fn new(binding: Option<VirtualKey>) -> Self {
        let state = match binding {
            Some(key) => HotkeyState::Bound { key, held: false },
            None => HotkeyState::Unbound,
        };
        Self { state }
    }

    /// Get the current state
    pub fn state(&self) -> HotkeyState {
        self.state
    }

    /// The effective binding; while learning this is the binding in force before
    pub fn binding(&self) -> Option<VirtualKey> {
        match self.state {
            HotkeyState::Unbound => None,
            HotkeyState::Bound { key, .. } => Some(key),
            HotkeyState::Learning { previous } => previous,
        }
    }

    pub fn is_learning(&self) -> bool {
        matches!(self.state, HotkeyState::Learning { .. })
    }

    /// Enter Learning; returns false if a session is already active
    pub fn request_learn(&mut self) -> bool {
        if self.is_learning() {
            debug!("learn request ignored, already learning");
            return false;
        }
        let previous = self.binding();
        self.transition_to(HotkeyState::Learning { previous });
        true
    }

    /// Drop the binding; not allowed while learning
    pub fn clear_binding(&mut self) -> bool {
        if self.is_learning() {
            debug!("clear request ignored while learning");
            return false;
        }
        self.transition_to(HotkeyState::Unbound);
        true
    }

    /// Process one key edge from the hook
    pub fn handle_edge(&mut self, edge: KeyEdge) -> HotkeyOutcome {
        match self.state {
            HotkeyState::Unbound => HotkeyOutcome::Ignored,
            HotkeyState::Learning { previous } => self.handle_learning(edge, previous),
            HotkeyState::Bound { key, held } => self.handle_bound(edge, key, held),
        }
    }

    /// Compute the next state while capturing a key
    fn handle_learning(&mut self, edge: KeyEdge, previous: Option<VirtualKey>) -> HotkeyOutcome {
        if edge.direction != KeyDirection::Down || edge.key.is_modifier() {
            return HotkeyOutcome::Ignored;
        }

        if edge.key == VirtualKey::ESCAPE {
            let restored = match previous {
                Some(key) => HotkeyState::Bound { key, held: false },
                None => HotkeyState::Unbound,
            };
            self.transition_to(restored);
            return HotkeyOutcome::Cancelled;
        }

        self.transition_to(HotkeyState::Bound {
            key: edge.key,
            held: false,
        });
        HotkeyOutcome::Captured(edge.key)
    }

    /// Compute the next state while armed
    fn handle_bound(&mut self, edge: KeyEdge, key: VirtualKey, held: bool) -> HotkeyOutcome {
        if edge.key != key {
            return HotkeyOutcome::Ignored;
        }

        match edge.direction {
            // Auto-repeat of a held key
            KeyDirection::Down if held => HotkeyOutcome::Ignored,
            KeyDirection::Down => {
                self.state = HotkeyState::Bound { key, held: true };
                HotkeyOutcome::Toggle
            }
            KeyDirection::Up => {
                self.state = HotkeyState::Bound { key, held: false };
                HotkeyOutcome::Ignored
            }
        }
    }

    /// Perform a state transition
    fn transition_to(&mut self, new_state: HotkeyState) {
        info!(from = %self.state, to = %new_state, "hotkey state transition");
        self.state = new_state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: u32) -> VirtualKey {
        VirtualKey::new(code).unwrap()
    }

    #[test]
    fn test_initial_state() {
        assert_eq!(HotkeyMachine::new(None).state(), HotkeyState::Unbound);
        assert_eq!(
            HotkeyMachine::new(Some(key(0x31))).state(),
            HotkeyState::Bound {
                key: key(0x31),
                held: false
            }
        );
    }

    #[test]
    fn test_unbound_is_inert() {
        let mut sm = HotkeyMachine::new(None);
        for _ in 0..5 {
            assert_eq!(sm.handle_edge(KeyEdge::down(key(0x31))), HotkeyOutcome::Ignored);
            assert_eq!(sm.handle_edge(KeyEdge::up(key(0x31))), HotkeyOutcome::Ignored);
        }
        assert_eq!(sm.state(), HotkeyState::Unbound);
    }

    #[test]
    fn test_auto_repeat_is_debounced() {
        let mut sm = HotkeyMachine::new(Some(key(0x31)));

        assert_eq!(sm.handle_edge(KeyEdge::down(key(0x31))), HotkeyOutcome::Toggle);
        for _ in 0..10 {
            assert_eq!(sm.handle_edge(KeyEdge::down(key(0x31))), HotkeyOutcome::Ignored);
        }

        assert_eq!(sm.handle_edge(KeyEdge::up(key(0x31))), HotkeyOutcome::Ignored);
        assert_eq!(sm.handle_edge(KeyEdge::down(key(0x31))), HotkeyOutcome::Toggle);
    }

    #[test]
    fn test_other_keys_ignored_when_bound() {
        let mut sm = HotkeyMachine::new(Some(key(0x31)));
        assert_eq!(sm.handle_edge(KeyEdge::down(key(0x32))), HotkeyOutcome::Ignored);
        assert_eq!(sm.handle_edge(KeyEdge::down(VirtualKey::ESCAPE)), HotkeyOutcome::Ignored);
        assert_eq!(
            sm.state(),
            HotkeyState::Bound {
                key: key(0x31),
                held: false
            }
        );
    }

    #[test]
    fn test_learn_then_capture() {
        let mut sm = HotkeyMachine::new(None);
        assert!(sm.request_learn());
        assert!(sm.is_learning());

        assert_eq!(
            sm.handle_edge(KeyEdge::down(key(0x31))),
            HotkeyOutcome::Captured(key(0x31))
        );
        assert!(!sm.is_learning());
        assert_eq!(sm.binding(), Some(key(0x31)));

        // Next press toggles even without an intervening Up
        assert_eq!(sm.handle_edge(KeyEdge::down(key(0x31))), HotkeyOutcome::Toggle);
    }

    #[test]
    fn test_learn_escape_restores_previous() {
        let mut sm = HotkeyMachine::new(Some(key(0x70)));
        assert!(sm.request_learn());
        assert_eq!(sm.binding(), Some(key(0x70)));

        assert_eq!(
            sm.handle_edge(KeyEdge::down(VirtualKey::ESCAPE)),
            HotkeyOutcome::Cancelled
        );
        assert_eq!(
            sm.state(),
            HotkeyState::Bound {
                key: key(0x70),
                held: false
            }
        );

        let mut unbound = HotkeyMachine::new(None);
        unbound.request_learn();
        unbound.handle_edge(KeyEdge::down(VirtualKey::ESCAPE));
        assert_eq!(unbound.state(), HotkeyState::Unbound);
    }

    #[test]
    fn test_learning_ignores_modifiers_and_releases() {
        let mut sm = HotkeyMachine::new(None);
        sm.request_learn();

        assert_eq!(sm.handle_edge(KeyEdge::down(key(0xA0))), HotkeyOutcome::Ignored);
        assert_eq!(sm.handle_edge(KeyEdge::up(key(0x31))), HotkeyOutcome::Ignored);
        assert!(sm.is_learning());
    }

    #[test]
    fn test_learning_does_not_toggle_old_binding() {
        let mut sm = HotkeyMachine::new(Some(key(0x31)));
        sm.request_learn();

        assert_eq!(
            sm.handle_edge(KeyEdge::down(key(0x31))),
            HotkeyOutcome::Captured(key(0x31))
        );
    }

    #[test]
    fn test_request_learn_is_not_reentrant() {
        let mut sm = HotkeyMachine::new(Some(key(0x31)));
        assert!(sm.request_learn());
        assert!(!sm.request_learn());
        assert_eq!(
            sm.state(),
            HotkeyState::Learning {
                previous: Some(key(0x31))
            }
        );
    }

    #[test]
    fn test_clear_binding() {
        let mut sm = HotkeyMachine::new(Some(key(0x31)));
        assert!(sm.clear_binding());
        assert_eq!(sm.binding(), None);

        for _ in 0..3 {
            assert_eq!(sm.handle_edge(KeyEdge::down(key(0x31))), HotkeyOutcome::Ignored);
            assert_eq!(sm.handle_edge(KeyEdge::up(key(0x31))), HotkeyOutcome::Ignored);
        }
    }

    #[test]
    fn test_clear_ignored_while_learning() {
        let mut sm = HotkeyMachine::new(Some(key(0x31)));
        sm.request_learn();
        assert!(!sm.clear_binding());
        assert!(sm.is_learning());
    }
}
