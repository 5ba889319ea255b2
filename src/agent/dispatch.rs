//! Single owner of all mutable agent state
//!
//! Key edges from the hook, menu commands from the tray and poll ticks are
//! funnelled into one task, so no two mutations of the fan flag, the hotkey
//! binding or the learning session can interleave.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::events::AppEvent;
use crate::hotkey::KeyEdge;
use crate::render::GlyphRenderer;
use crate::settings::{AutostartRegistry, SettingsStore};
use crate::state::{HotkeyMachine, HotkeyOutcome, LockKeySource, LockMonitor, LockState};
use crate::ui::{self, Command, HotkeyStatus, StatusSnapshot};

/// User-visible message texts
mod text {
    pub const CAPS_ON_TITLE: &str = "Caps Lock ON";
    pub const CAPS_ON: &str = "It may have been switched on by accident.";
    pub const NUM_OFF_TITLE: &str = "Num Lock OFF";
    pub const NUM_OFF: &str = "The numeric keypad may not work.";
    pub const FAN_ON_TITLE: &str = "Fan ON";
    pub const FAN_ON: &str = "Cooling fans switched on.";
    pub const FAN_OFF_TITLE: &str = "Fan OFF";
    pub const FAN_OFF: &str = "Cooling fans switched off.";
    pub const HOTKEY_TITLE: &str = "Fan Hotkey";
    pub const HOTKEY_SAVED_TITLE: &str = "Fan Hotkey Saved";
    pub const HOTKEY_PROMPT: &str = "Press the new hotkey now. Esc cancels.";
    pub const HOTKEY_CANCELLED: &str = "Cancelled.";
    pub const HOTKEY_CLEARED: &str = "Cleared.";
}

/// Collaborators the agent is built from
pub struct AgentParts {
    pub settings: SettingsStore,
    pub autostart: Box<dyn AutostartRegistry>,
    pub locks: Box<dyn LockKeySource>,
    pub renderer: GlyphRenderer,
    pub events: broadcast::Sender<AppEvent>,
    pub poll_interval: Duration,
    /// False when the keyboard hook could not be installed
    pub hotkey_available: bool,
}

/// The agent: fan state, hotkey state machine and lock-key poller
pub struct Agent {
    hotkeys: HotkeyMachine,
    fan: bool,
    autostart_enabled: bool,
    settings: SettingsStore,
    autostart: Box<dyn AutostartRegistry>,
    locks: Box<dyn LockKeySource>,
    monitor: LockMonitor,
    renderer: GlyphRenderer,
    events: broadcast::Sender<AppEvent>,
    poll_interval: Duration,
    hotkey_available: bool,
}

impl Agent {
    /// Create the agent from loaded settings and a first lock-key sample
    pub fn new(parts: AgentParts) -> Self {
        let autostart_enabled = parts.autostart.is_enabled().unwrap_or_else(|e| {
            warn!(error = %e, "cannot read autostart registration, assuming off");
            false
        });
        let initial = parts.locks.read();

        Self {
            hotkeys: HotkeyMachine::new(parts.settings.fan_hotkey()),
            fan: parts.settings.fan_sim_enabled(),
            autostart_enabled,
            settings: parts.settings,
            autostart: parts.autostart,
            locks: parts.locks,
            monitor: LockMonitor::new(initial),
            renderer: parts.renderer,
            events: parts.events,
            poll_interval: parts.poll_interval,
            hotkey_available: parts.hotkey_available,
        }
    }

    pub fn fan_enabled(&self) -> bool {
        self.fan
    }

    pub fn hotkeys(&self) -> &HotkeyMachine {
        &self.hotkeys
    }

    /// Run the agent until Exit is requested or the command channel closes
    pub async fn run(
        &mut self,
        mut edge_rx: mpsc::Receiver<KeyEdge>,
        mut command_rx: mpsc::Receiver<Command>,
    ) {
        info!(
            fan = self.fan,
            hotkey = ?self.hotkeys.binding(),
            hotkey_available = self.hotkey_available,
            "agent started"
        );

        self.refresh_icon(self.monitor.last());
        self.publish_status(false);

        let mut ticker = time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                Some(edge) = edge_rx.recv() => {
                    self.handle_key_edge(edge);
                }

                command = command_rx.recv() => match command {
                    Some(Command::Exit) => {
                        info!("exit requested");
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => {
                        info!("command channel closed");
                        break;
                    }
                },

                _ = ticker.tick() => {
                    self.poll_tick();
                }
            }
        }

        info!("agent stopped");
    }

    /// Feed one key edge through the hotkey state machine
    pub fn handle_key_edge(&mut self, edge: KeyEdge) {
        match self.hotkeys.handle_edge(edge) {
            HotkeyOutcome::Ignored => {}
            HotkeyOutcome::Toggle => {
                debug!(vk = edge.key.code(), "fan hotkey pressed");
                self.set_fan(!self.fan, true);
            }
            HotkeyOutcome::Captured(key) => {
                info!(vk = key.code(), name = %key.name(), "fan hotkey learned");
                self.settings.set_fan_hotkey(Some(key));
                self.announce(text::HOTKEY_SAVED_TITLE, key.to_string());
                self.publish_status(false);
            }
            HotkeyOutcome::Cancelled => {
                info!("fan hotkey learning cancelled");
                self.announce(text::HOTKEY_TITLE, text::HOTKEY_CANCELLED);
                self.publish_status(false);
            }
        }
    }

    /// Apply a menu command other than Exit
    pub fn handle_command(&mut self, command: Command) {
        debug!(?command, "menu command");

        match command {
            Command::ShowStatus => self.publish_status(true),
            Command::ToggleNotifications => {
                let enabled = !self.settings.notifications_enabled();
                self.settings.set_notifications_enabled(enabled);
                info!(enabled, "notifications toggled");
                self.publish_status(false);
            }
            Command::ToggleFan => self.set_fan(!self.fan, true),
            Command::LearnHotkey => {
                if !self.hotkey_available {
                    warn!("keyboard hook unavailable, ignoring learn request");
                    return;
                }
                if self.hotkeys.request_learn() {
                    self.announce(text::HOTKEY_TITLE, text::HOTKEY_PROMPT);
                    self.publish_status(false);
                }
            }
            Command::ClearHotkey => {
                if !self.hotkey_available {
                    warn!("keyboard hook unavailable, ignoring clear request");
                    return;
                }
                if self.hotkeys.clear_binding() {
                    self.settings.set_fan_hotkey(None);
                    self.announce(text::HOTKEY_TITLE, text::HOTKEY_CLEARED);
                    self.publish_status(false);
                }
            }
            Command::ToggleAutostart => {
                let enabled = !self.autostart_enabled;
                match self.autostart.set_enabled(enabled) {
                    Ok(()) => {
                        self.autostart_enabled = enabled;
                        info!(enabled, "autostart toggled");
                    }
                    Err(e) => warn!(error = %e, "failed to change autostart registration"),
                }
                self.publish_status(false);
            }
            Command::Exit => {}
        }
    }

    /// Sample the lock keys and react to any edge
    pub fn poll_tick(&mut self) {
        let now = self.locks.read();
        let change = self.monitor.observe(now);

        if change.changed {
            debug!(?now, "lock state changed");
            // Icon first; frequent tray updates can delay a pending balloon
            self.refresh_icon(now);

            if change.caps_turned_on {
                self.notify(text::CAPS_ON_TITLE, text::CAPS_ON);
            }
            if change.num_turned_off {
                self.notify(text::NUM_OFF_TITLE, text::NUM_OFF);
            }
        }

        // The fan may have changed through the hotkey since the last tick
        self.publish_status(false);
    }

    /// The single mutation point for the fan flag
    fn set_fan(&mut self, enabled: bool, notify: bool) {
        if self.fan == enabled {
            return;
        }

        self.fan = enabled;
        self.settings.set_fan_sim_enabled(enabled);
        info!(enabled, "fan state changed");

        self.refresh_icon(self.locks.read());
        self.publish_status(false);

        if notify {
            if enabled {
                self.notify(text::FAN_ON_TITLE, text::FAN_ON);
            } else {
                self.notify(text::FAN_OFF_TITLE, text::FAN_OFF);
            }
        }
    }

    fn refresh_icon(&self, locks: LockState) {
        match self.renderer.render(locks.num_lock, locks.caps_lock, self.fan) {
            Ok(glyph) => self.emit(AppEvent::IconChanged {
                glyph: Arc::new(glyph),
                tooltip: ui::tooltip(locks.caps_lock, locks.num_lock, self.fan),
            }),
            Err(e) => warn!(error = %e, "glyph render failed, keeping previous icon"),
        }
    }

    fn publish_status(&self, reveal: bool) {
        let snapshot = self.snapshot();
        if tracing::enabled!(tracing::Level::TRACE) {
            match serde_json::to_string(&snapshot) {
                Ok(json) => trace!(reveal, snapshot = %json, "emitting status"),
                Err(e) => trace!(error = %e, "status snapshot not serializable"),
            }
        }
        let _ = self.events.send(AppEvent::StatusRefreshed { snapshot, reveal });
    }

    /// Current state as shown by the status surface and menu
    pub fn snapshot(&self) -> StatusSnapshot {
        let locks = self.locks.read();
        let hotkey = if !self.hotkey_available {
            HotkeyStatus::Unavailable
        } else if self.hotkeys.is_learning() {
            HotkeyStatus::Learning
        } else {
            match self.hotkeys.binding() {
                Some(key) => HotkeyStatus::Bound(key),
                None => HotkeyStatus::Unbound,
            }
        };

        StatusSnapshot {
            num_lock: locks.num_lock,
            caps_lock: locks.caps_lock,
            fan: self.fan,
            notifications: self.settings.notifications_enabled(),
            autostart: self.autostart_enabled,
            hotkey,
        }
    }

    /// Notification subject to the user's NotificationsEnabled setting
    fn notify(&self, title: &str, message: &str) {
        if self.settings.notifications_enabled() {
            self.announce(title, message);
        } else {
            debug!(title, "notification suppressed");
        }
    }

    /// Feedback for an explicit user action, always shown
    fn announce(&self, title: &str, message: impl Into<String>) {
        self.emit(AppEvent::notification(title, message));
    }

    fn emit(&self, event: AppEvent) {
        debug!(%event, "emitting event");
        let _ = self.events.send(event);
    }
}
