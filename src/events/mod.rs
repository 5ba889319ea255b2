//! Events module for agent output
//!
//! Provides the structured events the agent emits towards the tray surface:
//! transient notifications, glyph/tooltip refreshes and status snapshots.

use std::sync::Arc;

use serde::Serialize;

use crate::render::GlyphImage;
use crate::ui::StatusSnapshot;

/// Events emitted by the agent after a state change or poll tick
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    /// Show a transient balloon message
    Notification {
        title: String,
        message: String,
    },

    /// Replace the tray glyph and tooltip
    IconChanged {
        #[serde(skip)]
        glyph: Arc<GlyphImage>,
        tooltip: String,
    },

    /// Refresh the status surface
    StatusRefreshed {
        snapshot: StatusSnapshot,
        /// Bring the surface up; otherwise update it only if already visible
        reveal: bool,
    },
}

impl AppEvent {
    pub fn notification(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Notification {
            title: title.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for AppEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppEvent::Notification { title, message } => {
                write!(f, "NOTIFICATION ({}: {})", title, message)
            }
            AppEvent::IconChanged { tooltip, .. } => write!(f, "ICON_CHANGED ({})", tooltip),
            AppEvent::StatusRefreshed { reveal, .. } => {
                write!(f, "STATUS_REFRESHED (reveal: {})", reveal)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = AppEvent::notification("Fan ON", "Cooling fans switched on.");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"notification\""));
        assert!(json.contains("Fan ON"));
    }

    #[test]
    fn test_icon_event_skips_pixels() {
        let event = AppEvent::IconChanged {
            glyph: Arc::new(GlyphImage::default()),
            tooltip: "Task Status Assistant | C:On N:Off F:Off".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "icon_changed");
        assert!(json.get("glyph").is_none());
        assert_eq!(event.to_string(), "ICON_CHANGED (Task Status Assistant | C:On N:Off F:Off)");
    }
}
