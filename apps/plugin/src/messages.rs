//! UI message protocol.
//!
//! The plugin UI posts JSON messages such as
//! `{"type": "wrap-text", "spacing": 12, "wrapHeightPercent": 80}`. Field values come
//! straight from form inputs, so anything missing or non-numeric falls back to the
//! configured default instead of failing the command.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::host::{Notification, Scene};
use crate::reflow::{ReflowState, WrapOptions};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiMessage {
    WrapText {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        spacing: Option<Value>,
        #[serde(
            default,
            rename = "wrapHeightPercent",
            skip_serializing_if = "Option::is_none"
        )]
        wrap_height_percent: Option<Value>,
    },
}

impl UiMessage {
    /// Resolves the message into command options, filling gaps from `defaults`.
    ///
    /// Spacing below zero becomes zero. The wrap-height percentage is rounded here and
    /// clamped to `[1, 100]` by the geometry resolver.
    pub fn into_options(self, defaults: &WrapOptions) -> WrapOptions {
        match self {
            UiMessage::WrapText {
                spacing,
                wrap_height_percent,
            } => WrapOptions {
                spacing: finite_number(spacing.as_ref())
                    .map(|s| s.max(0.0))
                    .unwrap_or(defaults.spacing),
                wrap_height_percent: finite_number(wrap_height_percent.as_ref())
                    .map(|p| p.round() as i64)
                    .unwrap_or(defaults.wrap_height_percent),
                search: defaults.search.clone(),
            },
        }
    }
}

fn finite_number(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|v| v.is_finite())
}

/// What the headless host reads on stdin.
#[derive(Debug, Clone, Deserialize)]
pub struct HostSession {
    pub scene: Scene,
    pub message: UiMessage,
}

/// What the headless host writes on stdout.
#[derive(Debug, Clone, Serialize)]
pub struct HostOutput {
    pub state: ReflowState,
    pub notification: Notification,
    pub scene: Scene,
}
