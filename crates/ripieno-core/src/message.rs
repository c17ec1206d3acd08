//! Messages exchanged between components.
//!
//! `MessageKind` is a closed enum: every kind the runtime understands is a
//! variant here, and the wire codec dispatches with a `match` instead of a
//! runtime type registry.

use std::time::{SystemTime, UNIX_EPOCH};

/// The payload of a [`Message`].
#[derive(Debug, Clone, PartialEq)]
pub enum MessageKind {
    /// Initiate component shutdown.
    Shutdown,
    /// A new component has been registered (broadcast by the app).
    NewComponent,
    /// An input component changed its active state.
    ComponentActiveStateChanged { value: bool },
    /// Request a device scan for the given duration, in seconds.
    DeviceScanRequest { duration: f64 },
    /// Stop all activity as soon as possible.
    EmergencyStop,
    /// A named keyboard shortcut was triggered.
    Shortcut { command: String },
    /// Pause outputs in a group.
    Pause { group: u32 },
    /// Resume outputs in a group.
    Resume { group: u32 },
    /// Ask components to save their configuration.
    ConfigSaveRequest,
    /// Restore a component's configuration.
    Configure { config: serde_json::Value },
    /// Announce the sample rate of an output.
    SetRate { rate: f64 },
    /// Set the power of an output.
    SetPower { power: f64 },
    /// Set the power of all outputs in a group.
    SetGroupPower { group: u32, power: f64 },
}

impl MessageKind {
    /// Lowercased kind name, as used in the wire format's `name` field.
    pub fn name(&self) -> &'static str {
        match self {
            MessageKind::Shutdown => "shutdown",
            MessageKind::NewComponent => "newcomponent",
            MessageKind::ComponentActiveStateChanged { .. } => "componentactivestatechanged",
            MessageKind::DeviceScanRequest { .. } => "devicescanrequest",
            MessageKind::EmergencyStop => "emergencystop",
            MessageKind::Shortcut { .. } => "shortcut",
            MessageKind::Pause { .. } => "pause",
            MessageKind::Resume { .. } => "resume",
            MessageKind::ConfigSaveRequest => "configsaverequest",
            MessageKind::Configure { .. } => "configure",
            MessageKind::SetRate { .. } => "setrate",
            MessageKind::SetPower { .. } => "setpower",
            MessageKind::SetGroupPower { .. } => "setgrouppower",
        }
    }
}

/// A message routed through the app's command queue.
///
/// `src` and `ts` are filled in by the sending component's [`HubContext`],
/// never by the caller.
///
/// [`HubContext`]: crate::component::HubContext
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Epoch seconds when the message was sent.
    pub ts: Option<f64>,
    /// Name of the sending component.
    pub src: Option<String>,
    /// Destination component name; `None` broadcasts to every component.
    pub dst: Option<String>,
    pub kind: MessageKind,
}

impl Message {
    /// Broadcast message with the given kind.
    pub fn new(kind: MessageKind) -> Self {
        Self {
            ts: None,
            src: None,
            dst: None,
            kind,
        }
    }

    /// Message addressed to a specific component.
    pub fn to(dst: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            ts: None,
            src: None,
            dst: Some(dst.into()),
            kind,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Current time as epoch seconds, the clock used for `ts` stamping.
    pub fn now() -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(Message::new(MessageKind::Shutdown).name(), "shutdown");
        assert_eq!(
            MessageKind::SetGroupPower {
                group: 1,
                power: 0.5
            }
            .name(),
            "setgrouppower"
        );
    }

    #[test]
    fn test_builders() {
        let m = Message::new(MessageKind::EmergencyStop);
        assert!(m.ts.is_none());
        assert!(m.src.is_none());
        assert!(m.dst.is_none());

        let m = Message::to("synth", MessageKind::Pause { group: 2 });
        assert_eq!(m.dst.as_deref(), Some("synth"));
    }

    #[test]
    fn test_now_is_recent() {
        // 2020-01-01 as a sanity floor
        assert!(Message::now() > 1_577_836_800.0);
    }
}
