//! Newline-delimited JSON wire format for bridging a remote controller.
//!
//! Each line is one JSON object tagged with `__module__`/`__class__` for
//! dispatch, plus `ts`/`src`/`dst`/`name` and the kind-specific fields.
//! Decoding is a closed `match` over the known tag pairs; an unknown tag is
//! a [`WireError`], not an import of arbitrary code.
//!
//! `src` serializes as the component name but always decodes to `None`: the
//! remote process cannot resurrect a component identity. This asymmetry is
//! intentional and load-bearing for the bridge.

use serde_json::{json, Map, Value};

use crate::error::WireError;
use crate::message::{Message, MessageKind};

/// Wire tags `(__module__, __class__)` for each message kind.
fn tags(kind: &MessageKind) -> (&'static str, &'static str) {
    match kind {
        MessageKind::Shutdown => ("ripieno.messages.component", "Shutdown"),
        MessageKind::NewComponent => ("ripieno.messages.component", "NewComponent"),
        MessageKind::ComponentActiveStateChanged { .. } => {
            ("ripieno.messages.component", "ComponentActiveStateChanged")
        }
        MessageKind::DeviceScanRequest { .. } => ("ripieno.messages.component", "DeviceScanRequest"),
        MessageKind::EmergencyStop => ("ripieno.messages.input", "EmergencyStop"),
        MessageKind::Shortcut { .. } => ("ripieno.messages.input", "Shortcut"),
        MessageKind::Pause { .. } => ("ripieno.messages.input", "Pause"),
        MessageKind::Resume { .. } => ("ripieno.messages.input", "Resume"),
        MessageKind::ConfigSaveRequest => ("ripieno.messages.config", "ConfigSaveRequest"),
        MessageKind::Configure { .. } => ("ripieno.messages.config", "Configure"),
        MessageKind::SetRate { .. } => ("ripieno.messages.power", "SetRate"),
        MessageKind::SetPower { .. } => ("ripieno.messages.power", "SetPower"),
        MessageKind::SetGroupPower { .. } => ("ripieno.messages.power", "SetGroupPower"),
    }
}

/// Encode a message as a single JSON line (no trailing newline).
pub fn encode(msg: &Message) -> String {
    let (module, class) = tags(&msg.kind);
    let mut obj = Map::new();
    obj.insert("__module__".into(), json!(module));
    obj.insert("__class__".into(), json!(class));
    obj.insert("ts".into(), json!(msg.ts));
    obj.insert("src".into(), json!(msg.src));
    obj.insert("dst".into(), json!(msg.dst));
    obj.insert("name".into(), json!(msg.kind.name()));

    match &msg.kind {
        MessageKind::ComponentActiveStateChanged { value } => {
            obj.insert("value".into(), json!(value));
        }
        MessageKind::DeviceScanRequest { duration } => {
            obj.insert("duration".into(), json!(duration));
        }
        MessageKind::Shortcut { command } => {
            obj.insert("command".into(), json!(command));
        }
        MessageKind::Pause { group } | MessageKind::Resume { group } => {
            obj.insert("group".into(), json!(group));
        }
        MessageKind::Configure { config } => {
            obj.insert("config".into(), config.clone());
        }
        MessageKind::SetRate { rate } => {
            obj.insert("rate".into(), json!(rate));
        }
        MessageKind::SetPower { power } => {
            obj.insert("power".into(), json!(power));
        }
        MessageKind::SetGroupPower { group, power } => {
            obj.insert("group".into(), json!(group));
            obj.insert("power".into(), json!(power));
        }
        MessageKind::Shutdown
        | MessageKind::NewComponent
        | MessageKind::EmergencyStop
        | MessageKind::ConfigSaveRequest => {}
    }

    Value::Object(obj).to_string()
}

/// Decode one JSON line into a message.
///
/// `src` is always `None` in the result, regardless of what was on the wire.
pub fn decode(line: &str) -> Result<Message, WireError> {
    let value: Value = serde_json::from_str(line)?;
    let obj = value.as_object().ok_or(WireError::MissingTag("__module__"))?;

    let module = tag(obj, "__module__")?;
    let class = tag(obj, "__class__")?;

    let kind = match (module, class) {
        ("ripieno.messages.component", "Shutdown") => MessageKind::Shutdown,
        ("ripieno.messages.component", "NewComponent") => MessageKind::NewComponent,
        ("ripieno.messages.component", "ComponentActiveStateChanged") => {
            MessageKind::ComponentActiveStateChanged {
                value: bool_field(obj, "value")?,
            }
        }
        ("ripieno.messages.component", "DeviceScanRequest") => MessageKind::DeviceScanRequest {
            duration: float_field(obj, "duration")?,
        },
        ("ripieno.messages.input", "EmergencyStop") => MessageKind::EmergencyStop,
        ("ripieno.messages.input", "Shortcut") => MessageKind::Shortcut {
            command: string_field(obj, "command")?,
        },
        ("ripieno.messages.input", "Pause") => MessageKind::Pause {
            group: group_field(obj)?,
        },
        ("ripieno.messages.input", "Resume") => MessageKind::Resume {
            group: group_field(obj)?,
        },
        ("ripieno.messages.config", "ConfigSaveRequest") => MessageKind::ConfigSaveRequest,
        ("ripieno.messages.config", "Configure") => MessageKind::Configure {
            config: obj
                .get("config")
                .cloned()
                .ok_or(WireError::MissingField("config"))?,
        },
        ("ripieno.messages.power", "SetRate") => MessageKind::SetRate {
            rate: float_field(obj, "rate")?,
        },
        ("ripieno.messages.power", "SetPower") => MessageKind::SetPower {
            power: float_field(obj, "power")?,
        },
        ("ripieno.messages.power", "SetGroupPower") => MessageKind::SetGroupPower {
            group: group_field(obj)?,
            power: float_field(obj, "power")?,
        },
        (module, class) => {
            return Err(WireError::UnknownType {
                module: module.to_owned(),
                class: class.to_owned(),
            })
        }
    };

    Ok(Message {
        ts: obj.get("ts").and_then(Value::as_f64),
        // A remote peer cannot hand us a live component reference.
        src: None,
        dst: obj
            .get("dst")
            .and_then(Value::as_str)
            .map(str::to_owned),
        kind,
    })
}

fn tag<'a>(obj: &'a Map<String, Value>, key: &'static str) -> Result<&'a str, WireError> {
    obj.get(key)
        .and_then(Value::as_str)
        .ok_or(WireError::MissingTag(key))
}

fn bool_field(obj: &Map<String, Value>, key: &'static str) -> Result<bool, WireError> {
    match obj.get(key) {
        Some(v) => v.as_bool().ok_or(WireError::BadField(key)),
        None => Err(WireError::MissingField(key)),
    }
}

fn float_field(obj: &Map<String, Value>, key: &'static str) -> Result<f64, WireError> {
    match obj.get(key) {
        Some(v) => v.as_f64().ok_or(WireError::BadField(key)),
        None => Err(WireError::MissingField(key)),
    }
}

fn string_field(obj: &Map<String, Value>, key: &'static str) -> Result<String, WireError> {
    match obj.get(key) {
        Some(v) => v.as_str().map(str::to_owned).ok_or(WireError::BadField(key)),
        None => Err(WireError::MissingField(key)),
    }
}

fn group_field(obj: &Map<String, Value>) -> Result<u32, WireError> {
    match obj.get("group") {
        Some(v) => v
            .as_u64()
            .and_then(|g| u32::try_from(g).ok())
            .ok_or(WireError::BadField("group")),
        None => Err(WireError::MissingField("group")),
    }
}
