//! Raw inbound commands and their canonical normalized form.
//!
//! Control payloads reach the bridge in many shapes: a bare boolean, `0`/`1`,
//! `"on"`/`"off"`, or an object carrying any subset of light attributes.
//! [`RawCommand`] captures that shape as an explicit variant so the
//! normalizer can match on it instead of probing JSON types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Shape of an inbound control payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCommand {
    Bool(bool),
    Number(f64),
    Text(String),
    Object(CommandFields),
    /// Anything else (null, arrays, …). Carries the JSON kind for diagnostics.
    Unsupported(&'static str),
}

/// The attribute subset an object payload may carry.
///
/// Fields with an unusable JSON type are treated as absent, except `xy`
/// which keeps a [`XyInput::Malformed`] marker so the normalizer can
/// substitute the default white point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandFields {
    pub on: Option<bool>,
    pub bri: Option<f64>,
    pub xy: Option<XyInput>,
    pub hue: Option<f64>,
    pub sat: Option<f64>,
    pub ct: Option<f64>,
    pub position: Option<f64>,
    pub temperature: Option<f64>,
}

/// The `xy` attribute as received.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum XyInput {
    Point([f64; 2]),
    Malformed,
}

impl RawCommand {
    /// Classify a JSON payload.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Bool(flag) => Self::Bool(*flag),
            Value::Number(num) => num.as_f64().map_or(Self::Unsupported("number"), Self::Number),
            Value::String(text) => Self::Text(text.clone()),
            Value::Object(map) => Self::Object(CommandFields {
                on: map.get("on").and_then(parse_switch),
                bri: map.get("bri").and_then(Value::as_f64),
                xy: map.get("xy").map(parse_xy),
                hue: map.get("hue").and_then(Value::as_f64),
                sat: map.get("sat").and_then(Value::as_f64),
                ct: map.get("ct").and_then(Value::as_f64),
                position: map.get("position").and_then(Value::as_f64),
                temperature: map.get("temperature").and_then(Value::as_f64),
            }),
            Value::Null => Self::Unsupported("null"),
            Value::Array(_) => Self::Unsupported("array"),
        }
    }

    /// Short label used in logs and error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::Text(_) => "string",
            Self::Object(_) => "object",
            Self::Unsupported(kind) => kind,
        }
    }
}

impl From<bool> for RawCommand {
    fn from(flag: bool) -> Self {
        Self::Bool(flag)
    }
}

impl From<CommandFields> for RawCommand {
    fn from(fields: CommandFields) -> Self {
        Self::Object(fields)
    }
}

/// Interpret a text payload as an on/off switch.
#[must_use]
pub fn parse_switch_text(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "on" | "1" | "true" => Some(true),
        "off" | "0" | "false" => Some(false),
        _ => None,
    }
}

/// Interpret a numeric payload as an on/off switch (only `0` and `1`).
#[must_use]
#[allow(clippy::float_cmp)]
pub fn parse_switch_number(value: f64) -> Option<bool> {
    if value == 1.0 {
        Some(true)
    } else if value == 0.0 {
        Some(false)
    } else {
        None
    }
}

fn parse_switch(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(num) => num.as_f64().and_then(parse_switch_number),
        Value::String(text) => parse_switch_text(text),
        _ => None,
    }
}

fn parse_xy(value: &Value) -> XyInput {
    match value.as_array().map(Vec::as_slice) {
        Some([x, y]) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => XyInput::Point([x, y]),
            _ => XyInput::Malformed,
        },
        _ => XyInput::Malformed,
    }
}

/// Which canonical action a normalized command represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Switch,
    Dim,
    Color,
    Position,
    Temperature,
}

/// Which color attribute last drove a light, as reported by `colormode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    Xy,
    Hs,
    Ct,
}

/// Canonical device command produced by the normalizer.
///
/// `on` and `bri` are always present; the optional attributes are set only
/// when the command changes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedCommand {
    pub on: bool,
    pub bri: u8,
    pub command: CommandKind,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub change_direction: Option<i8>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub xy: Option<[f64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub hue: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sat: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ct: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub position: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub temperature: Option<f64>,
}

impl NormalizedCommand {
    /// A command that only carries the on/off + brightness pair.
    #[must_use]
    pub fn new(command: CommandKind, on: bool, bri: u8) -> Self {
        Self {
            on,
            bri,
            command,
            change_direction: None,
            xy: None,
            hue: None,
            sat: None,
            ct: None,
            position: None,
            temperature: None,
        }
    }

    /// The color mode this command puts a light in, if any.
    #[must_use]
    pub fn color_mode(&self) -> Option<ColorMode> {
        if self.xy.is_some() {
            Some(ColorMode::Xy)
        } else if self.hue.is_some() || self.sat.is_some() {
            Some(ColorMode::Hs)
        } else if self.ct.is_some() {
            Some(ColorMode::Ct)
        } else {
            None
        }
    }
}
