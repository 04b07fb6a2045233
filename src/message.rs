//! Wire types of the cell socket protocol.

use crate::cell_id::CellId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A (possibly nested) description of one cell, as pushed by the server.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellDescription {
	/// The id exactly as sent. See [`cell_id`](`CellDescription::cell_id`).
	pub id: Value,
	pub cell_type: String,
	#[serde(default)]
	pub extra_data: Map<String, Value>,
	#[serde(default)]
	pub named_children: Map<String, Value>,
	#[serde(default)]
	pub children: Vec<Value>,
}

impl CellDescription {
	/// The id this description names, or `None` if the wire id is falsy (`0`, `""`, `null`, `false`).
	#[must_use]
	pub fn cell_id(&self) -> Option<CellId> {
		CellId::from_value(&self.id)
	}
}

/// One value of a named-child slot.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ChildDescription {
	/// A bare id: reuse the live instance with this id.
	Reference(CellId),
	List(Vec<ChildDescription>),
	Cell(Box<CellDescription>),
}

impl ChildDescription {
	/// # Errors
	///
	/// If `value` is neither an id, a list nor a cell description.
	pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
		match value {
			Value::String(_) | Value::Number(_) => CellId::deserialize(value).map(ChildDescription::Reference),
			Value::Array(items) => items.iter().map(Self::from_value).collect::<Result<_, _>>().map(ChildDescription::List),
			_ => CellDescription::deserialize(value).map(|description| ChildDescription::Cell(Box::new(description))),
		}
	}
}

fn default_true() -> bool {
	true
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellUpdated {
	#[serde(flatten)]
	pub description: CellDescription,
	#[serde(default = "default_true")]
	pub should_display: bool,
	#[serde(default)]
	pub postscript: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellDataUpdated {
	pub id: CellId,
	#[serde(default)]
	pub data_info: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellDataRequested {
	#[serde(default)]
	pub id: Option<CellId>,
	#[serde(default)]
	pub data_info: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CellsDiscarded {
	pub ids: Vec<CellId>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CellDiscarded {
	pub id: CellId,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppendPostscript {
	pub script: String,
}

/// Inbound messages, tagged on `type`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
	#[serde(rename = "#cellUpdated")]
	CellUpdated(CellUpdated),
	#[serde(rename = "#cellDataUpdated")]
	CellDataUpdated(CellDataUpdated),
	#[serde(rename = "#cellDataRequested")]
	CellDataRequested(CellDataRequested),
	#[serde(rename = "#cellsDiscarded")]
	CellsDiscarded(CellsDiscarded),
	#[serde(rename = "#cellDiscarded")]
	CellDiscarded(CellDiscarded),
	#[serde(rename = "#appendPostscript")]
	AppendPostscript(AppendPostscript),
}

impl Message {
	pub const KNOWN_TYPES: [&'static str; 6] = [
		"#cellUpdated",
		"#cellDataUpdated",
		"#cellDataRequested",
		"#cellsDiscarded",
		"#cellDiscarded",
		"#appendPostscript",
	];

	/// Whether `value` carries a `type` this client handles.
	#[must_use]
	pub fn is_known(value: &Value) -> bool {
		value.get("type").and_then(Value::as_str).map_or(false, |t| Self::KNOWN_TYPES.contains(&t))
	}
}

/// Response to the server's `"request_ack"` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ack {
	#[serde(rename = "ACK")]
	pub ack: u64,
}

/// Outbound listing of registered key listeners.
#[derive(Debug, Serialize)]
pub struct KeyListenerInfoResponse<T: Serialize> {
	pub event: &'static str,
	#[serde(rename = "KeyListeners")]
	pub key_listeners: T,
}
