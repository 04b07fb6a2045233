use core::fmt;
use serde::{
	de::{self, Visitor},
	Deserialize, Deserializer, Serialize, Serializer,
};
use serde_json::Value;

/// Server-assigned identity of a cell.
///
/// The server sends ids as strings or numbers. Both are keyed by their string form,
/// so `3` and `"3"` name the same cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(String);

impl CellId {
	#[must_use]
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	#[must_use]
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Reads an id out of a JSON value.
	///
	/// Falsy values (`null`, `false`, `""`, `0`) are not ids.
	#[must_use]
	pub fn from_value(value: &Value) -> Option<Self> {
		match value {
			Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
			Value::Number(n) if n.as_f64() != Some(0.0) => Some(Self(n.to_string())),
			Value::Bool(true) => Some(Self("true".to_owned())),
			_ => None,
		}
	}
}

impl fmt::Display for CellId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for CellId {
	fn from(id: &str) -> Self {
		Self(id.to_owned())
	}
}

impl From<String> for CellId {
	fn from(id: String) -> Self {
		Self(id)
	}
}

impl From<u64> for CellId {
	fn from(id: u64) -> Self {
		Self(id.to_string())
	}
}

impl From<CellId> for Value {
	fn from(id: CellId) -> Self {
		Value::String(id.0)
	}
}

impl Serialize for CellId {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.0)
	}
}

impl<'de> Deserialize<'de> for CellId {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		deserializer.deserialize_any(CellIdVisitor)
	}
}

struct CellIdVisitor;
impl<'de> Visitor<'de> for CellIdVisitor {
	type Value = CellId;

	fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str("a cell id (string or number)")
	}

	fn visit_str<E: de::Error>(self, v: &str) -> Result<CellId, E> {
		Ok(CellId(v.to_owned()))
	}

	fn visit_string<E: de::Error>(self, v: String) -> Result<CellId, E> {
		Ok(CellId(v))
	}

	fn visit_u64<E: de::Error>(self, v: u64) -> Result<CellId, E> {
		Ok(CellId(v.to_string()))
	}

	fn visit_i64<E: de::Error>(self, v: i64) -> Result<CellId, E> {
		Ok(CellId(v.to_string()))
	}

	fn visit_f64<E: de::Error>(self, v: f64) -> Result<CellId, E> {
		Ok(CellId(v.to_string()))
	}
}
