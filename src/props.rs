use crate::{cell_id::CellId, error::ComponentError};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A resolved named-child slot: a single live cell or an arbitrarily nested list of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Child {
	Cell(CellId),
	List(Vec<Child>),
}

impl Child {
	/// Visits every id in this slot, depth first, in order.
	pub fn for_each_id(&self, f: &mut impl FnMut(&CellId)) {
		match self {
			Child::Cell(id) => f(id),
			Child::List(items) => items.iter().for_each(|item| item.for_each_id(f)),
		}
	}

	#[must_use]
	pub fn ids(&self) -> Vec<CellId> {
		let mut ids = Vec::new();
		self.for_each_id(&mut |id| ids.push(id.clone()));
		ids
	}

	#[must_use]
	pub fn as_cell(&self) -> Option<&CellId> {
		match self {
			Child::Cell(id) => Some(id),
			Child::List(_) => None,
		}
	}
}

pub type NamedChildren = BTreeMap<String, Child>;

/// The props of one component instance.
///
/// `data` is the merged `{...extraData, id, extraData}` object exactly as computed from the
/// incoming description. Children are kept apart from it as resolved ids.
#[derive(Debug, Clone, PartialEq)]
pub struct Props {
	id: CellId,
	data: Map<String, Value>,
	pub named_children: NamedChildren,
	pub children: Vec<CellId>,
}

impl Props {
	/// # Errors
	///
	/// [`ComponentError::MissingId`] if `data.id` is absent or falsy.
	pub fn new(data: Map<String, Value>) -> Result<Self, ComponentError> {
		let id = data.get("id").and_then(CellId::from_value).ok_or(ComponentError::MissingId)?;
		Ok(Self {
			id,
			data,
			named_children: NamedChildren::new(),
			children: Vec::new(),
		})
	}

	/// Builds the merged props object for a description. `id` is stored as sent.
	#[must_use]
	pub fn merge(id: &Value, extra_data: &Map<String, Value>) -> Map<String, Value> {
		let mut merged = extra_data.clone();
		merged.insert("id".to_owned(), id.clone());
		merged.insert("extraData".to_owned(), Value::Object(extra_data.clone()));
		merged
	}

	#[must_use]
	pub fn id(&self) -> &CellId {
		&self.id
	}

	#[must_use]
	pub fn data(&self) -> &Map<String, Value> {
		&self.data
	}

	#[must_use]
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.data.get(key)
	}

	#[must_use]
	pub fn get_str(&self, key: &str) -> Option<&str> {
		self.data.get(key).and_then(Value::as_str)
	}

	/// JavaScript-style truthiness of a prop.
	#[must_use]
	pub fn is_truthy(&self, key: &str) -> bool {
		match self.data.get(key) {
			None | Some(Value::Null) | Some(Value::Bool(false)) => false,
			Some(Value::String(s)) => !s.is_empty(),
			Some(Value::Number(n)) => n.as_f64().map_or(true, |n| n != 0.0 && !n.is_nan()),
			Some(_) => true,
		}
	}

	#[must_use]
	pub fn extra_data(&self) -> Option<&Map<String, Value>> {
		self.data.get("extraData").and_then(Value::as_object)
	}

	/// Every child id, named slots first, then positional children.
	#[must_use]
	pub fn child_ids(&self) -> Vec<CellId> {
		let mut ids = Vec::new();
		for child in self.named_children.values() {
			child.for_each_id(&mut |id| ids.push(id.clone()));
		}
		ids.extend(self.children.iter().cloned());
		ids
	}
}
