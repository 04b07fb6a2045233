use super::KeyListener;
use crate::error::KeyRegistryError;
use hashbrown::HashMap;
use serde_json::Value;
use std::rc::Rc;
use tracing::debug;

/// Global registry of started [`KeyListener`]s, keyed by listener id.
#[derive(Debug, Default)]
pub struct KeyRegistry {
	key_listeners: HashMap<String, Rc<KeyListener>>,
}

impl KeyRegistry {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// # Errors
	///
	/// [`KeyRegistryError::DuplicateListener`] if the id is taken.
	pub fn add_listener(&mut self, listener: Rc<KeyListener>) -> Result<(), KeyRegistryError> {
		if self.key_listeners.contains_key(listener.id()) {
			return Err(KeyRegistryError::DuplicateListener(listener.id().to_owned()));
		}
		debug!(id = listener.id(), "registering key listener");
		self.key_listeners.insert(listener.id().to_owned(), listener);
		Ok(())
	}

	pub fn remove_listener(&mut self, id: &str) -> Option<Rc<KeyListener>> {
		self.key_listeners.remove(id)
	}

	#[must_use]
	pub fn number_of_listeners(&self) -> usize {
		self.key_listeners.len()
	}

	#[must_use]
	pub fn listener_by_id(&self, id: &str) -> Option<&Rc<KeyListener>> {
		self.key_listeners.get(id)
	}

	/// All listeners with a binding for exactly `command`, ordered by listener id.
	#[must_use]
	pub fn listeners_by_key_combination(&self, command: &str) -> Vec<&Rc<KeyListener>> {
		let mut listeners: Vec<_> = self.key_listeners.values().filter(|listener| listener.bindings().iter().any(|binding| binding.command() == command)).collect();
		listeners.sort_by(|a, b| a.id().cmp(b.id()));
		listeners
	}

	/// The listener whose target carries `data-cell-id == cell_id`.
	///
	/// # Errors
	///
	/// [`KeyRegistryError::AmbiguousCellId`] if more than one listener claims the cell.
	pub fn listener_by_cell_id(&self, cell_id: &str) -> Result<Option<&Rc<KeyListener>>, KeyRegistryError> {
		let mut found = self.key_listeners.values().filter(|listener| listener.cell_id().as_deref() == Some(cell_id));
		let first = found.next();
		if found.next().is_some() {
			return Err(KeyRegistryError::AmbiguousCellId(cell_id.to_owned()));
		}
		Ok(first)
	}

	/// `{listenerId: {id, cellId, bindings: [...]}}` for the server.
	#[must_use]
	pub fn listener_data(&self) -> Value {
		let mut data = serde_json::Map::new();
		for (id, listener) in &self.key_listeners {
			data.insert(id.clone(), serde_json::to_value(listener.info()).unwrap_or(Value::Null));
		}
		Value::Object(data)
	}
}
