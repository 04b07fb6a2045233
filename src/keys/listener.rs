use super::{binding::BindingInfo, KeyBinding, KeyRegistry, KeyboardEvent};
use crate::error::KeyRegistryError;
use core::{cell::RefCell, fmt};
use hashbrown::HashMap;
use serde::Serialize;
use std::rc::Rc;
use tracing::{instrument, trace};

pub type KeydownDispatch = Rc<dyn Fn(&dyn KeyboardEvent)>;

/// Something a single capturing `keydown` listener can be attached to.
pub trait KeyTarget {
	/// DOM id of the target (empty for the document).
	fn element_id(&self) -> String;
	/// The `data-cell-id` of the target, if it maps to a cell.
	fn cell_id(&self) -> Option<String>;
	/// The `data-cell-type` of the target, if it maps to a cell.
	fn cell_type(&self) -> Option<String>;
	fn attach(&self, dispatch: KeydownDispatch);
	fn detach(&self);
}

/// Hands out [`KeyTarget`]s for rendered cells and for the whole document.
pub trait KeyHost {
	fn element_target(&self, element_id: &str, cell_id: &str, cell_type: &str) -> Rc<dyn KeyTarget>;
	fn document_target(&self) -> Rc<dyn KeyTarget>;
}

/// Owns one target and an ordered list of bindings.
pub struct KeyListener {
	id: String,
	target: Rc<dyn KeyTarget>,
	bindings: Vec<KeyBinding>,
}

impl fmt::Debug for KeyListener {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("KeyListener").field("id", &self.id).field("bindings", &self.bindings).finish()
	}
}

impl KeyListener {
	/// The listener id is `"{cellType}-{elementId}"` of `target`.
	#[must_use]
	pub fn new(target: Rc<dyn KeyTarget>, bindings: Vec<KeyBinding>) -> Rc<Self> {
		let id = format!("{}-{}", target.cell_type().unwrap_or_else(|| "document".to_owned()), target.element_id());
		Self::with_id(id, target, bindings)
	}

	#[must_use]
	pub fn with_id(id: impl Into<String>, target: Rc<dyn KeyTarget>, bindings: Vec<KeyBinding>) -> Rc<Self> {
		Rc::new(Self {
			id: id.into(),
			target,
			bindings,
		})
	}

	#[must_use]
	pub fn id(&self) -> &str {
		&self.id
	}

	#[must_use]
	pub fn bindings(&self) -> &[KeyBinding] {
		&self.bindings
	}

	#[must_use]
	pub fn cell_id(&self) -> Option<String> {
		self.target.cell_id()
	}

	/// Registers this listener and attaches it to its target.
	///
	/// # Errors
	///
	/// [`KeyRegistryError::DuplicateListener`] if a listener with the same id is registered.
	/// Nothing is attached in that case.
	#[instrument(skip(self, registry), fields(id = %self.id))]
	pub fn start(self: &Rc<Self>, registry: &mut KeyRegistry) -> Result<(), KeyRegistryError> {
		registry.add_listener(Rc::clone(self))?;
		let weak = Rc::downgrade(self);
		self.target.attach(Rc::new(move |event: &dyn KeyboardEvent| {
			if let Some(listener) = weak.upgrade() {
				listener.main_listener(event);
			}
		}));
		Ok(())
	}

	/// Detaches from the target and deregisters. [`start`](`KeyListener::start`) resumes.
	#[instrument(skip(self, registry), fields(id = %self.id))]
	pub fn pause(&self, registry: &mut KeyRegistry) {
		self.target.detach();
		registry.remove_listener(&self.id);
	}

	/// Offers `event` to every binding in order.
	///
	/// Stopping immediate propagation only affects other listeners on the target.
	/// This listener's remaining bindings still see the event.
	pub fn main_listener(&self, event: &dyn KeyboardEvent) {
		for binding in &self.bindings {
			if binding.handle(event) {
				trace!(id = %self.id, command = binding.command(), "key binding fired");
			}
		}
	}

	pub(crate) fn info(&self) -> ListenerInfo<'_> {
		ListenerInfo {
			id: &self.id,
			cell_id: self.target.cell_id(),
			bindings: self.bindings.iter().map(KeyBinding::info).collect(),
		}
	}
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListenerInfo<'a> {
	id: &'a str,
	cell_id: Option<String>,
	bindings: Vec<BindingInfo<'a>>,
}

/// A [`KeyTarget`] without a DOM. Events are fed in through [`MemoryKeyTarget::dispatch`].
#[derive(Default)]
pub struct MemoryKeyTarget {
	element_id: String,
	cell_id: Option<String>,
	cell_type: Option<String>,
	listener: RefCell<Option<KeydownDispatch>>,
}

impl MemoryKeyTarget {
	#[must_use]
	pub fn new(element_id: &str, cell_id: Option<&str>, cell_type: Option<&str>) -> Rc<Self> {
		Rc::new(Self {
			element_id: element_id.to_owned(),
			cell_id: cell_id.map(str::to_owned),
			cell_type: cell_type.map(str::to_owned),
			listener: RefCell::default(),
		})
	}

	#[must_use]
	pub fn is_attached(&self) -> bool {
		self.listener.borrow().is_some()
	}

	/// Delivers `event` to the attached listener. Returns `false` if nothing is attached.
	pub fn dispatch(&self, event: &dyn KeyboardEvent) -> bool {
		let listener = self.listener.borrow().clone();
		match listener {
			Some(listener) => {
				listener(event);
				true
			}
			None => false,
		}
	}
}

impl KeyTarget for MemoryKeyTarget {
	fn element_id(&self) -> String {
		self.element_id.clone()
	}

	fn cell_id(&self) -> Option<String> {
		self.cell_id.clone()
	}

	fn cell_type(&self) -> Option<String> {
		self.cell_type.clone()
	}

	fn attach(&self, dispatch: KeydownDispatch) {
		*self.listener.borrow_mut() = Some(dispatch);
	}

	fn detach(&self) {
		self.listener.borrow_mut().take();
	}
}

/// Hands out [`MemoryKeyTarget`]s and remembers them by element id.
#[derive(Default)]
pub struct MemoryKeyHost {
	targets: RefCell<HashMap<String, Rc<MemoryKeyTarget>>>,
	document: Rc<MemoryKeyTarget>,
}

impl MemoryKeyHost {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn target(&self, element_id: &str) -> Option<Rc<MemoryKeyTarget>> {
		self.targets.borrow().get(element_id).cloned()
	}

	#[must_use]
	pub fn document(&self) -> &Rc<MemoryKeyTarget> {
		&self.document
	}
}

impl KeyHost for MemoryKeyHost {
	fn element_target(&self, element_id: &str, cell_id: &str, cell_type: &str) -> Rc<dyn KeyTarget> {
		let mut targets = self.targets.borrow_mut();
		let target = targets.entry(element_id.to_owned()).or_insert_with(|| MemoryKeyTarget::new(element_id, Some(cell_id), Some(cell_type)));
		Rc::clone(target) as Rc<dyn KeyTarget>
	}

	fn document_target(&self) -> Rc<dyn KeyTarget> {
		Rc::clone(&self.document) as Rc<dyn KeyTarget>
	}
}
