use crate::keys::{KeyHost, KeyTarget, KeyboardEvent, KeydownDispatch, Modifier};
use core::cell::RefCell;
use std::rc::Rc;
use tracing::{error, trace};
use wasm_bindgen::{closure::Closure, JsCast};

impl KeyboardEvent for web_sys::KeyboardEvent {
	fn key(&self) -> String {
		web_sys::KeyboardEvent::key(self)
	}

	fn modifier(&self, modifier: Modifier) -> bool {
		match modifier {
			Modifier::Shift => self.shift_key(),
			Modifier::Alt => self.alt_key(),
			Modifier::Meta => self.meta_key(),
			Modifier::Ctrl => self.ctrl_key(),
		}
	}

	fn stop_propagation(&self) {
		web_sys::Event::stop_propagation(self);
	}

	fn stop_immediate_propagation(&self) {
		web_sys::Event::stop_immediate_propagation(self);
	}

	fn prevent_default(&self) {
		web_sys::Event::prevent_default(self);
	}
}

/// A capturing `keydown` listener slot on an element or the document.
pub struct ElementKeyTarget {
	target: web_sys::EventTarget,
	element_id: String,
	cell_id: Option<String>,
	cell_type: Option<String>,
	listener: RefCell<Option<Closure<dyn Fn(web_sys::KeyboardEvent)>>>,
}

impl ElementKeyTarget {
	#[must_use]
	pub fn new(target: web_sys::EventTarget, element_id: &str, cell_id: Option<&str>, cell_type: Option<&str>) -> Rc<Self> {
		Rc::new(Self {
			target,
			element_id: element_id.to_owned(),
			cell_id: cell_id.map(str::to_owned),
			cell_type: cell_type.map(str::to_owned),
			listener: RefCell::default(),
		})
	}
}

impl KeyTarget for ElementKeyTarget {
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
		self.detach();
		let closure = Closure::wrap(Box::new(move |event: web_sys::KeyboardEvent| dispatch(&event)) as Box<dyn Fn(web_sys::KeyboardEvent)>);
		let mut options = web_sys::AddEventListenerOptions::new();
		options.capture(true);
		if let Err(error) = self
			.target
			.add_event_listener_with_callback_and_add_event_listener_options("keydown", closure.as_ref().unchecked_ref(), &options)
		{
			return error!("Failed to add keydown listener to {:?}: {:?}", self.element_id, error);
		}
		trace!(element_id = %self.element_id, "keydown listener attached");
		*self.listener.borrow_mut() = Some(closure);
	}

	fn detach(&self) {
		if let Some(closure) = self.listener.borrow_mut().take() {
			if let Err(error) = self
				.target
				.remove_event_listener_with_callback_and_bool("keydown", closure.as_ref().unchecked_ref(), true)
			{
				error!("Failed to remove keydown listener from {:?}: {:?}", self.element_id, error);
			}
		}
	}
}

/// Hands out [`ElementKeyTarget`]s for elements of `document`.
pub struct DocumentKeyHost {
	document: web_sys::Document,
}

impl DocumentKeyHost {
	#[must_use]
	pub fn new(document: web_sys::Document) -> Self {
		Self { document }
	}
}

impl KeyHost for DocumentKeyHost {
	fn element_target(&self, element_id: &str, cell_id: &str, cell_type: &str) -> Rc<dyn KeyTarget> {
		let target: web_sys::EventTarget = match self.document.get_element_by_id(element_id) {
			Some(element) => element.into(),
			None => {
				error!("No element {:?} to bind keys to; binding to the document instead.", element_id);
				self.document.clone().into()
			}
		};
		ElementKeyTarget::new(target, element_id, Some(cell_id), Some(cell_type))
	}

	fn document_target(&self) -> Rc<dyn KeyTarget> {
		ElementKeyTarget::new(self.document.clone().into(), "", None, None)
	}
}
