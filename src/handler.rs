//! The message handler: turns inbound cell messages into live components and projected DOM.
//!
//! # One `#cellUpdated` pass
//!
//! 1. The description tree is resolved top-down. Unknown ids are constructed, known ones
//!    receive their new props in place. Children are resolved before their parent is registered.
//!    A bare id in a child slot re-attaches that live cell (and marks its subtree updated).
//! 2. The top-level cell is rendered into the handler's arena, which is reset first,
//!    and projected over its element.
//! 3. `componentDidLoad` runs for every cell created in the pass, in creation order,
//!    then `componentDidUpdate` for every cell updated (but not created) in the pass.
//! 4. All dirty flags are cleared and the message's postscript, if any, is queued.
//!
//! If resolving or rendering fails, the cells created so far in the pass are dropped again
//! without any lifecycle hook, and the error is returned.

use crate::{
	cell_id::CellId,
	cells::ActiveCells,
	component::{render, Instance, Services},
	config::Config,
	error::{ComponentError, HandlerError, ProjectorError},
	keys::KeyRegistry,
	message::{CellDataRequested, CellDataUpdated, CellDescription, CellUpdated, ChildDescription, KeyListenerInfoResponse, Message},
	postscript::{PostscriptQueue, ScriptHost},
	projector::Projector,
	props::{Child, NamedChildren, Props},
	registry::ComponentRegistry,
	socket::{AckCounter, Frame},
	vdom::{Bump, Node, Vdom},
};
use core::cell::RefCell;
use serde_json::Value;
use std::rc::Rc;
use tracing::{debug, error, info, instrument, trace, trace_span, warn};

pub struct MessageHandler<P: Projector> {
	config: Config,
	projector: P,
	registry: ComponentRegistry,
	services: Services,
	cells: ActiveCells,
	arena: Bump,
	postscripts: PostscriptQueue,
	acks: AckCounter,
	pass_created: Vec<CellId>,
	pass_touched: Vec<CellId>,
}

impl<P: Projector> MessageHandler<P> {
	#[must_use]
	pub fn new(projector: P, registry: ComponentRegistry) -> Self {
		Self {
			config: Config::default(),
			projector,
			registry,
			services: Services::default(),
			cells: ActiveCells::new(),
			arena: Bump::new(),
			postscripts: PostscriptQueue::default(),
			acks: AckCounter::default(),
			pass_created: Vec::new(),
			pass_touched: Vec::new(),
		}
	}

	#[must_use]
	pub fn with_config(mut self, config: Config) -> Self {
		self.services.debounce_window = config.debounce_window();
		self.config = config;
		self
	}

	/// Replaces the services components reach out through. Their debounce window follows the config.
	#[must_use]
	pub fn with_services(mut self, services: Services) -> Self {
		self.services = Services {
			debounce_window: self.config.debounce_window(),
			..services
		};
		self
	}

	#[must_use]
	pub fn config(&self) -> &Config {
		&self.config
	}

	#[must_use]
	pub fn projector(&self) -> &P {
		&self.projector
	}

	pub fn projector_mut(&mut self) -> &mut P {
		&mut self.projector
	}

	#[must_use]
	pub fn services(&self) -> &Services {
		&self.services
	}

	#[must_use]
	pub fn key_registry(&self) -> &Rc<RefCell<KeyRegistry>> {
		&self.services.key_registry
	}

	/// The active components map.
	#[must_use]
	pub fn active_components(&self) -> &ActiveCells {
		&self.cells
	}

	#[must_use]
	pub fn component(&self, id: &CellId) -> Option<&Instance> {
		self.cells.get(id)
	}

	#[must_use]
	pub fn postscripts(&self) -> &PostscriptQueue {
		&self.postscripts
	}

	/// Calls `f` on every live descendant of `id`, depth first.
	pub fn each_descendant(&self, id: &CellId, mut f: impl FnMut(&Instance)) {
		for descendant in self.cells.descendants(id) {
			if let Some(instance) = self.cells.get(&descendant) {
				f(instance);
			}
		}
	}

	/// Renders the live cell `id` into `bump` without projecting it.
	///
	/// # Errors
	///
	/// [`ComponentError::NotFound`] if `id` is not live, or whatever rendering fails with.
	pub fn render_cell<'a>(&'a self, id: &CellId, bump: &'a Bump) -> Result<Node<'a>, ComponentError> {
		let instance = self.cells.get(id).ok_or_else(|| ComponentError::NotFound(id.clone()))?;
		render(Vdom::new(bump), &self.cells, instance)
	}

	/// Sends `message` to the server on behalf of `cell_id`.
	pub fn send_message_for(&self, message: Value, cell_id: &CellId) {
		self.services.outbox.send_message_for(message, cell_id);
	}

	/// Handles one raw text frame from the socket.
	///
	/// # Errors
	///
	/// If the frame is not JSON, or as [`receive`](`MessageHandler::receive`).
	pub fn handle_frame(&mut self, text: &str, scripts: &mut dyn ScriptHost) -> Result<(), HandlerError> {
		match Frame::parse(text)? {
			Frame::Postscripts => {
				self.handle_postscript(scripts);
				Ok(())
			}
			Frame::RequestAck => {
				let ack = self.acks.next();
				trace!(ack = ack.ack, "acknowledging");
				self.services.outbox.send(&ack);
				Ok(())
			}
			Frame::Message(message) => self.receive(message),
		}
	}

	/// # Errors
	///
	/// If `text` is not JSON, or as [`receive`](`MessageHandler::receive`).
	pub fn receive_json(&mut self, text: &str) -> Result<(), HandlerError> {
		self.receive(serde_json::from_str(text)?)
	}

	/// Dispatches one decoded message on its `type`.
	///
	/// Unknown types are logged and ignored.
	///
	/// # Errors
	///
	/// Protocol violations: a known message type with a malformed body, an unknown `cellType`,
	/// a missing or falsy `id`, or a child reference to a cell that is not live.
	#[instrument(skip(self, message))]
	pub fn receive(&mut self, message: Value) -> Result<(), HandlerError> {
		if !Message::is_known(&message) {
			self.does_not_understand(&message);
			return Ok(());
		}
		let message_type = message.get("type").and_then(Value::as_str).unwrap_or_default().to_owned();
		if cfg!(feature = "dangerous-logging") {
			trace!(message = %message, "received");
		} else {
			trace!(message_type = %message_type, "received");
		}

		let message: Message = serde_json::from_value(message).map_err(|source| HandlerError::Malformed { message_type, source })?;
		match message {
			Message::CellUpdated(update) => self.cell_updated(update),
			Message::CellDataUpdated(update) => {
				self.cell_data_updated(&update);
				Ok(())
			}
			Message::CellDataRequested(request) => {
				self.cell_data_requested(&request);
				Ok(())
			}
			Message::CellsDiscarded(discarded) => {
				self.cells_discarded(&discarded.ids);
				Ok(())
			}
			Message::CellDiscarded(discarded) => {
				self.cells_discarded(&[discarded.id]);
				Ok(())
			}
			Message::AppendPostscript(append) => {
				self.append_postscript(append.script);
				Ok(())
			}
		}
	}

	fn does_not_understand(&self, message: &Value) {
		if cfg!(feature = "dangerous-logging") {
			warn!("CellHandler does not understand the following message: {}", message);
		} else {
			warn!(message_type = ?message.get("type"), "CellHandler does not understand a message");
		}
	}

	pub fn append_postscript(&mut self, script: impl Into<String>) {
		self.postscripts.push(script);
	}

	/// Runs every queued postscript on `scripts`. Returns how many failed.
	#[instrument(skip(self, scripts), fields(queued = self.postscripts.len()))]
	pub fn handle_postscript(&mut self, scripts: &mut dyn ScriptHost) -> usize {
		self.postscripts.drain_into(scripts)
	}

	#[must_use]
	pub fn connection_closed_view(vdom: Vdom<'_>) -> Node<'_> {
		vdom.h(
			"main.container",
			[("role", "main")],
			vec![vdom.h("div", [("class", "alert alert-primary center-block mt-5")], vec![vdom.text("Disconnected")])],
		)
	}

	/// Replaces the root element with a "Disconnected" notice.
	///
	/// # Errors
	///
	/// If the root element is not in the document.
	#[instrument(skip(self))]
	pub fn show_connection_closed(&mut self) -> Result<(), ProjectorError> {
		info!("connection closed");
		self.arena.reset();
		let view = Self::connection_closed_view(Vdom::new(&self.arena));
		self.projector.replace(&self.config.root_element_id, view)
	}

	#[instrument(skip(self, update), fields(id = %update.description.id, should_display = update.should_display))]
	fn cell_updated(&mut self, update: CellUpdated) -> Result<(), HandlerError> {
		self.pass_created.clear();
		self.pass_touched.clear();

		let resolved = self.resolve_description(&update.description).and_then(|id| {
			if update.should_display {
				self.project(&id)?;
			}
			Ok(id)
		});
		if let Err(error) = resolved {
			self.roll_back_pass();
			return Err(error);
		}

		if update.should_display {
			self.call_did_load_for_new();
			self.call_did_update();
		} else {
			debug!("not displayed; skipping projection");
			self.call_did_load_for_new();
		}
		self.clear_pass();

		if let Some(postscript) = update.postscript {
			self.postscripts.push(postscript);
		}
		Ok(())
	}

	fn project(&mut self, id: &CellId) -> Result<(), HandlerError> {
		self.arena.reset();
		let instance = match self.cells.get(id) {
			Some(instance) => instance,
			None => return Err(ComponentError::NotFound(id.clone()).into()),
		};
		let node = render(Vdom::new(&self.arena), &self.cells, instance)?;
		trace!(allocated = self.arena.allocated_bytes(), "rendered");
		if let Err(error) = self.projector.replace(instance.element_id(), node) {
			error!("could not project {}: {}", instance, error);
		}
		Ok(())
	}

	/// Creates or updates the cell `description` names. Returns its id.
	fn resolve_description(&mut self, description: &CellDescription) -> Result<CellId, HandlerError> {
		let span = trace_span!("resolve", id = %description.id, cell_type = %description.cell_type);
		let _enter = span.enter();

		let id = description.cell_id().ok_or(ComponentError::MissingId)?;
		let props = Props::new(Props::merge(&description.id, &description.extra_data))?;

		if let Some(instance) = self.cells.get_mut(&id) {
			trace!("updating");
			instance.receive_props(props);
			let (named_children, children) = self.resolve_children(description, &id)?;
			if let Some(instance) = self.cells.get_mut(&id) {
				instance.props.named_children = named_children;
				instance.props.children = children;
			}
			self.mark_updated(&id);
		} else {
			trace!("creating");
			let widget = self.registry.construct(&description.cell_type, &props)?;
			let mut instance = Instance::new(description.cell_type.clone(), props, widget, &self.config.element_id_prefix);
			let (named_children, children) = self.resolve_children(description, &id)?;
			instance.props.named_children = named_children;
			instance.props.children = children;
			if self.cells.insert(instance).is_some() {
				warn!("cell {} appeared inside its own description", id);
			}
			self.pass_created.push(id.clone());
		}
		Ok(id)
	}

	fn resolve_children(&mut self, description: &CellDescription, parent: &CellId) -> Result<(NamedChildren, Vec<CellId>), HandlerError> {
		let malformed = |source: serde_json::Error| HandlerError::Malformed {
			message_type: "#cellUpdated".to_owned(),
			source,
		};

		let mut named_children = NamedChildren::new();
		for (slot, value) in &description.named_children {
			let child = ChildDescription::from_value(value).map_err(malformed)?;
			named_children.insert(slot.clone(), self.resolve_child(child, parent)?);
		}

		let mut children = Vec::new();
		for value in &description.children {
			let child = ChildDescription::from_value(value).map_err(malformed)?;
			self.resolve_child(child, parent)?.for_each_id(&mut |id| children.push(id.clone()));
		}
		Ok((named_children, children))
	}

	fn resolve_child(&mut self, child: ChildDescription, parent: &CellId) -> Result<Child, HandlerError> {
		match child {
			ChildDescription::List(items) => Ok(Child::List(items.into_iter().map(|item| self.resolve_child(item, parent)).collect::<Result<_, _>>()?)),
			ChildDescription::Reference(reference) => {
				if !self.cells.contains(&reference) {
					return Err(HandlerError::DanglingReference {
						reference,
						parent: parent.clone(),
					});
				}
				trace!(%reference, "re-attaching");
				self.mark_updated(&reference);
				for descendant in self.cells.descendants(&reference) {
					self.mark_updated(&descendant);
				}
				self.set_parent(&reference, parent);
				Ok(Child::Cell(reference))
			}
			ChildDescription::Cell(description) => {
				let id = self.resolve_description(&description)?;
				self.set_parent(&id, parent);
				Ok(Child::Cell(id))
			}
		}
	}

	fn set_parent(&mut self, id: &CellId, parent: &CellId) {
		if let Some(instance) = self.cells.get_mut(id) {
			instance.parent = Some(parent.clone());
		}
	}

	fn mark_updated(&mut self, id: &CellId) {
		if let Some(instance) = self.cells.get_mut(id) {
			if !instance.was_updated {
				instance.was_updated = true;
				self.pass_touched.push(id.clone());
			}
		}
	}

	fn call_did_load_for_new(&mut self) {
		for id in &self.pass_created {
			if let Some(instance) = self.cells.get_mut(id) {
				instance.did_load(&self.services);
			}
		}
	}

	/// Cells created in this pass are skipped even if they were updated too.
	fn call_did_update(&mut self) {
		for id in &self.pass_touched {
			if let Some(instance) = self.cells.get_mut(id) {
				if !instance.was_created {
					instance.did_update(&self.services);
				}
			}
		}
	}

	/// Drops every cell created by a pass that failed before its lifecycle hooks ran.
	///
	/// Live cells the pass already updated keep their new props.
	fn roll_back_pass(&mut self) {
		for id in &self.pass_created {
			if self.cells.remove(id).is_some() {
				debug!(%id, "rolled back");
			}
		}
		self.clear_pass();
	}

	fn clear_pass(&mut self) {
		for instance in self.cells.iter_mut() {
			instance.was_created = false;
			instance.was_updated = false;
		}
		self.pass_created.clear();
		self.pass_touched.clear();
	}

	#[instrument(skip(self, update), fields(id = %update.id))]
	fn cell_data_updated(&mut self, update: &CellDataUpdated) {
		match self.cells.get_mut(&update.id) {
			Some(instance) => instance.update_data(&update.data_info, &self.services),
			None => error!("data update fail; no component with id: {}", update.id),
		}
	}

	#[instrument(skip(self, request))]
	fn cell_data_requested(&mut self, request: &CellDataRequested) {
		for data in &request.data_info {
			match data.get("request").and_then(Value::as_str) {
				Some("KeyRegistry") => {
					let key_listeners = self.services.key_registry.borrow().listener_data();
					self.services.outbox.send(&KeyListenerInfoResponse {
						event: "KeyDownEventListenerInfoRequest",
						key_listeners,
					});
				}
				other => debug!(request = ?other, "ignoring data request"),
			}
		}
	}

	#[instrument(skip(self))]
	fn cells_discarded(&mut self, ids: &[CellId]) {
		for id in ids {
			match self.cells.get_mut(id) {
				Some(instance) => {
					instance.will_unload(&self.services);
					self.cells.remove(id);
				}
				None => trace!(%id, "already discarded"),
			}
		}
	}
}
