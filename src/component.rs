//! The lifecycle contract every cell widget implements, and the per-instance bookkeeping around it.

use crate::{
	async_queue::AsyncMessageQueue,
	cell_id::CellId,
	cells::ActiveCells,
	config::Config,
	debounce::Debouncer,
	error::{ComponentError, KeyRegistryError, QueueError},
	keys::{KeyHost, KeyListener, KeyRegistry, MemoryKeyHost},
	props::{Child, Props},
	socket::Outbox,
	style::add_custom_styles,
	vdom::{self, Node, Vdom},
};
use core::{cell::Cell, cell::RefCell, fmt};
use serde_json::Value;
use std::rc::Rc;
use tracing::{trace, trace_span, warn};
use web_time::Duration;

/// A cell widget.
///
/// Only [`build`](`Component::build`) is required in practice. Every hook defaults to a no-op.
/// Widgets never render themselves directly: [`render`] wraps `build` with the cross-cutting props.
pub trait Component {
	/// Describes this widget's own DOM shape, allocated in the pass's arena ([`RenderContext::vdom`]).
	///
	/// # Errors
	///
	/// The default implementation always fails with [`ComponentError::MissingBuild`].
	fn build<'a>(&self, cx: &RenderContext<'a>) -> Result<Node<'a>, ComponentError> {
		Err(ComponentError::MissingBuild {
			cell_type: cx.cell_type().to_owned(),
			id: cx.id().clone(),
		})
	}

	/// Called once, after the first render pass that included this cell.
	fn component_did_load(&mut self, _cx: &mut CellContext<'_>) {}

	/// Called once, right before the cell is discarded.
	fn component_will_unload(&mut self, _cx: &mut CellContext<'_>) {}

	/// Called on every update before the new props are swapped in. The return value becomes the props.
	fn component_will_receive_props(&mut self, _old: &Props, next: Props) -> Props {
		next
	}

	/// Called after an update pass has been projected. Not called in the pass that created the cell.
	fn component_did_update(&mut self, _cx: &mut CellContext<'_>) {}

	/// Receives a `#cellDataUpdated` payload. No re-render follows.
	fn update_data(&mut self, _data_info: &Value, _cx: &mut CellContext<'_>) {}

	/// DOM id of this cell's root element.
	fn element_id(&self, id: &CellId, prefix: &str) -> String {
		format!("{}{}", prefix, id)
	}
}

/// What components reach outside of themselves through.
#[derive(Clone)]
pub struct Services {
	pub outbox: Outbox,
	pub key_registry: Rc<RefCell<KeyRegistry>>,
	pub key_host: Rc<dyn KeyHost>,
	/// Orders replies to requests cells sent with a `message_id`.
	pub replies: Rc<RefCell<AsyncMessageQueue<Value>>>,
	/// Window of the debouncers handed out by [`CellContext::debouncer`].
	pub debounce_window: Duration,
}

impl Default for Services {
	fn default() -> Self {
		Self {
			outbox: Outbox::default(),
			key_registry: Rc::default(),
			key_host: Rc::new(MemoryKeyHost::new()),
			replies: Rc::default(),
			debounce_window: Config::default().debounce_window(),
		}
	}
}

/// A live cell: one widget plus everything the handler tracks about it.
pub struct Instance {
	cell_type: String,
	element_id: String,
	pub(crate) props: Props,
	pub(crate) parent: Option<CellId>,
	num_renders: Cell<u32>,
	pub(crate) was_created: bool,
	pub(crate) was_updated: bool,
	key_listener: Option<Rc<KeyListener>>,
	widget: Box<dyn Component>,
}

impl fmt::Debug for Instance {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Instance")
			.field("cell_type", &self.cell_type)
			.field("id", self.props.id())
			.field("parent", &self.parent)
			.field("num_renders", &self.num_renders.get())
			.field("was_created", &self.was_created)
			.field("was_updated", &self.was_updated)
			.finish()
	}
}

impl fmt::Display for Instance {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} [{}]", self.cell_type, self.props.id())
	}
}

impl Instance {
	#[must_use]
	pub fn new(cell_type: impl Into<String>, props: Props, widget: Box<dyn Component>, element_id_prefix: &str) -> Self {
		let element_id = widget.element_id(props.id(), element_id_prefix);
		Self {
			cell_type: cell_type.into(),
			element_id,
			props,
			parent: None,
			num_renders: Cell::new(0),
			was_created: true,
			was_updated: false,
			key_listener: None,
			widget,
		}
	}

	#[must_use]
	pub fn id(&self) -> &CellId {
		self.props.id()
	}

	#[must_use]
	pub fn cell_type(&self) -> &str {
		&self.cell_type
	}

	#[must_use]
	pub fn element_id(&self) -> &str {
		&self.element_id
	}

	#[must_use]
	pub fn props(&self) -> &Props {
		&self.props
	}

	#[must_use]
	pub fn parent(&self) -> Option<&CellId> {
		self.parent.as_ref()
	}

	#[must_use]
	pub fn num_renders(&self) -> u32 {
		self.num_renders.get()
	}

	#[must_use]
	pub fn has_rendered_before(&self) -> bool {
		self.num_renders.get() > 0
	}

	#[must_use]
	pub fn was_created(&self) -> bool {
		self.was_created
	}

	#[must_use]
	pub fn was_updated(&self) -> bool {
		self.was_updated
	}

	#[must_use]
	pub fn key_listener(&self) -> Option<&Rc<KeyListener>> {
		self.key_listener.as_ref()
	}

	pub fn children_do(&self, mut f: impl FnMut(&CellId)) {
		self.props.children.iter().for_each(|child| f(child));
	}

	pub fn named_children_do(&self, mut f: impl FnMut(&str, &Child)) {
		for (name, child) in &self.props.named_children {
			f(name, child);
		}
	}

	/// Ancestor ids, parent first.
	#[must_use]
	pub fn inheritance_chain(&self, cells: &ActiveCells) -> Vec<CellId> {
		cells.inheritance_chain(self.id())
	}

	fn with_context<R>(&mut self, services: &Services, f: impl FnOnce(&mut dyn Component, &mut CellContext<'_>) -> R) -> R {
		let Instance {
			cell_type,
			element_id,
			props,
			key_listener,
			widget,
			..
		} = self;
		let mut cx = CellContext {
			cell_type,
			element_id,
			props,
			services,
			key_listener,
		};
		f(widget.as_mut(), &mut cx)
	}

	pub(crate) fn receive_props(&mut self, next: Props) {
		self.props = self.widget.component_will_receive_props(&self.props, next);
	}

	pub(crate) fn did_load(&mut self, services: &Services) {
		trace!(id = %self.id(), "componentDidLoad");
		self.with_context(services, |widget, cx| widget.component_did_load(cx));
	}

	pub(crate) fn did_update(&mut self, services: &Services) {
		trace!(id = %self.id(), "componentDidUpdate");
		self.with_context(services, |widget, cx| widget.component_did_update(cx));
	}

	/// Pauses the cell's key listener, if any, then runs the widget hook.
	pub(crate) fn will_unload(&mut self, services: &Services) {
		trace!(id = %self.id(), "componentWillUnload");
		self.with_context(services, |widget, cx| {
			cx.pause_key_listener();
			widget.component_will_unload(cx);
		});
	}

	pub(crate) fn update_data(&mut self, data_info: &Value, services: &Services) {
		self.with_context(services, |widget, cx| widget.update_data(data_info, cx));
	}
}

/// Read access during a render pass: the rendering cell, every other live cell and the pass's arena.
pub struct RenderContext<'a> {
	vdom: Vdom<'a>,
	cells: &'a ActiveCells,
	instance: &'a Instance,
}

impl<'a> RenderContext<'a> {
	#[must_use]
	pub fn vdom(&self) -> Vdom<'a> {
		self.vdom
	}

	#[must_use]
	pub fn id(&self) -> &'a CellId {
		self.instance.id()
	}

	#[must_use]
	pub fn cell_type(&self) -> &'a str {
		self.instance.cell_type()
	}

	#[must_use]
	pub fn element_id(&self) -> &'a str {
		self.instance.element_id()
	}

	#[must_use]
	pub fn props(&self) -> &'a Props {
		self.instance.props()
	}

	/// The `id`, `data-cell-id` and `data-cell-type` attributes most widgets put on their root element.
	#[must_use]
	pub fn cell_attributes(&self) -> [(&'static str, String); 3] {
		[
			("id", self.element_id().to_owned()),
			("data-cell-id", self.id().to_string()),
			("data-cell-type", self.cell_type().to_owned()),
		]
	}

	/// A child that was discarded since its parent's last update renders nothing.
	fn render_child(&self, id: &CellId) -> Result<Node<'a>, ComponentError> {
		match self.cells.get(id) {
			Some(child) => render(self.vdom, self.cells, child),
			None => {
				warn!(parent = %self.id(), child = %id, "child is no longer live");
				Ok(vdom::empty())
			}
		}
	}

	/// Renders the single child in `slot`. An absent slot renders nothing.
	///
	/// # Errors
	///
	/// If the child fails to render.
	pub fn render_child_named(&self, slot: &str) -> Result<Node<'a>, ComponentError> {
		match self.props().named_children.get(slot) {
			None => Ok(vdom::empty()),
			Some(Child::Cell(id)) => self.render_child(id),
			Some(list @ Child::List(_)) => {
				trace!(slot, "single-child slot holds a list; rendering its first cell");
				list.ids().first().map_or_else(|| Ok(vdom::empty()), |id| self.render_child(id))
			}
		}
	}

	/// Renders a list-valued `slot`, preserving its nesting.
	///
	/// # Errors
	///
	/// If a child fails to render.
	pub fn render_children_named(&self, slot: &str) -> Result<Rendered<'a>, ComponentError> {
		match self.props().named_children.get(slot) {
			None => Ok(Rendered::List(Vec::new())),
			Some(child) => self.render_slot(child),
		}
	}

	fn render_slot(&self, child: &Child) -> Result<Rendered<'a>, ComponentError> {
		Ok(match child {
			Child::Cell(id) => Rendered::Node(self.render_child(id)?),
			Child::List(items) => Rendered::List(items.iter().map(|item| self.render_slot(item)).collect::<Result<_, _>>()?),
		})
	}

	/// Renders the positional children as one keyed fragment, keyed `"{id}-child-{childId}"`.
	///
	/// # Errors
	///
	/// If a child fails to render.
	pub fn render_children(&self) -> Result<Node<'a>, ComponentError> {
		let children = self
			.props()
			.children
			.iter()
			.filter_map(|child_id| match self.cells.get(child_id) {
				Some(child) => Some(render(self.vdom, self.cells, child).map(|node| (format!("{}-child-{}", self.id(), child_id), node))),
				None => {
					warn!(parent = %self.id(), child = %child_id, "child is no longer live");
					None
				}
			})
			.collect::<Result<Vec<_>, _>>()?;
		Ok(self.vdom.keyed(children))
	}
}

/// Rendered nodes of a list-valued slot, nested like the slot.
#[derive(Clone)]
pub enum Rendered<'a> {
	Node(Node<'a>),
	List(Vec<Rendered<'a>>),
}

impl<'a> Rendered<'a> {
	/// All nodes depth first, dropping empty ones.
	#[must_use]
	pub fn flatten(self) -> Vec<Node<'a>> {
		let mut nodes = Vec::new();
		self.flatten_into(&mut nodes);
		nodes
	}

	fn flatten_into(self, nodes: &mut Vec<Node<'a>>) {
		match self {
			Rendered::Node(node) if vdom::is_empty(&node) => (),
			Rendered::Node(node) => nodes.push(node),
			Rendered::List(items) => items.into_iter().for_each(|item| item.flatten_into(nodes)),
		}
	}

	/// The rows of a two-level slot, each flattened.
	#[must_use]
	pub fn rows(self) -> Vec<Vec<Node<'a>>> {
		match self {
			Rendered::Node(node) => vec![Rendered::Node(node).flatten()],
			Rendered::List(rows) => rows.into_iter().map(Rendered::flatten).collect(),
		}
	}
}

/// Renders `instance`: [`Component::build`], then the props every cell honours.
///
/// - `flexChild` (truthy): adds the `flex-child` class,
/// - `customStyle` (object): merged into the inline style,
/// - `queryTag`: becomes `data-tag`.
///
/// Nodes are allocated in `vdom`'s arena.
///
/// # Errors
///
/// Whatever `build` fails with.
pub fn render<'a>(vdom: Vdom<'a>, cells: &'a ActiveCells, instance: &'a Instance) -> Result<Node<'a>, ComponentError> {
	let span = trace_span!("render", cell = %instance);
	let _enter = span.enter();

	let mut node = instance.widget.build(&RenderContext { vdom, cells, instance })?;
	instance.num_renders.set(instance.num_renders.get() + 1);

	let props = instance.props();
	if props.is_truthy("flexChild") {
		node = vdom.with_class(node, "flex-child");
	}
	if props.is_truthy("queryTag") {
		if let Some(tag) = props.get("queryTag") {
			node = vdom.with_attribute(node, "data-tag", &tag.as_str().map_or_else(|| tag.to_string(), str::to_owned));
		}
	}
	if let Some(Value::Object(custom_style)) = props.get("customStyle") {
		node = add_custom_styles(vdom, custom_style, node);
	}
	Ok(node)
}

/// Mutable access to a cell's surroundings from inside a lifecycle hook.
pub struct CellContext<'a> {
	cell_type: &'a str,
	element_id: &'a str,
	props: &'a Props,
	services: &'a Services,
	key_listener: &'a mut Option<Rc<KeyListener>>,
}

impl<'a> CellContext<'a> {
	#[must_use]
	pub fn id(&self) -> &CellId {
		self.props.id()
	}

	#[must_use]
	pub fn cell_type(&self) -> &str {
		self.cell_type
	}

	#[must_use]
	pub fn element_id(&self) -> &str {
		self.element_id
	}

	#[must_use]
	pub fn props(&self) -> &Props {
		self.props
	}

	#[must_use]
	pub fn outbox(&self) -> &Outbox {
		&self.services.outbox
	}

	/// A debouncer for this cell's outgoing edits, using the configured window.
	#[must_use]
	pub fn debouncer<T>(&self) -> Debouncer<T> {
		Debouncer::new(self.services.debounce_window)
	}

	/// Sends `message` with this cell as its `target_cell`.
	pub fn send_message(&self, message: Value) {
		self.services.outbox.send_message_for(message, self.props.id());
	}

	/// Sends `message` with this cell as its `target_cell` and a `message_id`, and expects the reply
	/// to be handed to [`take_reply`](`CellContext::take_reply`).
	pub fn send_ordered_message(&self, mut message: Value, message_id: u64) {
		if let Value::Object(fields) = &mut message {
			fields.insert("message_id".to_owned(), message_id.into());
		}
		self.services.replies.borrow_mut().enqueue(self.id().clone(), message_id);
		self.send_message(message);
	}

	/// Hands in the reply to an ordered message. Returns the replies that are now in order to apply.
	///
	/// # Errors
	///
	/// If `message_id` isn't pending for this cell.
	pub fn take_reply(&self, message_id: u64, reply: Value) -> Result<Vec<Value>, QueueError> {
		self.services.replies.borrow_mut().dequeue(self.id(), message_id, reply)
	}

	#[must_use]
	pub fn key_host(&self) -> &dyn KeyHost {
		self.services.key_host.as_ref()
	}

	#[must_use]
	pub fn key_registry(&self) -> &Rc<RefCell<KeyRegistry>> {
		&self.services.key_registry
	}

	#[must_use]
	pub fn key_listener(&self) -> Option<&Rc<KeyListener>> {
		self.key_listener.as_ref()
	}

	/// Starts `listener` and keeps it with this cell, so that unloading the cell pauses it.
	///
	/// # Errors
	///
	/// If a listener with the same id is already registered.
	pub fn start_key_listener(&mut self, listener: Rc<KeyListener>) -> Result<(), KeyRegistryError> {
		self.pause_key_listener();
		listener.start(&mut self.services.key_registry.borrow_mut())?;
		*self.key_listener = Some(listener);
		Ok(())
	}

	pub fn pause_key_listener(&mut self) {
		if let Some(listener) = self.key_listener.take() {
			listener.pause(&mut self.services.key_registry.borrow_mut());
		}
	}
}
