//! The built-in widgets.
//!
//! Application widgets live elsewhere and are added through
//! [`ComponentRegistry::register`](`crate::registry::ComponentRegistry::register`).

use crate::{
	cell_id::CellId,
	component::{CellContext, Component, RenderContext},
	error::ComponentError,
	keys::{KeyBinding, KeyListener, KeyboardEvent, Modifier},
	props::Props,
	vdom::{self, Node},
};
use serde_json::{json, Value};
use tracing::error;

/// The page root. Its element id is the bare cell id, so it projects over the `page_root` element.
#[derive(Debug, Default)]
pub struct RootCell;

impl Component for RootCell {
	fn build<'a>(&self, cx: &RenderContext<'a>) -> Result<Node<'a>, ComponentError> {
		Ok(cx.vdom().h("div", cx.cell_attributes(), vec![cx.render_child_named("child")?]))
	}

	fn element_id(&self, id: &CellId, _prefix: &str) -> String {
		id.to_string()
	}
}

/// Plain text from the `rawText` prop.
#[derive(Debug, Default)]
pub struct Text;

impl Component for Text {
	fn build<'a>(&self, cx: &RenderContext<'a>) -> Result<Node<'a>, ComponentError> {
		let vdom = cx.vdom();
		let text = cx.props().get_str("rawText").unwrap_or_default();
		Ok(vdom.h("div.cell", cx.cell_attributes(), vec![vdom.text(text)]))
	}
}

/// A vertical run of the cells in the `elements` slot.
#[derive(Debug, Default)]
pub struct Sequence;

impl Sequence {
	fn classes(props: &Props) -> String {
		let mut classes = vec!["cell sequence sequence-vertical".to_owned()];
		if props.is_truthy("flexParent") {
			classes.push("flex-parent".to_owned());
		}
		if props.is_truthy("overflow") {
			classes.push("overflow".to_owned());
		}
		if props.is_truthy("margin") {
			if let Some(margin) = props.get("margin") {
				classes.push(format!("child-margin-{}", margin.as_str().map_or_else(|| margin.to_string(), str::to_owned)));
			}
		}
		classes.join(" ")
	}
}

impl Component for Sequence {
	fn build<'a>(&self, cx: &RenderContext<'a>) -> Result<Node<'a>, ComponentError> {
		let mut attributes = cx.cell_attributes().to_vec();
		attributes.push(("class", Self::classes(cx.props())));
		let elements = cx.render_children_named("elements")?.flatten();
		Ok(cx.vdom().h("div", attributes, elements))
	}
}

/// Wraps the cell in the `child` slot. Hidden while the slot is empty.
#[derive(Debug, Default)]
pub struct Container;

impl Component for Container {
	fn build<'a>(&self, cx: &RenderContext<'a>) -> Result<Node<'a>, ComponentError> {
		let child = cx.render_child_named("child")?;
		let style = if vdom::is_empty(&child) { "display:none;" } else { "" };
		let mut attributes = cx.cell_attributes().to_vec();
		attributes.push(("class", "cell".to_owned()));
		attributes.push(("style", style.to_owned()));
		Ok(cx.vdom().h("div", attributes, vec![child]))
	}
}

/// A document-wide key binding. Renders nothing.
///
/// Reads `keyCmd`, `stopPropagation`, `stopImmediatePropagation` and `preventDefault` from `extraData`
/// and reports each matching `keydown` to the server.
#[derive(Debug)]
pub struct KeyAction {
	key_cmd: String,
	stop_propagation: bool,
	stop_immediate_propagation: bool,
	prevent_default: bool,
}

impl KeyAction {
	#[must_use]
	pub fn new(props: &Props) -> Self {
		let flag = |name: &str| props.extra_data().and_then(|extra| extra.get(name)).and_then(Value::as_bool).unwrap_or(false);
		Self {
			key_cmd: props
				.extra_data()
				.and_then(|extra| extra.get("keyCmd"))
				.and_then(Value::as_str)
				.unwrap_or_default()
				.to_owned(),
			stop_propagation: flag("stopPropagation"),
			stop_immediate_propagation: flag("stopImmediatePropagation"),
			prevent_default: flag("preventDefault"),
		}
	}

	#[must_use]
	pub fn key_cmd(&self) -> &str {
		&self.key_cmd
	}
}

impl Component for KeyAction {
	fn build<'a>(&self, _cx: &RenderContext<'a>) -> Result<Node<'a>, ComponentError> {
		Ok(vdom::empty())
	}

	fn component_did_load(&mut self, cx: &mut CellContext<'_>) {
		let outbox = cx.outbox().clone();
		let id = cx.id().clone();
		let key_cmd = self.key_cmd.clone();
		let binding = KeyBinding::new(&self.key_cmd, move |event: &dyn KeyboardEvent| {
			let response = json!({
				"event": "keydown",
				"data": {
					"keyCmd": key_cmd,
					"key": event.key(),
					"ctrlKey": event.modifier(Modifier::Ctrl),
					"shiftKey": event.modifier(Modifier::Shift),
					"altKey": event.modifier(Modifier::Alt),
					"metaKey": event.modifier(Modifier::Meta),
				},
			});
			outbox.send_message_for(response, &id);
		})
		.stop_propagation(self.stop_propagation)
		.stop_immediate_propagation(self.stop_immediate_propagation)
		.prevent_default(self.prevent_default);

		let listener = KeyListener::with_id(format!("#document-{}", cx.id()), cx.key_host().document_target(), vec![binding]);
		if let Err(error) = cx.start_key_listener(listener) {
			error!("could not start key action {}: {}", cx.id(), error);
		}
	}
}
