use cells_dom::{
	component::{CellContext, Component, RenderContext, Services},
	error::{ComponentError, HandlerError},
	keys::{KeyEvent, MemoryKeyHost, Modifier},
	postscript::RecordingScriptHost,
	props::Props,
	socket::{Outbox, Transport},
	vdom::{self, Bump, Node},
	CellId, ComponentRegistry, MemoryDom, MessageHandler,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};
use std::{cell::RefCell, rc::Rc};

type Log = Rc<RefCell<Vec<String>>>;

/// Renders its `elements` and `child` slots and logs every lifecycle call.
struct Recorder {
	log: Log,
}

impl Component for Recorder {
	fn build<'a>(&self, cx: &RenderContext<'a>) -> Result<Node<'a>, ComponentError> {
		let mut children = cx.render_children_named("elements")?.flatten();
		children.push(cx.render_child_named("child")?);
		Ok(cx.vdom().h("div", cx.cell_attributes(), children))
	}

	fn component_did_load(&mut self, cx: &mut CellContext<'_>) {
		self.log.borrow_mut().push(format!("load {}", cx.id()));
	}

	fn component_did_update(&mut self, cx: &mut CellContext<'_>) {
		self.log.borrow_mut().push(format!("update {}", cx.id()));
	}

	fn component_will_unload(&mut self, cx: &mut CellContext<'_>) {
		self.log.borrow_mut().push(format!("unload {}", cx.id()));
	}

	fn update_data(&mut self, data_info: &Value, cx: &mut CellContext<'_>) {
		self.log.borrow_mut().push(format!("data {} {}", cx.id(), data_info));
	}
}

/// Requests two pages on load and applies the replies in request order.
struct Pager {
	log: Log,
}

impl Component for Pager {
	fn build<'a>(&self, cx: &RenderContext<'a>) -> Result<Node<'a>, ComponentError> {
		Ok(cx.vdom().h("div", cx.cell_attributes(), Vec::new()))
	}

	fn component_did_load(&mut self, cx: &mut CellContext<'_>) {
		for page in 1..=2 {
			cx.send_ordered_message(json!({"event": "page", "page": page}), page);
		}
	}

	fn update_data(&mut self, data_info: &Value, cx: &mut CellContext<'_>) {
		let message_id = data_info["message_id"].as_u64().unwrap();
		for reply in cx.take_reply(message_id, data_info.clone()).unwrap() {
			self.log.borrow_mut().push(format!("apply {}", reply["message_id"]));
		}
	}
}

#[derive(Default)]
struct Sent(RefCell<Vec<String>>);

impl Transport for Sent {
	fn send_string(&self, text: &str) {
		self.0.borrow_mut().push(text.to_owned());
	}
}

impl Sent {
	fn json(&self) -> Vec<Value> {
		self.0.borrow().iter().map(|text| serde_json::from_str(text).unwrap()).collect()
	}
}

fn recording_registry(log: &Log) -> ComponentRegistry {
	let mut registry = ComponentRegistry::with_builtin();
	let log = Rc::clone(log);
	let pager_log = Rc::clone(&log);
	registry.register("Recorder", move |props: &Props| -> Box<dyn Component> {
		log.borrow_mut().push(format!("new {}", props.id()));
		Box::new(Recorder { log: Rc::clone(&log) })
	});
	registry.register("Pager", move |_: &Props| -> Box<dyn Component> { Box::new(Pager { log: Rc::clone(&pager_log) }) });
	registry
}

fn handler(log: &Log) -> MessageHandler<MemoryDom> {
	MessageHandler::new(MemoryDom::default(), recording_registry(log))
}

fn take(log: &Log) -> Vec<String> {
	log.borrow_mut().drain(..).collect()
}

fn hello() -> Value {
	json!({
		"type": "#cellUpdated",
		"id": "page_root",
		"cellType": "RootCell",
		"namedChildren": {
			"child": {"id": "3", "cellType": "Text", "extraData": {"rawText": "Hello"}, "namedChildren": {}},
		},
		"shouldDisplay": true,
	})
}

fn tree() -> Value {
	json!({
		"type": "#cellUpdated",
		"id": "page_root",
		"cellType": "RootCell",
		"namedChildren": {
			"child": {
				"id": "seq",
				"cellType": "Recorder",
				"namedChildren": {
					"elements": [
						{"id": "a", "cellType": "Recorder"},
						{"id": "b", "cellType": "Recorder"},
					],
				},
			},
		},
	})
}

#[test]
fn hello_end_to_end() {
	let log = Log::default();
	let mut handler = handler(&log);
	handler.receive(hello()).unwrap();

	let cells = handler.active_components();
	assert_eq!(cells.len(), 2);
	assert!(cells.contains(&CellId::from("page_root")));
	assert!(cells.contains(&CellId::from(3)));
	assert_eq!(handler.projector().text_of("cell-3").as_deref(), Some("Hello"));
	assert_eq!(handler.projector().text_content(), "Hello");
}

#[test]
fn ids_stay_unique_across_updates() {
	let log = Log::default();
	let mut handler = handler(&log);
	for text in &["one", "two", "three"] {
		handler
			.receive(json!({
				"type": "#cellUpdated",
				"id": "page_root",
				"cellType": "RootCell",
				"namedChildren": {"child": {"id": 7, "cellType": "Recorder", "extraData": {"text": text}}},
			}))
			.unwrap();
	}

	assert_eq!(handler.active_components().len(), 2);
	let constructed = take(&log).into_iter().filter(|entry| entry.starts_with("new")).collect::<Vec<_>>();
	assert_eq!(constructed, vec!["new 7".to_owned()]);
	let props = handler.component(&CellId::from(7)).unwrap().props();
	assert_eq!(props.get_str("text"), Some("three"));
	assert_eq!(props.get("id"), Some(&json!(7)));
}

#[test]
fn falsy_ids_are_rejected() {
	let log = Log::default();
	let mut handler = handler(&log);
	let result = handler.receive(json!({"type": "#cellUpdated", "id": "", "cellType": "Text"}));
	assert!(matches!(result, Err(HandlerError::Component(ComponentError::MissingId))));
	assert!(handler.active_components().is_empty());

	assert!(handler.receive(json!({"type": "#cellUpdated", "cellType": "Text"})).is_err());
}

#[test]
fn numeric_zero_ids_are_rejected() {
	let log = Log::default();
	let mut handler = handler(&log);
	let result = handler.receive(json!({"type": "#cellUpdated", "id": 0, "cellType": "Text", "shouldDisplay": false}));
	assert!(matches!(result, Err(HandlerError::Component(ComponentError::MissingId))));
	assert!(handler.active_components().is_empty());
	assert!(handler.postscripts().is_empty());
}

#[test]
fn lifecycle_runs_once_per_creation_then_per_update() {
	let log = Log::default();
	let mut handler = handler(&log);

	handler.receive(tree()).unwrap();
	assert_eq!(take(&log), vec!["new seq", "new a", "new b", "load a", "load b", "load seq"]);

	handler.receive(tree()).unwrap();
	assert_eq!(take(&log), vec!["update a", "update b", "update seq"]);

	let seq = handler.component(&CellId::from("seq")).unwrap();
	assert_eq!(seq.parent(), Some(&CellId::from("page_root")));
	assert_eq!(handler.component(&CellId::from("a")).unwrap().inheritance_chain(handler.active_components()), vec![
		CellId::from("seq"),
		CellId::from("page_root")
	]);
	assert!(!seq.was_created());
	assert!(!seq.was_updated());
}

#[test]
fn bare_ids_reattach_live_cells() {
	let log = Log::default();
	let mut handler = handler(&log);
	handler
		.receive(json!({
			"type": "#cellUpdated",
			"id": "page_root",
			"cellType": "RootCell",
			"namedChildren": {"child": {"id": "h1", "cellType": "Recorder", "namedChildren": {"child": {"id": "x", "cellType": "Recorder"}}}},
		}))
		.unwrap();
	assert_eq!(take(&log), vec!["new h1", "new x", "load x", "load h1"]);

	handler
		.receive(json!({
			"type": "#cellUpdated",
			"id": "page_root",
			"cellType": "RootCell",
			"namedChildren": {"child": {"id": "h2", "cellType": "Recorder", "namedChildren": {"child": "x"}}},
		}))
		.unwrap();
	assert_eq!(take(&log), vec!["new h2", "load h2", "update x"]);
	assert_eq!(handler.component(&CellId::from("x")).unwrap().parent(), Some(&CellId::from("h2")));
	assert!(handler.projector().get_element_by_id("cell-x").is_some());
}

#[test]
fn new_children_load_before_live_cells_update() {
	let log = Log::default();
	let mut handler = handler(&log);
	handler.receive(tree()).unwrap();
	take(&log);

	let mut grown = tree();
	grown["namedChildren"]["child"]["namedChildren"]["elements"]
		.as_array_mut()
		.unwrap()
		.push(json!({"id": "c", "cellType": "Recorder"}));
	handler.receive(grown).unwrap();
	assert_eq!(take(&log), vec!["new c", "load c", "update a", "update b", "update seq"]);
	assert!(handler.projector().get_element_by_id("cell-c").is_some());
}

#[test]
fn reattached_cells_update_their_descendants() {
	let log = Log::default();
	let mut handler = handler(&log);
	handler
		.receive(json!({
			"type": "#cellUpdated",
			"id": "page_root",
			"cellType": "RootCell",
			"namedChildren": {"child": {
				"id": "h1",
				"cellType": "Recorder",
				"namedChildren": {"child": {"id": "x", "cellType": "Recorder", "namedChildren": {"child": {"id": "y", "cellType": "Recorder"}}}},
			}},
		}))
		.unwrap();
	assert_eq!(take(&log), vec!["new h1", "new x", "new y", "load y", "load x", "load h1"]);

	handler
		.receive(json!({
			"type": "#cellUpdated",
			"id": "page_root",
			"cellType": "RootCell",
			"namedChildren": {"child": {"id": "h2", "cellType": "Recorder", "namedChildren": {"child": "x"}}},
		}))
		.unwrap();
	assert_eq!(take(&log), vec!["new h2", "load h2", "update x", "update y"]);
	assert_eq!(handler.component(&CellId::from("y")).unwrap().parent(), Some(&CellId::from("x")));
	assert!(handler.projector().get_element_by_id("cell-y").is_some());
}

#[test]
fn failed_passes_leave_no_cells_behind() {
	let log = Log::default();
	let mut handler = handler(&log);
	let mut broken = tree();
	broken["namedChildren"]["child"]["namedChildren"]["elements"] = json!([{"id": "a", "cellType": "Recorder"}, "ghost"]);

	let result = handler.receive(broken);
	assert!(matches!(result, Err(HandlerError::DanglingReference { reference, .. }) if reference == CellId::from("ghost")));
	assert_eq!(take(&log), vec!["new seq", "new a"]);
	assert!(handler.active_components().is_empty());
	let before = MemoryDom::default().to_html();
	assert_eq!(handler.projector().to_html(), before);

	handler.receive(tree()).unwrap();
	assert_eq!(take(&log), vec!["new seq", "new a", "new b", "load a", "load b", "load seq"]);
	assert!(handler.component(&CellId::from("a")).unwrap().has_rendered_before());
}

#[test]
fn references_to_dead_cells_are_errors() {
	let log = Log::default();
	let mut handler = handler(&log);
	let result = handler.receive(json!({
		"type": "#cellUpdated",
		"id": "page_root",
		"cellType": "RootCell",
		"namedChildren": {"child": "ghost"},
	}));
	assert!(matches!(result, Err(HandlerError::DanglingReference { .. })));
}

#[test]
fn unknown_cell_types_are_errors() {
	let log = Log::default();
	let mut handler = handler(&log);
	let result = handler.receive(json!({"type": "#cellUpdated", "id": 1, "cellType": "Spaceship"}));
	assert!(matches!(result, Err(HandlerError::Component(ComponentError::UnknownCellType(name))) if name == "Spaceship"));
}

#[test]
fn unknown_messages_are_ignored() {
	let log = Log::default();
	let mut handler = handler(&log);
	handler.receive(json!({"type": "#somethingNew", "id": 1})).unwrap();
	handler.receive(json!({"noType": true})).unwrap();
	assert!(handler.active_components().is_empty());
}

#[test]
fn known_messages_with_bad_bodies_are_malformed() {
	let log = Log::default();
	let mut handler = handler(&log);
	let result = handler.receive(json!({"type": "#cellsDiscarded", "ids": "not a list"}));
	assert!(matches!(result, Err(HandlerError::Malformed { message_type, .. }) if message_type == "#cellsDiscarded"));
}

#[test]
fn discarding_twice_is_harmless() {
	let log = Log::default();
	let mut handler = handler(&log);
	handler.receive(tree()).unwrap();
	take(&log);

	handler.receive(json!({"type": "#cellsDiscarded", "ids": ["a"]})).unwrap();
	assert!(!handler.active_components().contains(&CellId::from("a")));
	handler.receive(json!({"type": "#cellsDiscarded", "ids": ["a"]})).unwrap();
	assert!(!handler.active_components().contains(&CellId::from("a")));

	handler.receive(json!({"type": "#cellDiscarded", "id": "b"})).unwrap();
	assert_eq!(take(&log), vec!["unload a", "unload b"]);
}

#[test]
fn discarded_children_render_nothing() {
	let log = Log::default();
	let mut handler = handler(&log);
	handler.receive(tree()).unwrap();
	handler.receive(json!({"type": "#cellsDiscarded", "ids": ["a"]})).unwrap();

	let bump = Bump::new();
	let node = handler.render_cell(&CellId::from("seq"), &bump).unwrap();
	assert_eq!(vdom::element(&node).unwrap().content.dom_len(), 1);
}

#[test]
fn props_are_the_merged_extra_data() {
	let log = Log::default();
	let mut handler = handler(&log);
	handler.receive(hello()).unwrap();

	let extra_data = match json!({"rawText": "Bye", "n": 2}) {
		Value::Object(map) => map,
		_ => unreachable!(),
	};
	handler
		.receive(json!({"type": "#cellUpdated", "id": "3", "cellType": "Text", "extraData": extra_data}))
		.unwrap();

	let props = handler.component(&CellId::from(3)).unwrap().props();
	assert_eq!(props.data(), &Props::merge(&json!("3"), &extra_data));
	assert_eq!(props.extra_data(), Some(&extra_data));
	assert_eq!(handler.projector().text_of("cell-3").as_deref(), Some("Bye"));
}

#[test]
fn render_counts_accumulate() {
	let log = Log::default();
	let mut handler = handler(&log);
	handler.receive(hello()).unwrap();
	let text = handler.component(&CellId::from(3)).unwrap();
	assert!(text.has_rendered_before());
	assert_eq!(text.num_renders(), 1);

	handler.receive(hello()).unwrap();
	assert_eq!(handler.component(&CellId::from(3)).unwrap().num_renders(), 2);
}

#[test]
fn common_props_decorate_the_rendered_element() {
	let log = Log::default();
	let mut handler = handler(&log);
	handler
		.receive(json!({
			"type": "#cellUpdated",
			"id": "page_root",
			"cellType": "RootCell",
			"namedChildren": {
				"child": {
					"id": 3,
					"cellType": "Text",
					"extraData": {"rawText": "Hi", "flexChild": true, "queryTag": "greeting", "customStyle": {"color": "red"}},
				},
			},
		}))
		.unwrap();

	let element = handler.projector().get_element_by_id("cell-3").unwrap();
	assert!(element.has_class("cell"));
	assert!(element.has_class("flex-child"));
	assert_eq!(element.attribute("data-tag"), Some("greeting"));
	assert_eq!(element.attribute("data-cell-type"), Some("Text"));
	assert_eq!(element.attribute("style"), Some("color:red;"));
}

#[test]
fn hidden_updates_load_but_do_not_project() {
	let log = Log::default();
	let mut handler = handler(&log);
	let before = handler.projector().to_html();
	handler
		.receive(json!({
			"type": "#cellUpdated",
			"id": "page_root",
			"cellType": "RootCell",
			"namedChildren": {"child": {"id": "x", "cellType": "Recorder"}},
			"shouldDisplay": false,
			"postscript": "console.log('hidden')",
		}))
		.unwrap();

	assert_eq!(handler.projector().to_html(), before);
	assert_eq!(take(&log), vec!["new x", "load x"]);
	assert_eq!(handler.postscripts().len(), 1);
}

#[test]
fn postscripts_run_newest_first_on_request() {
	let log = Log::default();
	let mut handler = handler(&log);
	handler.handle_frame(r##"{"type": "#appendPostscript", "script": "first"}"##, &mut RecordingScriptHost::default()).unwrap();
	handler.handle_frame(r##"{"type": "#appendPostscript", "script": "second"}"##, &mut RecordingScriptHost::default()).unwrap();

	let mut scripts = RecordingScriptHost::default();
	handler.handle_frame("\"postscripts\"", &mut scripts).unwrap();
	assert_eq!(scripts.ran, vec!["second".to_owned(), "first".to_owned()]);
	assert!(handler.postscripts().is_empty());
}

#[test]
fn ack_requests_are_answered() {
	let log = Log::default();
	let sent = Rc::new(Sent::default());
	let mut handler = handler(&log).with_services(Services {
		outbox: Outbox::new(Some(Rc::clone(&sent) as Rc<dyn Transport>)),
		..Services::default()
	});

	handler.handle_frame("\"request_ack\"", &mut RecordingScriptHost::default()).unwrap();
	handler.handle_frame("\"request_ack\"", &mut RecordingScriptHost::default()).unwrap();
	assert_eq!(sent.json(), vec![json!({"ACK": 1}), json!({"ACK": 2})]);

	assert!(matches!(
		handler.handle_frame("{not json", &mut RecordingScriptHost::default()),
		Err(HandlerError::Decode(_))
	));
}

#[test]
fn data_updates_reach_the_component_only() {
	let log = Log::default();
	let mut handler = handler(&log);
	handler.receive(tree()).unwrap();
	take(&log);
	let html = handler.projector().to_html();

	handler.receive(json!({"type": "#cellDataUpdated", "id": "a", "dataInfo": {"rows": 3}})).unwrap();
	handler.receive(json!({"type": "#cellDataUpdated", "id": "missing", "dataInfo": {}})).unwrap();
	assert_eq!(take(&log), vec![r#"data a {"rows":3}"#]);
	assert_eq!(handler.projector().to_html(), html);
}

#[test]
fn key_actions_bind_the_document() {
	let log = Log::default();
	let sent = Rc::new(Sent::default());
	let keys = Rc::new(MemoryKeyHost::new());
	let mut handler = handler(&log).with_services(Services {
		outbox: Outbox::new(Some(Rc::clone(&sent) as Rc<dyn Transport>)),
		key_host: Rc::clone(&keys) as Rc<dyn cells_dom::keys::KeyHost>,
		..Services::default()
	});

	handler
		.receive(json!({
			"type": "#cellUpdated",
			"id": "page_root",
			"cellType": "RootCell",
			"namedChildren": {"child": {"id": "k", "cellType": "KeyAction", "extraData": {"keyCmd": "ctrlKey+S", "preventDefault": true}}},
		}))
		.unwrap();
	assert_eq!(handler.key_registry().borrow().number_of_listeners(), 1);
	assert!(handler.key_registry().borrow().listener_by_id("#document-k").is_some());

	let event = KeyEvent::new("S").with(Modifier::Ctrl);
	assert!(keys.document().dispatch(&event));
	assert!(event.default_prevented.get());
	assert!(keys.document().dispatch(&KeyEvent::new("S")));

	assert_eq!(sent.json(), vec![json!({
		"event": "keydown",
		"data": {"keyCmd": "ctrlKey+S", "key": "S", "ctrlKey": true, "shiftKey": false, "altKey": false, "metaKey": false},
		"target_cell": "k",
	})]);

	handler.receive(json!({"type": "#cellsDiscarded", "ids": ["k"]})).unwrap();
	assert_eq!(handler.key_registry().borrow().number_of_listeners(), 0);
	assert!(!keys.document().is_attached());
}

#[test]
fn key_registry_can_be_requested() {
	let log = Log::default();
	let sent = Rc::new(Sent::default());
	let mut handler = handler(&log).with_services(Services {
		outbox: Outbox::new(Some(Rc::clone(&sent) as Rc<dyn Transport>)),
		..Services::default()
	});
	handler
		.receive(json!({
			"type": "#cellUpdated",
			"id": "page_root",
			"cellType": "RootCell",
			"namedChildren": {"child": {"id": "k", "cellType": "KeyAction", "extraData": {"keyCmd": "Escape"}}},
		}))
		.unwrap();

	handler
		.receive(json!({"type": "#cellDataRequested", "id": "page_root", "dataInfo": [{"request": "KeyRegistry"}, {"request": "Other"}]}))
		.unwrap();

	let sent = sent.json();
	assert_eq!(sent.len(), 1);
	assert_eq!(sent[0]["event"], json!("KeyDownEventListenerInfoRequest"));
	assert_eq!(sent[0]["KeyListeners"]["#document-k"]["bindings"][0]["command"], json!("Escape"));
	assert!(sent[0].get("target_cell").is_none());
}

#[test]
fn closing_shows_the_disconnected_notice() {
	let log = Log::default();
	let mut handler = handler(&log);
	handler.receive(hello()).unwrap();
	handler.show_connection_closed().unwrap();

	let dom = handler.projector();
	assert_eq!(dom.text_content(), "Disconnected");
	assert!(dom.get_element_by_id("page_root").is_none());
	let main = dom.body().children[0].as_element().unwrap();
	assert_eq!(main.tag, "main");
	assert_eq!(main.attribute("role"), Some("main"));
	assert!(main.has_class("container"));
}

#[test]
fn descendants_are_walked_depth_first() {
	let log = Log::default();
	let mut handler = handler(&log);
	handler.receive(tree()).unwrap();

	let mut seen = Vec::new();
	handler.each_descendant(&CellId::from("page_root"), |instance| seen.push(instance.id().to_string()));
	seen.sort();
	assert_eq!(seen, vec!["a", "b", "seq"]);

	let mut named = Vec::new();
	handler
		.component(&CellId::from("seq"))
		.unwrap()
		.named_children_do(|slot, child| named.push((slot.to_owned(), child.ids())));
	assert_eq!(named, vec![("elements".to_owned(), vec![CellId::from("a"), CellId::from("b")])]);
}

#[test]
fn positional_children_are_resolved_and_rendered() {
	let log = Log::default();
	let mut handler = handler(&log);
	handler
		.receive(json!({
			"type": "#cellUpdated",
			"id": "list",
			"cellType": "Recorder",
			"children": [{"id": "p", "cellType": "Text", "extraData": {"rawText": "p"}}],
			"shouldDisplay": false,
		}))
		.unwrap();

	let list = handler.component(&CellId::from("list")).unwrap();
	let mut children = Vec::new();
	list.children_do(|id| children.push(id.clone()));
	assert_eq!(children, vec![CellId::from("p")]);
	assert_eq!(handler.component(&CellId::from("p")).unwrap().parent(), Some(&CellId::from("list")));
}

#[test]
fn merged_props_keep_extra_data_nested() {
	let mut extra_data = Map::new();
	extra_data.insert("a".to_owned(), json!(1));
	let merged = Props::merge(&json!("x"), &extra_data);
	assert_eq!(Value::Object(merged), json!({"a": 1, "id": "x", "extraData": {"a": 1}}));
}

#[test]
fn replies_are_applied_in_request_order() {
	let log = Log::default();
	let sent = Rc::new(Sent::default());
	let mut handler = handler(&log).with_services(Services {
		outbox: Outbox::new(Some(Rc::clone(&sent) as Rc<dyn Transport>)),
		..Services::default()
	});
	handler
		.receive(json!({
			"type": "#cellUpdated",
			"id": "page_root",
			"cellType": "RootCell",
			"namedChildren": {"child": {"id": "p", "cellType": "Pager"}},
		}))
		.unwrap();
	assert_eq!(sent.json(), vec![
		json!({"event": "page", "page": 1, "message_id": 1, "target_cell": "p"}),
		json!({"event": "page", "page": 2, "message_id": 2, "target_cell": "p"}),
	]);

	handler.receive(json!({"type": "#cellDataUpdated", "id": "p", "dataInfo": {"message_id": 2}})).unwrap();
	assert!(take(&log).is_empty());
	handler.receive(json!({"type": "#cellDataUpdated", "id": "p", "dataInfo": {"message_id": 1}})).unwrap();
	assert_eq!(take(&log), vec!["apply 1", "apply 2"]);
}
