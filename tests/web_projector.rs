#![cfg(target_arch = "wasm32")]

use cells_dom::{
	projector::Projector,
	vdom::{self, Bump, Node, Vdom, NO_ATTRIBUTES},
	web::{load_node, DomProjector},
};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{window, HtmlBodyElement};

wasm_bindgen_test_configure!(run_in_browser);

fn init() -> (DomProjector, HtmlBodyElement) {
	tracing_wasm::try_set_as_global_default().ok();

	let document = window().unwrap().document().unwrap();
	let body = document.body().unwrap().dyn_into::<HtmlBodyElement>().unwrap();
	body.set_inner_html(r#"<div id="page_root"></div>"#);
	(DomProjector::new(document), body)
}

fn cell<'a>(vdom: Vdom<'a>, id: &str, text: &str) -> Node<'a> {
	vdom.h("div.cell", [("id", id)], vec![vdom.text(text)])
}

#[wasm_bindgen_test]
fn create() {
	let (mut projector, body) = init();
	let bump = Bump::new();
	let vdom = Vdom::new(&bump);
	projector
		.replace("page_root", vdom.h("div", [("id", "page_root")], vec![cell(vdom, "cell-1", "Hello"), cell(vdom, "cell-2", "World")]))
		.unwrap();

	assert_eq!(body.inner_html(), r#"<div id="page_root"><div class="cell" id="cell-1">Hello</div><div class="cell" id="cell-2">World</div></div>"#);
}

#[wasm_bindgen_test]
fn diff_identical_keeps_nodes() {
	let (mut projector, _body) = init();
	let bump = Bump::new();
	let vdom = Vdom::new(&bump);
	let root = vdom.h("div", [("id", "page_root")], vec![cell(vdom, "cell-1", "Hello")]);
	projector.replace("page_root", root).unwrap();

	let document = projector.document().clone();
	let before = document.get_element_by_id("cell-1").unwrap();
	projector.replace("page_root", root).unwrap();
	let after = document.get_element_by_id("cell-1").unwrap();
	assert!(before.is_same_node(Some(AsRef::<web_sys::Node>::as_ref(&after))));
}

#[wasm_bindgen_test]
fn diff_updates_text_and_attributes_in_place() {
	let (mut projector, _body) = init();
	let bump = Bump::new();
	let vdom = Vdom::new(&bump);
	projector.replace("page_root", vdom.h("div", [("id", "page_root")], vec![cell(vdom, "cell-1", "Hello")])).unwrap();
	let document = projector.document().clone();
	let before = document.get_element_by_id("cell-1").unwrap();

	projector
		.replace("page_root", vdom.h("div", [("id", "page_root"), ("data-tag", "x")], vec![cell(vdom, "cell-1", "Bye")]))
		.unwrap();
	let root = document.get_element_by_id("page_root").unwrap();
	assert_eq!(root.get_attribute("data-tag").as_deref(), Some("x"));
	let after = document.get_element_by_id("cell-1").unwrap();
	assert!(before.is_same_node(Some(AsRef::<web_sys::Node>::as_ref(&after))));
	assert_eq!(before.text_content().as_deref(), Some("Bye"));
}

#[wasm_bindgen_test]
fn diff_removes_surplus_children() {
	let (mut projector, body) = init();
	let bump = Bump::new();
	let vdom = Vdom::new(&bump);
	projector
		.replace("page_root", vdom.h("div", [("id", "page_root")], vec![cell(vdom, "cell-1", "a"), cell(vdom, "cell-2", "b")]))
		.unwrap();
	projector.replace("page_root", vdom.h("div", [("id", "page_root")], vec![cell(vdom, "cell-1", "a")])).unwrap();
	assert_eq!(body.inner_html(), r#"<div id="page_root"><div class="cell" id="cell-1">a</div></div>"#);
}

#[wasm_bindgen_test]
fn keyed_children_are_projected_flat() {
	let (mut projector, body) = init();
	let bump = Bump::new();
	let vdom = Vdom::new(&bump);
	let children = vdom.keyed(vec![("1", cell(vdom, "cell-1", "a")), ("2", vdom.comment("c"))]);
	projector.replace("page_root", vdom.h("div", [("id", "page_root")], vec![children])).unwrap();
	assert_eq!(body.inner_html(), r#"<div id="page_root"><div class="cell" id="cell-1">a</div><!--c--></div>"#);
}

#[wasm_bindgen_test]
fn tag_changes_recreate() {
	let (mut projector, body) = init();
	let bump = Bump::new();
	projector.replace("page_root", Vdom::new(&bump).h("main", [("id", "page_root")], Vec::new())).unwrap();
	assert_eq!(body.inner_html(), r#"<main id="page_root"></main>"#);
}

#[wasm_bindgen_test]
fn load_reads_markup_back() {
	let (_projector, body) = init();
	body.set_inner_html(r#"<p id="x" class="a">one<b>two</b></p>"#);
	let bump = Bump::new();
	let loaded = load_node(&body.first_child().unwrap(), &bump, 10);
	assert_eq!(vdom::to_html(&loaded), r#"<p id="x" class="a">one<b>two</b></p>"#);

	let expected = Bump::new();
	let v = Vdom::new(&expected);
	let built = v.h("p", [("id", "x"), ("class", "a")], vec![v.text("one"), v.h("b", NO_ATTRIBUTES, vec![v.text("two")])]);
	assert_eq!(vdom::to_html(&loaded), vdom::to_html(&built));
}

#[wasm_bindgen_test]
fn missing_elements_are_errors() {
	let (mut projector, _body) = init();
	let bump = Bump::new();
	assert!(projector.replace("nope", Vdom::new(&bump).text("x")).is_err());
}
