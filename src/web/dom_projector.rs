use crate::{
	error::ProjectorError,
	projector::Projector,
	vdom::{self, Bump, Node},
};
use lignin::{Attribute, Element, ElementCreationOptions, ThreadBound};
use tracing::{error, instrument, trace, trace_span, warn};
use wasm_bindgen::{JsCast, JsValue};

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";
const MATHML_NAMESPACE: &str = "http://www.w3.org/1998/Math/MathML";

fn dom_error(operation: &'static str) -> impl Fn(JsValue) -> ProjectorError {
	move |error| ProjectorError::Dom(format!("{} failed: {:?}", operation, error))
}

/// Projects [`lignin`] nodes into a live document.
///
/// The element being replaced is loaded back into nodes first (into a scratch arena) and the two
/// node lists are diffed, so that unchanged DOM nodes (and their focus, selection and scroll state) survive.
#[derive(Debug)]
pub struct DomProjector {
	document: web_sys::Document,
	scratch: Bump,
	depth_limit: usize,
}

impl DomProjector {
	#[must_use]
	pub fn new(document: web_sys::Document) -> Self {
		Self {
			document,
			scratch: Bump::new(),
			depth_limit: 1000,
		}
	}

	/// The projector for the current window's document, if there is one.
	#[must_use]
	pub fn for_window() -> Option<Self> {
		web_sys::window().and_then(|window| window.document()).map(Self::new)
	}

	#[must_use]
	pub fn with_depth_limit(mut self, depth_limit: usize) -> Self {
		self.depth_limit = depth_limit;
		self
	}

	#[must_use]
	pub fn document(&self) -> &web_sys::Document {
		&self.document
	}

	/// Brings the DOM nodes of `parent` from index `*i` on (currently matching `vdom_a`) in line with `vdom_b`.
	///
	/// Both lists must be flat, i.e. come from [`vdom::dom_nodes`]. `*i` ends up past the last node of `vdom_b`.
	#[allow(clippy::similar_names)]
	fn diff_splice_node_list(
		&self,
		vdom_a: &[Node<'_>],
		vdom_b: &[Node<'_>],
		parent: &web_sys::Node,
		dom_slice: &web_sys::NodeList,
		i: &mut u32,
		depth_limit: usize,
	) -> Result<(), ProjectorError> {
		if depth_limit == 0 {
			error!("Depth limit reached");
			return Err(ProjectorError::Dom("depth limit reached".to_owned()));
		}

		for (k, (n_1, n_2)) in vdom_a.iter().zip(vdom_b).enumerate() {
			let dom = match dom_slice.get(*i) {
				Some(dom) => dom,
				None => {
					error!("Expected a node beyond end of `web_sys::NodeList`. Switching to insertions.");
					return self.insert_all(&vdom_b[k..], parent, None, i, depth_limit);
				}
			};

			match (*n_1, *n_2) {
				(Node::Text { text: t_1, .. }, Node::Text { text: t_2, .. }) => match dom.dyn_ref::<web_sys::Text>() {
					Some(text) => {
						let span = trace_span!("Diffing text node", t_1, t_2);
						let _enter = span.enter();
						if t_1 != t_2 {
							text.set_data(t_2);
						}
					}
					None => {
						error!("Expected to update `web_sys::Text` but found {:?}; Recreating the node.", dom);
						self.recreate(parent, &dom, n_2, depth_limit)?;
					}
				},

				(Node::Comment { comment: c_1, .. }, Node::Comment { comment: c_2, .. }) => match dom.dyn_ref::<web_sys::Comment>() {
					Some(comment) => {
						if c_1 != c_2 {
							comment.set_data(c_2);
						}
					}
					None => {
						error!("Expected to update `web_sys::Comment` but found {:?}; Recreating the node.", dom);
						self.recreate(parent, &dom, n_2, depth_limit)?;
					}
				},

				(Node::HtmlElement { element: e_1, .. }, Node::HtmlElement { element: e_2, .. })
				| (Node::SvgElement { element: e_1, .. }, Node::SvgElement { element: e_2, .. })
				| (Node::MathMlElement { element: e_1, .. }, Node::MathMlElement { element: e_2, .. })
					if e_1.name.eq_ignore_ascii_case(e_2.name) && e_1.creation_options.is() == e_2.creation_options.is() =>
				{
					let span = trace_span!("Diffing element", tag = e_1.name);
					let _enter = span.enter();
					match dom.dyn_ref::<web_sys::Element>() {
						Some(element) => self.update_element(e_1, e_2, element, depth_limit)?,
						None => {
							error!("Expected to update <{}> but found {:?}; Recreating the node.", e_1.name, dom);
							self.recreate(parent, &dom, n_2, depth_limit)?;
						}
					}
				}

				// Mismatching nodes: Destroy and rebuild.
				(_, n_2) => {
					trace!("Replacing mismatching node");
					self.recreate(parent, &dom, n_2, depth_limit)?;
				}
			}
			*i += 1;
		}

		let shared = vdom_a.len().min(vdom_b.len());
		for _ in &vdom_a[shared..] {
			match dom_slice.get(*i) {
				Some(removed) => {
					trace!("Removing {:?}", removed);
					parent.remove_child(&removed).map_err(dom_error("removeChild"))?;
				}
				None => {
					error!("Expected to remove a node beyond end of `web_sys::NodeList`. Skipping further deletions here.");
					break;
				}
			}
		}

		let next_sibling = dom_slice.get(*i);
		self.insert_all(&vdom_b[shared..], parent, next_sibling.as_ref(), i, depth_limit)
	}

	fn insert_all(&self, vdom_b: &[Node<'_>], parent: &web_sys::Node, next_sibling: Option<&web_sys::Node>, i: &mut u32, depth_limit: usize) -> Result<(), ProjectorError> {
		for new_node in vdom_b {
			let created = self.create(*new_node, depth_limit)?;
			parent.insert_before(&created, next_sibling).map_err(dom_error("insertBefore"))?;
			*i += 1;
		}
		Ok(())
	}

	fn recreate(&self, parent: &web_sys::Node, dom: &web_sys::Node, vdom_b: Node<'_>, depth_limit: usize) -> Result<(), ProjectorError> {
		let created = self.create(vdom_b, depth_limit)?;
		parent.replace_child(&created, dom).map_err(dom_error("replaceChild"))?;
		Ok(())
	}

	/// Creates the DOM node for one flat node.
	fn create(&self, node: Node<'_>, depth_limit: usize) -> Result<web_sys::Node, ProjectorError> {
		if depth_limit == 0 {
			error!("Depth limit reached");
			return Err(ProjectorError::Dom("depth limit reached".to_owned()));
		}
		let (element, namespace) = match node {
			Node::Text { text, .. } => return Ok(self.document.create_text_node(text).into()),
			Node::Comment { comment, .. } => return Ok(self.document.create_comment(comment).into()),
			Node::HtmlElement { element, .. } => (element, None),
			Node::SvgElement { element, .. } => (element, Some(SVG_NAMESPACE)),
			Node::MathMlElement { element, .. } => (element, Some(MATHML_NAMESPACE)),
			Node::Memoized { .. } | Node::Multi(_) | Node::Keyed(_) | Node::RemnantSite(_) => {
				return Err(ProjectorError::Dom("expected a flat node list".to_owned()));
			}
		};

		let &Element { name, creation_options, .. } = element;
		let span = trace_span!("Creating element", name, ?namespace);
		let _enter = span.enter();
		let dom_element = match (namespace, creation_options.is()) {
			(None, None) => self.document.create_element(name),
			// This isn't entirely modern, but is well-supported.
			(None, Some(is)) => self.document.create_element_with_str(name, is),
			(namespace, None) => self.document.create_element_ns(namespace, name),
			(namespace, Some(is)) => self.document.create_element_ns_with_str(namespace, name, is),
		}
		.map_err(dom_error("createElement"))?;

		let empty = Element {
			name,
			creation_options,
			attributes: &[],
			content: Node::Multi(&[]),
			event_bindings: &[],
		};
		self.update_element(&empty, element, &dom_element, depth_limit)?;
		Ok(dom_element.into())
	}

	#[allow(clippy::similar_names)]
	fn update_element(&self, e_1: &Element<'_, ThreadBound>, e_2: &Element<'_, ThreadBound>, element: &web_sys::Element, depth_limit: usize) -> Result<(), ProjectorError> {
		let mut a_1 = e_1.attributes;
		let mut a_2 = e_2.attributes;
		while !a_1.is_empty() && a_1.first() == a_2.first() {
			a_1 = &a_1[1..];
			a_2 = &a_2[1..];
		}
		while !a_1.is_empty() && a_1.last() == a_2.last() {
			a_1 = &a_1[..a_1.len() - 1];
			a_2 = &a_2[..a_2.len() - 1];
		}
		for &Attribute { name, .. } in a_1 {
			if !a_2.iter().any(|added| added.name == name) {
				element.remove_attribute(name).map_err(dom_error("removeAttribute"))?;
			}
		}
		for &Attribute { name, value } in a_2 {
			element.set_attribute(name, value).map_err(dom_error("setAttribute"))?;
		}

		if !e_2.event_bindings.is_empty() {
			warn!("<{}> has {} event binding(s), which are not projected", e_2.name, e_2.event_bindings.len());
		}

		let (mut c_1, mut c_2) = (Vec::new(), Vec::new());
		vdom::dom_nodes(&e_1.content, &mut c_1);
		vdom::dom_nodes(&e_2.content, &mut c_2);
		let node: &web_sys::Node = element.as_ref();
		self.diff_splice_node_list(&c_1, &c_2, node, &node.child_nodes(), &mut 0, depth_limit - 1)
	}
}

impl Projector for DomProjector {
	#[instrument(skip(self, node))]
	fn replace(&mut self, element_id: &str, node: Node<'_>) -> Result<(), ProjectorError> {
		let mut vdom_b = Vec::new();
		vdom::dom_nodes(&node, &mut vdom_b);
		if vdom_b.is_empty() {
			return Err(ProjectorError::EmptyNode(element_id.to_owned()));
		}

		let element = self.document.get_element_by_id(element_id).ok_or_else(|| ProjectorError::ElementNotFound(element_id.to_owned()))?;
		let dom: &web_sys::Node = element.as_ref();
		let parent = dom.parent_node().ok_or_else(|| ProjectorError::Dom(format!("element {:?} is detached", element_id)))?;
		let dom_slice = parent.child_nodes();
		let mut i = (0..dom_slice.length())
			.find(|&i| dom_slice.get(i).map_or(false, |sibling| sibling.is_same_node(Some(dom))))
			.ok_or_else(|| ProjectorError::Dom(format!("element {:?} is not among its parent's children", element_id)))?;

		self.scratch.reset();
		let current = load_node(dom, &self.scratch, self.depth_limit);
		trace!("diffing against the loaded element");
		self.diff_splice_node_list(&[current], &vdom_b, &parent, &dom_slice, &mut i, self.depth_limit)?;
		trace!("Scratch heap capacity (loaded nodes): {}", self.scratch.allocated_bytes());
		Ok(())
	}
}

/// Reads a live DOM node back into a [`lignin`] node allocated in `bump`.
///
/// Nodes other than elements, text and comments load as an empty fragment.
#[must_use]
pub fn load_node<'a>(node: &web_sys::Node, bump: &'a Bump, depth_limit: usize) -> Node<'a> {
	if let Some(element) = node.dyn_ref::<web_sys::Element>() {
		if depth_limit == 0 {
			error!("Depth limit reached while loading <{}>", element.local_name());
			return vdom::empty();
		}
		let loaded: &'a Element<'a, ThreadBound> = bump.alloc(load_element(element, bump, depth_limit));
		if node.dyn_ref::<web_sys::HtmlElement>().is_some() {
			Node::HtmlElement { element: loaded, dom_binding: None }
		} else {
			match element.namespace_uri().as_deref() {
				Some(SVG_NAMESPACE) => Node::SvgElement { element: loaded, dom_binding: None },
				Some(MATHML_NAMESPACE) => Node::MathMlElement { element: loaded, dom_binding: None },
				_ => Node::HtmlElement { element: loaded, dom_binding: None },
			}
		}
	} else if let Some(text) = node.dyn_ref::<web_sys::Text>() {
		Node::Text {
			text: bump.alloc_str(&text.data()),
			dom_binding: None,
		}
	} else if let Some(comment) = node.dyn_ref::<web_sys::Comment>() {
		Node::Comment {
			comment: bump.alloc_str(&comment.data()),
			dom_binding: None,
		}
	} else {
		warn!("Skipping unrecognised node: {:?}", node);
		vdom::empty()
	}
}

fn load_element<'a>(element: &web_sys::Element, bump: &'a Bump, depth_limit: usize) -> Element<'a, ThreadBound> {
	let attributes = element.attributes();
	let node: &web_sys::Node = element.as_ref();
	let child_nodes = node.child_nodes();
	let children = (0..child_nodes.length())
		.filter_map(|i| child_nodes.get(i))
		.map(|child| load_node(&child, bump, depth_limit - 1))
		.collect::<Vec<_>>();
	Element {
		name: bump.alloc_str(&element.local_name()),
		creation_options: ElementCreationOptions::new(),
		attributes: bump.alloc_slice_fill_iter((0..attributes.length()).filter_map(|i| attributes.item(i)).map(|attribute| Attribute {
			name: bump.alloc_str(&attribute.name()),
			value: bump.alloc_str(&attribute.value()),
		}).collect::<Vec<_>>()),
		content: Node::Multi(bump.alloc_slice_fill_iter(children)),
		event_bindings: &[],
	}
}
