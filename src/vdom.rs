//! Rendering into [`lignin`] nodes.
//!
//! One render pass allocates all of its nodes in a single [`Bump`] arena, which the
//! [`MessageHandler`](`crate::MessageHandler`) resets before the next pass.
//! [`Vdom`] wraps that arena with the builders widgets use. The free functions read finished nodes back.

pub use bumpalo::Bump;

use core::{
	fmt::{self, Write},
	hash::{Hash, Hasher},
};
use hashbrown::HashSet;
use lignin::{Attribute, Element, ElementCreationOptions, ReorderableFragment, ThreadBound};
use std::collections::hash_map::DefaultHasher;
use tracing::warn;

pub type Node<'a> = lignin::Node<'a, ThreadBound>;

/// Attributes while they are still being edited: names are unique, insertion order is kept.
pub type AttributeList = Vec<(String, String)>;

/// For [`Vdom::h`] calls without attributes.
pub const NO_ATTRIBUTES: [(&str, &str); 0] = [];

/// Renders nothing. Used by headless cells.
#[must_use]
pub fn empty<'a>() -> Node<'a> {
	Node::Multi(&[])
}

/// Allocates nodes in one pass's arena.
#[derive(Clone, Copy)]
pub struct Vdom<'a> {
	bump: &'a Bump,
}

impl<'a> Vdom<'a> {
	#[must_use]
	pub fn new(bump: &'a Bump) -> Self {
		Self { bump }
	}

	#[must_use]
	pub fn bump(&self) -> &'a Bump {
		self.bump
	}

	#[must_use]
	pub fn str(&self, s: &str) -> &'a str {
		self.bump.alloc_str(s)
	}

	#[must_use]
	pub fn text(&self, text: &str) -> Node<'a> {
		Node::Text {
			text: self.str(text),
			dom_binding: None,
		}
	}

	#[must_use]
	pub fn comment(&self, comment: &str) -> Node<'a> {
		Node::Comment {
			comment: self.str(comment),
			dom_binding: None,
		}
	}

	/// An unkeyed fragment. Empty nodes are dropped.
	pub fn multi(&self, nodes: impl IntoIterator<Item = Node<'a>>) -> Node<'a> {
		let nodes: Vec<_> = nodes.into_iter().filter(|node| !is_empty(node)).collect();
		Node::Multi(self.bump.alloc_slice_fill_iter(nodes))
	}

	/// A fragment whose children keep their identity across reorders.
	///
	/// Empty nodes are dropped. On a duplicate key the whole fragment is built with [`multi`](`Vdom::multi`) instead.
	pub fn keyed<K: Hash>(&self, children: impl IntoIterator<Item = (K, Node<'a>)>) -> Node<'a> {
		let children: Vec<_> = children
			.into_iter()
			.filter(|(_, content)| !is_empty(content))
			.map(|(key, content)| (dom_key(&key), content))
			.collect();

		let mut seen = HashSet::with_capacity(children.len());
		if !children.iter().all(|&(dom_key, _)| seen.insert(dom_key)) {
			warn!("duplicate key among {} children; rendering them unkeyed", children.len());
			return self.multi(children.into_iter().map(|(_, content)| content));
		}

		Node::Keyed(
			self.bump
				.alloc_slice_fill_iter(children.into_iter().map(|(dom_key, content)| ReorderableFragment { dom_key, content })),
		)
	}

	/// Creates an HTML element.
	///
	/// `selector` is a tag name optionally followed by `.class` and `#id` parts, e.g. `"div.card.mt-5"`.
	/// Selector classes come before any `class` attribute value. Empty children are dropped.
	pub fn h<K, V>(&self, selector: &str, attributes: impl IntoIterator<Item = (K, V)>, children: impl IntoIterator<Item = Node<'a>>) -> Node<'a>
	where
		K: AsRef<str>,
		V: AsRef<str>,
	{
		let (name, mut list) = parse_selector(selector);
		for (name, value) in attributes {
			let (name, value) = (name.as_ref(), value.as_ref());
			if name == "class" {
				append_class(&mut list, value);
			} else {
				set_attribute(&mut list, name, value);
			}
		}
		Node::HtmlElement {
			element: self.bump.alloc(Element {
				name: self.str(name),
				creation_options: ElementCreationOptions::new(),
				attributes: self.attributes(&list),
				content: self.multi(children),
				event_bindings: &[],
			}),
			dom_binding: None,
		}
	}

	fn attributes(&self, list: &[(String, String)]) -> &'a [Attribute<'a>] {
		self.bump.alloc_slice_fill_iter(list.iter().map(|(name, value)| Attribute {
			name: self.str(name),
			value: self.str(value),
		}))
	}

	/// Returns `node` with its attribute list passed through `edit`.
	///
	/// Anything that isn't an element is returned unchanged.
	pub fn edit_attributes(&self, node: Node<'a>, edit: impl FnOnce(&mut AttributeList)) -> Node<'a> {
		let rebuild = |element: &'a Element<'a, ThreadBound>| -> &'a Element<'a, ThreadBound> {
			let mut list: AttributeList = element.attributes.iter().map(|attribute| (attribute.name.to_owned(), attribute.value.to_owned())).collect();
			edit(&mut list);
			self.bump.alloc(Element {
				name: element.name,
				creation_options: element.creation_options,
				attributes: self.attributes(&list),
				content: element.content,
				event_bindings: element.event_bindings,
			})
		};
		match node {
			Node::HtmlElement { element, dom_binding } => Node::HtmlElement {
				element: rebuild(element),
				dom_binding,
			},
			Node::SvgElement { element, dom_binding } => Node::SvgElement {
				element: rebuild(element),
				dom_binding,
			},
			Node::MathMlElement { element, dom_binding } => Node::MathMlElement {
				element: rebuild(element),
				dom_binding,
			},
			other => other,
		}
	}

	#[must_use]
	pub fn with_attribute(&self, node: Node<'a>, name: &str, value: &str) -> Node<'a> {
		self.edit_attributes(node, |list| set_attribute(list, name, value))
	}

	/// Appends `class` to the node's space-separated `class` attribute.
	#[must_use]
	pub fn with_class(&self, node: Node<'a>, class: &str) -> Node<'a> {
		self.edit_attributes(node, |list| append_class(list, class))
	}
}

fn parse_selector(selector: &str) -> (&str, AttributeList) {
	let mut list = AttributeList::new();
	let tag_end = selector.find(|c: char| c == '.' || c == '#').unwrap_or_else(|| selector.len());
	let name = if tag_end == 0 { "div" } else { &selector[..tag_end] };
	let mut rest = &selector[tag_end..];
	while let Some(marker) = rest.chars().next() {
		let part_end = rest[1..].find(|c: char| c == '.' || c == '#').map_or(rest.len(), |i| i + 1);
		let part = &rest[1..part_end];
		if !part.is_empty() {
			if marker == '.' {
				append_class(&mut list, part);
			} else {
				set_attribute(&mut list, "id", part);
			}
		}
		rest = &rest[part_end..];
	}
	(name, list)
}

pub fn set_attribute(list: &mut AttributeList, name: &str, value: &str) {
	match list.iter_mut().find(|(n, _)| n == name) {
		Some(slot) => slot.1 = value.to_owned(),
		None => list.push((name.to_owned(), value.to_owned())),
	}
}

pub fn append_class(list: &mut AttributeList, class: &str) {
	let class = class.trim();
	if class.is_empty() {
		return;
	}
	match list.iter_mut().find(|(n, _)| n == "class") {
		Some((_, value)) if !value.is_empty() => {
			value.push(' ');
			value.push_str(class);
		}
		Some((_, value)) => *value = class.to_owned(),
		None => list.push(("class".to_owned(), class.to_owned())),
	}
}

/// The `dom_key` a [`Vdom::keyed`] child gets for `key`. Stable across passes.
#[must_use]
pub fn dom_key(key: &impl Hash) -> u64 {
	let mut hasher = DefaultHasher::new();
	key.hash(&mut hasher);
	hasher.finish()
}

/// Whether `node` renders no DOM nodes at all.
#[must_use]
pub fn is_empty(node: &Node<'_>) -> bool {
	node.dom_len() == 0
}

/// The element behind an HTML, SVG or MathML element node.
#[must_use]
pub fn element<'a>(node: &Node<'a>) -> Option<&'a Element<'a, ThreadBound>> {
	match *node {
		Node::HtmlElement { element, .. } | Node::SvgElement { element, .. } | Node::MathMlElement { element, .. } => Some(element),
		_ => None,
	}
}

#[must_use]
pub fn attribute<'a>(node: &Node<'a>, name: &str) -> Option<&'a str> {
	element(node)?.attributes.iter().find(|attribute| attribute.name == name).map(|attribute| attribute.value)
}

#[must_use]
pub fn has_class(node: &Node<'_>, class: &str) -> bool {
	attribute(node, "class").map_or(false, |classes| classes.split_whitespace().any(|c| c == class))
}

/// Expands fragments, so that every returned node is a comment, element or text node.
pub fn dom_nodes<'a>(node: &Node<'a>, nodes: &mut Vec<Node<'a>>) {
	match *node {
		Node::Comment { .. } | Node::HtmlElement { .. } | Node::MathMlElement { .. } | Node::SvgElement { .. } | Node::Text { .. } => nodes.push(*node),
		Node::Memoized { content, .. } => dom_nodes(content, nodes),
		Node::Multi(children) => children.iter().for_each(|child| dom_nodes(child, nodes)),
		Node::Keyed(fragments) => fragments.iter().for_each(|fragment| dom_nodes(&fragment.content, nodes)),
		Node::RemnantSite(_) => warn!("remnant sites are not rendered"),
	}
}

/// Concatenated text of `node` and all descendants.
#[must_use]
pub fn text_content(node: &Node<'_>) -> String {
	let mut nodes = Vec::new();
	dom_nodes(node, &mut nodes);
	let mut text = String::new();
	for node in nodes {
		match node {
			Node::Text { text: t, .. } => text.push_str(t),
			node => {
				if let Some(element) = element(&node) {
					text.push_str(&text_content(&element.content));
				}
			}
		}
	}
	text
}

/// Serialises to HTML. Text and attribute values are escaped.
#[must_use]
pub fn to_html(node: &Node<'_>) -> String {
	let mut html = String::new();
	write_html(node, &mut html).ok();
	html
}

fn write_html(node: &Node<'_>, out: &mut String) -> fmt::Result {
	let mut nodes = Vec::new();
	dom_nodes(node, &mut nodes);
	for node in nodes {
		match node {
			Node::Text { text, .. } => write_escaped(out, text)?,
			Node::Comment { comment, .. } => write!(out, "<!--{}-->", comment)?,
			node => {
				if let Some(element) = element(&node) {
					write!(out, "<{}", element.name)?;
					for attribute in element.attributes {
						write!(out, " {}=\"", attribute.name)?;
						write_escaped(out, attribute.value)?;
						out.push('"');
					}
					out.push('>');
					write_html(&element.content, out)?;
					write!(out, "</{}>", element.name)?;
				}
			}
		}
	}
	Ok(())
}

pub(crate) fn write_escaped(out: &mut String, text: &str) -> fmt::Result {
	for c in text.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'"' => out.push_str("&quot;"),
			c => out.push(c),
		}
	}
	Ok(())
}
