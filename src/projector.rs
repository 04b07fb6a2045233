//! Applying rendered nodes to a document.

use crate::{
	error::ProjectorError,
	vdom::{self, write_escaped, Node},
};
use core::fmt::{self, Write};
use tracing::{trace, warn};

/// Patches a document so that one of its elements matches a rendered node.
pub trait Projector {
	/// Replaces the element with DOM id `element_id` by the DOM nodes of `node`.
	///
	/// # Errors
	///
	/// [`ProjectorError::ElementNotFound`] if there is no such element,
	/// [`ProjectorError::EmptyNode`] if `node` has no DOM nodes.
	fn replace(&mut self, element_id: &str, node: Node<'_>) -> Result<(), ProjectorError>;
}

impl<P: Projector + ?Sized> Projector for &mut P {
	fn replace(&mut self, element_id: &str, node: Node<'_>) -> Result<(), ProjectorError> {
		(**self).replace(element_id, node)
	}
}

/// A node of a [`MemoryDom`]. Unlike [`Node`], it owns its content and outlives the render pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryNode {
	Element(MemoryElement),
	Text(String),
	Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryElement {
	pub tag: String,
	/// Attributes in insertion order. Names are unique.
	pub attributes: Vec<(String, String)>,
	pub children: Vec<MemoryNode>,
}

impl MemoryNode {
	/// Copies the DOM nodes of `node` out of its arena.
	#[must_use]
	pub fn materialize(node: &Node<'_>) -> Vec<Self> {
		let mut nodes = Vec::new();
		vdom::dom_nodes(node, &mut nodes);
		nodes
			.into_iter()
			.filter_map(|node| match node {
				Node::Text { text, .. } => Some(MemoryNode::Text(text.to_owned())),
				Node::Comment { comment, .. } => Some(MemoryNode::Comment(comment.to_owned())),
				node => match vdom::element(&node) {
					Some(element) => Some(MemoryNode::Element(MemoryElement {
						tag: element.name.to_owned(),
						attributes: element.attributes.iter().map(|attribute| (attribute.name.to_owned(), attribute.value.to_owned())).collect(),
						children: Self::materialize(&element.content),
					})),
					None => {
						warn!("skipping a node without DOM representation");
						None
					}
				},
			})
			.collect()
	}

	#[must_use]
	pub fn as_element(&self) -> Option<&MemoryElement> {
		match self {
			MemoryNode::Element(element) => Some(element),
			_ => None,
		}
	}

	#[must_use]
	pub fn text_content(&self) -> String {
		match self {
			MemoryNode::Text(text) => text.clone(),
			MemoryNode::Comment(_) => String::new(),
			MemoryNode::Element(element) => element.text_content(),
		}
	}

	fn write_html(&self, out: &mut String) -> fmt::Result {
		match self {
			MemoryNode::Text(text) => write_escaped(out, text),
			MemoryNode::Comment(comment) => write!(out, "<!--{}-->", comment),
			MemoryNode::Element(element) => element.write_html(out),
		}
	}
}

impl MemoryElement {
	#[must_use]
	pub fn attribute(&self, name: &str) -> Option<&str> {
		self.attributes.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
	}

	#[must_use]
	pub fn has_class(&self, class: &str) -> bool {
		self.attribute("class").map_or(false, |classes| classes.split_whitespace().any(|c| c == class))
	}

	#[must_use]
	pub fn text_content(&self) -> String {
		self.children.iter().map(MemoryNode::text_content).collect()
	}

	/// Depth-first search for the element whose `id` attribute is `id`, including this one.
	#[must_use]
	pub fn find_by_id(&self, id: &str) -> Option<&MemoryElement> {
		if self.attribute("id") == Some(id) {
			return Some(self);
		}
		self.children.iter().filter_map(MemoryNode::as_element).find_map(|child| child.find_by_id(id))
	}

	/// Puts `replacement` where the descendant with `id` is. Returns whether it was found.
	fn splice_by_id(&mut self, id: &str, replacement: &mut Option<Vec<MemoryNode>>) -> bool {
		let index = self.children.iter().position(|child| child.as_element().map_or(false, |element| element.attribute("id") == Some(id)));
		if let Some(index) = index {
			if let Some(nodes) = replacement.take() {
				self.children.splice(index..=index, nodes);
			}
			return true;
		}
		self.children.iter_mut().any(|child| match child {
			MemoryNode::Element(element) => element.splice_by_id(id, replacement),
			_ => false,
		})
	}

	#[must_use]
	pub fn to_html(&self) -> String {
		let mut html = String::new();
		self.write_html(&mut html).ok();
		html
	}

	fn write_html(&self, out: &mut String) -> fmt::Result {
		write!(out, "<{}", self.tag)?;
		for (name, value) in &self.attributes {
			write!(out, " {}=\"", name)?;
			write_escaped(out, value)?;
			out.push('"');
		}
		out.push('>');
		for child in &self.children {
			child.write_html(out)?;
		}
		write!(out, "</{}>", self.tag)
	}
}

/// An in-memory document, for headless use and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryDom {
	body: MemoryElement,
}

impl MemoryDom {
	/// A `<body>` holding one empty `<div>` with the given id.
	#[must_use]
	pub fn new(root_element_id: &str) -> Self {
		Self {
			body: MemoryElement {
				tag: "body".to_owned(),
				attributes: Vec::new(),
				children: vec![MemoryNode::Element(MemoryElement {
					tag: "div".to_owned(),
					attributes: vec![("id".to_owned(), root_element_id.to_owned())],
					children: Vec::new(),
				})],
			},
		}
	}

	#[must_use]
	pub fn body(&self) -> &MemoryElement {
		&self.body
	}

	#[must_use]
	pub fn get_element_by_id(&self, id: &str) -> Option<&MemoryElement> {
		self.body.find_by_id(id)
	}

	/// Text content of the element with DOM id `id`.
	#[must_use]
	pub fn text_of(&self, id: &str) -> Option<String> {
		self.get_element_by_id(id).map(MemoryElement::text_content)
	}

	#[must_use]
	pub fn text_content(&self) -> String {
		self.body.text_content()
	}

	#[must_use]
	pub fn to_html(&self) -> String {
		self.body.to_html()
	}
}

impl Default for MemoryDom {
	fn default() -> Self {
		Self::new("page_root")
	}
}

impl Projector for MemoryDom {
	fn replace(&mut self, element_id: &str, node: Node<'_>) -> Result<(), ProjectorError> {
		let nodes = MemoryNode::materialize(&node);
		if nodes.is_empty() {
			return Err(ProjectorError::EmptyNode(element_id.to_owned()));
		}
		if !self.body.splice_by_id(element_id, &mut Some(nodes)) {
			return Err(ProjectorError::ElementNotFound(element_id.to_owned()));
		}
		trace!(element_id, "replaced element");
		Ok(())
	}
}
