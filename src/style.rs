//! Inline style strings as ordered declaration lists.

use crate::vdom::{set_attribute, Node, Vdom};
use serde_json::{Map, Value};

/// `"width:100%;padding-left:10px;"` → `[("width", "100%"), ("padding-left", "10px")]`
#[must_use]
pub fn parse_style(style: &str) -> Vec<(String, String)> {
	style
		.split(';')
		.filter_map(|declaration| {
			let mut parts = declaration.splitn(2, ':');
			let name = parts.next()?.trim();
			if name.is_empty() {
				return None;
			}
			Some((name.to_owned(), parts.next().unwrap_or("").trim().to_owned()))
		})
		.collect()
}

/// Inverse of [`parse_style`]. Always ends with `;`.
#[must_use]
pub fn format_style(declarations: &[(String, String)]) -> String {
	let mut style = declarations.iter().map(|(name, value)| format!("{}:{}", name, value)).collect::<Vec<_>>().join(";");
	if !style.ends_with(';') {
		style.push(';');
	}
	style
}

/// Merges `custom` over the node's `style` attribute.
///
/// Declarations not named in `custom` keep their value and position.
#[must_use]
pub fn add_custom_styles<'a>(vdom: Vdom<'a>, custom: &Map<String, Value>, node: Node<'a>) -> Node<'a> {
	vdom.edit_attributes(node, |attributes| {
		let mut declarations = attributes.iter().find(|(name, _)| name == "style").map(|(_, style)| parse_style(style)).unwrap_or_default();
		for (name, value) in custom {
			let value = match value {
				Value::String(s) => s.clone(),
				other => other.to_string(),
			};
			match declarations.iter_mut().find(|(n, _)| n == name) {
				Some(slot) => slot.1 = value,
				None => declarations.push((name.clone(), value)),
			}
		}
		set_attribute(attributes, "style", &format_style(&declarations));
	})
}
