use core::{cell::Cell, fmt};
use serde::Serialize;
use std::rc::Rc;

/// Modifier flags of a `keydown` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
	Shift,
	Alt,
	Meta,
	Ctrl,
}

impl Modifier {
	/// Accepts both event property names (`shiftKey`) and key names (`Shift`, `Control`, `Ctrl`).
	#[must_use]
	pub fn parse(name: &str) -> Option<Self> {
		Some(match name {
			"shiftKey" | "Shift" => Modifier::Shift,
			"altKey" | "Alt" => Modifier::Alt,
			"metaKey" | "Meta" => Modifier::Meta,
			"ctrlKey" | "Control" | "Ctrl" => Modifier::Ctrl,
			_ => return None,
		})
	}

	#[must_use]
	pub fn event_property(self) -> &'static str {
		match self {
			Modifier::Shift => "shiftKey",
			Modifier::Alt => "altKey",
			Modifier::Meta => "metaKey",
			Modifier::Ctrl => "ctrlKey",
		}
	}
}

/// What a [`KeyBinding`] needs from a `keydown` event.
pub trait KeyboardEvent {
	fn key(&self) -> String;
	fn modifier(&self, modifier: Modifier) -> bool;
	fn stop_propagation(&self);
	fn stop_immediate_propagation(&self);
	fn prevent_default(&self);
}

/// A plain `keydown` event, for hosts without a DOM and for tests.
#[derive(Debug, Default)]
pub struct KeyEvent {
	pub key: String,
	pub shift_key: bool,
	pub alt_key: bool,
	pub meta_key: bool,
	pub ctrl_key: bool,
	pub propagation_stopped: Cell<bool>,
	pub immediate_propagation_stopped: Cell<bool>,
	pub default_prevented: Cell<bool>,
}

impl KeyEvent {
	pub fn new(key: impl Into<String>) -> Self {
		Self { key: key.into(), ..Self::default() }
	}

	#[must_use]
	pub fn with(mut self, modifier: Modifier) -> Self {
		match modifier {
			Modifier::Shift => self.shift_key = true,
			Modifier::Alt => self.alt_key = true,
			Modifier::Meta => self.meta_key = true,
			Modifier::Ctrl => self.ctrl_key = true,
		}
		self
	}
}

impl KeyboardEvent for KeyEvent {
	fn key(&self) -> String {
		self.key.clone()
	}

	fn modifier(&self, modifier: Modifier) -> bool {
		match modifier {
			Modifier::Shift => self.shift_key,
			Modifier::Alt => self.alt_key,
			Modifier::Meta => self.meta_key,
			Modifier::Ctrl => self.ctrl_key,
		}
	}

	fn stop_propagation(&self) {
		self.propagation_stopped.set(true);
	}

	fn stop_immediate_propagation(&self) {
		self.immediate_propagation_stopped.set(true);
	}

	fn prevent_default(&self) {
		self.default_prevented.set(true);
	}
}

/// A parsed command like `"ctrlKey+shiftKey+S"`: modifiers joined by `+`, then the literal key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCombo {
	command: String,
	key: String,
	modifiers: Vec<Modifier>,
	// Set when a modifier name isn't recognised. Such a combo can never match.
	unmatchable: bool,
}

impl KeyCombo {
	#[must_use]
	pub fn parse(command: &str) -> Self {
		let mut parts: Vec<&str> = command.split('+').collect();
		let key = parts.pop().unwrap_or("").to_owned();
		let mut modifiers = Vec::with_capacity(parts.len());
		let mut unmatchable = false;
		for part in parts {
			match Modifier::parse(part) {
				Some(modifier) => modifiers.push(modifier),
				None => unmatchable = true,
			}
		}
		Self {
			command: command.to_owned(),
			key,
			modifiers,
			unmatchable,
		}
	}

	#[must_use]
	pub fn command(&self) -> &str {
		&self.command
	}

	#[must_use]
	pub fn key(&self) -> &str {
		&self.key
	}

	#[must_use]
	pub fn modifiers(&self) -> &[Modifier] {
		&self.modifiers
	}

	/// Every modifier down and an exact, case-sensitive key match.
	pub fn matches(&self, event: &dyn KeyboardEvent) -> bool {
		!self.unmatchable && !self.key.is_empty() && self.modifiers.iter().all(|&modifier| event.modifier(modifier)) && event.key() == self.key
	}
}

pub type KeyHandler = Rc<dyn Fn(&dyn KeyboardEvent)>;

/// One key combination and its handler, owned by a [`KeyListener`](`super::KeyListener`).
#[derive(Clone)]
pub struct KeyBinding {
	combo: KeyCombo,
	handler: KeyHandler,
	stop_propagation: bool,
	stop_immediate_propagation: bool,
	prevent_default: bool,
}

impl fmt::Debug for KeyBinding {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("KeyBinding")
			.field("command", &self.combo.command)
			.field("stop_propagation", &self.stop_propagation)
			.field("stop_immediate_propagation", &self.stop_immediate_propagation)
			.field("prevent_default", &self.prevent_default)
			.finish()
	}
}

impl KeyBinding {
	pub fn new(command: &str, handler: impl Fn(&dyn KeyboardEvent) + 'static) -> Self {
		Self {
			combo: KeyCombo::parse(command),
			handler: Rc::new(handler),
			stop_propagation: false,
			stop_immediate_propagation: false,
			prevent_default: false,
		}
	}

	#[must_use]
	pub fn stop_propagation(mut self, stop: bool) -> Self {
		self.stop_propagation = stop;
		self
	}

	#[must_use]
	pub fn stop_immediate_propagation(mut self, stop: bool) -> Self {
		self.stop_immediate_propagation = stop;
		self
	}

	#[must_use]
	pub fn prevent_default(mut self, prevent: bool) -> Self {
		self.prevent_default = prevent;
		self
	}

	#[must_use]
	pub fn command(&self) -> &str {
		self.combo.command()
	}

	#[must_use]
	pub fn combo(&self) -> &KeyCombo {
		&self.combo
	}

	#[must_use]
	pub fn stops_immediate_propagation(&self) -> bool {
		self.stop_immediate_propagation
	}

	/// Applies the propagation flags, then calls the handler if the event matches.
	///
	/// The flags apply to every event reaching this binding, matching or not.
	/// Returns whether the handler ran.
	pub fn handle(&self, event: &dyn KeyboardEvent) -> bool {
		if self.stop_propagation {
			event.stop_propagation();
		}
		if self.stop_immediate_propagation {
			event.stop_immediate_propagation();
		}
		if self.prevent_default {
			event.prevent_default();
		}
		if self.combo.matches(event) {
			(self.handler)(event);
			true
		} else {
			false
		}
	}

	pub(crate) fn info(&self) -> BindingInfo<'_> {
		BindingInfo {
			command: self.combo.command(),
			stop_propagation: self.stop_propagation,
			stop_immediate_propagation: self.stop_immediate_propagation,
			prevent_default: self.prevent_default,
		}
	}
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BindingInfo<'a> {
	command: &'a str,
	stop_propagation: bool,
	stop_immediate_propagation: bool,
	prevent_default: bool,
}
