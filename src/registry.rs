//! `cellType` name → widget constructor.

use crate::{
	component::Component,
	error::ComponentError,
	props::Props,
	widgets::{Container, KeyAction, RootCell, Sequence, Text},
};
use core::{fmt, str::FromStr};
use hashbrown::HashMap;
use std::rc::Rc;

/// The built-in widgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellType {
	RootCell,
	Text,
	Sequence,
	Container,
	KeyAction,
}

impl CellType {
	pub const ALL: [CellType; 5] = [CellType::RootCell, CellType::Text, CellType::Sequence, CellType::Container, CellType::KeyAction];

	#[must_use]
	pub fn name(self) -> &'static str {
		match self {
			CellType::RootCell => "RootCell",
			CellType::Text => "Text",
			CellType::Sequence => "Sequence",
			CellType::Container => "Container",
			CellType::KeyAction => "KeyAction",
		}
	}

	#[must_use]
	pub fn construct(self, props: &Props) -> Box<dyn Component> {
		match self {
			CellType::RootCell => Box::new(RootCell),
			CellType::Text => Box::new(Text),
			CellType::Sequence => Box::new(Sequence),
			CellType::Container => Box::new(Container),
			CellType::KeyAction => Box::new(KeyAction::new(props)),
		}
	}
}

impl fmt::Display for CellType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for CellType {
	type Err = ComponentError;

	fn from_str(name: &str) -> Result<Self, Self::Err> {
		CellType::ALL
			.iter()
			.copied()
			.find(|cell_type| cell_type.name() == name)
			.ok_or_else(|| ComponentError::UnknownCellType(name.to_owned()))
	}
}

pub type Constructor = Rc<dyn Fn(&Props) -> Box<dyn Component>>;

/// Resolves `cellType` names.
///
/// Registered constructors take precedence over the built-in [`CellType`]s.
#[derive(Clone, Default)]
pub struct ComponentRegistry {
	builtin: bool,
	constructors: HashMap<String, Constructor>,
}

impl fmt::Debug for ComponentRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut names: Vec<_> = self.constructors.keys().collect();
		names.sort();
		f.debug_struct("ComponentRegistry").field("builtin", &self.builtin).field("constructors", &names).finish()
	}
}

impl ComponentRegistry {
	/// A registry that knows no cell types at all.
	#[must_use]
	pub fn empty() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with_builtin() -> Self {
		Self {
			builtin: true,
			constructors: HashMap::new(),
		}
	}

	pub fn register(&mut self, name: impl Into<String>, constructor: impl Fn(&Props) -> Box<dyn Component> + 'static) -> &mut Self {
		self.constructors.insert(name.into(), Rc::new(constructor));
		self
	}

	#[must_use]
	pub fn knows(&self, name: &str) -> bool {
		self.constructors.contains_key(name) || (self.builtin && name.parse::<CellType>().is_ok())
	}

	/// # Errors
	///
	/// [`ComponentError::UnknownCellType`] if `name` is not registered.
	pub fn construct(&self, name: &str, props: &Props) -> Result<Box<dyn Component>, ComponentError> {
		if let Some(constructor) = self.constructors.get(name) {
			return Ok(constructor(props));
		}
		if self.builtin {
			return Ok(name.parse::<CellType>()?.construct(props));
		}
		Err(ComponentError::UnknownCellType(name.to_owned()))
	}
}
