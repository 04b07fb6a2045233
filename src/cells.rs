//! The active components map: sole owner of every live [`Instance`].
//!
//! Parent and child links are plain ids into this map.

use crate::{cell_id::CellId, component::Instance};
use hashbrown::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct ActiveCells {
	cells: HashMap<CellId, Instance>,
}

impl ActiveCells {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn get(&self, id: &CellId) -> Option<&Instance> {
		self.cells.get(id)
	}

	pub fn get_mut(&mut self, id: &CellId) -> Option<&mut Instance> {
		self.cells.get_mut(id)
	}

	#[must_use]
	pub fn contains(&self, id: &CellId) -> bool {
		self.cells.contains_key(id)
	}

	/// Inserts `instance` under its own id, returning any instance it displaced.
	pub fn insert(&mut self, instance: Instance) -> Option<Instance> {
		self.cells.insert(instance.id().clone(), instance)
	}

	pub fn remove(&mut self, id: &CellId) -> Option<Instance> {
		self.cells.remove(id)
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.cells.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.cells.is_empty()
	}

	/// Every live id, sorted.
	#[must_use]
	pub fn ids(&self) -> Vec<CellId> {
		let mut ids: Vec<_> = self.cells.keys().cloned().collect();
		ids.sort();
		ids
	}

	pub fn iter(&self) -> impl Iterator<Item = &Instance> {
		self.cells.values()
	}

	pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Instance> {
		self.cells.values_mut()
	}

	/// Ids of all live descendants of `id`, depth first, in child order.
	///
	/// Each id is visited once, even if it is reachable along several paths.
	#[must_use]
	pub fn descendants(&self, id: &CellId) -> Vec<CellId> {
		let mut seen = HashSet::new();
		seen.insert(id.clone());
		let mut descendants = Vec::new();
		self.collect_descendants(id, &mut seen, &mut descendants);
		descendants
	}

	fn collect_descendants(&self, id: &CellId, seen: &mut HashSet<CellId>, descendants: &mut Vec<CellId>) {
		let instance = match self.cells.get(id) {
			Some(instance) => instance,
			None => return,
		};
		for child in instance.props().child_ids() {
			if self.cells.contains_key(&child) && seen.insert(child.clone()) {
				descendants.push(child.clone());
				self.collect_descendants(&child, seen, descendants);
			}
		}
	}

	/// Ancestor ids of `id`, parent first. Stops at a parent that is no longer live.
	#[must_use]
	pub fn inheritance_chain(&self, id: &CellId) -> Vec<CellId> {
		let mut chain = Vec::new();
		let mut current = self.cells.get(id).and_then(Instance::parent);
		while let Some(parent) = current {
			if parent == id || chain.contains(parent) {
				break;
			}
			chain.push(parent.clone());
			current = self.cells.get(parent).and_then(Instance::parent);
		}
		chain
	}
}
