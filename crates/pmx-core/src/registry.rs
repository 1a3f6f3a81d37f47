use crate::error::StoreError;
use crate::store::{Document, StateStore};
use crate::types::{Definitions, ProcessDefinition, RunningTable, StoppedTable};

/// Catalog of process definitions keyed by name. Every call goes to disk.
#[derive(Debug, Clone)]
pub struct Registry {
	store: StateStore,
}

impl Registry {
	pub fn new(store: StateStore) -> Self {
		Self { store }
	}

	pub fn all(&self) -> Result<Definitions, StoreError> {
		self.store.read(Document::Definitions)
	}

	pub fn get(&self, name: &str) -> Result<Option<ProcessDefinition>, StoreError> {
		Ok(self.all()?.remove(name))
	}

	pub fn put(&self, def: &ProcessDefinition) -> Result<(), StoreError> {
		self.store.update(Document::Definitions, |defs: &mut Definitions| {
			defs.insert(def.name.clone(), def.clone());
		})
	}

	/// Returns whether the name was registered.
	pub fn delete(&self, name: &str) -> Result<bool, StoreError> {
		self.store
			.update(Document::Definitions, |defs: &mut Definitions| defs.remove(name).is_some())
	}
}

/// The running and stopped documents.
#[derive(Debug, Clone)]
pub struct StatusTables {
	store: StateStore,
}

impl StatusTables {
	pub fn new(store: StateStore) -> Self {
		Self { store }
	}

	pub fn running(&self) -> Result<RunningTable, StoreError> {
		self.store.read(Document::Running)
	}

	pub fn stopped(&self) -> Result<StoppedTable, StoreError> {
		self.store.read(Document::Stopped)
	}

	pub fn record_running(&self, name: &str, pid: u32) -> Result<(), StoreError> {
		self.store.update(Document::Running, |t: &mut RunningTable| {
			t.insert(name.to_string(), pid.to_string());
		})
	}

	pub fn clear_running(&self, name: &str) -> Result<Option<String>, StoreError> {
		self.store
			.update(Document::Running, |t: &mut RunningTable| t.remove(name))
	}

	pub fn mark_stopped(&self, name: &str) -> Result<(), StoreError> {
		self.store.update(Document::Stopped, |t: &mut StoppedTable| {
			t.insert(name.to_string(), true);
		})
	}

	pub fn clear_stopped(&self, name: &str) -> Result<bool, StoreError> {
		self.store
			.update(Document::Stopped, |t: &mut StoppedTable| t.remove(name).is_some())
	}
}

pub fn is_stopped(stopped: &StoppedTable, name: &str) -> bool {
	stopped.get(name).copied().unwrap_or(false)
}
