//! Per-target actions behind `start`, `stop` and `remove`. Each target is
//! handled on its own: a failure is logged and reported, never fatal.

use std::path::Path;

use pmx_core::batch::{is_batch_arg, load_batch};
use pmx_core::{Lifecycle, ProcessDefinition};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
	Started { name: String, pid: u32 },
	Stopped { name: String },
	NotRunning { name: String },
	Removed { name: String },
	Unknown { name: String },
	Failed { target: String, error: String },
}

impl ItemOutcome {
	pub fn is_failure(&self) -> bool {
		matches!(self, ItemOutcome::Unknown { .. } | ItemOutcome::Failed { .. })
	}
}

pub fn start_targets(lifecycle: &Lifecycle, targets: &[String]) -> Vec<ItemOutcome> {
	let mut outcomes = Vec::new();
	for target in targets {
		if is_batch_arg(target) {
			for_each_batch_entry(target, &mut outcomes, |def| start_one(lifecycle, &def));
			continue;
		}
		let outcome = match lifecycle.registry().get(target) {
			Ok(Some(def)) => start_one(lifecycle, &def),
			Ok(None) => unknown(target),
			Err(e) => failed(target, e),
		};
		outcomes.push(outcome);
	}
	outcomes
}

pub fn stop_targets(lifecycle: &Lifecycle, targets: &[String]) -> Vec<ItemOutcome> {
	let mut outcomes = Vec::new();
	for target in targets {
		if is_batch_arg(target) {
			for_each_batch_entry(target, &mut outcomes, |def| stop_one(lifecycle, &def.name));
			continue;
		}
		let outcome = match lifecycle.registry().get(target) {
			Ok(Some(_)) => stop_one(lifecycle, target),
			Ok(None) => unknown(target),
			Err(e) => failed(target, e),
		};
		outcomes.push(outcome);
	}
	outcomes
}

pub fn remove_targets(lifecycle: &Lifecycle, names: &[String]) -> Vec<ItemOutcome> {
	names
		.iter()
		.map(|name| match lifecycle.remove(name) {
			Ok(true) => ItemOutcome::Removed { name: name.clone() },
			Ok(false) => unknown(name),
			Err(e) => failed(name, e),
		})
		.collect()
}

fn start_one(lifecycle: &Lifecycle, def: &ProcessDefinition) -> ItemOutcome {
	match lifecycle.start(def) {
		Ok(pid) => ItemOutcome::Started { name: def.name.clone(), pid },
		Err(e) => failed(&def.name, e),
	}
}

fn stop_one(lifecycle: &Lifecycle, name: &str) -> ItemOutcome {
	match lifecycle.stop(name) {
		Ok(true) => ItemOutcome::Stopped { name: name.to_string() },
		Ok(false) => ItemOutcome::NotRunning { name: name.to_string() },
		Err(e) => failed(name, e),
	}
}

fn for_each_batch_entry<F>(target: &str, outcomes: &mut Vec<ItemOutcome>, mut act: F)
where
	F: FnMut(ProcessDefinition) -> ItemOutcome,
{
	let entries = match load_batch(Path::new(target)) {
		Ok(entries) => entries,
		Err(e) => {
			outcomes.push(failed(target, e));
			return;
		}
	};
	for entry in entries {
		let outcome = match entry {
			Ok(def) => act(def),
			Err(e) => failed(target, e),
		};
		outcomes.push(outcome);
	}
}

fn unknown(name: &str) -> ItemOutcome {
	tracing::error!(name, "process not found in registry");
	ItemOutcome::Unknown { name: name.to_string() }
}

fn failed(target: &str, error: impl std::fmt::Display) -> ItemOutcome {
	tracing::error!(item = %target, "{}", error);
	ItemOutcome::Failed {
		target: target.to_string(),
		error: error.to_string(),
	}
}
