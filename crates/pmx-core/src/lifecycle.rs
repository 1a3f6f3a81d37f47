use std::fs::{File, OpenOptions};
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Child, Command, Stdio};

use nix::errno::Errno;
use nix::sys::signal::{kill, killpg, Signal};

use crate::error::{LifecycleError, StoreError};
use crate::probe;
use crate::registry::{Registry, StatusTables};
use crate::stats;
use crate::store::StateStore;
use crate::types::{ProcessDefinition, ProcessStatus, StatusEntry};

/// Start, stop and remove operations over the registry and status tables.
///
/// Compound operations are sequences of single-document calls. A concurrent
/// actor may see the intermediate state, e.g. a process already launched but
/// not yet recorded.
#[derive(Debug, Clone)]
pub struct Lifecycle {
	store: StateStore,
	registry: Registry,
	tables: StatusTables,
}

impl Lifecycle {
	pub fn new(store: StateStore) -> Self {
		Self {
			registry: Registry::new(store.clone()),
			tables: StatusTables::new(store.clone()),
			store,
		}
	}

	pub fn store(&self) -> &StateStore {
		&self.store
	}

	pub fn registry(&self) -> &Registry {
		&self.registry
	}

	pub fn tables(&self) -> &StatusTables {
		&self.tables
	}

	/// Launches `def`, replacing any instance recorded as running, and
	/// registers it. Returns the new pid.
	pub fn start(&self, def: &ProcessDefinition) -> Result<u32, LifecycleError> {
		let resolved = def.with_default_log_paths(self.store.work_dir());

		let running = self.tables.running()?;
		if let Some(old_pid) = running.get(&def.name) {
			tracing::info!(name = %def.name, pid = %old_pid, "replacing running instance");
			stop_by_id(old_pid)?;
		}

		let pid = launch(&resolved)?;

		if let Err(source) = self.record_started(def, pid) {
			if let Err(e) = stop_by_id(&pid.to_string()) {
				tracing::error!(name = %def.name, pid, "failed to kill unrecorded process: {}", e);
			}
			return Err(LifecycleError::Orphaned {
				name: def.name.clone(),
				pid,
				source,
			});
		}

		if let Err(e) = self.tables.clear_stopped(&def.name) {
			tracing::warn!(name = %def.name, "failed to clear stopped flag: {}", e);
		}

		tracing::info!(name = %def.name, pid, "started");
		Ok(pid)
	}

	fn record_started(&self, def: &ProcessDefinition, pid: u32) -> Result<(), StoreError> {
		self.registry.put(def)?;
		self.tables.record_running(&def.name, pid)
	}

	/// Kills the recorded process and marks the name as explicitly stopped.
	/// Returns `false` without touching state when nothing is recorded.
	pub fn stop(&self, name: &str) -> Result<bool, LifecycleError> {
		let running = self.tables.running()?;
		let Some(pid) = running.get(name) else {
			tracing::debug!(name, "not running, nothing to stop");
			return Ok(false);
		};

		stop_by_id(pid)?;

		let persistence = |source| LifecycleError::Persistence {
			name: name.to_string(),
			source,
		};
		self.tables.mark_stopped(name).map_err(persistence)?;
		self.tables.clear_running(name).map_err(persistence)?;

		tracing::info!(name, pid = %pid, "stopped");
		Ok(true)
	}

	/// Stops the process if running, then drops its definition. Unknown
	/// names are a no-op returning `false`.
	pub fn remove(&self, name: &str) -> Result<bool, LifecycleError> {
		if self.registry.get(name)?.is_none() {
			return Ok(false);
		}

		self.stop(name)?;

		self.registry
			.delete(name)
			.map_err(|source| LifecycleError::Persistence {
				name: name.to_string(),
				source,
			})?;
		if let Err(e) = self.tables.clear_stopped(name) {
			tracing::warn!(name, "failed to clear stopped flag: {}", e);
		}

		tracing::info!(name, "removed");
		Ok(true)
	}

	/// One entry per registered definition (or only `name`), sorted by name.
	/// Stats are probed only for names recorded as running.
	pub fn status(&self, name: Option<&str>) -> Result<Vec<StatusEntry>, StoreError> {
		let running = self.tables.running()?;
		let defs = self.registry.all()?;

		Ok(defs
			.values()
			.filter(|def| name.map_or(true, |n| n == def.name))
			.map(|def| match running.get(&def.name) {
				Some(pid) => StatusEntry {
					name: def.name.clone(),
					status: ProcessStatus::Online,
					pid: Some(pid.clone()),
					stats: stats::stats(pid).ok(),
				},
				None => StatusEntry {
					name: def.name.clone(),
					status: ProcessStatus::Offline,
					pid: None,
					stats: None,
				},
			})
			.collect())
	}
}

/// Kills `pid` if it is alive. A malformed pid or a process that is already
/// gone counts as success; failure to deliver the signal does not.
pub fn stop_by_id(pid: &str) -> Result<(), LifecycleError> {
	let Some(target) = probe::parse_pid(pid) else {
		tracing::warn!(pid, "ignoring malformed pid");
		return Ok(());
	};
	if !probe::is_pid_alive(target) {
		tracing::debug!(pid, "process already gone");
		return Ok(());
	}

	// children lead their own group, so take the whole tree down first
	let result = match killpg(target, Signal::SIGKILL) {
		Err(Errno::ESRCH) => kill(target, Signal::SIGKILL),
		other => other,
	};
	match result {
		Ok(()) | Err(Errno::ESRCH) => Ok(()),
		Err(source) => Err(LifecycleError::Kill {
			pid: pid.to_string(),
			source,
		}),
	}
}

fn launch(def: &ProcessDefinition) -> Result<u32, LifecycleError> {
	let stdout = log_stdio(def, def.stdout.as_deref())?;
	let stderr = log_stdio(def, def.stderr.as_deref())?;

	let child = Command::new(&def.command)
		.args(&def.args)
		.stdin(Stdio::null())
		.stdout(stdout)
		.stderr(stderr)
		.process_group(0)
		.spawn()
		.map_err(|source| LifecycleError::Launch {
			name: def.name.clone(),
			command: def.command.clone(),
			source,
		})?;

	let pid = child.id();
	reap(child);
	Ok(pid)
}

fn log_stdio(def: &ProcessDefinition, path: Option<&Path>) -> Result<Stdio, LifecycleError> {
	match path {
		Some(path) => open_log(path)
			.map(Stdio::from)
			.map_err(|source| LifecycleError::LogFile {
				name: def.name.clone(),
				path: path.to_path_buf(),
				source,
			}),
		None => Ok(Stdio::null()),
	}
}

fn open_log(path: &Path) -> std::io::Result<File> {
	OpenOptions::new().create(true).append(true).open(path)
}

// A dead child that nobody waits on stays a zombie and still answers signal
// zero, which would hide the crash from the monitor.
fn reap(mut child: Child) {
	let pid = child.id();
	let spawned = std::thread::Builder::new()
		.name(format!("pmx-reap-{}", pid))
		.spawn(move || {
			let status = child.wait();
			tracing::debug!(pid, ?status, "child exited");
		});
	if let Err(e) = spawned {
		tracing::warn!(pid, "failed to spawn reaper thread: {}", e);
	}
}
