use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Registry document: process name to definition.
pub type Definitions = BTreeMap<String, ProcessDefinition>;

/// Running document: process name to the OS pid recorded at launch.
///
/// Presence is not proof of liveness, the pid may be dead or reused.
pub type RunningTable = BTreeMap<String, String>;

/// Stopped document: names an operator stopped explicitly.
pub type StoppedTable = BTreeMap<String, bool>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessDefinition {
	#[serde(rename = "Name")]
	pub name: String,
	#[serde(rename = "Cmd")]
	pub command: String,
	#[serde(rename = "Args", default, deserialize_with = "null_as_empty")]
	pub args: Vec<String>,
	#[serde(rename = "Stdout", default)]
	pub stdout: Option<PathBuf>,
	#[serde(rename = "Stderr", default)]
	pub stderr: Option<PathBuf>,
	#[serde(rename = "AutoRestart", default)]
	pub auto_restart: bool,
}

impl ProcessDefinition {
	pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			command: command.into(),
			args: Vec::new(),
			stdout: None,
			stderr: None,
			auto_restart: false,
		}
	}

	pub fn with_args<I, S>(mut self, args: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.args = args.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_auto_restart(mut self, auto_restart: bool) -> Self {
		self.auto_restart = auto_restart;
		self
	}

	/// Fills absent or empty log paths with `<work_dir>/<name>.out.log` and
	/// `<work_dir>/<name>.err.log`. Idempotent; explicit paths are kept.
	pub fn with_default_log_paths(&self, work_dir: &Path) -> Self {
		let mut def = self.clone();
		if is_unset(&def.stdout) {
			def.stdout = Some(default_stdout_path(work_dir, &def.name));
		}
		if is_unset(&def.stderr) {
			def.stderr = Some(default_stderr_path(work_dir, &def.name));
		}
		def
	}

	/// Rejects definitions that cannot be launched or would place default
	/// log files outside the working directory.
	pub fn validate(&self) -> Result<(), String> {
		if self.name.trim().is_empty() {
			return Err("missing Name".to_string());
		}
		if self.name.contains('/') || self.name == "." || self.name == ".." {
			return Err(format!("invalid Name '{}'", self.name));
		}
		if self.command.trim().is_empty() {
			return Err(format!("{}: missing Cmd", self.name));
		}
		Ok(())
	}
}

pub fn default_stdout_path(work_dir: &Path, name: &str) -> PathBuf {
	work_dir.join(format!("{}.out.log", name))
}

pub fn default_stderr_path(work_dir: &Path, name: &str) -> PathBuf {
	work_dir.join(format!("{}.err.log", name))
}

fn is_unset(path: &Option<PathBuf>) -> bool {
	path.as_ref().map_or(true, |p| p.as_os_str().is_empty())
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
	Online,
	Offline,
}

impl fmt::Display for ProcessStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ProcessStatus::Online => write!(f, "online"),
			ProcessStatus::Offline => write!(f, "offline"),
		}
	}
}

/// Point-in-time resource usage reported by `ps`. Values are kept as the
/// tool printed them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessStats {
	#[serde(rename = "Pid")]
	pub pid: String,
	#[serde(rename = "User")]
	pub user: String,
	#[serde(rename = "RSS")]
	pub rss: String,
	#[serde(rename = "CPU")]
	pub cpu: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
	#[serde(rename = "Name")]
	pub name: String,
	#[serde(rename = "Status")]
	pub status: ProcessStatus,
	#[serde(rename = "Pid", default, skip_serializing)]
	pub pid: Option<String>,
	#[serde(rename = "Stats", default, skip_serializing_if = "Option::is_none")]
	pub stats: Option<ProcessStats>,
}
