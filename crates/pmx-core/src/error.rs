use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
	#[error("failed to access {}: {}", .path.display(), .source)]
	Io {
		path: PathBuf,
		#[source]
		source: io::Error,
	},
	#[error("failed to lock {}: {}", .path.display(), .source)]
	Lock {
		path: PathBuf,
		#[source]
		source: io::Error,
	},
	#[error("invalid JSON in {}: {}", .path.display(), .source)]
	Decode {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},
	#[error("failed to encode {}: {}", .path.display(), .source)]
	Encode {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},
}

#[derive(Debug, Error)]
pub enum LifecycleError {
	#[error("{name}: failed to open log file {}: {}", .path.display(), .source)]
	LogFile {
		name: String,
		path: PathBuf,
		#[source]
		source: io::Error,
	},
	#[error("{name}: failed to start '{command}': {source}")]
	Launch {
		name: String,
		command: String,
		#[source]
		source: io::Error,
	},
	#[error("failed to kill process {pid}: {source}")]
	Kill {
		pid: String,
		#[source]
		source: nix::errno::Errno,
	},
	#[error("{name}: failed to record pid {pid}, process was killed: {source}")]
	Orphaned {
		name: String,
		pid: u32,
		#[source]
		source: StoreError,
	},
	#[error("{name}: failed to update state: {source}")]
	Persistence {
		name: String,
		#[source]
		source: StoreError,
	},
	#[error(transparent)]
	Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum ProbeError {
	#[error("process {0} not found")]
	NotFound(String),
	#[error("failed to run ps: {0}")]
	Command(#[source] io::Error),
	#[error("unexpected ps output for process {pid}: {output:?}")]
	Format { pid: String, output: String },
}

#[derive(Debug, Error)]
pub enum TailError {
	#[error("unable to open log file {}: {}", .path.display(), .source)]
	Open {
		path: PathBuf,
		#[source]
		source: io::Error,
	},
	#[error("error reading logs from {}: {}", .path.display(), .source)]
	Read {
		path: PathBuf,
		#[source]
		source: io::Error,
	},
	#[error("failed to write log output: {0}")]
	Write(#[source] io::Error),
	#[error("tail failed for {}: {}", .path.display(), .message)]
	Utility { path: PathBuf, message: String },
}

#[derive(Debug, Error)]
pub enum BatchError {
	#[error("failed to read batch file: {0}")]
	Read(#[from] StoreError),
	#[error("batch file {} not found or empty", .0.display())]
	Missing(PathBuf),
	#[error("batch entry {index}: {reason}")]
	Invalid { index: usize, reason: String },
}
