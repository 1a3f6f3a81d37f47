use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use pmx_core::MonitorConfig;
use serde::Deserialize;

use crate::paths;

// ── Global config (~/.config/pmx/config.toml) ───────────────────────────────

#[derive(Debug, Clone, Deserialize, Default)]
pub struct GlobalConfig {
	#[serde(default)]
	pub work_dir: Option<PathBuf>,
	#[serde(default)]
	pub monitor: MonitorSection,
	#[serde(default)]
	pub serve: ServeConfig,
	#[serde(default)]
	pub logs: LogsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorSection {
	#[serde(default = "default_interval_secs")]
	pub interval_secs: u64,
	#[serde(default = "default_max_backoff_secs")]
	pub max_backoff_secs: u64,
}

impl Default for MonitorSection {
	fn default() -> Self {
		Self { interval_secs: default_interval_secs(), max_backoff_secs: default_max_backoff_secs() }
	}
}

fn default_interval_secs() -> u64 { 5 }
fn default_max_backoff_secs() -> u64 { 60 }

#[derive(Debug, Clone, Deserialize)]
pub struct ServeConfig {
	#[serde(default = "default_bind")]
	pub bind: String,
	#[serde(default = "default_port")]
	pub port: u16,
	#[serde(default)]
	pub monitor: bool,
}

impl Default for ServeConfig {
	fn default() -> Self {
		Self { bind: default_bind(), port: default_port(), monitor: false }
	}
}

fn default_bind() -> String { "0.0.0.0".into() }
fn default_port() -> u16 { 8081 }

#[derive(Debug, Clone, Deserialize)]
pub struct LogsConfig {
	#[serde(default = "default_lines")]
	pub lines: usize,
}

impl Default for LogsConfig {
	fn default() -> Self {
		Self { lines: default_lines() }
	}
}

fn default_lines() -> usize { 5 }

impl GlobalConfig {
	pub fn work_dir(&self) -> PathBuf {
		paths::resolve_work_dir(self.work_dir.as_ref())
	}

	pub fn monitor_config(&self) -> MonitorConfig {
		let interval = Duration::from_secs(self.monitor.interval_secs.max(1));
		MonitorConfig {
			interval,
			max_backoff: Duration::from_secs(self.monitor.max_backoff_secs).max(interval),
		}
	}
}

pub fn parse_global_config(content: &str) -> Result<GlobalConfig, toml::de::Error> {
	toml::from_str(content)
}

pub fn load_global_config() -> GlobalConfig {
	let path = paths::config_path();
	if path.exists() {
		match std::fs::read_to_string(&path) {
			Ok(content) => match parse_global_config(&content) {
				Ok(config) => return config,
				Err(e) => tracing::warn!("failed to parse {}: {}", path.display(), e),
			},
			Err(e) => tracing::warn!("failed to read {}: {}", path.display(), e),
		}
	}
	GlobalConfig::default()
}

// ── key=value command arguments ─────────────────────────────────────────────

/// Splits command arguments into positional targets and `key=value` options.
/// A later option with the same key wins.
pub fn split_options(args: &[String]) -> (Vec<String>, BTreeMap<String, String>) {
	let mut positional = Vec::new();
	let mut options = BTreeMap::new();
	for arg in args {
		match arg.split_once('=') {
			Some((key, value)) if !key.is_empty() && !key.contains('/') => {
				options.insert(key.to_string(), value.trim().to_string());
			}
			_ => positional.push(arg.clone()),
		}
	}
	(positional, options)
}

/// Applies `port=` and `monitor=` overrides to the serve section. Invalid
/// values are logged and the configured value kept.
pub fn apply_serve_options(serve: &mut ServeConfig, options: &BTreeMap<String, String>) {
	if let Some(raw) = options.get("port") {
		match raw.parse::<u16>() {
			Ok(port) => serve.port = port,
			Err(_) => tracing::warn!("invalid port provided: {}, using {}", raw, serve.port),
		}
	}
	if let Some(raw) = options.get("monitor") {
		match raw.parse::<bool>() {
			Ok(monitor) => serve.monitor = monitor,
			Err(_) => tracing::warn!("invalid monitor flag: {}, using {}", raw, serve.monitor),
		}
	}
}
