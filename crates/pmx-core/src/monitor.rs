use std::time::Duration;

use tokio::sync::watch;

use crate::error::StoreError;
use crate::lifecycle::Lifecycle;
use crate::probe;
use crate::registry::is_stopped;

#[derive(Debug, Clone)]
pub struct MonitorConfig {
	pub interval: Duration,
	pub max_backoff: Duration,
}

impl Default for MonitorConfig {
	fn default() -> Self {
		Self {
			interval: Duration::from_secs(5),
			max_backoff: Duration::from_secs(60),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartOutcome {
	Restarted { name: String, pid: u32 },
	Failed { name: String, error: String },
}

/// Polls the on-disk state and relaunches auto-restart processes that are
/// down and were not stopped by an operator.
#[derive(Debug, Clone)]
pub struct Monitor {
	lifecycle: Lifecycle,
	config: MonitorConfig,
}

impl Monitor {
	pub fn new(lifecycle: Lifecycle, config: MonitorConfig) -> Self {
		Self { lifecycle, config }
	}

	/// One polling pass. All three documents are re-read; nothing carries
	/// over from the previous pass.
	pub fn tick(&self) -> Result<Vec<RestartOutcome>, StoreError> {
		let defs = self.lifecycle.registry().all()?;
		let running = self.lifecycle.tables().running()?;
		let stopped = self.lifecycle.tables().stopped()?;

		let mut outcomes = Vec::new();
		for (name, def) in &defs {
			if !def.auto_restart || is_stopped(&stopped, name) {
				continue;
			}

			let down = match running.get(name) {
				None => true,
				Some(pid) => !probe::is_alive(pid),
			};
			if !down {
				continue;
			}

			tracing::warn!(name = %name, "process is down, restarting");
			match self.lifecycle.start(def) {
				Ok(pid) => {
					tracing::info!(name = %name, pid, "restarted");
					outcomes.push(RestartOutcome::Restarted { name: name.clone(), pid });
				}
				Err(e) => {
					tracing::error!(name = %name, "failed to restart: {}", e);
					outcomes.push(RestartOutcome::Failed {
						name: name.clone(),
						error: e.to_string(),
					});
				}
			}
		}
		Ok(outcomes)
	}

	/// Runs passes on a fixed interval until `cancel` flips or its sender is
	/// dropped. Read failures back off exponentially and never end the loop.
	pub async fn run(self, mut cancel: watch::Receiver<bool>) {
		tracing::info!(interval = ?self.config.interval, "monitor started");
		let mut failures: u32 = 0;

		loop {
			if *cancel.borrow() {
				break;
			}

			let monitor = self.clone();
			let delay = match tokio::task::spawn_blocking(move || monitor.tick()).await {
				Ok(Ok(_)) => {
					failures = 0;
					self.config.interval
				}
				Ok(Err(e)) => {
					failures = failures.saturating_add(1);
					let delay = self.backoff(failures);
					tracing::warn!(retry_in = ?delay, "failed to read state: {}", e);
					delay
				}
				Err(e) => {
					failures = failures.saturating_add(1);
					let delay = self.backoff(failures);
					tracing::error!(retry_in = ?delay, "monitor pass aborted: {}", e);
					delay
				}
			};

			tokio::select! {
				_ = tokio::time::sleep(delay) => {}
				_ = cancel.changed() => break,
			}
		}

		tracing::info!("monitor stopped");
	}

	pub fn backoff(&self, failures: u32) -> Duration {
		let factor = 2u32.saturating_pow(failures.min(16));
		self.config
			.interval
			.saturating_mul(factor)
			.min(self.config.max_backoff)
			.max(self.config.interval)
	}
}
