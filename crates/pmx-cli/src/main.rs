use std::io::IsTerminal;

use owo_colors::OwoColorize;
use pmx::commands::{self, ItemOutcome};
use pmx::config::{self, GlobalConfig};
use pmx::{output, serve};
use pmx_core::{tail, Lifecycle, Monitor, StateStore};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

fn main() {
	let args: Vec<String> = std::env::args().skip(1).collect();

	if args.is_empty() {
		print_usage();
		return;
	}

	match args[0].as_str() {
		"help" | "--help" | "-h" => print_usage(),
		"version" | "--version" | "-V" => println!("pmx {}", env!("CARGO_PKG_VERSION")),
		"start" | "stop" | "remove" | "rm" | "ls" | "logs" | "monitor" | "serve" => {
			init_tracing();
			let config = config::load_global_config();
			let Some(lifecycle) = open_lifecycle(&config) else {
				return;
			};
			let rest = &args[1..];
			match args[0].as_str() {
				"start" => cmd_start(&lifecycle, rest),
				"stop" => cmd_stop(&lifecycle, rest),
				"remove" | "rm" => cmd_remove(&lifecycle, rest),
				"ls" => cmd_ls(&lifecycle),
				"logs" => cmd_logs(&lifecycle, &config, rest),
				"monitor" => cmd_monitor(&lifecycle, &config),
				_ => cmd_serve(&lifecycle, &config, rest),
			}
		}
		other => {
			eprintln!("unknown command: {}", other);
			eprintln!();
			print_usage();
		}
	}
}

fn init_tracing() {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.with_writer(std::io::stderr)
		.init();
}

fn print_usage() {
	eprintln!("{} {}: single-host process manager", "pmx".bold(), env!("CARGO_PKG_VERSION"));
	eprintln!();
	eprintln!("usage: {} <command> [arguments]", "pmx".bold());
	eprintln!();

	eprintln!("{}", "processes".cyan().bold());
	eprintln!("  {} <name|file.json>...   Start registered processes or register from a JSON file", "start".bold());
	eprintln!("  {} <name|file.json>...    Kill running processes by name or JSON file", "stop".bold());
	eprintln!("  {} <name>...            Stop if running, then drop from the registry", "remove".bold());
	eprintln!("  {}                          List registered processes with live stats", "ls".bold());
	eprintln!();

	eprintln!("{}", "logs".cyan().bold());
	eprintln!("  {} <name> [lines=N] [type=out|err]", "logs".bold());
	eprintln!("                              Print the last N lines (default 5), then follow");
	eprintln!();

	eprintln!("{}", "system".cyan().bold());
	eprintln!("  {}                     Auto-restart loop, runs in the foreground", "monitor".bold());
	eprintln!("  {} [port=N] [monitor=true]", "serve".bold());
	eprintln!("                              HTTP control API (default port 8081)");
	eprintln!("  {}                     Print version", "version".bold());
	eprintln!();

	eprintln!("{}", "examples".cyan().bold());
	eprintln!("  pmx start my-api");
	eprintln!("  pmx start ./config/services.json");
	eprintln!("  pmx logs my-api lines=50 type=err");
	eprintln!();
	eprintln!("State lives in $PMX_HOME (or work_dir in {}).", pmx::paths::config_path().display());
	eprintln!("Run 'pmx monitor' under a service manager to keep auto-restart active.");
}

fn open_lifecycle(config: &GlobalConfig) -> Option<Lifecycle> {
	let work_dir = config.work_dir();
	match StateStore::open(&work_dir) {
		Ok(store) => Some(Lifecycle::new(store)),
		Err(e) => {
			tracing::error!("cannot use working directory {}: {}", work_dir.display(), e);
			None
		}
	}
}

fn runtime() -> Option<tokio::runtime::Runtime> {
	match tokio::runtime::Runtime::new() {
		Ok(rt) => Some(rt),
		Err(e) => {
			tracing::error!("failed to start async runtime: {}", e);
			None
		}
	}
}

/// Flips to `true` on the first Ctrl+C. Must be called inside a runtime.
fn ctrl_c_signal() -> watch::Receiver<bool> {
	let (tx, rx) = watch::channel(false);
	tokio::spawn(async move {
		match tokio::signal::ctrl_c().await {
			Ok(()) => {
				let _ = tx.send(true);
			}
			Err(e) => {
				tracing::error!("failed to listen for ctrl-c: {}", e);
				// keep the sender alive so receivers do not read it as cancellation
				std::future::pending::<()>().await;
			}
		}
	});
	rx
}

fn report(outcomes: &[ItemOutcome]) {
	for outcome in outcomes {
		match outcome {
			ItemOutcome::NotRunning { name } => tracing::info!(name = %name, "not running"),
			ItemOutcome::Removed { name } => tracing::info!(name = %name, "removed"),
			_ => {}
		}
	}
	let failures = outcomes.iter().filter(|o| o.is_failure()).count();
	if failures > 0 {
		tracing::warn!("{} of {} item(s) failed", failures, outcomes.len());
	}
}

fn cmd_start(lifecycle: &Lifecycle, args: &[String]) {
	if args.is_empty() {
		tracing::error!("usage: pmx start <name|file.json>...");
		return;
	}
	report(&commands::start_targets(lifecycle, args));
	cmd_ls(lifecycle);
}

fn cmd_stop(lifecycle: &Lifecycle, args: &[String]) {
	if args.is_empty() {
		tracing::error!("usage: pmx stop <name|file.json>...");
		return;
	}
	report(&commands::stop_targets(lifecycle, args));
	cmd_ls(lifecycle);
}

fn cmd_remove(lifecycle: &Lifecycle, args: &[String]) {
	if args.is_empty() {
		tracing::error!("usage: pmx remove <name>...");
		return;
	}
	report(&commands::remove_targets(lifecycle, args));
	cmd_ls(lifecycle);
}

fn cmd_ls(lifecycle: &Lifecycle) {
	match lifecycle.status(None) {
		Ok(entries) => {
			let color = std::io::stdout().is_terminal();
			print!("{}", output::render_table(&entries, color));
		}
		Err(e) => tracing::error!("failed to read process state: {}", e),
	}
}

fn cmd_logs(lifecycle: &Lifecycle, config: &GlobalConfig, args: &[String]) {
	let (positional, options) = config::split_options(args);
	let Some(name) = positional.first() else {
		tracing::error!("usage: pmx logs <name> [lines=N] [type=out|err]");
		return;
	};

	let def = match lifecycle.registry().get(name) {
		Ok(Some(def)) => def.with_default_log_paths(lifecycle.store().work_dir()),
		Ok(None) => {
			tracing::error!("process '{}' not found in registry", name);
			return;
		}
		Err(e) => {
			tracing::error!("failed to read registry: {}", e);
			return;
		}
	};

	let lines = match options.get("lines").map(|raw| raw.parse::<usize>()) {
		Some(Ok(n)) => n,
		Some(Err(_)) => {
			tracing::warn!("invalid line count, using {}", config.logs.lines);
			config.logs.lines
		}
		None => config.logs.lines,
	};
	let path = match options.get("type").map(String::as_str) {
		Some("err") => def.stderr,
		_ => def.stdout,
	};
	let Some(path) = path else {
		tracing::error!("no log files configured for process '{}'", name);
		return;
	};

	let Some(rt) = runtime() else { return };
	rt.block_on(async {
		tracing::info!("tailing logs for {} ({})", name, path.display());
		let cancel = ctrl_c_signal();
		let mut stdout = tokio::io::stdout();
		if let Err(e) = tail::tail(&path, lines, &mut stdout, cancel).await {
			tracing::error!("{}", e);
		}
	});
}

fn cmd_monitor(lifecycle: &Lifecycle, config: &GlobalConfig) {
	let Some(rt) = runtime() else { return };
	let monitor = Monitor::new(lifecycle.clone(), config.monitor_config());
	tracing::info!("press ctrl-c to stop");
	rt.block_on(async {
		let cancel = ctrl_c_signal();
		monitor.run(cancel).await;
	});
}

fn cmd_serve(lifecycle: &Lifecycle, config: &GlobalConfig, args: &[String]) {
	let (_, options) = config::split_options(args);
	let mut serve_config = config.serve.clone();
	config::apply_serve_options(&mut serve_config, &options);

	let Some(rt) = runtime() else {
		std::process::exit(1);
	};
	let result = rt.block_on(serve::run(lifecycle.clone(), &serve_config, config.monitor_config()));
	if let Err(e) = result {
		tracing::error!("server failed: {}", e);
		std::process::exit(1);
	}
}
