pub mod api;

use std::future::Future;

use pmx_core::{Lifecycle, Monitor, MonitorConfig};
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::config::ServeConfig;

pub async fn bind(config: &ServeConfig) -> std::io::Result<TcpListener> {
	let addr = format!("{}:{}", config.bind, config.port);
	let listener = TcpListener::bind(&addr).await?;
	tracing::info!("control server listening on http://{}", addr);
	Ok(listener)
}

/// Serves the control API until `shutdown` resolves. With a monitor config
/// the auto-restart loop runs alongside and is cancelled on the same signal.
pub async fn serve<S>(
	listener: TcpListener,
	lifecycle: Lifecycle,
	monitor: Option<MonitorConfig>,
	shutdown: S,
) -> std::io::Result<()>
where
	S: Future<Output = ()> + Send + 'static,
{
	let (cancel_tx, cancel_rx) = watch::channel(false);

	let monitor_handle = monitor.map(|config| {
		let monitor = Monitor::new(lifecycle.clone(), config);
		tokio::spawn(monitor.run(cancel_rx))
	});

	let result = axum::serve(listener, api::router(lifecycle))
		.with_graceful_shutdown(async move {
			shutdown.await;
			tracing::info!("shutting down");
		})
		.await;

	let _ = cancel_tx.send(true);
	if let Some(handle) = monitor_handle {
		if let Err(e) = handle.await {
			tracing::warn!("monitor task ended abnormally: {}", e);
		}
	}
	result
}

pub async fn run(lifecycle: Lifecycle, config: &ServeConfig, monitor: MonitorConfig) -> std::io::Result<()> {
	let listener = bind(config).await?;
	let monitor = config.monitor.then_some(monitor);
	serve(listener, lifecycle, monitor, async {
		if let Err(e) = tokio::signal::ctrl_c().await {
			tracing::error!("failed to listen for ctrl-c: {}", e);
			std::future::pending::<()>().await;
		}
	})
	.await
}
