use std::io::SeekFrom;
use std::path::Path;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::watch;

use crate::error::TailError;

pub const FOLLOW_POLL: Duration = Duration::from_millis(500);

/// Last `lines` lines of `path`, as printed by `tail -n`.
pub async fn last_lines(path: &Path, lines: usize) -> Result<String, TailError> {
	let output = Command::new("tail")
		.arg("-n")
		.arg(lines.to_string())
		.arg(path)
		.output()
		.await
		.map_err(|e| TailError::Utility {
			path: path.to_path_buf(),
			message: e.to_string(),
		})?;
	if !output.status.success() {
		return Err(TailError::Utility {
			path: path.to_path_buf(),
			message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
		});
	}
	Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Streams bytes appended to `path` after the call into `out`, polling every
/// [`FOLLOW_POLL`] while idle. Restarts from the top if the file shrinks.
/// Returns when `cancel` flips or its sender is dropped.
pub async fn follow<W>(path: &Path, out: &mut W, mut cancel: watch::Receiver<bool>) -> Result<(), TailError>
where
	W: AsyncWrite + Unpin,
{
	let read_err = |source| TailError::Read {
		path: path.to_path_buf(),
		source,
	};

	let mut file = tokio::fs::File::open(path).await.map_err(|source| TailError::Open {
		path: path.to_path_buf(),
		source,
	})?;
	let mut pos = file.seek(SeekFrom::End(0)).await.map_err(read_err)?;
	let mut buf = [0u8; 4096];

	loop {
		if *cancel.borrow() {
			return Ok(());
		}

		let n = file.read(&mut buf).await.map_err(read_err)?;
		if n > 0 {
			out.write_all(&buf[..n]).await.map_err(TailError::Write)?;
			out.flush().await.map_err(TailError::Write)?;
			pos += n as u64;
			continue;
		}

		let len = file.metadata().await.map_err(read_err)?.len();
		if len < pos {
			pos = file.seek(SeekFrom::Start(0)).await.map_err(read_err)?;
			continue;
		}

		tokio::select! {
			_ = tokio::time::sleep(FOLLOW_POLL) => {}
			_ = cancel.changed() => return Ok(()),
		}
	}
}

/// `last_lines` followed by `follow`. A failing `tail` is logged and the
/// follow still runs.
pub async fn tail<W>(
	path: &Path,
	lines: usize,
	out: &mut W,
	cancel: watch::Receiver<bool>,
) -> Result<(), TailError>
where
	W: AsyncWrite + Unpin,
{
	match last_lines(path, lines).await {
		Ok(head) => {
			out.write_all(head.as_bytes()).await.map_err(TailError::Write)?;
			out.flush().await.map_err(TailError::Write)?;
		}
		Err(e) => tracing::warn!("{}", e),
	}
	follow(path, out, cancel).await
}
