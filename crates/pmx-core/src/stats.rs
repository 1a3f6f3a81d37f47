//! Resource usage via `ps`. Presentation only; the lifecycle and monitor
//! never consult it.

use std::process::Command;

use crate::error::ProbeError;
use crate::probe;
use crate::types::ProcessStats;

pub fn stats(pid: &str) -> Result<ProcessStats, ProbeError> {
	let target = probe::parse_pid(pid).ok_or_else(|| ProbeError::NotFound(pid.to_string()))?;
	let output = Command::new("ps")
		.args(["-p", &target.to_string(), "-o", "user=,rss=,pcpu="])
		.output()
		.map_err(ProbeError::Command)?;
	if !output.status.success() {
		return Err(ProbeError::NotFound(pid.to_string()));
	}
	parse_ps_output(&target.to_string(), &String::from_utf8_lossy(&output.stdout))
}

pub fn parse_ps_output(pid: &str, output: &str) -> Result<ProcessStats, ProbeError> {
	let fields: Vec<&str> = output.split_whitespace().collect();
	match fields.as_slice() {
		[] => Err(ProbeError::NotFound(pid.to_string())),
		[user, rss, cpu] => Ok(ProcessStats {
			pid: pid.to_string(),
			user: user.to_string(),
			rss: rss.to_string(),
			cpu: cpu.to_string(),
		}),
		_ => Err(ProbeError::Format {
			pid: pid.to_string(),
			output: output.trim().to_string(),
		}),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_three_columns() {
		let stats = parse_ps_output("42", "  root   1204  0.3\n").unwrap();
		assert_eq!(stats.user, "root");
		assert_eq!(stats.rss, "1204");
		assert_eq!(stats.cpu, "0.3");
		assert_eq!(stats.pid, "42");
	}

	#[test]
	fn rejects_unexpected_field_counts() {
		assert!(matches!(parse_ps_output("1", ""), Err(ProbeError::NotFound(_))));
		assert!(matches!(parse_ps_output("1", "root 12"), Err(ProbeError::Format { .. })));
		assert!(matches!(
			parse_ps_output("1", "root 12 0.0 extra"),
			Err(ProbeError::Format { .. })
		));
	}

	#[test]
	fn malformed_pid_is_not_found() {
		assert!(matches!(stats("-1"), Err(ProbeError::NotFound(_))));
	}
}
