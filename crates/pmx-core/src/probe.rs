//! Signal-zero liveness checks. This is the only "is it alive" input used for
//! control decisions; see [`crate::stats`] for the cosmetic `ps` probe.

use nix::sys::signal::kill;
use nix::unistd::Pid;

/// Parses a recorded pid. Non-positive values are rejected so a corrupt
/// record can never address a process group or every process.
pub fn parse_pid(raw: &str) -> Option<Pid> {
	match raw.trim().parse::<i32>() {
		Ok(n) if n > 0 => Some(Pid::from_raw(n)),
		_ => None,
	}
}

pub fn is_pid_alive(pid: Pid) -> bool {
	kill(pid, None).is_ok()
}

/// True when `raw` names a process that accepts signal zero from us.
pub fn is_alive(raw: &str) -> bool {
	parse_pid(raw).map_or(false, is_pid_alive)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rejects_dangerous_pids() {
		assert_eq!(parse_pid("0"), None);
		assert_eq!(parse_pid("-1"), None);
		assert_eq!(parse_pid("abc"), None);
		assert_eq!(parse_pid(""), None);
		assert_eq!(parse_pid(" 42\n"), Some(Pid::from_raw(42)));
	}

	#[test]
	fn own_process_is_alive() {
		assert!(is_alive(&std::process::id().to_string()));
		assert!(!is_alive("0"));
		assert!(!is_alive("not-a-pid"));
	}
}
