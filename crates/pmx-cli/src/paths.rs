use std::path::PathBuf;

pub const APP_NAME: &str = "pmx";
pub const HOME_ENV: &str = "PMX_HOME";
pub const SYSTEM_WORK_DIR: &str = "/var/lib/pmx";

pub fn config_dir() -> PathBuf {
	if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
		PathBuf::from(dir).join(APP_NAME)
	} else if let Some(home) = home_dir() {
		home.join(".config").join(APP_NAME)
	} else {
		PathBuf::from("/tmp").join(APP_NAME).join("config")
	}
}

pub fn config_path() -> PathBuf {
	config_dir().join("config.toml")
}

/// Per-user state directory, used when neither the environment nor the
/// config file names a working directory and we are not root.
pub fn user_state_dir() -> PathBuf {
	if let Ok(dir) = std::env::var("XDG_STATE_HOME") {
		PathBuf::from(dir).join(APP_NAME)
	} else if let Some(home) = home_dir() {
		home.join(".local").join("state").join(APP_NAME)
	} else {
		PathBuf::from("/tmp").join(APP_NAME)
	}
}

/// `PMX_HOME`, then the configured directory, then the system or per-user
/// default.
pub fn resolve_work_dir(configured: Option<&PathBuf>) -> PathBuf {
	if let Ok(dir) = std::env::var(HOME_ENV) {
		if !dir.is_empty() {
			return PathBuf::from(dir);
		}
	}
	if let Some(dir) = configured {
		return expand_tilde(dir);
	}
	if nix::unistd::geteuid().is_root() {
		PathBuf::from(SYSTEM_WORK_DIR)
	} else {
		user_state_dir()
	}
}

fn expand_tilde(path: &PathBuf) -> PathBuf {
	if let Ok(rest) = path.strip_prefix("~") {
		if let Some(home) = home_dir() {
			return home.join(rest);
		}
	}
	path.clone()
}

fn home_dir() -> Option<PathBuf> {
	std::env::var("HOME").ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn tilde_expands_to_home() {
		let Some(home) = home_dir() else { return };
		assert_eq!(expand_tilde(&PathBuf::from("~/pmx")), home.join("pmx"));
		assert_eq!(expand_tilde(&PathBuf::from("/srv/pmx")), PathBuf::from("/srv/pmx"));
	}
}
