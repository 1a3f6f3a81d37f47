use std::path::Path;

use crate::error::BatchError;
use crate::store;
use crate::types::ProcessDefinition;

pub fn is_batch_arg(arg: &str) -> bool {
	arg.ends_with(".json")
}

/// Loads a JSON array of definitions. The outer error covers the file as a
/// whole; each element is decoded and validated on its own so one bad entry
/// does not sink the rest.
pub fn load_batch(path: &Path) -> Result<Vec<Result<ProcessDefinition, BatchError>>, BatchError> {
	let entries: Vec<serde_json::Value> =
		store::read_json_locked(path)?.ok_or_else(|| BatchError::Missing(path.to_path_buf()))?;

	Ok(entries
		.into_iter()
		.enumerate()
		.map(|(index, value)| -> Result<ProcessDefinition, BatchError> {
			let def: ProcessDefinition = serde_json::from_value(value)
				.map_err(|e| BatchError::Invalid { index, reason: e.to_string() })?;
			def.validate()
				.map_err(|reason| BatchError::Invalid { index, reason })?;
			Ok(def)
		})
		.collect())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn write_temp(name: &str, content: &str) -> std::path::PathBuf {
		let path = std::env::temp_dir().join(format!("pmx-batch-{}-{}.json", std::process::id(), name));
		std::fs::write(&path, content).unwrap();
		path
	}

	#[test]
	fn splits_valid_and_invalid_entries() {
		let path = write_temp(
			"mixed",
			r#"[
				{"Name": "web", "Cmd": "sleep", "Args": ["100"], "AutoRestart": true},
				{"Name": "", "Cmd": "sleep"},
				{"Cmd": "sleep"},
				42
			]"#,
		);
		let entries = load_batch(&path).unwrap();
		assert_eq!(entries.len(), 4);
		assert_eq!(entries[0].as_ref().unwrap().name, "web");
		assert!(matches!(entries[1], Err(BatchError::Invalid { index: 1, .. })));
		assert!(matches!(entries[2], Err(BatchError::Invalid { index: 2, .. })));
		assert!(matches!(entries[3], Err(BatchError::Invalid { index: 3, .. })));
		let _ = std::fs::remove_file(&path);
	}

	#[test]
	fn missing_file_is_an_error() {
		let path = std::env::temp_dir().join("pmx-batch-does-not-exist.json");
		assert!(matches!(load_batch(&path), Err(BatchError::Missing(_))));
	}

	#[test]
	fn non_array_is_an_error() {
		let path = write_temp("object", r#"{"Name": "web"}"#);
		assert!(matches!(load_batch(&path), Err(BatchError::Read(_))));
		let _ = std::fs::remove_file(&path);
	}

	#[test]
	fn recognises_batch_arguments() {
		assert!(is_batch_arg("./services.json"));
		assert!(!is_batch_arg("web"));
	}
}
