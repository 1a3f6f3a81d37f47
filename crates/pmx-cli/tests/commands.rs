use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

use pmx::commands::{remove_targets, start_targets, stop_targets, ItemOutcome};
use pmx_core::{probe, Lifecycle, ProcessDefinition, StateStore};

static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

fn test_lifecycle(name: &str) -> (Lifecycle, PathBuf) {
	let n = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
	let dir = std::env::temp_dir().join(format!("pmx-cmd-{}-{}-{}", std::process::id(), n, name));
	let _ = std::fs::remove_dir_all(&dir);
	let store = StateStore::open(&dir).unwrap();
	(Lifecycle::new(store), dir)
}

fn args(items: &[&str]) -> Vec<String> {
	items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn batch_skips_invalid_entries_and_starts_the_rest() {
	let (lc, dir) = test_lifecycle("batch");
	let batch = dir.join("services.json");
	std::fs::write(
		&batch,
		r#"[
	{"Name": "", "Cmd": "sleep", "Args": ["100"]},
	{"Name": "web", "Cmd": "sleep", "Args": ["100"], "AutoRestart": true}
]"#,
	)
	.unwrap();

	let outcomes = start_targets(&lc, &args(&[batch.to_str().unwrap()]));
	assert_eq!(outcomes.len(), 2);
	assert!(matches!(&outcomes[0], ItemOutcome::Failed { .. }));
	let pid = match &outcomes[1] {
		ItemOutcome::Started { name, pid } if name == "web" => *pid,
		other => panic!("expected web to start, got {:?}", other),
	};
	assert!(probe::is_alive(&pid.to_string()));
	assert!(lc.registry().get("web").unwrap().unwrap().auto_restart);

	// the same file stops what it started
	let outcomes = stop_targets(&lc, &args(&[batch.to_str().unwrap()]));
	assert!(outcomes.contains(&ItemOutcome::Stopped { name: "web".into() }));

	let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn unreadable_batch_does_not_stop_later_targets() {
	let (lc, dir) = test_lifecycle("batch-missing");
	lc.registry().put(&ProcessDefinition::new("web", "sleep").with_args(["100"])).unwrap();

	let missing = dir.join("nope.json");
	let outcomes = start_targets(&lc, &args(&[missing.to_str().unwrap(), "ghost", "web"]));
	assert_eq!(outcomes.len(), 3);
	assert!(matches!(&outcomes[0], ItemOutcome::Failed { .. }));
	assert_eq!(outcomes[1], ItemOutcome::Unknown { name: "ghost".into() });
	assert!(matches!(&outcomes[2], ItemOutcome::Started { name, .. } if name == "web"));

	lc.stop("web").unwrap();
	let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn stop_reports_not_running() {
	let (lc, dir) = test_lifecycle("stop-idle");
	lc.registry().put(&ProcessDefinition::new("web", "sleep").with_args(["100"])).unwrap();

	let outcomes = stop_targets(&lc, &args(&["web", "web"]));
	assert_eq!(
		outcomes,
		vec![
			ItemOutcome::NotRunning { name: "web".into() },
			ItemOutcome::NotRunning { name: "web".into() },
		]
	);

	let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn remove_reports_each_name() {
	let (lc, dir) = test_lifecycle("remove");
	lc.start(&ProcessDefinition::new("web", "sleep").with_args(["100"])).unwrap();

	let outcomes = remove_targets(&lc, &args(&["web", "ghost"]));
	assert_eq!(outcomes[0], ItemOutcome::Removed { name: "web".into() });
	assert_eq!(outcomes[1], ItemOutcome::Unknown { name: "ghost".into() });
	assert!(lc.registry().all().unwrap().is_empty());

	let _ = std::fs::remove_dir_all(&dir);
}
