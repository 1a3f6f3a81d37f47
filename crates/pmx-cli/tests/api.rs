use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use pmx::serve;
use pmx_core::{probe, Lifecycle, ProcessDefinition, StateStore};
use serde_json::Value;

static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

fn temp_dir(name: &str) -> PathBuf {
	let n = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
	let dir = std::env::temp_dir().join(format!("pmx-api-{}-{}-{}", std::process::id(), n, name));
	let _ = std::fs::remove_dir_all(&dir);
	dir
}

struct TestServer {
	addr: SocketAddr,
	lifecycle: Lifecycle,
	dir: PathBuf,
	handle: tokio::task::JoinHandle<std::io::Result<()>>,
}

impl TestServer {
	async fn start(name: &str) -> Self {
		let dir = temp_dir(name);
		let lifecycle = Lifecycle::new(StateStore::open(&dir).unwrap());
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		let handle = tokio::spawn(serve::serve(listener, lifecycle.clone(), None, std::future::pending()));
		Self { addr, lifecycle, dir, handle }
	}

	async fn get(&self, path: &str) -> (u16, String) {
		self.request("GET", path).await
	}

	async fn request(&self, method: &str, path: &str) -> (u16, String) {
		let addr = self.addr;
		let request = format!(
			"{} {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\nContent-Length: 0\r\n\r\n",
			method, path, addr
		);
		tokio::task::spawn_blocking(move || {
			let mut stream = TcpStream::connect(addr).unwrap();
			stream.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
			stream.write_all(request.as_bytes()).unwrap();
			let mut raw = String::new();
			stream.read_to_string(&mut raw).unwrap();
			parse_response(&raw)
		})
		.await
		.unwrap()
	}

	async fn json(&self, path: &str) -> (u16, Value) {
		let (status, body) = self.get(path).await;
		(status, serde_json::from_str(&body).unwrap_or_else(|e| panic!("bad json {:?}: {}", body, e)))
	}

	fn shutdown(self) {
		self.handle.abort();
		let _ = std::fs::remove_dir_all(&self.dir);
	}
}

fn parse_response(raw: &str) -> (u16, String) {
	let (head, body) = raw.split_once("\r\n\r\n").unwrap_or((raw, ""));
	let status = head
		.split_whitespace()
		.nth(1)
		.and_then(|s| s.parse().ok())
		.unwrap_or(0);
	(status, body.to_string())
}

fn sleeper(name: &str) -> ProcessDefinition {
	ProcessDefinition::new(name, "sleep").with_args(["100"])
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn root_serves_banner() {
	let server = TestServer::start("banner").await;
	let (status, body) = server.get("/").await;
	assert_eq!(status, 200);
	assert_eq!(body, serve::api::BANNER);
	server.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn status_lists_registry_sorted() {
	let server = TestServer::start("status").await;

	let (status, body) = server.json("/status").await;
	assert_eq!(status, 200);
	assert_eq!(body, serde_json::json!([]));

	server.lifecycle.registry().put(&sleeper("zeta")).unwrap();
	server.lifecycle.registry().put(&sleeper("alpha")).unwrap();

	let (status, body) = server.json("/status").await;
	assert_eq!(status, 200);
	let names: Vec<&str> = body.as_array().unwrap().iter().map(|e| e["Name"].as_str().unwrap()).collect();
	assert_eq!(names, vec!["alpha", "zeta"]);
	assert_eq!(body[0]["Status"], "offline");
	assert!(body[0].get("Stats").is_none());

	server.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn status_by_name() {
	let server = TestServer::start("status-name").await;
	server.lifecycle.registry().put(&sleeper("web")).unwrap();

	let (status, body) = server.json("/status?name=web").await;
	assert_eq!(status, 200);
	assert_eq!(body["Name"], "web");
	assert_eq!(body["Status"], "offline");

	let (status, body) = server.json("/status?name=ghost").await;
	assert_eq!(status, 200);
	assert_eq!(body, serde_json::json!({}));

	server.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn start_and_stop_round_trip() {
	let server = TestServer::start("start-stop").await;
	server.lifecycle.registry().put(&sleeper("web")).unwrap();

	let (status, body) = server.json("/start?name=web").await;
	assert_eq!(status, 200);
	assert_eq!(body["Message"], "Process started.");
	let pid = body["Pid"].as_u64().unwrap().to_string();
	assert!(probe::is_alive(&pid));

	let (status, body) = server.json("/status?name=web").await;
	assert_eq!(status, 200);
	assert_eq!(body["Status"], "online");
	if let Some(stats) = body.get("Stats") {
		assert_eq!(stats["Pid"], pid.as_str());
	}

	let (status, body) = server.request("POST", "/stop?name=web").await;
	assert_eq!(status, 200);
	let body: Value = serde_json::from_str(&body).unwrap();
	assert_eq!(body["Message"], "Process stopped.");
	assert!(server.lifecycle.tables().running().unwrap().is_empty());

	server.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn missing_name_is_bad_request() {
	let server = TestServer::start("missing").await;
	for path in ["/start", "/stop", "/start?name="] {
		let (status, body) = server.json(path).await;
		assert_eq!(status, 400, "{}", path);
		assert_eq!(body["Error"], "Process name is required.");
	}
	server.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unknown_name_is_not_found() {
	let server = TestServer::start("unknown").await;
	for path in ["/start?name=ghost", "/stop?name=ghost"] {
		let (status, body) = server.json(path).await;
		assert_eq!(status, 404, "{}", path);
		assert_eq!(body["Error"], "Unknown process name.");
	}
	server.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn launch_failure_is_server_error() {
	let server = TestServer::start("launch-fail").await;
	server
		.lifecycle
		.registry()
		.put(&ProcessDefinition::new("broken", "/nonexistent/pmx-binary"))
		.unwrap();

	let (status, body) = server.json("/start?name=broken").await;
	assert_eq!(status, 500);
	assert!(body["Error"].as_str().unwrap().starts_with("Unable to start process"));

	server.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn corrupt_state_is_server_error() {
	let server = TestServer::start("corrupt").await;
	std::fs::write(server.lifecycle.store().path(pmx_core::Document::Definitions), "not json").unwrap();

	let (status, body) = server.json("/status").await;
	assert_eq!(status, 500);
	assert!(body["Error"].as_str().is_some());

	server.shutdown();
}
