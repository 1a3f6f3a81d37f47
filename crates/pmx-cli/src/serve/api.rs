use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use pmx_core::Lifecycle;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

pub const BANNER: &str = "PMX control server is active. Visit /status for process details.";

#[derive(Clone)]
pub struct AppState {
	pub lifecycle: Lifecycle,
}

pub fn router(lifecycle: Lifecycle) -> Router {
	let state = AppState { lifecycle };

	Router::new()
		.route("/", get(banner))
		.route("/status", get(status))
		.route("/start", get(start_process).post(start_process))
		.route("/stop", get(stop_process).post(stop_process))
		.layer(CorsLayer::permissive())
		.with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct NameQuery {
	name: Option<String>,
}

impl NameQuery {
	fn name(&self) -> Option<&str> {
		self.name.as_deref().filter(|n| !n.is_empty())
	}

	fn required(&self) -> Result<String, ApiError> {
		self.name()
			.map(str::to_string)
			.ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "Process name is required."))
	}
}

#[derive(Serialize)]
struct ActionResponse {
	#[serde(rename = "Message")]
	message: &'static str,
	#[serde(rename = "Pid", skip_serializing_if = "Option::is_none")]
	pid: Option<u32>,
}

#[derive(Serialize)]
struct ErrorResponse {
	#[serde(rename = "Error")]
	error: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	message: String,
}

impl ApiError {
	fn new(status: StatusCode, message: impl Into<String>) -> Self {
		Self { status, message: message.into() }
	}

	fn unknown() -> Self {
		Self::new(StatusCode::NOT_FOUND, "Unknown process name.")
	}

	fn internal(context: &str, error: impl std::fmt::Display) -> Self {
		tracing::error!("{}: {}", context, error);
		Self::new(StatusCode::INTERNAL_SERVER_ERROR, format!("{}: {}", context, error))
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		(self.status, Json(ErrorResponse { error: self.message })).into_response()
	}
}

/// Runs blocking store and process work off the async workers.
async fn blocking<T, F>(context: &'static str, f: F) -> Result<T, ApiError>
where
	F: FnOnce() -> T + Send + 'static,
	T: Send + 'static,
{
	tokio::task::spawn_blocking(f)
		.await
		.map_err(|e| ApiError::internal(context, e))
}

async fn banner() -> &'static str {
	BANNER
}

async fn status(State(state): State<AppState>, Query(query): Query<NameQuery>) -> Result<Response, ApiError> {
	let name = query.name().map(str::to_string);
	let lifecycle = state.lifecycle.clone();
	let filter = name.clone();
	let entries = blocking("Unable to read status", move || lifecycle.status(filter.as_deref()))
		.await?
		.map_err(|e| ApiError::internal("Unable to read status", e))?;

	if name.is_none() {
		return Ok(Json(entries).into_response());
	}
	match entries.into_iter().next() {
		Some(entry) => Ok(Json(entry).into_response()),
		None => Ok(Json(serde_json::json!({})).into_response()),
	}
}

async fn start_process(
	State(state): State<AppState>,
	Query(query): Query<NameQuery>,
) -> Result<Json<ActionResponse>, ApiError> {
	let name = query.required()?;
	let lifecycle = state.lifecycle.clone();

	let pid = blocking("Unable to start process", move || {
		let def = lifecycle
			.registry()
			.get(&name)
			.map_err(|e| ApiError::internal("Unable to start process", e))?
			.ok_or_else(ApiError::unknown)?;
		lifecycle
			.start(&def)
			.map_err(|e| ApiError::internal("Unable to start process", e))
	})
	.await??;

	Ok(Json(ActionResponse { message: "Process started.", pid: Some(pid) }))
}

async fn stop_process(
	State(state): State<AppState>,
	Query(query): Query<NameQuery>,
) -> Result<Json<ActionResponse>, ApiError> {
	let name = query.required()?;
	let lifecycle = state.lifecycle.clone();

	blocking("Unable to stop process", move || {
		if lifecycle
			.registry()
			.get(&name)
			.map_err(|e| ApiError::internal("Unable to stop process", e))?
			.is_none()
		{
			return Err(ApiError::unknown());
		}
		lifecycle
			.stop(&name)
			.map_err(|e| ApiError::internal("Unable to stop process", e))
	})
	.await??;

	Ok(Json(ActionResponse { message: "Process stopped.", pid: None }))
}
