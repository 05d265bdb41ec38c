use std::sync::Arc;

use axum::{
  body::Bytes,
  extract::State,
  http::StatusCode,
  response::{IntoResponse, Response},
  routing::get,
  Json, Router,
};
use contract_compiler::{CompileRequest, CompileResponse, Compiler, ErrorKind};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::error;

#[derive(Clone)]
pub struct AppState {
  pub compiler: Arc<Compiler>,
}

pub fn build_router(compiler: Arc<Compiler>) -> Router {
  Router::new()
    .route("/compile", get(compile_default).post(compile))
    .route("/health", get(health_check))
    .layer(TraceLayer::new_for_http())
    .with_state(AppState { compiler })
}

async fn compile(State(state): State<AppState>, body: Bytes) -> Response {
  let request: CompileRequest = match serde_json::from_slice(&body) {
    Ok(request) => request,
    Err(err) => {
      return (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": format!("Invalid request body: {err}") })),
      )
        .into_response();
    }
  };
  run(state, move |compiler| compiler.handle(request)).await
}

async fn compile_default(State(state): State<AppState>) -> Response {
  run(state, |compiler| compiler.handle_default()).await
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
  Json(json!({
    "status": "ok",
    "backend": state.compiler.backend_name(),
    "version": env!("CARGO_PKG_VERSION"),
  }))
}

/// The pipeline does blocking file and process I/O, so it runs off the async workers.
async fn run<F>(state: AppState, job: F) -> Response
where
  F: FnOnce(&Compiler) -> CompileResponse + Send + 'static,
{
  let compiler = Arc::clone(&state.compiler);
  match tokio::task::spawn_blocking(move || job(&compiler)).await {
    Ok(response) => respond(response),
    Err(err) => {
      error!(error = %err, "compile task aborted");
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Compilation task aborted" })),
      )
        .into_response()
    }
  }
}

fn respond(response: CompileResponse) -> Response {
  let status = response
    .error_kind()
    .map(status_for)
    .unwrap_or(StatusCode::OK);
  (status, Json(response)).into_response()
}

fn status_for(kind: ErrorKind) -> StatusCode {
  match kind {
    ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
    ErrorKind::NotFound => StatusCode::NOT_FOUND,
    ErrorKind::CompilerErrors => StatusCode::UNPROCESSABLE_ENTITY,
    ErrorKind::BackendUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::body::Body;
  use axum::http::{header, Request};
  use contract_compiler::{
    canonicalize_path, CompilationOutput, CompilerBackend, CompilerConfig, ResolcBackend,
    SourceUnit,
  };
  use serde_json::Value;
  use std::path::PathBuf;
  use tower::ServiceExt;

  struct FakeBackend;

  impl CompilerBackend for FakeBackend {
    fn name(&self) -> &str {
      "fake"
    }

    fn compile(&self, sources: &SourceUnit) -> contract_compiler::Result<CompilationOutput> {
      let contracts: serde_json::Map<String, Value> = sources
        .keys()
        .map(|file| {
          let contract = file.trim_end_matches(".sol").to_string();
          let descriptor = if contract.starts_with('I') {
            json!({ "abi": [] })
          } else {
            json!({ "abi": [], "evm": { "bytecode": { "object": "6001600101" } } })
          };
          let mut by_name = serde_json::Map::new();
          by_name.insert(contract, descriptor);
          (file.clone(), Value::Object(by_name))
        })
        .collect();
      Ok(serde_json::from_value(json!({ "contracts": contracts })).expect("output"))
    }
  }

  struct Harness {
    _temp: tempfile::TempDir,
    root: PathBuf,
  }

  impl Harness {
    fn new() -> Self {
      let temp = tempfile::tempdir().expect("tempdir");
      let root = canonicalize_path(temp.path());
      std::fs::create_dir_all(root.join("contracts")).expect("dirs");
      std::fs::write(
        root.join("contracts/Storage.sol"),
        "import \"./IStorage.sol\";\ncontract Storage {}",
      )
      .expect("write");
      std::fs::write(root.join("contracts/IStorage.sol"), "interface IStorage {}").expect("write");
      Self { _temp: temp, root }
    }

    fn config(&self) -> CompilerConfig {
      CompilerConfig {
        root: self.root.clone(),
        ..CompilerConfig::default()
      }
    }

    fn router(&self) -> Router {
      build_router(Arc::new(Compiler::with_backend(
        self.config(),
        Arc::new(FakeBackend),
      )))
    }
  }

  async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
      .await
      .expect("body");
    (status, serde_json::from_slice(&bytes).expect("json body"))
  }

  fn post(body: Value) -> Request<Body> {
    Request::builder()
      .method("POST")
      .uri("/compile")
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .expect("request")
  }

  #[tokio::test]
  async fn post_inline_sources_returns_contracts() {
    let harness = Harness::new();
    let (status, body) = send(
      harness.router(),
      post(json!({ "sources": { "Adder.sol": "contract Adder {}" } })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["contracts"]["Adder"]["bytecode"], "6001600101");
    assert!(body.get("warnings").is_none());
    assert!(body.get("error").is_none());
  }

  #[tokio::test]
  async fn post_file_path_reports_missing_bytecode_as_warning() {
    let harness = Harness::new();
    let (status, body) = send(
      harness.router(),
      post(json!({ "solidityFilePath": "contracts/Storage.sol" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["contracts"]["IStorage"]["bytecode"], "");
    assert_eq!(
      body["warnings"],
      json!(["No bytecode found for contract: IStorage"])
    );
  }

  #[tokio::test]
  async fn get_compile_uses_the_default_entry() {
    let harness = Harness::new();
    let request = Request::builder()
      .uri("/compile")
      .body(Body::empty())
      .expect("request");
    let (status, body) = send(harness.router(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["contracts"].get("Storage").is_some());
  }

  #[tokio::test]
  async fn error_statuses_follow_the_error_kind() {
    let harness = Harness::new();

    let (status, body) = send(harness.router(), post(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(
      harness.router(),
      post(json!({ "solidityFilePath": "contracts/Missing.sol" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"]
      .as_str()
      .expect("error")
      .contains("Missing.sol"));
    assert!(body.get("contracts").is_none());
  }

  #[tokio::test]
  async fn malformed_json_is_a_bad_request() {
    let harness = Harness::new();
    let request = Request::builder()
      .method("POST")
      .uri("/compile")
      .body(Body::from("{not json"))
      .expect("request");
    let (status, body) = send(harness.router(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
      .as_str()
      .expect("error")
      .starts_with("Invalid request body"));
  }

  #[tokio::test]
  async fn missing_backend_binary_is_service_unavailable() {
    let harness = Harness::new();
    let compiler = Compiler::with_backend(
      harness.config(),
      Arc::new(ResolcBackend::new("/definitely/not/a/real/resolc")),
    );
    let (status, body) = send(
      build_router(Arc::new(compiler)),
      post(json!({ "sources": { "A.sol": "contract A {}" } })),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"]
      .as_str()
      .expect("error")
      .starts_with("Compiler backend unavailable"));
  }

  #[tokio::test]
  async fn health_reports_the_backend() {
    let harness = Harness::new();
    let request = Request::builder()
      .uri("/health")
      .body(Body::empty())
      .expect("request");
    let (status, body) = send(harness.router(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["backend"], "fake");
  }
}
