//! A fake AI backend served by axum on an ephemeral port.
//!
//! Transformations are deterministic:
//! - no instruction, no language: echoes the page code
//! - language only: prefixes the page code with `// <language>`
//! - an instruction: appends `// <first line of instruction>` to the code
//!   after the first blank line, or to the page code when there is none
//! - an instruction containing `FAIL`: HTTP 500
//! - the impact-analysis prompt: a fixed narrative with recommendations

#![allow(dead_code)]

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use code_assistant_core::{TransformRequest, TransformResult};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const PAGE_CODE: &str = "let a = 1;\nlet b = 2;";
pub const NARRATIVE: &str =
    "## Impact Analysis\nOne line appended.\n\n## Recommendations\n- Add a unit test\n- Review naming\n\n## Notes\nnone";

pub struct FakeState {
    pages: HashMap<(String, String), String>,
    pub requests: Mutex<Vec<TransformRequest>>,
    pub saved: Mutex<Vec<(String, String, String)>>,
}

impl FakeState {
    fn new() -> Self {
        let mut pages = HashMap::new();
        pages.insert(
            ("ENG".to_string(), "Parser".to_string()),
            PAGE_CODE.to_string(),
        );
        pages.insert(("ENG".to_string(), "Empty".to_string()), String::new());
        Self {
            pages,
            requests: Mutex::new(Vec::new()),
            saved: Mutex::new(Vec::new()),
        }
    }

    fn page(&self, space: &str, title: &str) -> Option<String> {
        self.pages
            .get(&(space.to_string(), title.to_string()))
            .cloned()
    }
}

pub struct FakeBackend {
    pub base_url: String,
    pub state: Arc<FakeState>,
}

impl FakeBackend {
    pub fn requests(&self) -> Vec<TransformRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn saved(&self) -> Vec<(String, String, String)> {
        self.state.saved.lock().unwrap().clone()
    }
}

/// Starts the fake on its own thread and runtime so both sync and async
/// tests can use it.
pub fn spawn_fake_backend() -> FakeBackend {
    let state = Arc::new(FakeState::new());
    let app = Router::new()
        .route("/spaces", get(spaces))
        .route("/pages", get(pages))
        .route("/code-assistant", post(transform))
        .route("/export", post(export))
        .route("/save-to-confluence", post(save))
        .with_state(state.clone());

    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            tx.send(listener.local_addr().unwrap()).unwrap();
            axum::serve(listener, app).await.unwrap();
        });
    });
    let addr = rx.recv().unwrap();
    FakeBackend {
        base_url: format!("http://{}", addr),
        state,
    }
}

async fn spaces() -> Json<Value> {
    Json(json!({
        "spaces": [
            { "key": "ENG", "name": "Engineering" },
            { "key": "OPS", "name": "Operations" }
        ]
    }))
}

#[derive(Deserialize)]
struct PagesQuery {
    space_key: String,
}

async fn pages(Query(q): Query<PagesQuery>) -> Result<Json<Value>, StatusCode> {
    match q.space_key.as_str() {
        "ENG" => Ok(Json(json!({ "pages": ["Parser", "Empty"] }))),
        "OPS" => Ok(Json(json!({ "pages": [] }))),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

async fn transform(
    State(state): State<Arc<FakeState>>,
    Json(req): Json<TransformRequest>,
) -> Result<Json<TransformResult>, (StatusCode, String)> {
    state.requests.lock().unwrap().push(req.clone());
    let page = state
        .page(&req.space_key, &req.page_title)
        .ok_or((StatusCode::NOT_FOUND, "page not found".to_string()))?;

    if req.instruction.contains("FAIL") {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "model overloaded".to_string(),
        ));
    }

    let mut result = TransformResult {
        original_code: page.clone(),
        summary: Some(format!("{} summary", req.page_title)),
        ..Default::default()
    };
    if req.instruction.starts_with("Analyze the impact") {
        result.modified_code = Some(NARRATIVE.to_string());
    } else if !req.instruction.is_empty() {
        let code = req
            .instruction
            .split_once("\n\n")
            .map(|(_, code)| code.to_string())
            .unwrap_or(page);
        let first = req.instruction.lines().next().unwrap_or_default();
        result.modified_code = Some(format!("{}\n// {}", code, first.trim_end_matches(':')));
    } else if !req.target_language.is_empty() {
        result.converted_code = Some(format!("// {}\n{}", req.target_language, page));
    }
    Ok(Json(result))
}

#[derive(Deserialize)]
struct ExportBody {
    content: String,
    format: String,
    filename: String,
}

async fn export(Json(body): Json<ExportBody>) -> Vec<u8> {
    format!("[{}:{}]\n{}", body.format, body.filename, body.content).into_bytes()
}

#[derive(Deserialize)]
struct SaveBody {
    space_key: String,
    page_title: String,
    content: String,
}

async fn save(
    State(state): State<Arc<FakeState>>,
    Json(body): Json<SaveBody>,
) -> Result<Json<Value>, StatusCode> {
    if state.page(&body.space_key, &body.page_title).is_none() {
        return Err(StatusCode::NOT_FOUND);
    }
    state
        .saved
        .lock()
        .unwrap()
        .push((body.space_key, body.page_title, body.content));
    Ok(Json(json!({ "status": "saved" })))
}
