//! HTTP dashboard: server-rendered page, form actions and a small JSON API.

use axum::extract::{DefaultBodyLimit, Multipart, Path as AxumPath, Query, State};
use axum::response::{Html, IntoResponse, Redirect};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use migscope_core::views;
use migscope_core::DatasetKey;
use migscope_loader::{FileInput, LocalFiles, Session};

use crate::html::{render_page, PageModel};

pub struct Dashboard {
    bind_addr: String,
    session: Session,
    max_upload: usize,
}

impl Dashboard {
    pub fn new(bind_addr: String, session: Session, max_upload: usize) -> Self {
        Self {
            bind_addr,
            session,
            max_upload,
        }
    }

    pub fn router(&self) -> Router {
        router(self.session.clone(), self.max_upload)
    }

    pub async fn run(self) -> Result<(), anyhow::Error> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(&self.bind_addr).await?;
        tracing::info!(
            addr = %self.bind_addr,
            max_upload = self.max_upload,
            "HTTP dashboard listening"
        );
        axum::serve(listener, app).await?;
        Ok(())
    }
}

pub fn router(session: Session, max_upload: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/load", post(load_prefix))
        .route("/upload", post(upload_files))
        .route("/self-test", post(self_test))
        .route("/dataset/:key", post(select_dataset))
        .route("/api/state", get(api_state))
        .route("/api/logs", get(api_logs))
        .route("/api/health", get(api_health))
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(TraceLayer::new_for_http())
        .with_state(session)
}

#[derive(Debug, Default, Deserialize)]
struct IndexQuery {
    prefix: Option<String>,
    dataset: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoadForm {
    #[serde(default)]
    prefix: String,
}

async fn index(State(session): State<Session>, Query(q): Query<IndexQuery>) -> Html<String> {
    if let Some(prefix) = q.prefix.as_deref().filter(|p| !p.trim().is_empty()) {
        if let Err(e) = session.load_prefix(prefix).await {
            tracing::debug!(error = %e, "autoload from query rejected");
        }
    }
    if let Some(dataset) = q.dataset.as_deref() {
        session.select_dataset(dataset).await;
    }
    Html(render(&session).await)
}

async fn render(session: &Session) -> String {
    let notice = session.notice().await;
    let prefix = session.last_prefix().await;
    let log_text = session.log().render();
    let model = {
        let store = session.read().await;
        PageModel::build(&store, notice, prefix, log_text, session.self_test_url())
    };
    render_page(&model)
}

async fn load_prefix(State(session): State<Session>, Form(form): Form<LoadForm>) -> Redirect {
    if let Err(e) = session.load_prefix(&form.prefix).await {
        tracing::debug!(error = %e, "prefix load rejected");
    }
    Redirect::to("/")
}

async fn upload_files(State(session): State<Session>, mut multipart: Multipart) -> Redirect {
    let mut files = LocalFiles::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                session.log().error("Upload failed", e.to_string());
                return Redirect::to("/");
            }
        };

        let slot = field.name().unwrap_or_default().to_string();
        let Some(file_name) = field.file_name().map(str::to_string).filter(|n| !n.is_empty())
        else {
            // browsers send an unnamed empty part for every unused file input
            continue;
        };
        let data = match field.bytes().await {
            Ok(data) => data,
            Err(e) => {
                session
                    .log()
                    .error(format!("Could not read upload {file_name}"), e.to_string());
                return Redirect::to("/");
            }
        };

        let input = FileInput::Upload {
            name: file_name,
            data,
        };
        if slot == "summary" {
            files.summary = Some(input);
        } else if let Ok(key) = slot.parse::<DatasetKey>() {
            files.set_dataset(key, input);
        } else {
            session
                .log()
                .warn(format!("Ignoring upload field '{slot}'"));
        }
    }

    if let Err(e) = session.load_files(&files).await {
        tracing::debug!(error = %e, "file load rejected");
    }
    Redirect::to("/")
}

async fn self_test(State(session): State<Session>) -> Redirect {
    if let Err(e) = session.run_self_test().await {
        tracing::debug!(error = %e, "self-test failed");
    }
    Redirect::to("/")
}

async fn select_dataset(State(session): State<Session>, AxumPath(key): AxumPath<String>) -> Redirect {
    session.select_dataset(&key).await;
    Redirect::to("/")
}

async fn api_state(State(session): State<Session>) -> Json<serde_json::Value> {
    let notice = session.notice().await;
    let store = session.read().await;
    let counts: serde_json::Map<String, serde_json::Value> = views::metrics(&store)
        .into_iter()
        .map(|m| {
            (
                m.key.as_str().to_string(),
                serde_json::json!({"total": m.total, "exported": m.exported}),
            )
        })
        .collect();

    Json(serde_json::json!({
        "summary": store.summary(),
        "counts": counts,
        "active": store.active(),
        "columns": views::infer_columns(store.active_records()),
        "source": store.source_label(),
        "loaded_at": store.loaded_at(),
        "notice": notice,
    }))
}

async fn api_logs(State(session): State<Session>) -> impl IntoResponse {
    (
        [("content-type", "text/plain; charset=utf-8")],
        session.log().render(),
    )
}

async fn api_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"ok": true, "service": "migscope"}))
}
