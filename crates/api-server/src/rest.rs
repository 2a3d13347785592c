//! REST handlers: JSON endpoints and the HTML pages of the UI.

use crate::ui;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use bookrec_core::{AppConfig, Recommendation, RecommenderError};
use bookrec_pipeline::{PipelineOutcome, TrainingPipeline};
use bookrec_recommender::Recommender;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// Maximum accepted title length in a query.
const MAX_TITLE_LEN: usize = 512;

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub recommender: Arc<Recommender>,
    /// Train from raw files already on disk instead of downloading them.
    pub skip_ingestion: bool,
    /// Training holds the write side while it rewrites the artifact files;
    /// reads of those files hold the read side.
    pub artifacts: Arc<RwLock<()>>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: AppConfig, skip_ingestion: bool) -> Self {
        let recommender = Recommender::new(config.recommendation());
        Self {
            config: Arc::new(config),
            recommender: Arc::new(recommender),
            skip_ingestion,
            artifacts: Arc::new(RwLock::new(())),
            start_time: Instant::now(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecommendQuery {
    pub title: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TrainResponse {
    pub status: String,
    pub clean_rows: usize,
    pub titles: usize,
    pub users: usize,
    pub recall_at_k: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(err: &RecommenderError) -> ApiError {
    let (status, code) = match err.root() {
        RecommenderError::TitleNotFound(_) => (StatusCode::NOT_FOUND, "title_not_found"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    };
    (
        status,
        Json(ErrorResponse {
            error: code.to_string(),
            message: err.to_string(),
        }),
    )
}

fn validate_title(title: &str) -> Result<(), &'static str> {
    if title.trim().is_empty() {
        return Err("title must not be empty");
    }
    if title.len() > MAX_TITLE_LEN {
        return Err("title exceeds maximum length");
    }
    Ok(())
}

fn bad_request(msg: &str) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: "invalid_title".to_string(),
            message: msg.to_string(),
        }),
    )
}

/// Run a blocking closure off the async executor.
async fn blocking<T, F>(work: F) -> Result<T, RecommenderError>
where
    F: FnOnce() -> Result<T, RecommenderError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| RecommenderError::Io(std::io::Error::other(e)))?
}

async fn recommend(state: &AppState, title: String) -> Result<Recommendation, RecommenderError> {
    let guard = state.artifacts.clone().read_owned().await;
    let recommender = state.recommender.clone();
    blocking(move || {
        let _guard = guard;
        recommender.recommend_book(&title)
    })
    .await
}

async fn book_names(state: &AppState) -> Result<Vec<String>, RecommenderError> {
    let guard = state.artifacts.clone().read_owned().await;
    let recommender = state.recommender.clone();
    blocking(move || {
        let _guard = guard;
        recommender.book_names()
    })
    .await
}

async fn train(state: &AppState) -> Result<PipelineOutcome, RecommenderError> {
    let config = state.config.as_ref().clone();
    let skip_ingestion = state.skip_ingestion;
    info!(skip_ingestion, "Training requested");
    // Held until the pipeline finishes, even if the request is dropped.
    let guard = state.artifacts.clone().write_owned().await;
    blocking(move || {
        let _guard = guard;
        TrainingPipeline::new(config)
            .skip_ingestion(skip_ingestion)
            .start_training_pipeline()
    })
    .await
}

// ─── JSON API ─────────────────────────────────────────────────────────────

/// GET /api/books — every selectable title.
pub async fn list_books(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    book_names(&state).await.map(Json).map_err(|e| {
        error!(error = %e, "Failed to load book names");
        api_error(&e)
    })
}

/// GET /api/recommendations?title=… — five similar titles with covers.
pub async fn get_recommendations(
    State(state): State<AppState>,
    Query(query): Query<RecommendQuery>,
) -> Result<Json<Recommendation>, ApiError> {
    if let Err(msg) = validate_title(&query.title) {
        warn!(error = msg, "Recommendation request validation failed");
        metrics::counter!("api.validation_errors").increment(1);
        return Err(bad_request(msg));
    }

    match recommend(&state, query.title).await {
        Ok(recommendation) => {
            metrics::counter!("api.recommendations").increment(1);
            Ok(Json(recommendation))
        }
        Err(e) => {
            error!(error = %e, "Recommendation failed");
            metrics::counter!("api.errors").increment(1);
            Err(api_error(&e))
        }
    }
}

/// POST /api/train — run the whole training pipeline.
pub async fn train_model(State(state): State<AppState>) -> Result<Json<TrainResponse>, ApiError> {
    match train(&state).await {
        Ok(outcome) => {
            metrics::counter!("api.trainings").increment(1);
            Ok(Json(TrainResponse {
                status: "Training Completed!".to_string(),
                clean_rows: outcome.clean_rows,
                titles: outcome.titles,
                users: outcome.users,
                recall_at_k: outcome.evaluation.map(|r| r.recall_at_k),
            }))
        }
        Err(e) => {
            error!(error = %e, "Training failed");
            metrics::counter!("api.errors").increment(1);
            Err(api_error(&e))
        }
    }
}

/// GET /health — Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

// ─── HTML UI ──────────────────────────────────────────────────────────────

/// GET / — selection control with train and recommend buttons.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let names = book_names(&state).await;
    Html(ui::render_page(&ui::Page {
        book_names: names.as_deref().unwrap_or_default(),
        selected: None,
        notice: names.as_ref().err().map(|_| ui::NO_MODEL_NOTICE.to_string()),
        recommendation: None,
    }))
}

/// GET /recommend?title=… — the page with five recommendations rendered.
pub async fn show_recommendations(
    State(state): State<AppState>,
    Query(query): Query<RecommendQuery>,
) -> Response {
    let names = match book_names(&state).await {
        Ok(names) => names,
        Err(e) => return page_error(&e),
    };
    match recommend(&state, query.title.clone()).await {
        Ok(recommendation) => {
            metrics::counter!("ui.recommendations").increment(1);
            Html(ui::render_page(&ui::Page {
                book_names: &names,
                selected: Some(&query.title),
                notice: None,
                recommendation: Some(&recommendation),
            }))
            .into_response()
        }
        Err(e) => page_error(&e),
    }
}

/// POST /train — retrain, then show the page again.
pub async fn train_from_page(State(state): State<AppState>) -> Response {
    if let Err(e) = train(&state).await {
        return page_error(&e);
    }
    metrics::counter!("ui.trainings").increment(1);
    trained_page(book_names(&state).await)
}

/// The page shown after a successful training run.
pub(crate) fn trained_page(names: Result<Vec<String>, RecommenderError>) -> Response {
    let names = match names {
        Ok(names) => names,
        Err(e) => return page_error(&e),
    };
    Html(ui::render_page(&ui::Page {
        book_names: &names,
        selected: None,
        notice: Some("Training Completed!".to_string()),
        recommendation: None,
    }))
    .into_response()
}

fn page_error(err: &RecommenderError) -> Response {
    error!(error = %err, "Request failed");
    metrics::counter!("ui.errors").increment(1);
    let (status, _) = api_error(err);
    (status, Html(ui::render_error(err))).into_response()
}
