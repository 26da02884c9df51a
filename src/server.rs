use crate::config::ServerConfig;
use crate::data::{SchedulingInput, SchedulingOutput};
use crate::engine::{HighsEngine, SolvingEngine};
use crate::error::{InputError, SchedulingError};
use crate::solver;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing::post};
use log::{error, info, warn};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<dyn SolvingEngine + Send + Sync>,
    pub default_timeout: Duration,
}

impl AppState {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            engine: Arc::new(HighsEngine {
                threads: config.solver_threads,
                log_to_console: config.solver_log,
                ..HighsEngine::default()
            }),
            default_timeout: config.default_timeout,
        }
    }
}

#[derive(Serialize)]
struct SuccessBody {
    success: bool,
    #[serde(flatten)]
    output: SchedulingOutput,
}

#[derive(Serialize)]
struct FailureBody {
    success: bool,
    message: String,
}

fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    let body = FailureBody {
        success: false,
        message: message.into(),
    };
    (status, Json(body)).into_response()
}

/// Rejects requests the model builder must never see.
fn validate(input: &SchedulingInput) -> Result<(), InputError> {
    if input.students.is_empty() {
        return Err(InputError::MissingStudents);
    }
    if input.schedule_info.dates.is_empty() {
        return Err(InputError::MissingDates);
    }
    if input.schedule_info.slots_per_day.is_empty() {
        return Err(InputError::MissingSlots);
    }
    if input.timeout == Some(0) {
        return Err(InputError::InvalidTimeout);
    }
    let mut dates = HashSet::new();
    if let Some(date) = input.schedule_info.dates.iter().find(|d| !dates.insert(*d)) {
        return Err(InputError::DuplicateDate(date.clone()));
    }
    let mut labels = HashSet::new();
    let slots = &input.schedule_info.slots_per_day;
    if let Some(label) = slots.iter().find(|l| !labels.insert(*l)) {
        return Err(InputError::DuplicateSlot(label.clone()));
    }
    Ok(())
}

async fn generate_handler(
    State(state): State<AppState>,
    payload: Result<Json<SchedulingInput>, JsonRejection>,
) -> Response {
    let input = match payload {
        Ok(Json(input)) => input,
        Err(rejection) => {
            let err = InputError::Malformed(rejection.body_text());
            warn!("Rejected request: {}", err);
            return failure(StatusCode::BAD_REQUEST, err.to_string());
        }
    };
    if let Err(err) = validate(&input) {
        warn!("Rejected request: {}", err);
        return failure(StatusCode::BAD_REQUEST, err.to_string());
    }

    let engine = state.engine.clone();
    let default_timeout = state.default_timeout;
    let result = tokio::task::spawn_blocking(move || {
        solver::solve(&input, engine.as_ref(), default_timeout)
    })
    .await;

    match result {
        Ok(Ok(output)) => {
            let body = SuccessBody {
                success: true,
                output,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Ok(Err(SchedulingError::NoSchedule)) => failure(
            StatusCode::BAD_REQUEST,
            "No timetable satisfying every rule was found within the time limit. \
             The constraints may be too tight or the problem too large; relax them and try again.",
        ),
        Ok(Err(err)) => {
            error!("Timetable generation failed: {}", err);
            failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Server error: {}", err),
            )
        }
        Err(join_error) => {
            error!("Solver task aborted: {}", join_error);
            failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Server error: solver task aborted",
            )
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/timetable/generate", post(generate_handler))
        .with_state(state)
}

pub async fn run_server(config: ServerConfig) -> std::io::Result<()> {
    let app = router(AppState::from_config(&config));
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;

    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, app).await
}
