use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::LeagueError;
use crate::models::{ApiResponse, FixtureWeek, LeagueState, Team};
use crate::services::LeagueService;

const MAX_SCORE: u32 = 20;

pub async fn serve(port: u16, service: Arc<LeagueService>) -> anyhow::Result<()> {
    let app = create_router(service);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    tracing::info!("League API server listening on port {}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

fn create_router(service: Arc<LeagueService>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/league", get(get_league_handler))
        .route("/fixtures", get(get_fixtures_handler))
        .route("/teams", get(get_teams_handler))
        .route("/generate-fixtures", post(generate_fixtures_handler))
        .route("/league/play-week", post(play_week_handler))
        .route("/league/play-all", post(play_all_handler))
        .route("/league/reset", post(reset_handler))
        .route("/league/edit-match", post(edit_match_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(service)
}

/// Error half of every handler: status code plus the failure envelope.
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<LeagueError> for ApiError {
    fn from(err: LeagueError) -> Self {
        let status = match &err {
            LeagueError::InsufficientTeams { .. } | LeagueError::InvalidRoster(_) => StatusCode::BAD_REQUEST,
            LeagueError::MatchNotFound { .. } => StatusCode::NOT_FOUND,
            LeagueError::MatchNotEditable { .. } => StatusCode::CONFLICT,
            LeagueError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            LeagueError::Simulation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::<()>::error(self.message))).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

async fn health_check() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("League API is running"))
}

// GET /league - Current league state
async fn get_league_handler(State(service): State<Arc<LeagueService>>) -> ApiResult<LeagueState> {
    Ok(Json(ApiResponse::success(service.state().await?)))
}

// GET /fixtures - Every week with its matches
async fn get_fixtures_handler(State(service): State<Arc<LeagueService>>) -> ApiResult<Vec<FixtureWeek>> {
    Ok(Json(ApiResponse::success(service.fixtures().await?)))
}

async fn get_teams_handler(State(service): State<Arc<LeagueService>>) -> ApiResult<Vec<Team>> {
    Ok(Json(ApiResponse::success(service.teams().await?)))
}

// POST /generate-fixtures - Fresh schedule, results cleared
async fn generate_fixtures_handler(State(service): State<Arc<LeagueService>>) -> ApiResult<LeagueState> {
    Ok(Json(ApiResponse::success(service.generate_fixtures().await?)))
}

async fn play_week_handler(State(service): State<Arc<LeagueService>>) -> ApiResult<LeagueState> {
    Ok(Json(ApiResponse::success(service.play_next_week().await?)))
}

async fn play_all_handler(State(service): State<Arc<LeagueService>>) -> ApiResult<LeagueState> {
    Ok(Json(ApiResponse::success(service.play_all_remaining().await?)))
}

async fn reset_handler(State(service): State<Arc<LeagueService>>) -> ApiResult<LeagueState> {
    Ok(Json(ApiResponse::success(service.reset().await?)))
}

// POST /league/edit-match - Overwrite a completed result
#[derive(Debug, Deserialize)]
struct EditMatchRequest {
    week: usize,
    match_index: usize,
    home_score: u32,
    away_score: u32,
}

impl EditMatchRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.week < 1 {
            return Err(ApiError::bad_request("week must be at least 1"));
        }
        if self.home_score > MAX_SCORE || self.away_score > MAX_SCORE {
            return Err(ApiError::bad_request(format!(
                "scores must be between 0 and {}",
                MAX_SCORE
            )));
        }
        Ok(())
    }
}

async fn edit_match_handler(
    State(service): State<Arc<LeagueService>>,
    Json(request): Json<EditMatchRequest>,
) -> ApiResult<LeagueState> {
    request.validate()?;
    let state = service
        .edit_match(request.week, request.match_index, request.home_score, request.away_score)
        .await?;
    Ok(Json(ApiResponse::success(state)))
}
