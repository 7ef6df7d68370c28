use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use coil_planner::SolveError;
use coil_planner::config::{DEFAULT_COILS, Profile, SolverConfig};
use coil_planner::scrap::{Suggestion, suggest_scrap_alternatives};
use coil_planner::solver::Solver;
use coil_planner::types::{CoilSpec, Part, Plan};
use serde::{Deserialize, Serialize};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Deserialize, Serialize)]
struct OptimizeRequest {
    parts: Vec<Part>,
    #[serde(default)]
    coils: Option<Vec<CoilSpec>>,
    #[serde(default)]
    profile: Profile,
    #[serde(default)]
    suggest_scrap: bool,
}

#[derive(Serialize)]
struct OptimizeResponse {
    plan: Plan,
    table_count: usize,
    waste_percent: f64,
    scrap_suggestions: Vec<Suggestion>,
}

fn error_status(err: &SolveError) -> StatusCode {
    if err.is_input_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    }
}

async fn optimize(
    Json(req): Json<OptimizeRequest>,
) -> Result<Json<OptimizeResponse>, (StatusCode, String)> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /optimize"
    );

    let coils = req.coils.unwrap_or_else(|| DEFAULT_COILS.to_vec());
    let parts: Vec<Part> = req
        .parts
        .into_iter()
        .enumerate()
        .map(|(id, p)| Part { id, ..p })
        .collect();
    let config = SolverConfig::with_profile(req.profile);
    let suggest_scrap = req.suggest_scrap;

    // The solver is CPU-bound; keep it off the async workers
    let response = tokio::task::spawn_blocking(move || {
        let plan = Solver::new(parts.clone(), &coils, config.clone()).solve()?;
        let scrap_suggestions = if suggest_scrap {
            suggest_scrap_alternatives(&plan, &parts, &coils, &config)
        } else {
            Vec::new()
        };
        Ok::<_, SolveError>(OptimizeResponse {
            table_count: plan.table_count(),
            waste_percent: plan.waste_percent(),
            plan,
            scrap_suggestions,
        })
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
    .map_err(|e| {
        tracing::warn!(error = %e, "solve failed");
        (error_status(&e), e.to_string())
    })?;

    Ok(Json(response))
}

#[tokio::main]
async fn main() {
    let _sentry = sentry::init((
        std::env::var("SENTRY_DSN").ok(),
        sentry::ClientOptions::default(),
    ));

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("development.log")
        .expect("failed to open development.log");

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");

    let app = Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/optimize", post(optimize))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    eprintln!("Listening on {addr}");
    axum::serve(listener, app).await.unwrap();
}
