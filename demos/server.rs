//! Demo server: env config, registry bootstrap, and the full request
//! pipeline over a pair of sample route groups (system admin + agency
//! scoped).

use agency_core::{
    base_layers, common_routes_with_ready, ensure_database_exists, ensure_registry_tables,
    protect_agency, protect_system, success_created, success_many, success_one, AppError,
    AppState, AuthUser, NewAgency, RateLimitState, Role, RoleRequirement, ServerConfig,
};
use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("agency_core=info".parse()?))
        .init();

    // Missing or weak JWT_SECRET refuses to start here.
    let config = ServerConfig::from_env()?;
    ensure_database_exists(&config.database_url).await?;

    let state = AppState::new(config.clone())?;
    ensure_registry_tables(&state.pools.main_pool()).await?;

    let admin = protect_system(
        Router::new()
            .route("/agencies", get(list_agencies).post(create_agency))
            .with_state(state.clone()),
        state.clone(),
        RoleRequirement::at_least([Role::Admin]),
    );

    let agency = protect_agency(
        Router::new()
            .route("/leads", get(list_leads))
            .route("/leads/echo", post(echo_lead))
            .with_state(state.clone()),
        state.clone(),
        RoleRequirement::at_least([Role::Employee]),
    );

    let api = Router::new()
        .merge(common_routes_with_ready(state.clone()))
        .nest("/api/v1/admin", admin)
        .nest("/api/v1", agency);

    let rate = RateLimitState::new(&state.config);
    let app = base_layers(api, &state.config, rate);

    let listener = TcpListener::bind(&state.config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // Drain every pool before exit, bounded by the configured timeout.
    state.pools.shutdown(state.config.shutdown_timeout).await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };
    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn list_agencies(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let agencies = state.registry.list().await?;
    Ok(success_many(agencies))
}

async fn create_agency(
    State(state): State<AppState>,
    Json(body): Json<NewAgency>,
) -> Result<impl IntoResponse, AppError> {
    let record = state.registry.create(&body, &state.pools).await?;
    Ok(success_created(record))
}

/// Agency-scoped sample: runs against the database the session token is
/// bound to.
async fn list_leads(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let db = claims
        .agency_database
        .as_deref()
        .ok_or(AppError::NoAgencyContext)?;
    let pool = state.pools.agency_pool(db)?;
    let rows: Vec<(i64, String)> =
        sqlx::query_as("SELECT id, title FROM leads ORDER BY id LIMIT 100")
            .fetch_all(&pool)
            .await?;
    let leads: Vec<serde_json::Value> = rows
        .into_iter()
        .map(|(id, title)| serde_json::json!({ "id": id, "title": title }))
        .collect();
    Ok(success_many(leads))
}

async fn echo_lead(
    AuthUser(claims): AuthUser,
    Json(body): Json<serde_json::Value>,
) -> impl IntoResponse {
    success_one(serde_json::json!({
        "receivedBy": claims.email,
        "agencyDatabase": claims.agency_database,
        "lead": body
    }))
}
