// ABOUTME: Entry point for the blogsmith binary.
// ABOUTME: Initializes tracing, loads configuration from the environment, and starts the HTTP server.

use std::sync::Arc;
use std::time::Duration;

use blogsmith_agent::CrewRunner;
use blogsmith_server::{AppState, ServerConfig, serve, spawn_session_sweeper};

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("blogsmith=debug,tower_http=debug")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let crew = config.load_crew()?;
    tracing::info!(
        model = %config.llm.model,
        notes = %config.tools.notes_path.display(),
        agents = crew.agents.len(),
        tasks = crew.tasks.len(),
        "blogsmith starting up"
    );
    if !config.tools.notes_path.exists() {
        tracing::warn!(
            path = %config.tools.notes_path.display(),
            "notes file not found; read_notes and search_notes will report errors"
        );
    }

    let runner = CrewRunner::from_config(config.llm.clone(), config.tools.clone(), crew)?;
    let state = Arc::new(AppState::new(Arc::new(runner)));
    spawn_session_sweeper(
        Arc::downgrade(&state),
        SESSION_SWEEP_INTERVAL.min(config.session_idle),
        config.session_idle,
    );
    serve(state, config.bind).await
}
