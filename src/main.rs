mod app;
mod auth;
mod config;
mod db;
mod error;
mod patients;
mod state;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "clinicdesk=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = state::AppState::init().await?;
    tracing::info!(environment = ?app_state.config.environment, "configuration loaded");

    db::migrate(&app_state.db).await;

    let addr = app_state.config.bind_addr()?;
    let db = app_state.db.clone();
    let result = app::serve(app::build_app(app_state), addr).await;

    db.close().await;
    tracing::info!("database pool closed");
    result
}
