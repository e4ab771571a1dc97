mod access;
mod config;
mod db;
mod panel;
mod routes;
mod services;
mod state;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = config::ServerConfig::from_env().expect("invalid configuration");

    let pool = db::init_pool(&config.database_url, config.db_max_connections)
        .await
        .expect("database init failed");
    let state = state::AppState::new(pool);

    // Spawn background persistence task.
    let _persistence =
        services::persistence::spawn_persistence_task(state.clone(), config.flush_interval, config.workspace_idle_ttl);

    let app = routes::app(state);
    let port = config.port;
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "synchrodesk listening");
    axum::serve(listener, app).await.expect("server failed");
}
