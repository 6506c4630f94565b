//! Demo JSON:API server over the blog declarations in `schema/`.
//!
//! `cargo run -p demo-server` creates the tables and serves them.
//! `cargo run -p demo-server -- rollback` drops them again.

use jsonapi_crud::{
    common_routes_with_ready, ensure_database_exists, load_from_dir, migrate, resolve, resource_routes, rollback,
    AppState, Settings,
};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("jsonapi_crud=info,demo_server=info")),
        )
        .init();

    ensure_database_exists(&settings.database_url).await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&settings.database_url)
        .await?;

    let config = load_from_dir(&settings.schema_dir).await?;
    let model = resolve(&config)?;

    if std::env::args().nth(1).as_deref() == Some("rollback") {
        rollback(&pool, &model).await?;
        return Ok(());
    }
    migrate(&pool, &model).await?;

    let state = AppState::from_settings(pool, model, &settings);
    let app = common_routes_with_ready(state.clone()).merge(resource_routes(state));
    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("demo server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
