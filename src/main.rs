use road_watch::{
    AppState,
    accounts::AccountService,
    config::{AppConfig, Env},
    create_router,
    forecast::{ForecastState, OpenMeteoClient},
    repository::{InMemoryRepository, PostgresRepository, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::{error::Error, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Initializes configuration, logging, the store, the forecast client and the
/// HTTP server, in that order. Any startup failure ends the process with an
/// error instead of serving a half-configured API.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load()?;

    // 2. Logging Filter Setup
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "road_watch=debug,tower_http=info".into());

    // 3. Pretty logs locally, JSON for log aggregation in production.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Store Initialization
    let repo = match &config.db_url {
        Some(db_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(db_url)
                .await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("Connected to PostgreSQL, migrations applied");
            Arc::new(PostgresRepository::new(pool)) as RepositoryState
        }
        None => {
            tracing::warn!(
                "DATABASE_URL not set, using the in-process store; data is lost on restart"
            );
            Arc::new(InMemoryRepository::new()) as RepositoryState
        }
    };

    if let Some(seed) = &config.bootstrap_admin {
        AccountService::new(repo.as_ref()).bootstrap_admin(seed).await?;
    }

    // 5. Forecast collaborator
    let forecast = Arc::new(OpenMeteoClient::new(&config.forecast_url)) as ForecastState;

    // 6. Unified State Assembly
    let port = config.port;
    let app_state = AppState {
        repo,
        forecast,
        config,
    };

    // 7. Router and Server Startup
    let app = create_router(app_state);
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;

    tracing::info!("Listening on 0.0.0.0:{port}");
    tracing::info!(
        "API Documentation (Swagger UI) available at: http://localhost:{port}/swagger-ui"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
