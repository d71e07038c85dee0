use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer};
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use skillswap_auth::services::{InMemoryUserStore, PgUserStore, UserStore};
use skillswap_auth::{configure, AppState};
use skillswap_config::{AuthConfig, LoggingConfig, ServerConfig, StoreBackend};
use skillswap_observability::{init_tracing, RequestLogger, RequestLoggerConfig, TracingConfig};

const SERVICE_NAME: &str = "auth-service";

fn tracing_config(logging: &LoggingConfig) -> TracingConfig {
    let config = TracingConfig::for_service(SERVICE_NAME).with_level(logging.level.as_str());
    let config = if logging.json { config.json() } else { config.pretty() };
    if logging.log_spans {
        config.with_spans()
    } else {
        config
    }
}

async fn build_store(server: &ServerConfig) -> anyhow::Result<Arc<dyn UserStore>> {
    match server.store {
        StoreBackend::Memory => {
            tracing::warn!("using the in-memory user store; accounts are lost on restart");
            Ok(Arc::new(InMemoryUserStore::new()))
        }
        StoreBackend::Postgres => {
            let database_url = server
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres store")?;

            tracing::info!(max_connections = server.max_connections, "connecting to database");
            let pool = PgPoolOptions::new()
                .max_connections(server.max_connections)
                .connect(database_url)
                .await
                .context("failed to connect to database")?;

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("failed to run migrations")?;
            tracing::info!("database ready");

            Ok(Arc::new(PgUserStore::new(pool)))
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = AuthConfig::from_env().context("invalid configuration")?;
    init_tracing(tracing_config(&config.logging));

    let store = build_store(&config.server).await?;
    let state = AppState::new(&config.jwt, config.bcrypt_cost, store);

    let logger_config =
        RequestLoggerConfig::for_service(SERVICE_NAME).with_slow_threshold(config.logging.slow_request_ms);
    let bind = (config.server.host.clone(), config.server.port);
    tracing::info!(host = %bind.0, port = bind.1, "starting auth service");

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .wrap(RequestLogger::new(logger_config.clone()))
            .wrap(cors)
            .configure(configure(state.clone()))
    })
    .bind(bind)?
    .run()
    .await?;

    Ok(())
}
