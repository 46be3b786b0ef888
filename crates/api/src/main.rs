//! API server entry point.

use api::config::Config;
use domain::{InMemoryGroupRepository, InMemoryMemberDirectory, Member};
use group_store::{PostgresGroupRepository, PostgresMemberDirectory};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Builds the router over PostgreSQL, running migrations first.
async fn postgres_app(
    config: &Config,
    database_url: &str,
    members: Vec<Member>,
    metrics_handle: PrometheusHandle,
) -> axum::Router {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(database_url)
        .await
        .expect("failed to connect to database");

    let repository = PostgresGroupRepository::new(pool.clone());
    repository
        .run_migrations()
        .await
        .expect("failed to run migrations");

    let directory = PostgresMemberDirectory::new(pool);
    for member in &members {
        directory
            .upsert(member)
            .await
            .expect("failed to seed member directory");
    }

    tracing::info!(seeded = members.len(), "using PostgreSQL storage");
    api::create_app(api::create_state(repository, directory), metrics_handle)
}

/// Builds the router over the in-memory adapters.
fn in_memory_app(members: Vec<Member>, metrics_handle: PrometheusHandle) -> axum::Router {
    tracing::warn!(
        seeded = members.len(),
        "DATABASE_URL not set, using in-memory storage"
    );
    let directory = InMemoryMemberDirectory::with_members(members);
    api::create_app(
        api::create_state(InMemoryGroupRepository::new(), directory),
        metrics_handle,
    )
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Load seed members
    let members = match config.members_file {
        Some(ref path) => api::seed::load_members(path)
            .await
            .expect("failed to load members file"),
        None => Vec::new(),
    };

    // 4. Build the application over the configured storage
    let app = match config.database_url {
        Some(ref url) => postgres_app(&config, url, members, metrics_handle).await,
        None => in_memory_app(members, metrics_handle),
    };

    // 5. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}
