use std::sync::Arc;

use fleetdash::auth::ensure_seed_admin;
use fleetdash::config::AppConfig;
use fleetdash::db::{init_pool, run_migrations};
use fleetdash::error::AppError;
use fleetdash::routes::create_router;
use fleetdash::services::{trips::CsvTripSource, users::SqliteUserStore};
use fleetdash::state::AppState;
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = AppConfig::from_env()?;
    let db = init_pool(&config.database_url).await?;

    if let Err(err) = run_migrations(&db).await {
        error!("migration failed: {err:?}");
        return Err(err);
    }

    let users = SqliteUserStore::new(db.clone());
    ensure_seed_admin(&users, config.seed_admin.as_ref()).await?;

    let trips = CsvTripSource::new(config.trips_file.clone());
    if !tokio::fs::try_exists(trips.path()).await? {
        error!(
            "trip file {} not found; dashboards will fail until it exists",
            trips.path().display()
        );
    }

    let state = AppState::new(config.clone(), Arc::new(users), Arc::new(trips));
    let app = create_router(state);

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,fleetdash=debug,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
