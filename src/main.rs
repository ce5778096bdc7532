use clap::Parser;
use tracing::{error, info, warn};

use crate::{
    auth::{db::AuthDatabase, Auth},
    config::{Config, StartArgs},
    error::WeaverError,
    state::Portal,
};

pub mod auth;
pub mod config;
pub mod course;
pub mod db;
pub mod error;
pub mod resource;
pub mod router;
pub mod state;
pub mod user;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let StartArgs {
        config_path,
        address: host,
        port,
        log_level: level,
    } = StartArgs::parse();

    tracing_subscriber::fmt().with_max_level(level).init();

    if let Err(e) = run(config_path, format!("{host}:{port}")).await {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run(config_path: String, addr: String) -> Result<(), WeaverError> {
    let db_url = std::env::var("DATABASE_URL")
        .map_err(|_| WeaverError::Validation("DATABASE_URL not set".to_string()))?;

    let Config {
        title,
        cookie_domain,
        admin,
        session,
    } = Config::read(&config_path)?;

    let db_pool = db::create_pool(&db_url).await?;
    db::migrate(&db_pool).await?;

    let auth = Auth::new(
        AuthDatabase::new(db_pool.clone()),
        cookie_domain,
        admin,
        session,
    )?;

    if !auth.admin_enabled() {
        warn!("No admin configured, the back-office is disabled");
    }

    let state = Portal::new(db_pool, auth, title);

    info!("Now listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let router = router::router(state);

    axum::serve(listener, router).await?;

    Ok(())
}
