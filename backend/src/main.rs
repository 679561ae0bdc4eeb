//! Backend entry-point: loads settings, migrates the database, wires the
//! services, and serves the REST API until shutdown.

mod server;

use std::sync::Arc;

use actix_web::web;
use color_eyre::eyre::{WrapErr, eyre};
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use server::{
    DatabaseProbe, Runtime, RuntimeInputs, ServerConfig, VoucherSettings, build_runtime,
    create_server,
};
use voucher_backend::domain::IdempotencyConfig;
use voucher_backend::inbound::http::health::HealthState;
use voucher_backend::inbound::http::session_config::{BuildMode, key_fingerprint, session_settings};
use voucher_backend::outbound::persistence::{DbPool, PoolConfig, run_pending_migrations};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = VoucherSettings::load_from_iter(std::env::args_os())
        .map_err(|err| eyre!("failed to load settings: {err}"))?;

    let session = session_settings(&settings.session_toggles(), BuildMode::from_debug_assertions())
        .wrap_err("invalid session configuration")?;
    info!(
        fingerprint = %key_fingerprint(&session.key),
        "session signing key loaded"
    );

    let database_url = settings.database_url()?;
    run_pending_migrations(database_url).await?;

    let mut pool_config = PoolConfig::new(database_url);
    if let Some(max_size) = settings.db_pool_max_size {
        pool_config = pool_config.with_max_size(max_size);
    }
    let pool = DbPool::new(pool_config)
        .await
        .wrap_err("failed to create database pool")?;

    let Runtime {
        http_state,
        maintenance,
    } = build_runtime(
        RuntimeInputs {
            pool: pool.clone(),
            qr: settings.qr_config()?,
            idempotency: IdempotencyConfig::from_env(),
            maintenance_interval: settings.maintenance_interval(),
        },
        settings.redis_url(),
    )
    .await?;

    let health_state = web::Data::new(HealthState::new().with_probe(Arc::new(DatabaseProbe(pool))));
    let bind_addr = settings.bind_addr()?;
    let server = create_server(
        health_state,
        http_state,
        ServerConfig::new(
            session.key,
            session.cookie_secure,
            session.same_site,
            bind_addr,
        ),
    )?;
    info!(%bind_addr, "voucher backend listening");

    let outcome = server.await;
    maintenance.abort();
    outcome.wrap_err("server terminated with an error")
}
