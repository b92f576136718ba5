#![deny(clippy::all, nonstandard_style, rust_2018_idioms)]

#[macro_use]
extern crate eyre;

#[macro_use]
extern crate tracing;

use std::{net::Ipv4Addr, sync::Arc};

use eyre::{Context as _, Report, Result};
use time::UtcOffset;
use tokio::{net::TcpListener, runtime::Builder as RuntimeBuilder, signal};

use self::{
    config::Config,
    context::Context,
    database::Database,
    util::{Args, DESCRIPTION},
};

mod client;
mod config;
mod context;
mod database;
mod logging;
mod model;
mod schedule;
mod server;
mod util;

fn main() {
    // Must happen while the process is still single-threaded
    let local_offset = UtcOffset::current_local_offset();

    let dotenv = dotenvy::dotenv();
    let args = Args::parse();

    let offset = local_offset.unwrap_or(UtcOffset::UTC);
    let _log_worker_guard = logging::init(args.quiet, offset);

    if let Err(err) = dotenv {
        warn!("Failed to load .env file: {err}");
    }

    if local_offset.is_err() {
        warn!("Failed to determine the local UTC offset; dates will be stored in UTC");
    }

    let runtime = RuntimeBuilder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build runtime");

    if let Err(err) = runtime.block_on(async_main(args, offset)) {
        error!("{:?}", err.wrap_err("Critical error in main"));
    }
}

async fn async_main(args: Args, local_offset: UtcOffset) -> Result<()> {
    DESCRIPTION.lines().for_each(|line| info!("{line}"));
    info!("-------------------------------------------------");

    let _ = rustls::crypto::ring::default_provider().install_default();

    config::init(local_offset).context("failed to initialize config")?;
    let config = Config::get();

    let db = Database::new(&config.database);
    let ctx = Arc::new(Context::new(config, db));

    if args.sync_once {
        ctx.sync_medals().await;

        return Ok(());
    }

    ctx.login().await;

    let port = args.port.unwrap_or(config.port);
    let app = server::router(Arc::clone(&ctx));

    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
        .await
        .with_context(|| format!("failed to bind to port {port}"))?;

    info!("Server running on port {port}");

    tokio::spawn({
        let ctx = Arc::clone(&ctx);

        async move { ctx.sync_medals().await }
    });

    let mut scheduler = Arc::clone(&ctx)
        .schedule_daily_sync()
        .await
        .context("failed to schedule daily medal sync")?;

    tokio::spawn(Arc::clone(&ctx).refresh_login());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("failed to serve http")?;

    info!("Shutting down");

    if let Err(err) = scheduler.shutdown().await {
        warn!("Failed to shut down scheduler: {err}");
    }

    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(_) => info!("Received Ctrl+C"),
        Err(err) => error!("{:?}", Report::new(err).wrap_err("Failed to await ctrl+c")),
    }
}
