//! Hexploration automation worker
#![deny(
    unused,
    warnings,
    future_incompatible,
    nonstandard_style,
    rust_2018_idioms,
    missing_docs,
    unused_imports
)]
#![forbid(unsafe_code)]

use dotenv::dotenv;
use log::{error, info};
use tai_vrf::{KeyPair, ECVRF};
use tokio::{
    signal::unix::{signal, SignalKind},
    sync::watch,
};
use worker::{
    chain::EvmChain,
    config::{command, Config},
    ethereum::format_address,
    health, Worker,
};

fn init_logger(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

async fn shutdown_signal() -> std::io::Result<()> {
    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv().ok();
    let matches = command().get_matches();
    init_logger(matches.get_flag("verbose"));

    let config = Config::from_matches(&matches)?;
    let key_pair = KeyPair::from_hex(&config.private_key)?;

    info!("=== Hexploration Worker Starting ===");
    info!("Worker wallet: {}", format_address(&key_pair.address()));
    info!("Chain: {:?} ({})", config.chain, config.chain.chain_id());
    info!("Poll interval: {}ms", config.poll_interval.as_millis());
    info!("Verbose: {}", config.verbose);
    info!("Mode: {}", config.mode);

    let listener = health::bind(config.health_port).await?;
    let chain = EvmChain::connect(&config.rpc_url, &key_pair, config.chain.chain_id()).await?;
    info!("Connected to chain ID {}", chain.chain_id());
    let (mut worker, state) = Worker::new(
        chain,
        ECVRF::new(key_pair.secret_key),
        config.deployments.clone(),
        config.mode,
        config.poll_interval,
    );
    let health_server = tokio::spawn(health::serve(listener, state));

    if let Err(err) = worker.preflight().await {
        error!("Preflight failed: {}", err);
        health_server.abort();
        return Err(err.into());
    }
    for process in worker.processes() {
        info!(
            "Managing {} ({}) as {:?}",
            process.label,
            format_address(&process.address),
            process.kind
        );
    }

    let (stop, shutdown) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(err) = shutdown_signal().await {
            error!("Unable to listen for shutdown signals: {}", err);
            // Keep the sender alive, a dropped sender stops the worker
            std::future::pending::<()>().await;
        }
        info!("Shutting down...");
        stop.send_replace(true);
    });

    worker.run(shutdown).await;
    health_server.abort();
    Ok(())
}
