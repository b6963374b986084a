//! Console scanning station.
//!
//! Reads decoded QR payloads (one per line, as keyboard-wedge scanners
//! type them) and operator commands from stdin, and prints what staff
//! should see after every change.

use anyhow::Context;
use gatecheck_core::environment::SystemClock;
use gatecheck_runtime::Store;
use gatecheck_runtime::metrics::MetricsServer;
use gatecheck_scanner::console::{ConsoleInput, SessionSnapshot, describe, parse_line};
use gatecheck_scanner::stores::postgres::PostgresTicketStore;
use gatecheck_scanner::{
    Config, ScannerAction, ScannerEnvironment, ScannerReducer, ScannerState, SharedPinGate,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type ScannerStore = Store<
    ScannerState,
    ScannerAction,
    ScannerEnvironment<PostgresTicketStore, SharedPinGate, SystemClock>,
    ScannerReducer<PostgresTicketStore, SharedPinGate, SystemClock>,
>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gatecheck_scanner=info,gatecheck_runtime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting Gatecheck scanner");

    // Load configuration
    let config = Config::from_env().context("Invalid configuration")?;
    info!(
        max_connections = config.database.max_connections,
        store_timeout_ms = config.scanner.store_timeout.as_millis(),
        fetch_retries = config.scanner.fetch_retries,
        "Configuration loaded"
    );

    if let Some(port) = config.metrics_port {
        MetricsServer::new(SocketAddr::from(([0, 0, 0, 0], port)))
            .start()
            .context("Failed to start metrics exporter")?;
    }

    // Setup ticket store
    info!("Connecting to ticket database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.connect_timeout)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to ticket database")?;
    let tickets = PostgresTicketStore::new(pool);
    tickets.migrate().await.context("Failed to run migrations")?;
    info!("Ticket database ready");

    let environment = ScannerEnvironment::new(
        tickets,
        SharedPinGate::new(config.scanner.staff_pin.clone()),
        SystemClock,
    )
    .with_operations(config.scanner.operation_settings());
    let store: ScannerStore = Store::new(ScannerState::default(), ScannerReducer::new(), environment);

    let renderer = spawn_renderer(&store);

    // Deep link from argv wins over the environment
    let deep_link = std::env::args().nth(1).or_else(|| config.scanner.deep_link.clone());
    if let Some(payload) = deep_link {
        store.send(ScannerAction::DeepLinkReceived { payload }).await?;
    }

    println!("{}", store.state(describe).await);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        match parse_line(&line) {
            None => {},
            Some(ConsoleInput::Quit) => break,
            Some(ConsoleInput::Status) => {
                let snapshot = store
                    .state(|state| serde_json::to_string(&SessionSnapshot::of(state)))
                    .await?;
                println!("{snapshot}");
            },
            Some(ConsoleInput::Unknown(command)) => warn!(command = %command, "Unknown command"),
            Some(ConsoleInput::Action(action)) => {
                store.send(action).await?;
                println!("{}", store.state(describe).await);
            },
        }
    }

    info!("Input closed, shutting down");
    renderer.abort();
    store.shutdown(Duration::from_secs(10)).await?;
    Ok(())
}

/// Print the display after every effect result.
fn spawn_renderer(store: &ScannerStore) -> tokio::task::JoinHandle<()> {
    let mut results = store.subscribe_actions();
    let store = store.clone();

    tokio::spawn(async move {
        loop {
            match results.recv().await {
                Ok(_) => println!("{}", store.state(describe).await),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Display fell behind");
                },
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
