//! Administration service process.

use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wg_06_market_broker::{BrokerClient, BrokerConfig};
use wg_07_admin_gateway::{router, spawn_pollution_ingest, AdminState};

/// Watt-Grid administration service.
#[derive(Parser, Debug)]
#[command(name = "admin-server")]
#[command(about = "Plant registration, listing and CO2 statistics")]
struct Args {
    /// HTTP listen address.
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    listen: SocketAddr,

    /// MQTT broker URI for the pollution ingest.
    #[arg(long, default_value = "tcp://localhost:1883")]
    broker_url: String,

    /// Topic the plants publish pollution batches to.
    #[arg(long, default_value = "wattgrid/pollution")]
    pollution_topic: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let state = Arc::new(AdminState::new());

    // The gateway stays useful without the broker: registration and listing
    // keep working, statistics just see no new batches until it is back.
    let _broker = match BrokerClient::connect(&BrokerConfig {
        url: args.broker_url.clone(),
        client_id: "admin-server".into(),
    }) {
        Ok(broker) => {
            spawn_pollution_ingest(&broker, &args.pollution_topic, Arc::clone(&state))
                .await
                .context("subscribing to the pollution topic")?;
            Some(broker)
        }
        Err(error) => {
            warn!(%error, "Broker unavailable, starting without pollution ingest");
            None
        }
    };

    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("binding {}", args.listen))?;
    info!(listen = %args.listen, "Administration gateway listening");

    axum::serve(listener, router(state))
        .await
        .context("serving the administration gateway")?;
    Ok(())
}
