//! Renewable-energy provider process.
//!
//! Broadcasts a fresh energy request on a fixed cadence; the plant fleet
//! elects who fulfills each one. Requests that arrive while every plant is
//! busy queue up plant-side, so the provider never waits on anyone.

use anyhow::Context;
use clap::Parser;
use rand::Rng;
use shared_types::{epoch_millis, EnergyRequest};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use wg_06_market_broker::{BrokerClient, BrokerConfig, RequestPublisher};

/// Watt-Grid renewable-energy provider.
#[derive(Parser, Debug)]
#[command(name = "energy-provider")]
#[command(about = "Periodically broadcasts energy requests to the plant fleet")]
struct Args {
    /// MQTT broker URI.
    #[arg(long, default_value = "tcp://localhost:1883")]
    broker_url: String,

    /// Topic the plants subscribe to.
    #[arg(long, default_value = "wattgrid/energy-requests")]
    topic: String,

    /// Seconds between requests.
    #[arg(long, default_value = "10")]
    period_secs: u64,

    /// Smallest request, kWh.
    #[arg(long, default_value = "1000")]
    min_kwh: u64,

    /// Largest request, kWh.
    #[arg(long, default_value = "10000")]
    max_kwh: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let (min_kwh, max_kwh) = if args.min_kwh <= args.max_kwh {
        (args.min_kwh, args.max_kwh)
    } else {
        (args.max_kwh, args.min_kwh)
    };

    let broker = Arc::new(
        BrokerClient::connect(&BrokerConfig {
            url: args.broker_url.clone(),
            client_id: "energy-provider".into(),
        })
        .context("connecting to the broker")?,
    );
    let publisher = RequestPublisher::new(Arc::clone(&broker), &args.topic);

    info!(
        topic = %args.topic,
        period_secs = args.period_secs,
        "Energy provider started"
    );

    let mut tick = tokio::time::interval(Duration::from_secs(args.period_secs));
    loop {
        tokio::select! {
            _ = tick.tick() => {
                let request = EnergyRequest::new(
                    Uuid::new_v4().to_string(),
                    rand::thread_rng().gen_range(min_kwh..=max_kwh),
                    epoch_millis(),
                );
                info!(
                    request_id = %request.request_id,
                    amount_kwh = request.amount_kwh,
                    "Broadcasting energy request"
                );
                if let Err(error) = publisher.publish(&request).await {
                    // Rely on the client's automatic reconnect; this request
                    // is lost, the next tick sends a fresh one.
                    warn!(%error, "Failed to broadcast, will retry next period");
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    broker.shutdown().await;
    info!("Energy provider stopped");
    Ok(())
}
