//! Power-plant process entry point.

use clap::Parser;
use plant_runtime::{PlantConfig, PlantNode, StartupError};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Watt-Grid power plant process.
#[derive(Parser, Debug)]
#[command(name = "plant-node")]
#[command(about = "A thermal power plant competing on the energy market")]
struct Args {
    /// Optional TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let config = match PlantConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Configuration error: {error}");
            std::process::exit(1);
        }
    };

    // Port and id conflicts are operator-fixable: keep prompting until the
    // plant starts. With stdin closed (piped runs) the configured values get
    // one attempt and any failure is fatal.
    let mut interactive = true;
    let node = loop {
        let plant_id = match ask_number("Plant ID", config.plant.id).await {
            Answer::Value(value) => value,
            Answer::Eof(Some(default)) => {
                interactive = false;
                default
            }
            Answer::Eof(None) => {
                eprintln!("No plant id configured and no operator input available");
                std::process::exit(1);
            }
        };
        let port = match ask_port(u64::from(config.plant.port)).await {
            Answer::Value(value) => value as u16,
            Answer::Eof(Some(default)) => {
                interactive = false;
                default as u16
            }
            Answer::Eof(None) => {
                eprintln!("No port configured and no operator input available");
                std::process::exit(1);
            }
        };

        match PlantNode::start(&config, plant_id, port).await {
            Ok(node) => break node,
            Err(error @ (StartupError::PortInUse(_) | StartupError::IdConflict(_)))
                if interactive =>
            {
                println!("{error}, pick another.");
            }
            Err(error) => {
                eprintln!("Fatal startup error: {error}");
                std::process::exit(1);
            }
        }
    };

    println!("Plant running. Type 'exit' to shut down.");
    wait_for_exit().await;
    node.stop().await;
}

enum Answer {
    Value(u64),
    /// Stdin closed; carries the configured default when one exists.
    Eof(Option<u64>),
}

/// Prompt until the operator enters a positive number; an empty line takes
/// the configured default when there is one.
async fn ask_number(label: &str, default: u64) -> Answer {
    let label = label.to_string();
    tokio::task::spawn_blocking(move || {
        let stdin = std::io::stdin();
        loop {
            if default > 0 {
                print!("{label} [{default}]: ");
            } else {
                print!("{label}: ");
            }
            let _ = std::io::stdout().flush();

            let mut line = String::new();
            if stdin.read_line(&mut line).unwrap_or(0) == 0 {
                return Answer::Eof((default > 0).then_some(default));
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                if default > 0 {
                    return Answer::Value(default);
                }
                continue;
            }
            match trimmed.parse::<u64>() {
                Ok(value) if value > 0 => return Answer::Value(value),
                _ => println!("{label} must be a positive number."),
            }
        }
    })
    .await
    .unwrap_or(Answer::Eof(None))
}

async fn ask_port(default: u64) -> Answer {
    loop {
        match ask_number("Port", default).await {
            Answer::Value(value) if value <= u64::from(u16::MAX) => {
                return Answer::Value(value);
            }
            Answer::Value(_) => println!("Port must be between 1 and 65535."),
            eof => return eof,
        }
    }
}

/// Block until the operator types `exit` (or stdin closes).
async fn wait_for_exit() {
    let _ = tokio::task::spawn_blocking(|| {
        let stdin = std::io::stdin();
        let mut line = String::new();
        loop {
            line.clear();
            match stdin.read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) if line.trim() == "exit" => break,
                Ok(_) => println!("Type 'exit' to shut down."),
            }
        }
    })
    .await;
}
