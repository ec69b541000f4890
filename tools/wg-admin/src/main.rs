//! Watt-Grid administration CLI.
//!
//! A line-mode menu over the administration gateway: list the registered
//! plants or query the fleet-wide CO₂ average over a time interval.

use clap::Parser;
use serde::Deserialize;
use shared_types::PlantInfo;
use std::io::Write;

/// Watt-Grid administration CLI.
#[derive(Parser, Debug)]
#[command(name = "wg-admin")]
#[command(about = "Inspect registered plants and CO2 statistics")]
struct Args {
    /// Base URL of the administration gateway.
    #[arg(short, long, default_value = "http://localhost:8080")]
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let endpoint = args.endpoint.trim_end_matches('/').to_string();
    let http = reqwest::Client::new();

    loop {
        println!();
        println!("Watt-Grid administration");
        println!("  1) List registered plants");
        println!("  2) CO2 average over an interval");
        println!("  3) Exit");

        match read_line("> ").await.as_str() {
            "1" => list_plants(&http, &endpoint).await,
            "2" => co2_average(&http, &endpoint).await,
            "3" | "exit" => break,
            other => println!("Unknown choice {other:?}, enter 1, 2 or 3."),
        }
    }
    Ok(())
}

async fn list_plants(http: &reqwest::Client, endpoint: &str) {
    match http.get(format!("{endpoint}/plants")).send().await {
        Ok(response) if response.status().is_success() => {
            match response.json::<Vec<PlantInfo>>().await {
                Ok(plants) if plants.is_empty() => println!("No plants registered."),
                Ok(plants) => {
                    println!("{:>8}  {:<24} {:>15}", "ID", "ENDPOINT", "REGISTERED");
                    for plant in plants {
                        println!(
                            "{:>8}  {:<24} {:>15}",
                            plant.plant_id,
                            format!("{}:{}", plant.address, plant.port),
                            plant.registration_time,
                        );
                    }
                }
                Err(error) => println!("Unreadable response: {error}"),
            }
        }
        Ok(response) => println!("Gateway answered {}", response.status()),
        Err(error) => println!("Gateway unreachable: {error}"),
    }
}

async fn co2_average(http: &reqwest::Client, endpoint: &str) {
    let Some(t1) = read_number("t1 (epoch millis): ").await else {
        return;
    };
    let Some(t2) = read_number("t2 (epoch millis): ").await else {
        return;
    };

    let url = format!("{endpoint}/statistics/co2/average?t1={t1}&t2={t2}");
    match http.get(url).send().await {
        Ok(response) if response.status().is_success() => match response.json::<f64>().await {
            Ok(average) => println!("CO2 average over [{t1}, {t2}]: {average:.2}"),
            Err(error) => println!("Unreadable response: {error}"),
        },
        Ok(response) => {
            let status = response.status();
            let reason = response
                .json::<ErrorBody>()
                .await
                .map(|body| body.error)
                .unwrap_or_else(|_| status.to_string());
            println!("{reason}");
        }
        Err(error) => println!("Gateway unreachable: {error}"),
    }
}

async fn read_number(prompt: &str) -> Option<i64> {
    let line = read_line(prompt).await;
    match line.parse::<i64>() {
        Ok(value) => Some(value),
        Err(_) => {
            println!("Not a number: {line:?}");
            None
        }
    }
}

async fn read_line(prompt: &str) -> String {
    let prompt = prompt.to_string();
    tokio::task::spawn_blocking(move || {
        print!("{prompt}");
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        let _ = std::io::stdin().read_line(&mut line);
        line.trim().to_string()
    })
    .await
    .unwrap_or_default()
}
