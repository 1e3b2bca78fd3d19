use clap::{Parser, Subcommand};
use serde_json::Value;

use request_telemetry::observability::MetricsSnapshot;

#[derive(Parser)]
#[command(name = "telemetry-cli")]
#[command(about = "Inspect the metrics of a running request-telemetry server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Path of the snapshot endpoint.
    #[arg(short, long, default_value = "/metrics")]
    path: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the text report (totals, by method, by status code)
    Report,
    /// Print the raw JSON snapshot
    Json,
    /// Send GET /ping and show the correlation id the server assigned
    Ping,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Report => {
            let res = client.get(format!("{}{}", base, cli.path)).send().await?;
            if let Some(res) = check_status(res).await {
                let snapshot: MetricsSnapshot = res.json().await?;
                println!("{}", snapshot);
            }
        }
        Commands::Json => {
            let res = client.get(format!("{}{}", base, cli.path)).send().await?;
            if let Some(res) = check_status(res).await {
                let json: Value = res.json().await?;
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
        }
        Commands::Ping => {
            let res = client.get(format!("{}/ping", base)).send().await?;
            let request_id = res
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-")
                .to_string();
            println!("{} (request_id: {})", res.status(), request_id);
            println!("{}", res.text().await?);
        }
    }

    Ok(())
}

async fn check_status(res: reqwest::Response) -> Option<reqwest::Response> {
    let status = res.status();
    if status.is_success() {
        return Some(res);
    }
    eprintln!("Error: server returned status {}", status);
    if let Ok(text) = res.text().await {
        eprintln!("Response: {}", text);
    }
    None
}
