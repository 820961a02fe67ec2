use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "breaker-cli")]
#[command(about = "Management CLI for the dependency circuit breakers", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    /// Bearer key for control commands
    #[arg(short, long, env = "BREAKER_ADMIN_KEY")]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show health of every circuit
    Health,
    /// Show request statistics
    Stats,
    /// Force a circuit open
    Open {
        circuit: String,
        #[arg(short, long)]
        reason: Option<String>,
    },
    /// Force a circuit closed
    Close {
        circuit: String,
        #[arg(short, long)]
        reason: Option<String>,
    },
    /// Clear a circuit's metrics and close it
    Reset { circuit: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", key))?);
    }

    let res = match cli.command {
        Commands::Health => client.get(format!("{}/health", cli.url)).send().await?,
        Commands::Stats => client.get(format!("{}/stats", cli.url)).send().await?,
        Commands::Open { circuit, reason } => {
            control(&client, &cli.url, headers, "open", circuit, reason).await?
        }
        Commands::Close { circuit, reason } => {
            control(&client, &cli.url, headers, "close", circuit, reason).await?
        }
        Commands::Reset { circuit } => {
            control(&client, &cli.url, headers, "reset", circuit, None).await?
        }
    };
    print_response(res).await
}

async fn control(
    client: &reqwest::Client,
    url: &str,
    headers: HeaderMap,
    action: &str,
    circuit: String,
    reason: Option<String>,
) -> Result<reqwest::Response, reqwest::Error> {
    client
        .post(format!("{}/control", url))
        .headers(headers)
        .json(&json!({ "action": action, "circuitName": circuit, "reason": reason }))
        .send()
        .await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
