use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "gate-cli")]
#[command(about = "Management CLI for santuario-gate", long_about = None)]
struct Cli {
    #[arg(short, long, env = "GATE_ADMIN_URL", default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "GATE_ADMIN_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gate status
    Status,
    /// Decision counters since start
    Stats,
    /// Show the active route table and redirect targets
    Routes,
    /// Ask the gate what it would do for a path, without forwarding anything
    Decide {
        path: String,
        /// Evaluate as this signed-in user; anonymous when omitted
        #[arg(long)]
        user: Option<Uuid>,
        /// Evaluate subscriptions as of this RFC 3339 instant
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let request = match cli.command {
        Commands::Status => client.get(format!("{}/_gate/status", base)),
        Commands::Stats => client.get(format!("{}/_gate/stats", base)),
        Commands::Routes => client.get(format!("{}/_gate/routes", base)),
        Commands::Decide { path, user, at } => client
            .post(format!("{}/_gate/decide", base))
            .json(&json!({ "path": path, "user_id": user, "at": at })),
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
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
