use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Command-line client for the stream gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway health and pool state
    Health,
    /// Show cache, pool and rate limiter statistics
    Stats,
    /// Resolve one stream URL
    Resolve {
        stream_url: String,
        /// Skip the result cache
        #[arg(long)]
        bypass_cache: bool,
    },
    /// Check the status of several stream URLs
    Status {
        #[arg(required = true)]
        stream_urls: Vec<String>,
        /// Skip the result cache
        #[arg(long)]
        bypass_cache: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Health => client.get(format!("{}/health", base)).send().await?,
        Commands::Stats => client.get(format!("{}/cache/stats", base)).send().await?,
        Commands::Resolve {
            stream_url,
            bypass_cache,
        } => {
            client
                .get(format!("{}/resolve", base))
                .query(&[
                    ("url", stream_url),
                    ("bypass_cache", bypass_cache.to_string()),
                ])
                .send()
                .await?
        }
        Commands::Status {
            stream_urls,
            bypass_cache,
        } => {
            client
                .post(format!("{}/status-batch", base))
                .query(&[("bypass_cache", bypass_cache.to_string())])
                .json(&json!({ "urls": stream_urls }))
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if let Some(retry_after) = res.headers().get("retry-after") {
        eprintln!("Rate limited, retry after {}s", retry_after.to_str().unwrap_or("?"));
    }
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
    }

    let text = res.text().await?;
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
