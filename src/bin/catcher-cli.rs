use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "catcher-cli")]
#[command(about = "Inspect and exercise a running http-catcher", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:5000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print captured records
    Logs {
        /// Newest first
        #[arg(long)]
        desc: bool,

        /// Show at most this many records
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// PUT a file's bytes to the catcher as a raw body
    Send {
        file: PathBuf,

        /// Request path; defaults to /upload/<file name>
        #[arg(short, long)]
        path: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Logs { desc, limit } => {
            let order = if desc { "desc" } else { "asc" };
            let res = client
                .get(format!("{}/logs", base))
                .query(&[("order", order)])
                .send()
                .await?;

            let status = res.status();
            if !status.is_success() {
                eprintln!("Error: catcher returned status {}", status);
                if let Ok(text) = res.text().await {
                    eprintln!("Response: {}", text);
                }
                return Ok(());
            }

            let records: Vec<Value> = res.json().await?;
            let shown = limit.unwrap_or(records.len());
            println!("{}", serde_json::to_string_pretty(&records[..shown.min(records.len())])?);
        }
        Commands::Send { file, path } => {
            let data = tokio::fs::read(&file).await?;
            let path = path.unwrap_or_else(|| {
                let name = file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                format!("/upload/{}", name)
            });
            let path = if path.starts_with('/') { path } else { format!("/{}", path) };

            let res = client.put(format!("{}{}", base, path)).body(data).send().await?;
            let status = res.status();
            let json: Value = res.json().await?;
            if !status.is_success() {
                eprintln!("Error: catcher returned status {}", status);
            }
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    Ok(())
}
