// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use crate::config::SessionConfig;
use crate::session::SessionClient;
use crate::wallet::RawKeyWallet;
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// Fabstir EDS client CLI
#[derive(Parser, Debug)]
#[command(name = "eds-cli")]
#[command(version)]
#[command(about = "Encrypted key-value and row access against an EDS", long_about = None)]
pub struct Cli {
    /// TOML file with an [eds] table; environment is used otherwise
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the EDS WebSocket url
    #[arg(long, global = true, env = "EDS_URL")]
    pub url: Option<String>,

    /// Application namespace
    #[arg(long, global = true, env = "EDS_APP_ID")]
    pub app_id: Option<String>,

    /// Wallet private key
    #[arg(long, global = true, env = "EDS_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read a value
    Get { key: String },

    /// Store a value (JSON, or a plain string)
    Set { key: String, value: String },

    /// Delete a value
    Delete { key: String },

    /// List rows of a table updated after a timestamp
    Rows {
        table: String,

        #[arg(long, default_value_t = 0)]
        since: u64,
    },
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    dotenv::dotenv().ok();

    let mut config = match &cli.config {
        Some(path) => SessionConfig::from_file(path)?,
        None => SessionConfig::from_env()?,
    };
    if let Some(url) = cli.url {
        config.url = url;
    }
    if let Some(app_id) = cli.app_id {
        config.app_id = Some(app_id);
    }
    config.validate()?;

    let private_key = cli
        .private_key
        .ok_or_else(|| anyhow!("Private key required. Use --private-key or set EDS_PRIVATE_KEY env var"))?;
    let wallet = Arc::new(RawKeyWallet::from_private_key(&private_key)?);

    let client = SessionClient::connect(config, wallet).await?;
    let result = run(&client, cli.command).await;
    client.close().await;
    result
}

async fn run(client: &SessionClient, command: Commands) -> Result<()> {
    match command {
        Commands::Get { key } => match client.get_key::<Value>(&key).await? {
            Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
            None => println!("(not found)"),
        },
        Commands::Set { key, value } => {
            client.set_key(&key, &parse_value(&value)).await?;
            println!("✅ Stored {}", key);
        }
        Commands::Delete { key } => {
            client.delete_key(&key).await?;
            println!("✅ Deleted {}", key);
        }
        Commands::Rows { table, since } => {
            let rows = client.rows_updated_since::<Value>(&table, since).await?;
            for row in &rows {
                println!(
                    "{} @{} {}",
                    hex::encode(&row.key_hash),
                    row.updated_at,
                    serde_json::to_string(&row.row)?
                );
            }
            println!("{} row(s)", rows.len());
        }
    }
    Ok(())
}

/// JSON when it parses, otherwise the raw text
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
