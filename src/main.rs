//! skywire - command-line client for Skyhash servers
//!
//! Runs single queries or an interactive REPL.

mod config;
mod format;
mod repl;

use clap::{Parser, Subcommand};
use colored::Colorize;
use config::Config;
use skywire_client::{Client, Query};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "skywire")]
#[command(about = "Command-line client for Skyhash database servers")]
#[command(version)]
struct Cli {
    /// YAML config file
    #[arg(short, long, env = "SKYWIRE_CONFIG")]
    config: Option<PathBuf>,

    /// Server host
    #[arg(long)]
    host: Option<String>,

    /// Server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Username
    #[arg(short, long)]
    user: Option<String>,

    /// Password
    #[arg(long)]
    password: Option<String>,

    /// Enable TLS connection
    #[arg(long)]
    tls: bool,

    /// Path to CA certificate for server verification
    #[arg(long)]
    ca_cert: Option<PathBuf>,

    /// Skip server certificate verification (INSECURE)
    #[arg(long, short = 'k')]
    insecure: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start interactive REPL
    Repl,

    /// Run a single query
    Query {
        /// Query text, with `?` placeholders
        text: String,

        /// Parameters as JSON literals (1, -2, 1.5, "text", null, true, [1, 2])
        params: Vec<String>,
    },
}

impl Cli {
    fn apply_to(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.connection.host = host.clone();
        }
        if let Some(port) = self.port {
            config.connection.port = port;
        }
        if let Some(user) = &self.user {
            config.connection.username = user.clone();
        }
        if let Some(password) = &self.password {
            config.connection.password = password.clone();
        }
        if self.tls || self.ca_cert.is_some() || self.insecure {
            config.tls.enabled = true;
        }
        if let Some(ca) = &self.ca_cert {
            config.tls.ca_cert = Some(ca.clone());
        }
        if self.insecure {
            config.tls.insecure = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).map_err(|e| {
        tracing::error!("Failed to load config: {}", e);
        e
    })?;
    cli.apply_to(&mut config);

    let client = Client::new(config.connection_config());

    match cli.command {
        Some(Commands::Repl) | None => {
            repl::run(client, &config.history_path()).await?;
        }
        Some(Commands::Query { text, params }) => {
            let mut query = Query::new(text);
            for param in format::parse_params(&params)? {
                query.push_param(param);
            }

            client.connect().await.map_err(|e| {
                eprintln!("{}: {}", "Connection failed".red(), e);
                e
            })?;
            let result = client.query(&query).await;
            let _ = client.close().await;

            match result {
                Ok(response) => println!("{}", format::render(&response)),
                Err(e) => {
                    eprintln!("{}", format::render_error(&e));
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
