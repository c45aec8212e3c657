// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::error;

use console_session::config::SessionConfig;
use console_session::termination::LogNavigator;

/// Headless driver for the console session.
#[derive(Debug, Parser)]
#[command(name = "sessionctl", version)]
struct Cli {
    #[command(flatten)]
    config: SessionConfig,

    /// Log filter (tracing `EnvFilter` syntax).
    #[arg(long, default_value = "info", env = "CONSOLE_LOG_LEVEL")]
    log_level: String,

    /// Log output format: "text" or "json".
    #[arg(long, default_value = "text", env = "CONSOLE_LOG_FORMAT")]
    log_format: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in and persist the session.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "CONSOLE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Log out and clear the persisted session.
    Logout,
    /// Show the persisted session.
    Status,
    /// GET an API path with the session's credentials and print the JSON body.
    Get { path: String },
    /// Keep the session alive with proactive renewal until interrupted.
    Keepalive,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, &cli.log_format);

    if let Err(e) = run(cli).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(level: &str, format: &str) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        "json" => fmt::fmt().with_env_filter(filter).json().init(),
        _ => fmt::fmt().with_env_filter(filter).init(),
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let client = console_session::connect(&cli.config, Arc::new(LogNavigator));
    let session = client.session();

    match cli.command {
        Command::Login { username, password } => {
            let user = client.login(&username, &password).await?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        Command::Logout => {
            client.logout().await;
        }
        Command::Status => {
            let status = serde_json::json!({
                "authenticated": session.is_authenticated(),
                "admin": session.is_admin(),
                "has_refresh_token": session.store().refresh_token().is_some(),
                "user": session.user(),
                "session_file": cli.config.session_file(),
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Command::Get { path } => {
            let value: serde_json::Value = client.get_json(&path).await?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Command::Keepalive => {
            if !session.resume_renewal() {
                anyhow::bail!("no session to keep alive, log in first");
            }
            tracing::info!("keeping session alive, ctrl-c to stop");
            tokio::signal::ctrl_c().await?;
        }
    }
    Ok(())
}
