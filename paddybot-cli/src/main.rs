//! paddybot CLI - host process for the PaddyBot HTTP service
//!
//! - `serve`: load settings, start pools, serve until SIGINT/SIGTERM
//! - `config`: print the effective settings (secrets redacted)

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use paddybot_core::config::parse_bool;
use paddybot_core::Settings;
use tracing::info;

mod tracing_setup;

use tracing_setup::TracingConfig;

#[derive(Parser, Debug)]
#[command(
    name = "paddybot",
    author,
    version,
    about = "PaddyBot web service",
    long_about = "Run the PaddyBot HTTP API. Settings come from built-in defaults, the \
                  environment (and .env), then an optional TOML override file."
)]
struct Cli {
    /// TOML override file (default: ./paddybot.toml when present)
    #[arg(long, short = 'c', global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable debug mode and debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server
    Serve(ServeArgs),
    /// Print the effective configuration
    Config(ConfigArgs),
}

#[derive(Parser, Debug)]
struct ServeArgs {
    /// Interface to bind (overrides HOST and [app] host)
    #[arg(long, value_name = "HOST")]
    host: Option<String>,

    /// Port to bind (overrides PORT and [app] port)
    #[arg(long, short = 'p', value_name = "PORT")]
    port: Option<u16>,
}

#[derive(Parser, Debug)]
struct ConfigArgs {
    /// Only validate, print nothing on success
    #[arg(long)]
    check: bool,
}

/// Debug mode as far as it is known before settings load: the flag, or a
/// `DEBUG` value in the process environment (defaults to on, like the
/// settings). `.env` is not read yet at this point.
fn early_debug(cli: &Cli) -> bool {
    cli.debug
        || std::env::var("DEBUG")
            .ok()
            .and_then(|raw| parse_bool(&raw))
            .unwrap_or(true)
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    paddybot_core::load_dotenv();
    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    if cli.debug {
        settings.app.debug = true;
    }
    Ok(settings)
}

async fn run_serve(mut settings: Settings, args: ServeArgs) -> Result<()> {
    if let Some(host) = args.host {
        settings.app.host = host;
    }
    if let Some(port) = args.port {
        settings.app.port = port;
    }

    info!(
        app = %settings.app.name,
        host = %settings.app.host,
        port = settings.app.port,
        debug = settings.app.debug,
        "Starting server"
    );

    paddybot_server::run_server(settings)
        .await
        .context("Server error")
}

fn run_config(settings: &Settings, args: ConfigArgs) -> Result<()> {
    if args.check {
        return Ok(());
    }
    let rendered = toml::to_string_pretty(settings).context("Failed to render settings")?;
    print!("{rendered}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Before settings load, so .env and validation warnings are visible
    tracing_setup::init(&TracingConfig {
        debug: early_debug(&cli),
    })?;
    let settings = load_settings(&cli)?;

    match cli.command {
        Commands::Serve(args) => run_serve(settings, args).await,
        Commands::Config(args) => run_config(&settings, args),
    }
}
