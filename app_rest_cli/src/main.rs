mod args;
mod commands;
mod output;

use std::time::Duration;

use anyhow::Result;
use app_rest_client::{ClientConfig, RestClient, BASE_URL_VAR, DEBUG_VAR, TIMEOUT_VAR};
use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "app-rest")]
#[command(about = "Issue REST requests and report failures by kind")]
struct Cli {
    /// Base URL requests are resolved against
    #[arg(long, env = BASE_URL_VAR, global = true)]
    base_url: Option<String>,

    /// Log the wire trace of every request
    #[arg(
        long,
        env = DEBUG_VAR,
        global = true,
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    debug: bool,

    /// Default request timeout in seconds
    #[arg(long, env = TIMEOUT_VAR, global = true)]
    timeout: Option<u64>,

    /// Output format: table, json or body
    #[arg(long, default_value = "table", global = true)]
    output: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one request
    Request(commands::request::RequestArgs),
    /// Print the URL a request would be sent to
    Url(commands::url::UrlArgs),
}

/// `--debug` and `--verbose` both route wire traces to the log, so the wire
/// target must be let through at debug level for either.
fn wire_level(cli: &Cli) -> &'static str {
    let verbose = matches!(&cli.command, Commands::Request(args) if args.verbose);
    if cli.debug || verbose {
        "debug"
    } else {
        "info"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let wire_level = wire_level(&cli);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("app_rest=info".parse()?)
                .add_directive(format!("app_rest_client::wire={}", wire_level).parse()?),
        )
        .with_target(false)
        .init();

    let format = match cli.output.as_str() {
        "json" => OutputFormat::Json,
        "body" => OutputFormat::Body,
        _ => OutputFormat::Table,
    };

    // Flags win over the environment; `.env` fills the rest.
    let mut config = match cli.base_url.as_deref() {
        Some(base_url) => ClientConfig::new(base_url).with_env()?,
        None => ClientConfig::from_env()?,
    };
    config.debug |= cli.debug;
    if let Some(secs) = cli.timeout {
        config.timeout = Some(Duration::from_secs(secs));
    }
    let client = RestClient::with_config(config)?;

    match &cli.command {
        Commands::Request(args) => commands::request::run(args, &client, &format).await?,
        Commands::Url(args) => commands::url::run(args, &client)?,
    }

    Ok(())
}
