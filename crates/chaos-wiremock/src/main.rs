//! chaos-wiremock CLI
//!
//! Injects faults, delays and error responses into a running WireMock server.
//!
//! # Usage
//!
//! ```bash
//! # Delay every GET on /users by 500ms
//! chaos-wiremock --url http://localhost:8080 fixed-delay --millis 500 \
//!     --filter '{"method": "GET", "url": "/users"}'
//!
//! # Break the connection for POST and PUT
//! chaos-wiremock --config chaos.yaml fault --fault CONNECTION_RESET_BY_PEER \
//!     --recursive --filter '{"request": {"method": ["POST", "PUT"]}}'
//!
//! # Undo everything
//! chaos-wiremock --config chaos.yaml reset-mappings
//! ```

use anyhow::Context;
use chaos_wiremock::{actions, Configuration, MatchMode, WiremockConfig};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "chaos-wiremock")]
#[command(author, version, about = "Chaos experiments against a WireMock server")]
struct Args {
    /// YAML or JSON configuration file
    #[arg(short, long, env = "CHAOS_WIREMOCK_CONFIG")]
    config: Option<PathBuf>,

    /// WireMock base URL (overrides the configuration file)
    #[arg(short, long, env = "WIREMOCK_URL")]
    url: Option<String>,

    /// WireMock host, checked for reachability together with --port
    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<f64>,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add mappings given as JSON objects
    Add {
        #[arg(long = "mapping", required = true, value_parser = parse_json)]
        mappings: Vec<Value>,
    },
    /// Add a mapping for every *.json file in a directory
    Populate { dir: PathBuf },
    /// Delete the first mapping matched by each filter
    Delete {
        #[arg(long = "filter", required = true, value_parser = parse_json)]
        filters: Vec<Value>,
    },
    /// Delete every mapping
    DeleteAll,
    /// Change the response status of matched mappings
    Status {
        #[arg(long = "filter", required = true, value_parser = parse_json)]
        filters: Vec<Value>,
        #[arg(long)]
        status: String,
    },
    /// Change the status, and optionally the body, of every mapping
    StatusAll {
        #[arg(long)]
        status: String,
        #[arg(long)]
        body: Option<String>,
        #[arg(long)]
        body_file_name: Option<String>,
    },
    /// Make matched mappings answer with a fault
    Fault {
        #[arg(long = "filter", required = true, value_parser = parse_json)]
        filters: Vec<Value>,
        #[arg(long)]
        fault: String,
        /// Recursive matching (lists are allowed sets)
        #[arg(long)]
        recursive: bool,
    },
    /// Delay matched mappings by a fixed number of milliseconds
    FixedDelay {
        #[arg(long = "filter", required = true, value_parser = parse_json)]
        filters: Vec<Value>,
        #[arg(long)]
        millis: u64,
        #[arg(long)]
        recursive: bool,
    },
    /// Delay every response on the server
    GlobalFixedDelay { millis: u64 },
    /// Random delay for mappings whose request block equals --request
    RandomDelay {
        #[arg(long = "request", required = true, value_parser = parse_json)]
        requests: Vec<Value>,
        #[arg(long, value_parser = parse_json)]
        distribution: Value,
    },
    /// Random delay for every response on the server
    GlobalRandomDelay {
        #[arg(long, value_parser = parse_json)]
        distribution: Value,
    },
    /// Dribble the response body in chunks
    ChunkedDribble {
        #[arg(long = "request", required = true, value_parser = parse_json)]
        requests: Vec<Value>,
        #[arg(long, value_parser = parse_json)]
        delay: Value,
    },
    /// Apply the configured wiremock.defaults.down delay
    Down {
        #[arg(long = "request", required = true, value_parser = parse_json)]
        requests: Vec<Value>,
    },
    /// Remove every delay from the matched mappings
    Up {
        #[arg(long = "request", required = true, value_parser = parse_json)]
        requests: Vec<Value>,
    },
    /// Reset the server, deleting every mapping
    Reset,
    /// Reset mappings to the server's mapping files
    ResetMappings,
}

fn parse_json(s: &str) -> Result<Value, String> {
    serde_json::from_str(s).map_err(|e| format!("invalid JSON: {e}"))
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn load_configuration(args: &Args) -> anyhow::Result<Configuration> {
    let mut configuration = match &args.config {
        Some(path) => Configuration::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Configuration::default(),
    };

    if args.url.is_some() || args.host.is_some() || args.port.is_some() || args.timeout.is_some()
    {
        let wiremock = configuration
            .wiremock
            .get_or_insert_with(WiremockConfig::default);
        if let Some(url) = &args.url {
            wiremock.url = Some(url.clone());
            // host + port take precedence over url, so drop the file's pair
            if args.host.is_none() && args.port.is_none() {
                wiremock.host = None;
                wiremock.port = None;
            }
        }
        if let Some(host) = &args.host {
            wiremock.host = Some(host.clone());
        }
        if let Some(port) = args.port {
            wiremock.port = Some(port);
        }
        if let Some(timeout) = args.timeout {
            wiremock.timeout = timeout;
        }
    }

    configuration.wiremock()?.endpoint()?;
    Ok(configuration)
}

fn print<T: Serialize>(result: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}

fn mode(recursive: bool) -> MatchMode {
    MatchMode::from_strict(!recursive)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    let config = load_configuration(&args)?;
    let config = &config;

    match args.command {
        Command::Add { mappings } => print(&actions::add_mappings(config, &mappings).await?),
        Command::Populate { dir } => print(&actions::populate_from_dir(config, &dir).await?),
        Command::Delete { filters } => print(&actions::delete_mappings(config, &filters).await?),
        Command::DeleteAll => print(&actions::delete_all_mappings(config).await?),
        Command::Status { filters, status } => print(
            &actions::update_mappings_status_code(config, &filters, &status).await?,
        ),
        Command::StatusAll {
            status,
            body,
            body_file_name,
        } => print(
            &actions::update_all_mappings_status_code_and_body(
                config,
                &status,
                body,
                body_file_name,
            )
            .await?,
        ),
        Command::Fault {
            filters,
            fault,
            recursive,
        } => print(
            &actions::update_mappings_fault(config, &filters, &fault, mode(recursive)).await?,
        ),
        Command::FixedDelay {
            filters,
            millis,
            recursive,
        } => print(&actions::fixed_delay(config, &filters, millis, mode(recursive)).await?),
        Command::GlobalFixedDelay { millis } => {
            print(&actions::global_fixed_delay(config, millis).await?)
        }
        Command::RandomDelay {
            requests,
            distribution,
        } => print(&actions::random_delay(config, &requests, &distribution).await?),
        Command::GlobalRandomDelay { distribution } => {
            print(&actions::global_random_delay(config, &distribution).await?)
        }
        Command::ChunkedDribble { requests, delay } => {
            print(&actions::chunked_dribble_delay(config, &requests, &delay).await?)
        }
        Command::Down { requests } => print(&actions::down(config, &requests).await?),
        Command::Up { requests } => print(&actions::up(config, &requests).await?),
        Command::Reset => print(&actions::reset(config).await?),
        Command::ResetMappings => print(&actions::reset_mappings(config).await?),
    }
}
