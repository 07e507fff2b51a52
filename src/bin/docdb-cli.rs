use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use docdb_client::config::load_config;
use docdb_client::health::EndpointState;
use docdb_client::http::request::parse_resource_path;
use docdb_client::observability::{logging, metrics};
use docdb_client::{CancellationToken, DocumentClient, HttpVerb, RequestOptions, ResponseEnvelope};

#[derive(Parser)]
#[command(name = "docdb-cli")]
#[command(about = "Issue requests against a document database account", long_about = None)]
struct Cli {
    /// Client configuration file (TOML).
    #[arg(short, long, default_value = "docdb.toml")]
    config: PathBuf,

    /// Expose Prometheus metrics on this address while the command runs.
    #[arg(long)]
    metrics_address: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a resource by path (e.g. /dbs/db1/colls/c1/docs/d1)
    Get {
        path: String,
        /// Partition key as JSON (e.g. '"tenant-1"' or '["a", 1]')
        #[arg(short, long)]
        partition_key: Option<String>,
    },
    /// Show the database account's regions
    Account,
    /// Show resolved endpoints and their health
    Endpoints,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    logging::init_logging(&config.observability);

    let metrics_address = cli
        .metrics_address
        .clone()
        .or_else(|| config.observability.metrics_enabled.then(|| config.observability.metrics_address.clone()));
    if let Some(address) = metrics_address {
        match address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(metrics_address = %address, "Failed to parse metrics address"),
        }
    }

    let client = DocumentClient::builder(config).build().await?;

    match cli.command {
        Commands::Get { path, partition_key } => {
            let (resource_type, resource_id) = parse_resource_path(&path)
                .ok_or_else(|| format!("'{path}' is not a resource path"))?;
            let mut options = RequestOptions::new();
            if let Some(key) = partition_key {
                options = options.with_partition_key(serde_json::from_str::<Value>(&key)?);
            }

            let cancel = CancellationToken::new();
            let ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    ctrl_c.cancel();
                }
            });

            let response = client
                .execute(HttpVerb::Get, resource_type, &resource_id, &path, None, &options, Some(&cancel))
                .await?;
            print_response(&response)?;
        }
        Commands::Account => {
            let account = client.read_database_account().await?;
            println!("{}", serde_json::to_string_pretty(&account)?);
        }
        Commands::Endpoints => {
            let snapshot = client.endpoints().snapshot();
            let describe = |records: &[docdb_client::health::EndpointRecord]| -> Vec<Value> {
                records
                    .iter()
                    .map(|r| {
                        let state = match client.endpoints().state_of(&r.url) {
                            Some(EndpointState::Live) => "live",
                            Some(EndpointState::Unavailable { .. }) => "unavailable",
                            _ => "unknown",
                        };
                        json!({ "location": r.location, "url": r.url.as_str(), "state": state })
                    })
                    .collect()
            };
            let report = json!({
                "default": client.endpoints().default_endpoint().as_str(),
                "multiple_write_locations": client.endpoints().multiple_write_enabled(),
                "write": describe(&snapshot.write),
                "read": describe(&snapshot.read),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn print_response(response: &ResponseEnvelope) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("status: {}", response.status_code);
    if let Some(activity_id) = response.activity_id() {
        eprintln!("activity-id: {activity_id}");
    }
    if let Some(charge) = response.request_charge() {
        eprintln!("request-charge: {charge}");
    }
    if let Some(continuation) = response.continuation() {
        eprintln!("continuation: {continuation}");
    }
    match &response.result {
        Some(body) => println!("{}", serde_json::to_string_pretty(body)?),
        None => println!("(no content)"),
    }
    Ok(())
}
