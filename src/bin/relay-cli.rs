use std::path::PathBuf;

use clap::{Parser, Subcommand};

use relay_gateway::config::{load_config, GatewayConfig};
use relay_gateway::http::request::{request_urls, RequestTarget};
use relay_gateway::routing::{find_route, Route};
use relay_gateway::store::{FileRouteStore, RequestRecord, RouteStore};

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Inspect relay-gateway routes and recorded traffic", long_about = None)]
struct Cli {
    /// Gateway configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List active routes from the routes file
    Routes,
    /// Show which route a path resolves to and where it is forwarded
    Match {
        /// Request path, optionally with a query string
        path: String,
        /// Host the gateway is reached at
        #[arg(long, default_value = "localhost:8080")]
        host: String,
    },
    /// Print the most recent request log records
    Tail {
        #[arg(short = 'n', long, default_value_t = 20)]
        lines: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    let store = FileRouteStore::new(&config.storage.routes_path);

    match cli.command {
        Commands::Routes => {
            for record in store.active_routes().await? {
                println!(
                    "{:<20} {:<24} -> {}{}",
                    record.id,
                    display_endpoint(&record.endpoint),
                    record.origin_url,
                    if record.store_hits { "" } else { "  (not recorded)" }
                );
            }
        }
        Commands::Match { path, host } => {
            let routes: Vec<Route> = store
                .active_routes()
                .await?
                .iter()
                .map(|r| r.to_route())
                .collect();

            let (path_only, query) = match path.split_once('?') {
                Some((p, q)) => (p, Some(q)),
                None => (path.as_str(), None),
            };
            let Some(route) = find_route(&routes, path_only) else {
                return Err(format!("no route matches {path_only}").into());
            };

            let target = RequestTarget {
                host: &host,
                path: path_only,
                query,
                ..RequestTarget::default()
            };
            let urls = request_urls(&target, route);
            println!("route:   {}", route.id);
            println!("gateway: {}", urls.gateway);
            println!("origin:  {}", urls.origin);
            if route.tls.has_client_cert() {
                println!("tls:     client certificate");
            }
        }
        Commands::Tail { lines } => {
            let content = tokio::fs::read_to_string(&config.storage.requests_path).await?;
            let all: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
            for line in &all[all.len().saturating_sub(lines)..] {
                match serde_json::from_str::<RequestRecord>(line) {
                    Ok(record) => print_record(&record),
                    Err(e) => eprintln!("skipping malformed record: {e}"),
                }
            }
        }
    }

    Ok(())
}

fn display_endpoint(endpoint: &str) -> &str {
    if endpoint.is_empty() {
        "(catch-all)"
    } else {
        endpoint
    }
}

fn print_record(record: &RequestRecord) {
    match record {
        RequestRecord::Request(r) => println!(
            "{} {} -> {} {} {} [{}]",
            r.timestamp.to_rfc3339(),
            r.request_id,
            r.method,
            r.gateway_url,
            r.ip,
            r.route_id
        ),
        RequestRecord::Response(r) => println!(
            "{} {} <- {} in {}ms [{}]",
            r.timestamp.to_rfc3339(),
            r.request_id,
            r.status,
            r.duration_ms,
            r.route_id
        ),
    }
}
