//! HTTP server for the IPAM allocation API

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use clap::Parser;
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use ipam_alloc_core::AllocatorConfig;
use ipam_api::{AllocationAPI, AppContext};

#[derive(Parser)]
#[command(name = "api-server")]
#[command(about = "Serve available-resource allocation over HTTP")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: SocketAddr,

    /// JSON inventory file
    #[arg(long, default_value = "/var/lib/ipam/inventory.json")]
    store: PathBuf,

    /// Allocator configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => AllocatorConfig::load_from_file(path)?,
        None => AllocatorConfig::load_with_defaults()?,
    };

    let context = AppContext::bootstrap(&args.store, config).await?;

    let app = Router::new()
        .merge(AllocationAPI::router())
        .route("/", get(root))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(context);

    log::info!("Starting IPAM allocation API on http://{}", args.listen);
    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Root endpoint
async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "name": "IPAM allocation API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "GET|POST /api/ipam/prefixes/{id}/available-prefixes",
            "GET|POST /api/ipam/prefixes/{id}/available-ips",
            "GET|POST /api/ipam/ip-ranges/{id}/available-ips",
            "GET|POST /api/ipam/asn-ranges/{id}/available-asns",
            "GET|POST /api/ipam/vlan-groups/{id}/available-vlans",
            "GET /health"
        ]
    }))
}
