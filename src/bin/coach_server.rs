// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Coach Triathlon Server Binary
//!
//! Serves the weekly endpoints over HTTP.

use anyhow::{Context, Result};
use clap::Parser;
use coach_triathlon::{
    config::Config,
    logging::LoggingConfig,
    providers::StravaSourceFactory,
    routes,
    service::CoachService,
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "coach-triathlon-server")]
#[command(about = "Weekly training-load API over Strava activities")]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind (overrides the config file)
    #[arg(long)]
    host: Option<String>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<String>,

    /// Log format: json, pretty or compact
    #[arg(long)]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut logging = LoggingConfig::from_env();
    if let Some(format) = args.log_format.as_deref() {
        logging = logging.with_format(format);
    }
    logging.init()?;

    let config = Config::load(args.config)?;
    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);
    let ip: IpAddr = host
        .parse()
        .with_context(|| format!("Invalid bind address: {}", host))?;

    let sources = StravaSourceFactory::new(&config.strava).context("Failed to set up Strava client")?;
    let service = Arc::new(CoachService::new(Arc::new(sources), config.analysis.clone()));

    info!(
        host = %ip,
        port,
        api_base = %config.strava.api_base,
        server_token = config.strava.access_token.is_some(),
        zone_model = %config.analysis.zone_model,
        "HTTP server ready"
    );

    warp::serve(routes::api(service))
        .run(SocketAddr::new(ip, port))
        .await;

    Ok(())
}
