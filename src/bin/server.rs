//! maildrop Server Binary
//!
//! Starts the store-and-forward messaging server.

use clap::Parser;
use maildrop::network::Server;
use maildrop::Config;
use tracing_subscriber::{fmt, EnvFilter};

/// maildrop Server
#[derive(Parser, Debug)]
#[command(name = "maildrop-server")]
#[command(about = "Store-and-forward messaging server")]
#[command(version)]
struct Args {
    /// Hostname or address to bind
    hostname: String,

    /// Port to listen on
    #[arg(value_parser = parse_port)]
    port: u16,
}

/// Validate a port number argument
fn parse_port(value: &str) -> Result<u16, String> {
    let port: u32 = value
        .parse()
        .map_err(|_| "Port number must be an integer".to_string())?;

    if !(1024..=64000).contains(&port) {
        return Err("Port number must be in the range 1024-64000 (inclusive)".to_string());
    }

    Ok(port as u16)
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,maildrop=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let args = Args::parse();

    tracing::info!("maildrop server v{}", maildrop::VERSION);
    tracing::info!("Listen address: {}:{}", args.hostname, args.port);

    let config = Config::builder()
        .hostname(&args.hostname)
        .port(args.port)
        .build();

    let mut server = match Server::new(config) {
        Ok(server) => server,
        Err(error) => {
            tracing::error!(
                "Error binding socket on provided address {}:{}: {}",
                args.hostname,
                args.port,
                error
            );
            std::process::exit(1);
        }
    };

    if let Err(error) = server.run() {
        tracing::error!("Server error: {}", error);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
