//! Relay one Gotify stream to the log.
//!
//! Demonstrates:
//! - Building a client from token, endpoint and custom headers
//! - Logging every message through `TracingDispatcher`
//! - Graceful stop on Ctrl+C
//!
//! Usage:
//!   cargo run --example relay -- <token> <endpoint>
//!   cargo run --example relay -- <token> <endpoint> --headers '[{"Key":"X-A","Value":"b"}]'
//!   cargo run --example relay -- <token> <endpoint> --debug

// ============================================================================
// Imports
// ============================================================================

use gotify_relay::{ClientOptions, GotifyClient, Result, TracingDispatcher};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments.
#[derive(Debug, Clone)]
struct Args {
    token: String,
    endpoint: String,
    headers: Option<String>,
    debug: bool,
}

impl Args {
    /// Parse command-line arguments.
    fn parse() -> Option<Self> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let positional: Vec<&String> = {
            let mut skip_next = false;
            args.iter()
                .filter(|a| {
                    if skip_next {
                        skip_next = false;
                        return false;
                    }
                    if *a == "--headers" {
                        skip_next = true;
                        return false;
                    }
                    !a.starts_with("--")
                })
                .collect()
        };

        let headers = args
            .iter()
            .position(|a| a == "--headers")
            .and_then(|i| args.get(i + 1))
            .cloned();

        Some(Self {
            token: positional.first()?.to_string(),
            endpoint: positional.get(1)?.to_string(),
            headers,
            debug: args.iter().any(|a| a == "--debug"),
        })
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Initialize tracing/logging.
fn init_logging(debug: bool) {
    let filter = if debug {
        "gotify_relay=debug"
    } else {
        "gotify_relay=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let Some(args) = Args::parse() else {
        eprintln!("usage: relay <token> <endpoint> [--headers <json>] [--debug]");
        std::process::exit(2);
    };
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut options = ClientOptions::new();
    if args.debug {
        options = options.with_verbose();
    }

    let mut builder = GotifyClient::builder()
        .token(args.token)
        .endpoint(args.endpoint)
        .options(options)
        .dispatcher(TracingDispatcher);
    if let Some(headers) = args.headers {
        builder = builder.headers(headers);
    }

    let client = builder.build()?;
    client.start(false)?;

    println!("Relaying, press Ctrl+C to exit...");
    tokio::signal::ctrl_c().await?;

    client.stop().await;
    Ok(())
}
