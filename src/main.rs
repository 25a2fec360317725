//! cms-mcp: MCP server exposing CMS content to AI assistants
//!
//! This binary serves CMS content as MCP resources and tools over the
//! transports enabled in the configuration: stdio (default), a TCP
//! socket, and HTTP with SSE response delivery.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde_json::json;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use cms_mcp::config::{self, Config};
use cms_mcp::mcp::http::{run_http, HttpState};
use cms_mcp::mcp::server::run_stdio;
use cms_mcp::mcp::session::{run_eviction, SessionRegistry};
use cms_mcp::mcp::socket::run_socket;
use cms_mcp::mcp::Dispatcher;
use cms_mcp::store::MemoryStore;
use cms_mcp::{resources, tools};

/// MCP server exposing CMS content as resources and tools.
///
/// Publishes sites, pages, templates, components and logs as URI-addressed
/// resources, plus schema-validated tools, to MCP clients over stdio, a
/// TCP socket, or HTTP with SSE delivery.
#[derive(Parser, Debug)]
#[command(name = "cms-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN, // Default to warn for unknown levels
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
///
/// The writer is stderr: stdout belongs to the stdio transport and must
/// carry nothing but protocol messages.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Builds the in-memory store backing the default wiring.
///
/// A real deployment substitutes store implementations bound to the CMS
/// database and filesystem; the demo content keeps the server usable out
/// of the box.
fn demo_store() -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    store.insert_table(
        "sites",
        vec![[
            ("slug".to_string(), json!("main")),
            ("name".to_string(), json!("Main Site")),
            ("locale".to_string(), json!("en")),
        ]
        .into_iter()
        .collect()],
    );
    store.insert_table(
        "pages",
        vec![[
            ("slug".to_string(), json!("welcome")),
            ("title".to_string(), json!("Welcome")),
            ("body".to_string(), json!("Welcome to the CMS.")),
        ]
        .into_iter()
        .collect()],
    );
    store.insert_table("page_versions", vec![]);
    store.insert_file("templates/default", "<html>{{ content }}</html>");
    store.insert_file("components/header", "<header>{{ site.name }}</header>");
    store.insert_file("packages.json", "{\"packages\": []}");
    Arc::new(store)
}

/// Runs every enabled transport over one shared dispatcher.
async fn run(cfg: Config) -> std::io::Result<()> {
    let store = demo_store();
    let dispatcher = Dispatcher::new(
        Arc::new(resources::default_registry(&store)),
        Arc::new(tools::default_registry(&store)),
    );

    let mut background: Vec<tokio::task::JoinHandle<std::io::Result<()>>> = Vec::new();

    if cfg.socket.enabled {
        let bind: SocketAddr = cfg.socket.bind.parse().map_err(std::io::Error::other)?;
        background.push(tokio::spawn(run_socket(bind, dispatcher.clone())));
    }

    if cfg.http.enabled {
        let bind: SocketAddr = cfg.http.bind.parse().map_err(std::io::Error::other)?;
        let sessions = Arc::new(SessionRegistry::new(Duration::from_secs(
            cfg.session.idle_timeout_secs,
        )));
        let state = Arc::new(HttpState::new(
            sessions.clone(),
            dispatcher.clone(),
            Duration::from_secs(cfg.session.heartbeat_secs),
            Duration::from_secs(cfg.session.request_timeout_secs),
        ));
        // Eviction sweeps ride the heartbeat cadence.
        tokio::spawn(run_eviction(
            sessions,
            Duration::from_secs(cfg.session.heartbeat_secs),
        ));
        background.push(tokio::spawn(run_http(bind, state)));
    }

    if cfg.stdio.enabled {
        // Foreground: when stdin closes or a signal arrives, the process
        // shuts down and takes the background transports with it.
        run_stdio(dispatcher).await
    } else {
        for handle in background {
            handle.await.map_err(std::io::Error::other)??;
        }
        Ok(())
    }
}

/// Entry point for the cms-mcp server.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let config_path = args.config.as_deref();
    let cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if config_path.is_none() {
                if let Some(default_path) = config::default_config_path() {
                    eprintln!("\nExpected config at: {}", default_path.display());
                }
            }
            return ExitCode::FAILURE;
        }
    };

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    // Display GPL license notice (required by GPLv3 Section 5d)
    eprintln!(
        "cms-mcp {}  Copyright (C) 2026  The Embedded Society",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("This program comes with ABSOLUTELY NO WARRANTY.");
    eprintln!("This is free software, licensed under GPL-3.0-or-later.");
    eprintln!("Source: {}", env!("CARGO_PKG_REPOSITORY"));
    eprintln!();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        stdio = cfg.stdio.enabled,
        socket = cfg.socket.enabled,
        http = cfg.http.enabled,
        "Starting cms-mcp server"
    );

    // Single-threaded runtime: every connection handler, heartbeat tick
    // and dispatch task is cooperatively scheduled on one OS thread.
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cfg)) {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}
