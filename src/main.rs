//! Contact form service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ───────────────▶ http (axum server, request ID, body limit)
//!                          │
//!                          ▼
//!                      security (rate limiter, CSRF)
//!                          │
//!                          ▼
//!                      routing (category router: token → parse → validate → submit)
//!                          │                     │
//!                          │                     ▼
//!                          │                 forms (merged config, schemas)
//!                          ▼
//!                      email (reCAPTCHA, render, provider)
//!
//!     Cross-cutting: config, observability, lifecycle
//! ```

use std::path::PathBuf;

use clap::Parser;

use contact_forms::config::{load_config, ServerConfig};
use contact_forms::lifecycle::{build_application, signals::spawn_signal_handler, Shutdown};
use contact_forms::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "contact-forms")]
#[command(about = "Contact form service", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };

    init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "contact-forms starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        email_provider = ?config.email.provider,
        rate_limit_enabled = config.rate_limit.enabled,
        "Configuration loaded"
    );

    let app = build_application(config)?;

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    app.run(&shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
