//! Edge Dispatch
//!
//! An edge HTTP service built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌──────────────────────────────────────────────────────┐
//!                          │                     EDGE SERVICE                     │
//!                          │                                                      │
//!     Client Request       │  ┌─────────┐    ┌────────────┐    ┌──────────────┐   │
//!     ─────────────────────┼─▶│  http   │───▶│  routing   │───▶│   handlers   │   │
//!                          │  │ server  │    │ dispatcher │    │              │   │
//!                          │  └─────────┘    └─────┬──────┘    └──┬───┬───┬───┘   │
//!                          │                       │              │   │   │       │
//!                          │              error chain, hooks      │   │   │       │
//!                          │                                      ▼   │   ▼       │
//!                          │                           ┌─────────┐   │ ┌────────┐ │
//!                          │                           │ secrets │   │ │upstream│◀┼──── Origin /
//!                          │                           │  cache  │   │ │ client │ │     Weather API
//!                          │                           └─────────┘   │ └───┬────┘ │
//!                          │                                         ▼     ▼      │
//!     Client Response      │                                   ┌────────────┐     │
//!     ◀────────────────────┼───────────────────────────────────│  rewrite   │     │
//!                          │                                   │  (stream)  │     │
//!                          │                                   └────────────┘     │
//!                          │  ┌────────────────────────────────────────────────┐  │
//!                          │  │ config · observability · lifecycle             │  │
//!                          │  └────────────────────────────────────────────────┘  │
//!                          └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;

use edge_dispatch::lifecycle::startup::{self, StartupOptions};

#[derive(Debug, Parser)]
#[command(name = "edge-dispatch")]
#[command(about = "Edge HTTP service with streaming HTML rewriting", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    startup::run(StartupOptions {
        config_path: cli.config,
        bind_address: cli.bind,
    })
    .await?;

    Ok(())
}
