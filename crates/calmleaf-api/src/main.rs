//! Calmleaf server entry point.
//!
//! Binary name: `calmleaf`
//!
//! Parses CLI arguments, initializes database and services, then starts
//! the REST API server.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};

mod http;
mod state;

use state::AppState;

#[derive(Parser)]
#[command(name = "calmleaf", about = "Calmleaf chat companion backend", version)]
struct Cli {
    /// Increase verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Export spans via OpenTelemetry (stdout exporter)
    #[arg(long, global = true)]
    otel: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8000", env = "CALMLEAF_PORT")]
        port: u16,

        /// Host to bind
        #[arg(long, default_value = "127.0.0.1", env = "CALMLEAF_HOST")]
        host: String,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need app state or tracing
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        generate(*shell, &mut cmd, "calmleaf", &mut std::io::stdout());
        return Ok(());
    }

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "info,calmleaf=debug",
        _ => "trace",
    };
    calmleaf_observe::tracing_setup::init_tracing(filter, cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let state = AppState::init().await?;

    match cli.command {
        Commands::Serve { port, host } => {
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            println!(
                "  {} Calmleaf API listening on {}",
                console::style("⚡").bold(),
                console::style(format!("http://{addr}")).cyan()
            );
            println!("  {}", console::style("Press Ctrl+C to stop").dim());

            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            calmleaf_observe::tracing_setup::shutdown_tracing();
            println!("\n  Server stopped.");
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
