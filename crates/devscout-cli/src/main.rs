mod config;
mod console_cmd;
mod serve_cmd;
mod tui;

#[cfg(test)]
mod test_util;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use config::DevscoutConfig;
use serve_cmd::AppState;

#[derive(Parser)]
#[command(name = "devscout", about = "Developer tools research agent")]
struct Cli {
    /// Research workflow program (overrides DEVSCOUT_WORKFLOW env var)
    #[arg(long, global = true)]
    workflow: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive console prompt (default)
    Console,
    /// Serve the research API over HTTP
    Serve {
        /// Address to bind (overrides [server] bind)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (overrides DEVSCOUT_PORT and [server] port)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Launch the interactive terminal window
    Gui,
    /// Write a default devscout config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

/// Execute the `devscout init` command: write the default config file.
fn cmd_init(force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile::default();
    config::save_config_to(&cfg, &path)?;

    println!("Config written to {}", path.display());
    println!("  workflow.program = {}", cfg.workflow.program);
    println!("  server.port = {}", cfg.server.port);
    println!();
    println!("Next: point [workflow] program at your research workflow and run `devscout`.");

    Ok(())
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `default`.
fn init_tracing(default: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .init();
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Console);

    // The terminal window owns the screen; keep diagnostics off unless asked.
    init_tracing(match command {
        Commands::Gui => "off",
        _ => "info",
    });

    match command {
        Commands::Init { force } => {
            cmd_init(force)?;
        }
        Commands::Console => {
            let resolved = DevscoutConfig::resolve(cli.workflow.as_deref())?;
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            console_cmd::run_console(resolved.workflow.build(), stdin, std::io::stdout()).await?;
        }
        Commands::Serve { bind, port } => {
            let resolved = DevscoutConfig::resolve(cli.workflow.as_deref())?;
            let bind = bind.unwrap_or(resolved.server.bind);
            let port = port.unwrap_or(resolved.server.port);
            let section = resolved.workflow;
            let state = AppState::new(Arc::new(move || section.build()));
            serve_cmd::run_serve(state, &bind, port, &resolved.server.allowed_origins).await?;
        }
        Commands::Gui => {
            let resolved = DevscoutConfig::resolve(cli.workflow.as_deref())?;
            tui::run_gui(resolved.workflow.build(), resolved.gui.dark_mode).await?;
        }
    }

    Ok(())
}
