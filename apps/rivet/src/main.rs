//! rivet - transactional component installer
//!
//! Command line front end over the resolver, the transaction executor and
//! the elevated-operation server.

mod cli;
mod commands;
mod display;
mod error;
mod events;
mod logging;

use crate::cli::{Cli, Commands};
use crate::commands::CommandContext;
use crate::display::{CommandResult, OutputRenderer};
use crate::error::CliError;
use crate::events::EventHandler;
use clap::Parser;
use rivet_config::Config;
use rivet_events::EventReceiver;
use rivet_types::ColorChoice;
use std::process;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Parse command line arguments first to check for JSON mode
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        if !json_mode {
            eprintln!("Error: {e}");
        }
        process::exit(1);
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting rivet v{}", env!("CARGO_PKG_VERSION"));

    // File config (or defaults), then environment, then CLI flags
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;
    config.merge_env()?;
    apply_cli_config(&mut config, &cli.global, &cli.command);

    if let Some(manifest) = cli.command.manifest() {
        if !manifest.exists() {
            return Err(CliError::InvalidArguments(format!(
                "manifest {} does not exist",
                manifest.display()
            )));
        }
    }

    let (event_sender, event_receiver) = rivet_events::channel();

    let color = config.general.color;
    let renderer = OutputRenderer::new(cli.global.json, color);
    let colors_enabled = match color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => console::Term::stderr().features().colors_supported(),
    };
    let mut event_handler = EventHandler::new(colors_enabled, cli.global.json, cli.global.debug);

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let ctx = CommandContext {
        config,
        event_sender,
        cancel,
    };

    let result =
        execute_command_with_events(cli.command, ctx, event_receiver, &mut event_handler).await?;

    renderer.render_result(&result)?;

    if let CommandResult::Transaction(report) = &result {
        if report.status != "success" {
            return Err(CliError::TransactionFailed {
                status: report.status.clone(),
                message: report
                    .error
                    .clone()
                    .unwrap_or_else(|| "rolled back".to_string()),
            });
        }
    }

    info!("Command completed successfully");
    Ok(())
}

/// Execute command with concurrent event handling
async fn execute_command_with_events(
    command: Commands,
    ctx: CommandContext,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<CommandResult, CliError> {
    let mut command_future = Box::pin(execute_command(command, ctx));

    loop {
        select! {
            result = &mut command_future => {
                // Drain any remaining events
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(event);
                }
                return result;
            }

            event = event_receiver.recv() => {
                if let Some(event) = event {
                    event_handler.handle_event(event);
                }
            }
        }
    }
}

/// Execute the specified command
async fn execute_command(
    command: Commands,
    ctx: CommandContext,
) -> Result<CommandResult, CliError> {
    match command {
        Commands::Check { manifest } => commands::check(&ctx, &manifest).await,
        Commands::Plan {
            manifest,
            select,
            deselect,
            uninstall,
        } => commands::plan(&ctx, &manifest, &select, &deselect, uninstall).await,
        Commands::Install {
            manifest,
            select,
            deselect,
            ..
        } => commands::install(&ctx, &manifest, &select, &deselect).await,
        Commands::Uninstall {
            manifest,
            components,
        } => commands::uninstall(&ctx, &manifest, &components).await,
        Commands::StartServer { .. } => commands::start_server(&ctx).await,
    }
}

/// Cancel the running command on the first Ctrl-C
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("interrupt received, cancelling");
                cancel.cancel();
            }
            Err(e) => warn!(error = %e, "cannot listen for interrupts"),
        }
    });
}

/// Initialize tracing/logging
///
/// Logs go to stderr so stdout stays clean for results. `--json` switches the
/// formatter to JSON lines; `--debug` or `RUST_LOG` raise the level.
fn init_tracing(json_mode: bool, debug_enabled_flag: bool) {
    let debug_enabled = std::env::var("RUST_LOG").is_ok() || debug_enabled_flag;
    let default_filter = if debug_enabled {
        "info,rivet=debug,rivet_transaction=debug,rivet_remote=debug"
    } else {
        "warn,rivet=warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    if json_mode {
        if debug_enabled {
            tracing_subscriber::fmt()
                .json()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .init();
        } else {
            // Keep stderr quiet so JSON consumers only see the result
            tracing_subscriber::fmt()
                .with_writer(std::io::sink)
                .with_env_filter("off")
                .init();
        }
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    }
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(config: &mut Config, global: &cli::GlobalArgs, command: &Commands) {
    if let Some(color) = global.color {
        config.general.color = color;
    }
    if let Some(mode) = global.mode {
        config.general.mode = mode;
    }

    match command {
        Commands::Install {
            target_dir,
            remove_target_dir,
            ..
        } => {
            if let Some(dir) = target_dir {
                config.transaction.target_dir = Some(dir.clone());
            }
            if *remove_target_dir {
                config.transaction.remove_target_dir = true;
            }
        }
        Commands::StartServer {
            socket,
            key,
            remote_mode,
        } => {
            if let Some(socket) = socket {
                config.remote.socket_name = Some(socket.clone());
            }
            if let Some(key) = key {
                config.remote.authorization_key = Some(key.clone());
            }
            if let Some(mode) = remote_mode {
                config.remote.mode = *mode;
            }
        }
        _ => {}
    }
}
