//! Command implementations
//!
//! Each command loads what it needs, does its work through the library
//! crates and hands back a `CommandResult` for rendering. Library output
//! reaches the user through the event channel.

use crate::display::{CheckReport, CommandResult, ComponentReport, TransactionReport};
use crate::error::CliError;
use rivet_components::{check_all, ComponentGraph, Manifest};
use rivet_config::Config;
use rivet_events::{AppEvent, EventEmitter, EventSender, GeneralEvent};
use rivet_operations::{OperationEnvironment, OperationRegistry};
use rivet_remote::{RemoteClient, RemoteServer, ServerSettings};
use rivet_resolver::Resolver;
use rivet_transaction::{Transaction, TransactionExecutor, TransactionPolicy};
use rivet_types::{InstallerMode, PlanAction, TransactionPlan};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Shared state handed to every command
pub struct CommandContext {
    pub config: Config,
    pub event_sender: EventSender,
    /// Fires on Ctrl-C
    pub cancel: CancellationToken,
}

impl EventEmitter for CommandContext {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(&self.event_sender)
    }
}

impl CommandContext {
    fn registry(&self) -> OperationRegistry {
        OperationRegistry::with_builtin_kinds(&OperationEnvironment::from_config(&self.config))
    }

    fn resolver(&self) -> Resolver {
        Resolver::new().with_event_sender(self.event_sender.clone())
    }
}

/// Load a manifest into a graph, reporting rejected definitions as warnings
async fn load_graph(
    ctx: &CommandContext,
    manifest: &Path,
    mode: InstallerMode,
) -> Result<(ComponentGraph, Vec<String>), CliError> {
    info!(manifest = %manifest.display(), mode = %mode, "loading component manifest");
    let loaded = Manifest::load_from_file(manifest).await?.build_graph(mode)?;
    let rejected: Vec<String> = loaded.rejected.iter().map(ToString::to_string).collect();
    for message in &rejected {
        ctx.emit_warning_with_context(message.clone(), manifest.display().to_string());
    }
    debug!(
        components = loaded.graph.len(),
        repositories = loaded.repositories.len(),
        "component graph built"
    );
    Ok((loaded.graph, rejected))
}

/// Run the component checker and emit its findings as warning events
fn report_findings(ctx: &CommandContext, graph: &ComponentGraph) -> Vec<ComponentReport> {
    check_all(graph)
        .into_iter()
        .map(|(component, warnings)| {
            ctx.emit(AppEvent::General(GeneralEvent::ComponentWarnings {
                component: component.clone(),
                warnings: warnings.clone(),
            }));
            ComponentReport {
                component,
                warnings,
            }
        })
        .collect()
}

fn apply_selection(
    graph: &mut ComponentGraph,
    select: &[String],
    deselect: &[String],
) -> Result<(), CliError> {
    for name in select {
        graph.set_selected(name, true)?;
    }
    for name in deselect {
        graph.set_selected(name, false)?;
    }
    Ok(())
}

/// `rivet check`
pub async fn check(ctx: &CommandContext, manifest: &Path) -> Result<CommandResult, CliError> {
    let mode = ctx.config.general.mode;
    let (graph, rejected) = load_graph(ctx, manifest, mode).await?;

    let reports = report_findings(ctx, &graph);

    Ok(CommandResult::Check(CheckReport {
        manifest: manifest.to_path_buf(),
        components: graph.len(),
        reports,
        rejected,
    }))
}

/// `rivet plan`
pub async fn plan(
    ctx: &CommandContext,
    manifest: &Path,
    select: &[String],
    deselect: &[String],
    uninstall: bool,
) -> Result<CommandResult, CliError> {
    let (action, mode) = if uninstall {
        (PlanAction::Uninstall, InstallerMode::PackageManager)
    } else {
        (PlanAction::Install, ctx.config.general.mode)
    };
    let (mut graph, _) = load_graph(ctx, manifest, mode).await?;
    apply_selection(&mut graph, select, deselect)?;
    report_findings(ctx, &graph);

    let plan = ctx.resolver().plan(&graph, action)?;
    Ok(CommandResult::Plan(plan))
}

/// `rivet install`
pub async fn install(
    ctx: &CommandContext,
    manifest: &Path,
    select: &[String],
    deselect: &[String],
) -> Result<CommandResult, CliError> {
    let (mut graph, _) = load_graph(ctx, manifest, ctx.config.general.mode).await?;
    apply_selection(&mut graph, select, deselect)?;
    report_findings(ctx, &graph);

    let plan = ctx.resolver().plan(&graph, PlanAction::Install)?;
    run_plan(ctx, &plan).await
}

/// `rivet uninstall`
pub async fn uninstall(
    ctx: &CommandContext,
    manifest: &Path,
    components: &[String],
) -> Result<CommandResult, CliError> {
    let (mut graph, _) = load_graph(ctx, manifest, InstallerMode::PackageManager).await?;
    for name in components {
        match graph.component(name) {
            Some(component) if component.is_installed() => graph.set_selected(name, false)?,
            Some(_) => {
                return Err(CliError::InvalidArguments(format!(
                    "component {name} is not installed"
                )))
            }
            None => {
                return Err(CliError::InvalidArguments(format!(
                    "unknown component {name}"
                )))
            }
        }
    }
    report_findings(ctx, &graph);

    let plan = ctx.resolver().plan(&graph, PlanAction::Uninstall)?;
    run_plan(ctx, &plan).await
}

/// Build a transaction from `plan` and run it, delegating elevated kinds
/// when remote execution is enabled
async fn run_plan(ctx: &CommandContext, plan: &TransactionPlan) -> Result<CommandResult, CliError> {
    let registry = ctx.registry();
    let mut transaction = Transaction::from_plan(plan, &registry)?;

    let mut executor = TransactionExecutor::new(TransactionPolicy::from_config(&ctx.config))
        .with_event_sender(ctx.event_sender.clone());

    let remote = if ctx.config.remote.enabled {
        let client = Arc::new(
            RemoteClient::connect_with_config(&ctx.config.remote)
                .await?
                .with_event_sender(ctx.event_sender.clone()),
        );
        executor = executor.with_remote(
            client.clone(),
            ctx.config.remote.elevated_operations.iter().cloned(),
        );
        Some(client)
    } else {
        None
    };

    ctx.emit_operation_started(plan.action.to_string());
    let outcome = executor.run(&mut transaction, &ctx.cancel).await?;
    ctx.emit_operation_completed(plan.action.to_string(), outcome.is_success());

    if let Some(client) = remote {
        client.disconnect().await;
    }

    Ok(CommandResult::Transaction(TransactionReport {
        id: transaction.id().to_string(),
        action: plan.action.to_string(),
        status: outcome.status.to_string(),
        components: plan.components.clone(),
        required_space: plan.required_space,
        steps: transaction.len(),
        performed: outcome.performed,
        undone: outcome.undone,
        undo_failures: outcome.undo_failures,
        error: outcome.error.as_ref().map(ToString::to_string),
    }))
}

/// `rivet start-server`
pub async fn start_server(ctx: &CommandContext) -> Result<CommandResult, CliError> {
    let settings = ServerSettings::from_config(&ctx.config.remote)?;
    let server = RemoteServer::bind(settings, ctx.registry())
        .await
        .map_err(rivet_errors::Error::from)?
        .with_event_sender(ctx.event_sender.clone());
    let socket = server.socket_path().to_path_buf();

    server
        .serve(ctx.cancel.clone())
        .await
        .map_err(rivet_errors::Error::from)?;
    Ok(CommandResult::ServerStopped { socket })
}
