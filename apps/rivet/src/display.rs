//! Output rendering and formatting

use crate::events::format_bytes;
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use console::{Style, Term};
use rivet_types::{ColorChoice, Direction, TransactionPlan};
use serde::Serialize;
use std::io;
use std::path::PathBuf;

/// Warnings reported for one component
#[derive(Debug, Clone, Serialize)]
pub struct ComponentReport {
    pub component: String,
    pub warnings: Vec<String>,
}

/// Result of `rivet check`
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub manifest: PathBuf,
    pub components: usize,
    pub reports: Vec<ComponentReport>,
    /// Definitions dropped while building the graph
    pub rejected: Vec<String>,
}

impl CheckReport {
    pub fn warning_count(&self) -> usize {
        self.reports.iter().map(|r| r.warnings.len()).sum::<usize>() + self.rejected.len()
    }
}

/// Result of an install or uninstall run
#[derive(Debug, Clone, Serialize)]
pub struct TransactionReport {
    pub id: String,
    pub action: String,
    pub status: String,
    pub components: Vec<String>,
    pub required_space: u64,
    pub steps: usize,
    pub performed: usize,
    pub undone: usize,
    pub undo_failures: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything a command can hand back for rendering
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CommandResult {
    Check(CheckReport),
    Plan(TransactionPlan),
    Transaction(TransactionReport),
    ServerStopped { socket: PathBuf },
}

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    /// Use JSON output format
    json_output: bool,
    /// Color configuration
    color_choice: ColorChoice,
    /// Terminal instance
    term: Term,
}

impl OutputRenderer {
    /// Create new output renderer
    pub fn new(json_output: bool, color_choice: ColorChoice) -> Self {
        Self {
            json_output,
            color_choice,
            term: Term::stdout(),
        }
    }

    /// Render command result
    pub fn render_result(&self, result: &CommandResult) -> io::Result<()> {
        if self.json_output {
            self.render_json(result)
        } else {
            self.render_table(result)
        }
    }

    fn render_json(&self, result: &CommandResult) -> io::Result<()> {
        let json = serde_json::to_string_pretty(result).map_err(io::Error::other)?;
        self.term.write_line(&json)
    }

    fn render_table(&self, result: &CommandResult) -> io::Result<()> {
        match result {
            CommandResult::Check(report) => self.render_check_report(report),
            CommandResult::Plan(plan) => self.render_plan(plan),
            CommandResult::Transaction(report) => self.render_transaction_report(report),
            CommandResult::ServerStopped { socket } => self
                .term
                .write_line(&format!("Server on {} stopped", socket.display())),
        }
    }

    fn render_check_report(&self, report: &CheckReport) -> io::Result<()> {
        if report.warning_count() == 0 {
            return self.term.write_line(&format!(
                "{} {} component(s) in {} checked, no warnings",
                self.style_ok("[OK]"),
                report.components,
                report.manifest.display()
            ));
        }

        let mut table = self.new_table(&["Component", "Warning"]);
        for component in &report.reports {
            for warning in &component.warnings {
                table.add_row(vec![Cell::new(&component.component), Cell::new(warning)]);
            }
        }
        for rejected in &report.rejected {
            table.add_row(vec![
                Cell::new("-").fg(Color::Red),
                Cell::new(rejected).fg(Color::Red),
            ]);
        }

        self.term.write_line(&table.to_string())?;
        self.term.write_line(&format!(
            "{} warning(s) across {} component(s)",
            report.warning_count(),
            report.components
        ))
    }

    fn render_plan(&self, plan: &TransactionPlan) -> io::Result<()> {
        if plan.is_empty() {
            return self
                .term
                .write_line(&format!("Nothing to {}.", plan.action));
        }

        let mut table = self.new_table(&["#", "Component", "Operation", "Arguments", "Direction"]);
        for (index, operation) in plan.operations.iter().enumerate() {
            let direction = match operation.direction {
                Direction::Perform => Cell::new("perform").fg(Color::Green),
                Direction::Revert => Cell::new("revert").fg(Color::Yellow),
            };
            table.add_row(vec![
                Cell::new(index + 1),
                Cell::new(&operation.component),
                Cell::new(&operation.spec.name),
                Cell::new(operation.spec.arguments.join(" ")),
                direction,
            ]);
        }

        self.term.write_line(&table.to_string())?;
        self.term.write_line(&format!(
            "{}: {} ({} required)",
            plan.action,
            plan.components.join(", "),
            format_bytes(plan.required_space)
        ))
    }

    fn render_transaction_report(&self, report: &TransactionReport) -> io::Result<()> {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        let status = match report.status.as_str() {
            "success" => Cell::new(&report.status).fg(Color::Green),
            "canceled" => Cell::new(&report.status).fg(Color::Yellow),
            _ => Cell::new(&report.status).fg(Color::Red),
        };
        table.add_row(vec![
            Cell::new("Transaction").add_attribute(Attribute::Bold),
            Cell::new(&report.id),
        ]);
        table.add_row(vec![
            Cell::new("Action").add_attribute(Attribute::Bold),
            Cell::new(&report.action),
        ]);
        table.add_row(vec![
            Cell::new("Status").add_attribute(Attribute::Bold),
            status,
        ]);
        table.add_row(vec![
            Cell::new("Components").add_attribute(Attribute::Bold),
            Cell::new(report.components.join(", ")),
        ]);
        table.add_row(vec![
            Cell::new("Steps").add_attribute(Attribute::Bold),
            Cell::new(format!("{}/{} performed", report.performed, report.steps)),
        ]);
        if report.undone > 0 || report.undo_failures > 0 {
            table.add_row(vec![
                Cell::new("Rollback").add_attribute(Attribute::Bold),
                Cell::new(format!(
                    "{} undone, {} failed",
                    report.undone, report.undo_failures
                )),
            ]);
        }
        if let Some(error) = &report.error {
            table.add_row(vec![
                Cell::new("Error").add_attribute(Attribute::Bold),
                Cell::new(error).fg(Color::Red),
            ]);
        }
        self.term.write_line(&table.to_string())
    }

    fn new_table(&self, headers: &[&str]) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(
                headers
                    .iter()
                    .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
                    .collect::<Vec<_>>(),
            );
        if !self.colors_enabled() {
            table.force_no_tty();
        }
        table
    }

    fn style_ok(&self, text: &str) -> String {
        if self.colors_enabled() {
            Style::new().green().bold().apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn colors_enabled(&self) -> bool {
        match self.color_choice {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => self.term.features().colors_supported(),
        }
    }
}
