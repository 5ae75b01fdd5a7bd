//! `kiln setup`, `kiln add` and the `add-*` shorthands.
//!
//! Responsibility: translate CLI arguments into a core [`Command`], run it
//! through a [`Session`], and display the report. No business logic lives
//! here.

use tracing::{info, instrument};

use kiln_core::application::{Command, CommandReport};

use crate::{
    cli::{GlobalArgs, ScaffoldArgs},
    commands::session::Session,
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

/// Execute `setup` (no features) or `add` (one or more features).
#[instrument(skip_all, fields(features = ?features))]
pub fn execute(
    features: Vec<String>,
    args: ScaffoldArgs,
    global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let session = Session::open(&global, &args.project, &config, !args.no_install)?;
    let command = if features.is_empty() {
        Command::Setup
    } else {
        Command::Add { features }
    };

    if !session.is_dry_run() {
        output.header(&format!(
            "Scaffolding '{}' in {}",
            session.options().project_name,
            session.root().display()
        ))?;
    }

    let report = session.run(&command)?;
    info!(changes = report.change_count(), "scaffold finished");

    output.report(&report, global.verbose > 0)?;
    if !session.is_dry_run() {
        next_steps(&report, args.no_install, &output)?;
    }
    Ok(())
}

fn next_steps(report: &CommandReport, no_install: bool, output: &OutputManager) -> CliResult<()> {
    if report.command != "setup" {
        return Ok(());
    }
    output.print("")?;
    output.print("Next steps:")?;
    if no_install {
        output.print("  kiln init      # create the venv and install dependencies")?;
    } else {
        output.print("  kiln init      # create the venv and sync")?;
    }
    output.print("  kiln test")?;
    output.print("  kiln features  # see what else can be added")?;
    Ok(())
}
