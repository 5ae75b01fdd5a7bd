//! `kiln clean` and `kiln remove-all`.

use tracing::{info, instrument};

use kiln_core::application::Command;

use crate::{
    cli::{GlobalArgs, ProjectArgs, RemoveAllArgs},
    commands::session::Session,
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
};

/// Remove the venv, caches and build output.
#[instrument(skip_all)]
pub fn clean(
    args: ProjectArgs,
    global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let session = Session::open(&global, &args, &config, false)?;
    let report = session.run(&Command::Clean)?;
    Ok(output.report(&report, global.verbose > 0)?)
}

/// Remove everything kiln generates after showing what will go.
///
/// Requires `--yes` or an interactive confirmation.
#[instrument(skip_all)]
pub fn remove_all(
    args: RemoveAllArgs,
    global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let session = Session::open(&global, &args.project, &config, false)?;
    if session.is_dry_run() {
        let report = session.run(&Command::RemoveAll)?;
        return Ok(output.report(&report, true)?);
    }

    let pipeline = session.route(&Command::RemoveAll)?;
    if !args.yes {
        let preview = session.preview(&pipeline)?;
        if preview.change_count() == 0 {
            return Ok(output.report(&preview, false)?);
        }
        output.warning(&format!(
            "This removes {} path(s) under {}:",
            preview.change_count(),
            session.root().display()
        ))?;
        for effect in preview.changes() {
            output.print(&format!("  {effect}"))?;
        }
        if !confirm("Remove these paths?")? {
            return Err(CliError::Cancelled);
        }
    }

    let report = session.execute(&pipeline)?;
    info!(removed = report.change_count(), "remove-all finished");
    Ok(output.report(&report, false)?)
}

#[cfg(feature = "interactive")]
fn confirm(prompt: &str) -> CliResult<bool> {
    use std::io::IsTerminal as _;

    if !std::io::stdin().is_terminal() {
        return Err(CliError::InvalidInput {
            message: "refusing to remove files without --yes in a non-interactive session".into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| CliError::InvalidInput {
            message: format!("confirmation failed: {e}"),
        })
}

#[cfg(not(feature = "interactive"))]
fn confirm(_prompt: &str) -> CliResult<bool> {
    Err(CliError::FeatureNotAvailable {
        feature: "interactive",
    })
}
