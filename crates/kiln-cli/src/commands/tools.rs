//! `kiln init`, `sanitize`, `test`, `coverage` and `run`.
//!
//! Each maps to a fixed list of package-manager invocations. Tool output is
//! streamed as-is; a failing tool's exit code becomes kiln's.

use tracing::instrument;

use kiln_core::application::{Command, Stage};

use crate::{
    cli::{GlobalArgs, ProjectArgs},
    commands::session::Session,
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

#[instrument(skip_all, fields(command = command.name()))]
pub fn execute(
    command: Command,
    args: ProjectArgs,
    global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let session = Session::open(&global, &args, &config, true)?;

    if session.is_dry_run() {
        let report = session.run(&command)?;
        return Ok(output.report(&report, true)?);
    }

    let pipeline = session.route(&command)?;
    for stage in pipeline.stages() {
        if let Stage::Invoke(invocation) = stage {
            output.info(&format!("$ {invocation}"))?;
        }
    }
    let report = session.execute(&pipeline)?;
    Ok(output.report(&report, false)?)
}
