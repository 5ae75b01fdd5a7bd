//! Shared setup for commands that run a pipeline against a project root.
//!
//! Responsibility: resolve the root and [`ScaffoldOptions`] from flags and
//! config, wire the production adapters into an [`Engine`], and run or
//! preview a routed pipeline. No planning logic lives here.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use kiln_adapters::{HttpArchiveFetcher, LocalFilesystem, ProcessRunner};
use kiln_core::{
    application::{Command, CommandReport, CommandRouter, Engine, Pipeline},
    domain::{FeatureRegistry, ScaffoldOptions},
};

use crate::{
    cli::{GlobalArgs, ProjectArgs},
    config::AppConfig,
    error::{CliError, CliResult, IntoCli},
};

/// A resolved project root with the options and router for it.
pub struct Session {
    root: PathBuf,
    options: ScaffoldOptions,
    router: CommandRouter,
    dry_run: bool,
}

impl Session {
    /// Resolve everything a pipeline command needs.
    ///
    /// `install` controls whether scaffolding pipelines include `uv add`.
    pub fn open(
        global: &GlobalArgs,
        project: &ProjectArgs,
        config: &AppConfig,
        install: bool,
    ) -> CliResult<Self> {
        let root = resolve_root(global.root.as_deref())?;
        let options = build_options(project, config, &root)?;
        debug!(
            root = %root.display(),
            project = %options.project_name,
            layout = %options.layout,
            python = %options.python_version,
            "session resolved"
        );

        Ok(Self {
            root,
            options,
            router: CommandRouter::new(FeatureRegistry::builtin(), config.router_config(install)),
            dry_run: project.dry_run,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn options(&self) -> &ScaffoldOptions {
        &self.options
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn route(&self, command: &Command) -> CliResult<Pipeline> {
        Ok(self.router.route(command, &self.options)?)
    }

    /// Route and run `command`, or only preview it under `--dry-run`.
    #[instrument(skip_all, fields(command = command.name()))]
    pub fn run(&self, command: &Command) -> CliResult<CommandReport> {
        let pipeline = self.route(command)?;
        if self.dry_run {
            self.preview(&pipeline)
        } else {
            self.execute(&pipeline)
        }
    }

    pub fn preview(&self, pipeline: &Pipeline) -> CliResult<CommandReport> {
        Ok(engine().preview(&self.root, pipeline)?)
    }

    pub fn execute(&self, pipeline: &Pipeline) -> CliResult<CommandReport> {
        Ok(engine().execute(&self.root, pipeline)?)
    }
}

fn engine() -> Engine {
    Engine::new(
        Box::new(LocalFilesystem::new()),
        Box::new(ProcessRunner::new()),
        Box::new(HttpArchiveFetcher::new()),
    )
}

/// Absolute project root. Existence is checked by the engine.
pub fn resolve_root(root: Option<&Path>) -> CliResult<PathBuf> {
    let root = root.unwrap_or_else(|| Path::new("."));
    let absolute = std::path::absolute(root)
        .with_cli_context(|| format!("resolving project root {}", root.display()))?;
    // Prefer the canonical form so `.`/`..` never leak into the derived name.
    Ok(absolute.canonicalize().unwrap_or(absolute))
}

/// Merge flags over the `defaults` config section.
pub fn build_options(
    project: &ProjectArgs,
    config: &AppConfig,
    root: &Path,
) -> CliResult<ScaffoldOptions> {
    let name = match &project.name {
        Some(name) => name.clone(),
        None => root
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| CliError::InvalidRoot {
                path: root.to_path_buf(),
                reason: "cannot derive a project name from it; pass --name".into(),
            })?,
    };

    let defaults = &config.defaults;
    Ok(ScaffoldOptions::new(name)
        .with_python_version(
            project
                .python
                .clone()
                .unwrap_or_else(|| defaults.python_version.clone()),
        )
        .with_layout(project.layout.map(Into::into).unwrap_or(defaults.layout))
        .with_script_entry(
            project
                .script_entry
                .map(Into::into)
                .unwrap_or(defaults.script_entry),
        )
        .with_editable_install(project.editable || defaults.editable_install))
}
