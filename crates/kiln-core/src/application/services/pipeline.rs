//! Pipeline engine - runs an ordered list of stages against the ports.
//!
//! Every user command becomes a [`Pipeline`] (see
//! [`CommandRouter`](super::CommandRouter)). The [`Engine`] executes it
//! strictly in order and returns a [`CommandReport`] of the side effects
//! that were applied, or, on failure, [`ApplicationError::StepFailed`]
//! carrying the effects completed before the failing stage.

use std::fmt;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::{
    application::{
        ApplicationError,
        ports::{ArchiveFetcher, Filesystem, ToolRunner},
        services::FileWriter,
    },
    domain::{
        CleanupPolicy, FeatureRegistry, ManifestComposer, PathEntry, PathPlan, RelativePath,
        ScaffoldOptions, ToolInvocation, WritePolicy,
    },
    error::{KilnError, KilnResult},
};

/// One step of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// Compute the path plan for `base` plus these features.
    Plan { features: Vec<String> },
    /// Create planned directories and files.
    Materialize,
    /// Merge planned entries into both manifests.
    ComposeManifests,
    /// Run an external tool in the project root.
    Invoke(ToolInvocation),
    /// Unpack a remote archive into `dest` unless it already has content.
    Fetch { url: String, dest: RelativePath },
    /// Delete ephemeral artifacts.
    Clean,
    /// Delete ephemeral artifacts and everything kiln generates.
    RemoveAll,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Plan { .. } => "plan",
            Self::Materialize => "materialize",
            Self::ComposeManifests => "compose-manifests",
            Self::Invoke(_) => "invoke",
            Self::Fetch { .. } => "fetch",
            Self::Clean => "clean",
            Self::RemoveAll => "remove-all",
        }
    }

    /// Whether the stage needs the package manager.
    pub fn is_invoke(&self) -> bool {
        matches!(self, Self::Invoke(_))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plan { features } if features.is_empty() => write!(f, "plan base"),
            Self::Plan { features } => write!(f, "plan base + {}", features.join(", ")),
            Self::Invoke(inv) => write!(f, "run `{inv}`"),
            Self::Fetch { url, dest } => write!(f, "fetch {url} into {dest}"),
            other => f.write_str(other.name()),
        }
    }
}

/// An ordered list of stages for one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    command: String,
    options: ScaffoldOptions,
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(command: impl Into<String>, options: ScaffoldOptions) -> Self {
        Self {
            command: command.into(),
            options,
            stages: Vec::new(),
        }
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stages_from(mut self, stages: impl IntoIterator<Item = Stage>) -> Self {
        self.stages.extend(stages);
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn options(&self) -> &ScaffoldOptions {
        &self.options
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }
}

/// An observable change (or deliberate non-change) made by a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", rename_all = "kebab-case")]
pub enum SideEffect {
    CreatedDir { path: RelativePath },
    DirExisted { path: RelativePath },
    WroteFile { path: RelativePath, policy: WritePolicy },
    KeptFile { path: RelativePath },
    UpdatedManifest { path: RelativePath, added: Vec<String> },
    ManifestUnchanged { path: RelativePath },
    Removed { path: RelativePath, is_dir: bool },
    RanTool { command: String },
    Fetched { url: String, dest: RelativePath, entries: usize },
    SkippedFetch { dest: RelativePath },
}

impl SideEffect {
    /// `false` for effects that record something left as it was.
    pub fn is_change(&self) -> bool {
        !matches!(
            self,
            Self::DirExisted { .. }
                | Self::KeptFile { .. }
                | Self::ManifestUnchanged { .. }
                | Self::SkippedFetch { .. }
        )
    }
}

impl fmt::Display for SideEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreatedDir { path } => write!(f, "create   {path}/"),
            Self::DirExisted { path } => write!(f, "exists   {path}/"),
            Self::WroteFile { path, policy } => match policy {
                WritePolicy::AlwaysOverwrite => write!(f, "refresh  {path}"),
                WritePolicy::CreateIfAbsent => write!(f, "write    {path}"),
            },
            Self::KeptFile { path } => write!(f, "keep     {path}"),
            Self::UpdatedManifest { path, added } => {
                write!(f, "update   {path} (+{})", added.join(", +"))
            }
            Self::ManifestUnchanged { path } => write!(f, "ok       {path}"),
            Self::Removed { path, is_dir: true } => write!(f, "remove   {path}/"),
            Self::Removed { path, is_dir: false } => write!(f, "remove   {path}"),
            Self::RanTool { command } => write!(f, "run      {command}"),
            Self::Fetched { dest, entries, .. } => {
                write!(f, "fetch    {dest}/ ({entries} entries)")
            }
            Self::SkippedFetch { dest } => write!(f, "skip     {dest}/ (not empty)"),
        }
    }
}

/// What a command did (or, for a dry run, would do).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub dry_run: bool,
    /// Resolved features, when the pipeline planned any.
    pub features: Vec<String>,
    pub effects: Vec<SideEffect>,
}

impl CommandReport {
    fn new(command: &str, dry_run: bool) -> Self {
        Self {
            command: command.to_string(),
            dry_run,
            features: Vec::new(),
            effects: Vec::new(),
        }
    }

    pub fn changes(&self) -> impl Iterator<Item = &SideEffect> {
        self.effects.iter().filter(|e| e.is_change())
    }

    pub fn change_count(&self) -> usize {
        self.changes().count()
    }
}

/// Executes pipelines against injected adapters.
pub struct Engine {
    filesystem: Box<dyn Filesystem>,
    runner: Box<dyn ToolRunner>,
    fetcher: Box<dyn ArchiveFetcher>,
    registry: FeatureRegistry,
}

impl Engine {
    /// Create an engine over the builtin feature registry.
    pub fn new(
        filesystem: Box<dyn Filesystem>,
        runner: Box<dyn ToolRunner>,
        fetcher: Box<dyn ArchiveFetcher>,
    ) -> Self {
        Self {
            filesystem,
            runner,
            fetcher,
            registry: FeatureRegistry::builtin(),
        }
    }

    pub fn with_registry(mut self, registry: FeatureRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Run every stage in order under `root`.
    #[instrument(skip_all, fields(command = %pipeline.command(), root = %root.display()))]
    pub fn execute(&self, root: &Path, pipeline: &Pipeline) -> KilnResult<CommandReport> {
        self.drive(root, pipeline, false)
    }

    /// Describe what [`Self::execute`] would do without mutating anything.
    #[instrument(skip_all, fields(command = %pipeline.command(), root = %root.display()))]
    pub fn preview(&self, root: &Path, pipeline: &Pipeline) -> KilnResult<CommandReport> {
        self.drive(root, pipeline, true)
    }

    fn drive(&self, root: &Path, pipeline: &Pipeline, dry_run: bool) -> KilnResult<CommandReport> {
        if !self.filesystem.is_dir(root) {
            return Err(ApplicationError::RootMissing {
                path: root.to_path_buf(),
            }
            .into());
        }

        let mut run = Run {
            engine: self,
            root,
            options: pipeline.options(),
            dry_run,
            plan: None,
            report: CommandReport::new(pipeline.command(), dry_run),
        };

        for stage in pipeline.stages() {
            info!(stage = %stage, dry_run, "stage");
            if let Err(cause) = run.stage(stage) {
                warn!(stage = stage.name(), error = %cause, "stage failed");
                return Err(ApplicationError::StepFailed {
                    stage: stage.to_string(),
                    completed: run.report.effects,
                    cause: Box::new(cause),
                }
                .into());
            }
        }

        info!(
            changes = run.report.change_count(),
            effects = run.report.effects.len(),
            "command finished"
        );
        Ok(run.report)
    }
}

fn missing_plan(stage: &Stage) -> KilnError {
    KilnError::Internal {
        message: format!("stage '{}' requires a preceding plan stage", stage.name()),
    }
}

/// Mutable state of one pipeline execution.
struct Run<'a> {
    engine: &'a Engine,
    root: &'a Path,
    options: &'a ScaffoldOptions,
    dry_run: bool,
    plan: Option<PathPlan>,
    report: CommandReport,
}

impl Run<'_> {
    fn stage(&mut self, stage: &Stage) -> KilnResult<()> {
        match stage {
            Stage::Plan { features } => {
                let plan =
                    PathPlan::compute(self.root, &self.engine.registry, features, self.options)?;
                debug!(
                    features = ?plan.features(),
                    directories = plan.directories().len(),
                    files = plan.files().len(),
                    "planned"
                );
                self.report.features = plan.features().iter().map(|s| s.to_string()).collect();
                self.plan = Some(plan);
                Ok(())
            }
            Stage::Materialize => {
                let plan = self.plan.as_ref().ok_or_else(|| missing_plan(stage))?;
                FileWriter::new(self.engine.filesystem.as_ref())
                    .dry_run(self.dry_run)
                    .materialize(plan, &mut self.report.effects)
            }
            Stage::ComposeManifests => self.compose_manifests(stage),
            Stage::Invoke(invocation) => {
                if !self.dry_run {
                    self.engine.runner.run(invocation, self.root)?;
                }
                self.push(SideEffect::RanTool {
                    command: invocation.to_string(),
                });
                Ok(())
            }
            Stage::Fetch { url, dest } => self.fetch(url, dest),
            Stage::Clean => {
                let listing = self.engine.filesystem.walk(self.root)?;
                let targets = CleanupPolicy::select(&listing);
                self.remove(targets)
            }
            Stage::RemoveAll => {
                let listing = self.engine.filesystem.walk(self.root)?;
                let targets = CleanupPolicy::removal_targets(
                    &listing,
                    &self.engine.registry,
                    self.options,
                )?;
                self.remove(targets)
            }
        }
    }

    fn compose_manifests(&mut self, stage: &Stage) -> KilnResult<()> {
        let plan = self.plan.take().ok_or_else(|| missing_plan(stage))?;
        let result = self.compose_planned(&plan);
        self.plan = Some(plan);
        result
    }

    /// Each manifest's effect is recorded as soon as it is written.
    fn compose_planned(&mut self, plan: &PathPlan) -> KilnResult<()> {
        for manifest in plan.manifests() {
            let path = plan.absolute(&manifest.path);
            let existing = self.engine.filesystem.read_to_string(&path)?;
            let composition =
                ManifestComposer::compose(manifest.kind, existing.as_deref(), &manifest.entries)?;

            if !composition.changed() {
                self.push(SideEffect::ManifestUnchanged {
                    path: manifest.path.clone(),
                });
                continue;
            }
            if !self.dry_run {
                if let Some(parent) = path.parent() {
                    self.engine.filesystem.create_dir_all(parent)?;
                }
                self.engine.filesystem.write_file(&path, &composition.content)?;
            }
            self.push(SideEffect::UpdatedManifest {
                path: manifest.path.clone(),
                added: composition.added,
            });
        }
        Ok(())
    }

    fn fetch(&mut self, url: &str, dest: &RelativePath) -> KilnResult<()> {
        let target = self.root.join(dest);
        if self.engine.filesystem.is_dir(&target)
            && !self.engine.filesystem.walk(&target)?.is_empty()
        {
            info!(dest = %dest, "destination not empty, skipping download");
            self.push(SideEffect::SkippedFetch { dest: dest.clone() });
            return Ok(());
        }

        let entries = if self.dry_run {
            0
        } else {
            self.engine.filesystem.create_dir_all(&target)?;
            match self.engine.fetcher.fetch_into(url, &target) {
                Ok(entries) => entries,
                Err(err) => {
                    self.discard_partial(&target);
                    return Err(err);
                }
            }
        };
        self.push(SideEffect::Fetched {
            url: url.to_string(),
            dest: dest.clone(),
            entries,
        });
        Ok(())
    }

    /// Reset a fetch destination to empty so the next run downloads again.
    ///
    /// Only called for destinations that were empty before the fetch.
    fn discard_partial(&self, target: &Path) {
        let fs = self.engine.filesystem.as_ref();
        let reset = fs
            .remove_dir_all(target)
            .and_then(|()| fs.create_dir_all(target));
        if let Err(err) = reset {
            warn!(dest = %target.display(), error = %err, "could not discard partial download");
        }
    }

    fn remove(&mut self, targets: Vec<PathEntry>) -> KilnResult<()> {
        for target in targets {
            let path = self.root.join(&target.path);
            if !self.dry_run {
                if target.is_dir {
                    self.engine.filesystem.remove_dir_all(&path)?;
                } else {
                    self.engine.filesystem.remove_file(&path)?;
                }
            }
            self.push(SideEffect::Removed {
                path: target.path,
                is_dir: target.is_dir,
            });
        }
        Ok(())
    }

    fn push(&mut self, effect: SideEffect) {
        debug!(effect = %effect, "applied");
        self.report.effects.push(effect);
    }
}
