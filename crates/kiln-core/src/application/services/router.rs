//! Command Router - maps user commands to pipelines.

use std::collections::HashSet;

use tracing::{debug, instrument};

use crate::{
    application::services::{Pipeline, Stage},
    domain::{
        DependencyGroup, DomainValidator, FeatureDef, FeatureRegistry, RelativePath,
        RenderContext, ScaffoldOptions, ToolInvocation, requirement_name,
    },
    error::KilnResult,
};

/// Archive the `web-app` feature unpacks into `app/` by default.
pub const DEFAULT_WEB_APP_ARCHIVE: &str =
    "https://github.com/fastapi/full-stack-fastapi-template/archive/refs/heads/master.tar.gz";

/// A user-level command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Scaffold the base project.
    Setup,
    /// Scaffold base plus the given features.
    Add { features: Vec<String> },
    /// Create the virtual environment and sync dependencies.
    Init,
    /// Format then lint.
    Sanitize,
    Test,
    Coverage,
    Clean,
    /// Run the package entry point.
    Run,
    RemoveAll,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Add { .. } => "add",
            Self::Init => "init",
            Self::Sanitize => "sanitize",
            Self::Test => "test",
            Self::Coverage => "coverage",
            Self::Clean => "clean",
            Self::Run => "run",
            Self::RemoveAll => "remove-all",
        }
    }
}

/// Tool and network settings the router bakes into pipelines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    /// Package manager executable (`uv`).
    pub package_manager: String,
    pub web_app_archive_url: String,
    /// When `false`, scaffolding commands skip package-manager stages.
    pub install: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            package_manager: "uv".into(),
            web_app_archive_url: DEFAULT_WEB_APP_ARCHIVE.into(),
            install: true,
        }
    }
}

pub struct CommandRouter {
    registry: FeatureRegistry,
    config: RouterConfig,
}

impl CommandRouter {
    pub fn new(registry: FeatureRegistry, config: RouterConfig) -> Self {
        Self { registry, config }
    }

    /// Build the pipeline for `command`.
    ///
    /// Unknown features are rejected here, before any stage can run.
    #[instrument(skip_all, fields(command = command.name()))]
    pub fn route(&self, command: &Command, options: &ScaffoldOptions) -> KilnResult<Pipeline> {
        options.validate()?;
        let pipeline = Pipeline::new(command.name(), options.clone());
        let ctx = RenderContext::from_options(options);

        let pipeline = match command {
            Command::Setup => self.scaffold(pipeline, &[])?,
            Command::Add { features } => {
                DomainValidator::validate_requested(&self.registry, features)?;
                self.scaffold(pipeline, features)?
            }
            Command::Init => {
                let pm = &self.config.package_manager;
                let version = options.python_version.as_str();
                let mut stages = vec![
                    ToolInvocation::new(pm, pm).args(["venv", "--python", version]),
                    ToolInvocation::new(pm, pm).arg("sync"),
                ];
                if options.editable_install {
                    stages.push(
                        ToolInvocation::new(pm, pm).args(["pip", "install", "-e", "src"]),
                    );
                }
                pipeline.stages_from(stages.into_iter().map(Stage::Invoke))
            }
            Command::Sanitize => pipeline
                .stage(self.uv_run("ruff", ["format", "src", "tests"]))
                .stage(self.uv_run("ruff", ["check", "--fix", "src", "tests"])),
            Command::Test => pipeline.stage(self.uv_run("pytest", ["tests"])),
            Command::Coverage => {
                let cov = ctx.render("--cov={{PACKAGE_MODULE}}");
                pipeline.stage(self.uv_run(
                    "pytest",
                    [cov.as_str(), "--cov-report=term-missing", "tests"],
                ))
            }
            Command::Clean => pipeline.stage(Stage::Clean),
            Command::Run => {
                let entry = ctx.render("{{PACKAGE_DIR}}/main.py");
                pipeline.stage(self.uv_run("python", [entry.as_str()]))
            }
            Command::RemoveAll => pipeline.stage(Stage::RemoveAll),
        };

        debug!(stages = pipeline.stages().len(), "routed");
        Ok(pipeline)
    }

    fn scaffold(&self, pipeline: Pipeline, requested: &[String]) -> KilnResult<Pipeline> {
        let resolved = self.registry.resolve(requested)?;
        let mut pipeline = pipeline
            .stage(Stage::Plan {
                features: requested.to_vec(),
            })
            .stage(Stage::Materialize)
            .stage(Stage::ComposeManifests);

        for def in &resolved {
            if let Some(dir) = def.skeleton_dir {
                pipeline = pipeline.stage(Stage::Fetch {
                    url: self.config.web_app_archive_url.clone(),
                    dest: RelativePath::try_new(dir)?,
                });
            }
        }

        if !self.config.install {
            return Ok(pipeline);
        }

        // `setup` installs the base toolchain; `add` only what the requested
        // features bring beyond it.
        let installing: Vec<&FeatureDef> = if requested.is_empty() {
            resolved
        } else {
            let baseline: HashSet<&str> = self
                .registry
                .resolve::<&str>(&[])?
                .iter()
                .map(|d| d.id)
                .collect();
            resolved
                .into_iter()
                .filter(|d| !baseline.contains(d.id))
                .collect()
        };

        Ok(pipeline.stages_from(self.install_stages(&installing)))
    }

    fn install_stages(&self, defs: &[&FeatureDef]) -> Vec<Stage> {
        let pm = &self.config.package_manager;
        let mut stages = Vec::new();
        for group in [DependencyGroup::Dev, DependencyGroup::Runtime] {
            let mut seen = HashSet::new();
            let specs: Vec<&str> = defs
                .iter()
                .flat_map(|d| d.dependencies_in(group))
                .filter(|spec| seen.insert(requirement_name(spec)))
                .collect();
            if specs.is_empty() {
                continue;
            }
            let mut invocation = ToolInvocation::new(pm, pm).arg("add");
            if group == DependencyGroup::Dev {
                invocation = invocation.arg("--dev");
            }
            stages.push(Stage::Invoke(invocation.args(specs)));
        }
        stages
    }

    fn uv_run<'a>(&self, tool: &str, args: impl IntoIterator<Item = &'a str>) -> Stage {
        let pm = &self.config.package_manager;
        Stage::Invoke(
            ToolInvocation::new(tool, pm)
                .arg("run")
                .arg(tool)
                .args(args),
        )
    }
}
