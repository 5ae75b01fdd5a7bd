//! CLI argument definitions using the clap derive API.
//!
//! This module is the *only* place that knows about argument names, aliases,
//! help text, and value enums.  No business logic lives here.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use kiln_core::domain::{Layout, ScriptEntry};

pub mod global;
pub use global::{GlobalArgs, OutputFormat};

// ── Top-level CLI ─────────────────────────────────────────────────────────────

/// Main CLI entry-point.
#[derive(Debug, Parser)]
#[command(
    name    = "kiln",
    bin_name = "kiln",
    version  = env!("CARGO_PKG_VERSION"),
    author   = env!("CARGO_PKG_AUTHORS"),
    about    = "\u{1f525} Composable Python project scaffolding on top of uv",
    long_about = "Kiln lays out a uv-managed Python project from composable \
                  feature modules and wraps the everyday uv/ruff/pytest loop. \
                  Every command converges: re-running it changes nothing.",
    after_help = "EXAMPLES:\n\
        \x20 kiln setup\n\
        \x20 kiln add ml llm --no-install\n\
        \x20 kiln -C ../svc add-fastapi\n\
        \x20 kiln test\n\
        \x20 kiln remove-all --yes",
    arg_required_else_help = true,
    subcommand_required    = true,
)]
pub struct Cli {
    /// Flags available on every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

// ── Subcommands ───────────────────────────────────────────────────────────────

/// All available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scaffold the base project and install its tooling.
    #[command(
        about = "Scaffold the base project",
        after_help = "EXAMPLES:\n\
            \x20 kiln setup\n\
            \x20 kiln setup --name my-app --python 3.11 --layout flat\n\
            \x20 kiln setup --dry-run"
    )]
    Setup(ScaffoldArgs),

    /// Scaffold base plus one or more features.
    #[command(
        visible_alias = "a",
        about = "Add features to the project",
        after_help = "EXAMPLES:\n\
            \x20 kiln add ml\n\
            \x20 kiln add llm graph notebook\n\
            \x20 kiln features   # list what can be added"
    )]
    Add(AddArgs),

    /// Shorthand for `add notebook`.
    #[command(about = "Add Jupyter notebook support")]
    AddNotebook(ScaffoldArgs),

    /// Shorthand for `add ml`.
    #[command(about = "Add machine-learning directories and libraries")]
    AddMl(ScaffoldArgs),

    /// Shorthand for `add llm`.
    #[command(about = "Add an LLM prompts package and client libraries")]
    AddLlm(ScaffoldArgs),

    /// Shorthand for `add graph`.
    #[command(about = "Add a graphs package and graph libraries")]
    AddGraph(ScaffoldArgs),

    /// Shorthand for `add web-app`.
    #[command(about = "Add the FastAPI application skeleton under app/")]
    AddFastapi(ScaffoldArgs),

    /// Create the virtual environment and sync dependencies.
    #[command(about = "Create the venv and sync dependencies")]
    Init(ProjectArgs),

    /// Format then lint with ruff.
    #[command(about = "Format and lint (ruff)")]
    Sanitize(ProjectArgs),

    /// Run the test suite.
    #[command(about = "Run tests (pytest)")]
    Test(ProjectArgs),

    /// Run the test suite with coverage.
    #[command(about = "Run tests with coverage")]
    Coverage(ProjectArgs),

    /// Remove the virtual environment, caches and build output.
    #[command(about = "Remove venv, caches and build artifacts")]
    Clean(ProjectArgs),

    /// Run the package entry point.
    #[command(about = "Run the project's main module")]
    Run(ProjectArgs),

    /// Remove everything kiln generates, keeping .env, .gitignore and README.md.
    #[command(
        about = "Remove all generated files",
        after_help = "EXAMPLES:\n\
            \x20 kiln remove-all            # asks first\n\
            \x20 kiln remove-all --yes      # no prompt\n\
            \x20 kiln remove-all --dry-run  # show what would go"
    )]
    RemoveAll(RemoveAllArgs),

    /// List the feature catalog.
    #[command(
        visible_alias = "ls",
        about = "List available features",
        after_help = "EXAMPLES:\n\
            \x20 kiln features\n\
            \x20 kiln features --format json"
    )]
    Features(FeaturesArgs),

    /// Generate shell completion scripts.
    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n\
            \x20 kiln completions bash > ~/.local/share/bash-completion/completions/kiln\n\
            \x20 kiln completions zsh  > ~/.zfunc/_kiln\n\
            \x20 kiln completions fish > ~/.config/fish/completions/kiln.fish"
    )]
    Completions(CompletionsArgs),

    /// Manage the Kiln configuration.
    #[command(
        about = "Configuration management",
        subcommand,
        after_help = "EXAMPLES:\n\
            \x20 kiln config get defaults.python_version\n\
            \x20 kiln config list\n\
            \x20 kiln config init --local"
    )]
    Config(ConfigCommands),
}

// ── shared project options ────────────────────────────────────────────────────

/// Options that shape how the project is laid out.
///
/// Unset flags fall back to the `defaults` config section.
#[derive(Debug, Clone, Default, Args)]
pub struct ProjectArgs {
    /// Project (distribution) name.
    #[arg(
        long = "name",
        value_name = "NAME",
        help = "Project name (default: root directory name)"
    )]
    pub name: Option<String>,

    /// Python version as MAJOR.MINOR (a patch level is accepted).
    #[arg(long = "python", value_name = "VERSION", help = "Python version, e.g. 3.12")]
    pub python: Option<String>,

    /// Package layout under `src/`.
    #[arg(long = "layout", value_enum, help = "Package layout")]
    pub layout: Option<LayoutArg>,

    /// Manifest(s) that get the `[project.scripts]` entry.
    #[arg(long = "script-entry", value_enum, help = "Where to declare the console script")]
    pub script_entry: Option<ScriptEntryArg>,

    /// `init` also installs the package in editable mode.
    #[arg(long = "editable", help = "Install the package editable during init")]
    pub editable: bool,

    /// Preview what would happen without writing files or running tools.
    #[arg(long = "dry-run", help = "Show what would happen without doing it")]
    pub dry_run: bool,
}

/// Options for the scaffolding commands.
#[derive(Debug, Clone, Default, Args)]
pub struct ScaffoldArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Skip `uv add`; only files and manifests are touched.
    #[arg(long = "no-install", help = "Do not run the package manager")]
    pub no_install: bool,
}

/// Arguments for `kiln add`.
#[derive(Debug, Args)]
pub struct AddArgs {
    /// Feature identifiers or aliases.
    #[arg(value_name = "FEATURE", required = true, num_args = 1..)]
    pub features: Vec<String>,

    #[command(flatten)]
    pub scaffold: ScaffoldArgs,
}

/// Arguments for `kiln remove-all`.
#[derive(Debug, Args)]
pub struct RemoveAllArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Skip the confirmation prompt.
    #[arg(short = 'y', long = "yes", help = "Do not ask for confirmation")]
    pub yes: bool,
}

// ── features ──────────────────────────────────────────────────────────────────

/// Arguments for `kiln features`.
#[derive(Debug, Args)]
pub struct FeaturesArgs {
    /// Show a single feature in detail.
    #[arg(value_name = "FEATURE", help = "Show one feature")]
    pub feature: Option<String>,

    /// Output format.
    #[arg(
        long = "format",
        value_enum,
        default_value = "table",
        help = "Output format"
    )]
    pub format: ListFormat,
}

/// Output format for the `features` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    /// Human-readable table.
    Table,
    /// One identifier per line.
    List,
    /// JSON array.
    Json,
}

// ── completions ───────────────────────────────────────────────────────────────

/// Arguments for `kiln completions`.
#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum, help = "Shell to generate completions for")]
    pub shell: Shell,
}

/// Supported shells for completion generation.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ── config subcommands ────────────────────────────────────────────────────────

/// Subcommands for `kiln config`.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the value of a configuration key.
    Get {
        /// Dotted key path, e.g. `tools.package_manager`.
        key: String,
    },
    /// Print all configuration values.
    List,
    /// Print the path to the configuration file.
    Path,
    /// Write a configuration file populated with the defaults.
    Init(ConfigInitArgs),
}

/// Arguments for `kiln config init`.
#[derive(Debug, Args)]
pub struct ConfigInitArgs {
    /// Write `.kiln.toml` in the current directory instead of the user config dir.
    #[arg(long = "local", help = "Create .kiln.toml in the current directory")]
    pub local: bool,

    /// Overwrite an existing config file.
    #[arg(short = 'f', long = "force", help = "Overwrite existing configuration")]
    pub force: bool,

    /// Explicit destination.
    #[arg(long = "path", value_name = "FILE", conflicts_with = "local")]
    pub path: Option<PathBuf>,
}

// ── value enums ───────────────────────────────────────────────────────────────

/// Package layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LayoutArg {
    /// `src/` is the package.
    Flat,
    /// Package in `src/<name>/`.
    Nested,
}

impl From<LayoutArg> for Layout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Flat => Layout::Flat,
            LayoutArg::Nested => Layout::Nested,
        }
    }
}

/// Script entry placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScriptEntryArg {
    Package,
    Tooling,
    Both,
    None,
}

impl From<ScriptEntryArg> for ScriptEntry {
    fn from(arg: ScriptEntryArg) -> Self {
        match arg {
            ScriptEntryArg::Package => ScriptEntry::Package,
            ScriptEntryArg::Tooling => ScriptEntry::Tooling,
            ScriptEntryArg::Both => ScriptEntry::Both,
            ScriptEntryArg::None => ScriptEntry::None,
        }
    }
}

// ── tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_add_with_flags() {
        let cli = Cli::parse_from([
            "kiln", "-C", "/tmp/p", "add", "ml", "llm", "--no-install", "--layout", "flat",
        ]);
        assert_eq!(cli.global.root.as_deref(), Some(std::path::Path::new("/tmp/p")));
        match cli.command {
            Commands::Add(args) => {
                assert_eq!(args.features, vec!["ml", "llm"]);
                assert!(args.scaffold.no_install);
                assert_eq!(args.scaffold.project.layout, Some(LayoutArg::Flat));
            }
            other => panic!("expected add, got {other:?}"),
        }
    }

    #[test]
    fn add_requires_a_feature() {
        assert!(Cli::try_parse_from(["kiln", "add"]).is_err());
    }

    #[test]
    fn shorthand_commands_are_kebab_case() {
        let cli = Cli::parse_from(["kiln", "add-fastapi", "--dry-run"]);
        assert!(matches!(cli.command, Commands::AddFastapi(ref a) if a.project.dry_run));
    }

    #[test]
    fn remove_all_yes_flag() {
        let cli = Cli::parse_from(["kiln", "remove-all", "-y"]);
        assert!(matches!(cli.command, Commands::RemoveAll(RemoveAllArgs { yes: true, .. })));
    }

    #[test]
    fn value_enums_convert_to_core() {
        assert_eq!(Layout::from(LayoutArg::Flat), Layout::Flat);
        assert_eq!(ScriptEntry::from(ScriptEntryArg::Both), ScriptEntry::Both);
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        let result = Cli::try_parse_from(["kiln", "--quiet", "--verbose", "features"]);
        assert!(result.is_err());
    }
}
