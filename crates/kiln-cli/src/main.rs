//! # Kiln CLI
//!
//! Composable Python project scaffolding on top of uv.
//!
//! ## Startup sequence
//!
//! 1. Parse CLI arguments (clap handles `--help` / `--version` early-exit).
//! 2. Load configuration (defaults + files + env).
//! 3. Initialise the tracing subscriber (logging).
//! 4. Build the [`OutputManager`].
//! 5. Dispatch to the appropriate command handler.
//! 6. Translate any [`CliError`] into a user-facing message and exit code.
//!
//! ## Exit codes
//!
//! | Code | Meaning                          |
//! |------|----------------------------------|
//! |  0   | Success                          |
//! |  1   | Internal / system error          |
//! |  2   | User / input error               |
//! |  3   | Resource not found (root, tool)  |
//! |  4   | Configuration error              |
//! |  n   | Exit code of a failing tool      |

use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, info, instrument};

use kiln_core::application::Command;

use crate::{
    cli::{Cli, Commands},
    config::AppConfig,
    error::{CliError, CliResult},
    logging::init_logging,
    output::OutputManager,
};

mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod output;

fn main() -> ExitCode {
    // Missing .env is fine.
    let _ = dotenvy::dotenv();

    // ── 1. Parse arguments ────────────────────────────────────────────────
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version arrive here too.
            let _ = e.print();
            return ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(2));
        }
    };

    // ── 2. Load configuration ─────────────────────────────────────────────
    let config = match AppConfig::load(cli.global.config.as_ref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            let err = CliError::ConfigError {
                message: format!("{e:#}"),
                source: None,
            };
            eprint!("{}", err.format_plain(false));
            return ExitCode::from(err.exit_code());
        }
    };

    // ── 3. Initialise tracing ─────────────────────────────────────────────
    let _log_guard = match init_logging(&cli.global, config.logging.file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialise logging: {e:#}");
            return ExitCode::from(1);
        }
    };

    debug!(
        verbose = cli.global.verbose,
        quiet = cli.global.quiet,
        no_color = cli.global.no_color,
        root = ?cli.global.root,
        "CLI started"
    );

    // ── 4. Build output manager ───────────────────────────────────────────
    let output = OutputManager::new(&cli.global, &config);
    let verbose = cli.global.verbose > 0;
    let colored = output.supports_color();

    // ── 5. Dispatch + 6. Error handling ──────────────────────────────────
    match run(cli, config, output) {
        Ok(()) => {
            info!("kiln completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => handle_error(e, verbose, colored),
    }
}

/// Dispatch to the correct command handler.
#[instrument(skip_all)]
fn run(cli: Cli, config: AppConfig, output: OutputManager) -> CliResult<()> {
    use commands::{clean, completions, config as config_cmd, features, scaffold, tools};

    let global = cli.global;
    let add = |id: &str| vec![id.to_string()];

    match cli.command {
        Commands::Setup(args) => scaffold::execute(Vec::new(), args, global, config, output),
        Commands::Add(args) => {
            scaffold::execute(args.features, args.scaffold, global, config, output)
        }
        Commands::AddNotebook(args) => {
            scaffold::execute(add("notebook"), args, global, config, output)
        }
        Commands::AddMl(args) => scaffold::execute(add("ml"), args, global, config, output),
        Commands::AddLlm(args) => scaffold::execute(add("llm"), args, global, config, output),
        Commands::AddGraph(args) => scaffold::execute(add("graph"), args, global, config, output),
        Commands::AddFastapi(args) => {
            scaffold::execute(add("web-app"), args, global, config, output)
        }
        Commands::Init(args) => tools::execute(Command::Init, args, global, config, output),
        Commands::Sanitize(args) => {
            tools::execute(Command::Sanitize, args, global, config, output)
        }
        Commands::Test(args) => tools::execute(Command::Test, args, global, config, output),
        Commands::Coverage(args) => {
            tools::execute(Command::Coverage, args, global, config, output)
        }
        Commands::Run(args) => tools::execute(Command::Run, args, global, config, output),
        Commands::Clean(args) => clean::clean(args, global, config, output),
        Commands::RemoveAll(args) => clean::remove_all(args, global, config, output),
        Commands::Features(args) => features::execute(args, output),
        Commands::Completions(args) => completions::execute(args),
        Commands::Config(cmd) => config_cmd::execute(cmd, config, output),
    }
}

/// Translate a `CliError` into a user message and an appropriate exit code.
fn handle_error(err: CliError, verbose: bool, colored: bool) -> ExitCode {
    err.log();

    // stderr, so the message survives a redirected stdout.
    let use_color = colored && std::io::IsTerminal::is_terminal(&std::io::stderr());
    let msg = if use_color {
        err.format_colored(verbose)
    } else {
        err.format_plain(verbose)
    };
    eprint!("{msg}");

    ExitCode::from(err.exit_code())
}

// ── tests ─────────────────────────────────────────────────────────────────────
