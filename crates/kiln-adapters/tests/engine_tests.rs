//! End-to-end pipeline runs over the in-memory adapters.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use kiln_adapters::{MemoryFilesystem, RecordingRunner};
use kiln_core::{
    application::{ApplicationError, ports::ArchiveFetcher},
    error::{KilnError, KilnResult},
    prelude::*,
};

const ROOT: &str = "/proj";

/// Writes a fixed two-file skeleton into the in-memory tree.
struct FakeFetcher {
    fs: MemoryFilesystem,
}

impl ArchiveFetcher for FakeFetcher {
    fn fetch_into(&self, _url: &str, dest: &Path) -> KilnResult<usize> {
        self.fs.create_dir_all(&dest.join("backend"))?;
        self.fs.write_file(&dest.join("README.md"), "# skeleton")?;
        self.fs.write_file(&dest.join("backend/main.py"), "app = None")?;
        Ok(2)
    }
}

/// Leaves a partial skeleton behind and fails on its first call.
struct FlakyFetcher {
    fs: MemoryFilesystem,
    failed_once: AtomicBool,
}

impl ArchiveFetcher for FlakyFetcher {
    fn fetch_into(&self, url: &str, dest: &Path) -> KilnResult<usize> {
        if !self.failed_once.swap(true, Ordering::SeqCst) {
            self.fs.write_file(&dest.join("README.md"), "# partial")?;
            return Err(ApplicationError::FetchFailed {
                url: url.to_string(),
                reason: "connection reset".into(),
            }
            .into());
        }
        FakeFetcher {
            fs: self.fs.clone(),
        }
        .fetch_into(url, dest)
    }
}

fn no_install() -> RouterConfig {
    RouterConfig {
        install: false,
        ..RouterConfig::default()
    }
}

struct Harness {
    fs: MemoryFilesystem,
    runner: RecordingRunner,
    engine: Engine,
}

impl Harness {
    fn new() -> Self {
        let fs = MemoryFilesystem::with_dir(ROOT);
        let runner = RecordingRunner::new();
        let engine = Engine::new(
            Box::new(fs.clone()),
            Box::new(runner.clone()),
            Box::new(FakeFetcher { fs: fs.clone() }),
        );
        Self { fs, runner, engine }
    }

    fn run(&self, command: Command) -> KilnResult<CommandReport> {
        self.run_with(command, RouterConfig::default())
    }

    fn run_with(&self, command: Command, config: RouterConfig) -> KilnResult<CommandReport> {
        let router = CommandRouter::new(FeatureRegistry::builtin(), config);
        let pipeline = router.route(&command, &ScaffoldOptions::new("demo"))?;
        self.engine.execute(Path::new(ROOT), &pipeline)
    }

    fn file(&self, rel: &str) -> Option<String> {
        self.fs.read_file(Path::new(ROOT).join(rel))
    }

    fn has(&self, rel: &str) -> bool {
        self.fs.exists(&Path::new(ROOT).join(rel))
    }
}

fn add(features: &[&str]) -> Command {
    Command::Add {
        features: features.iter().map(|s| s.to_string()).collect(),
    }
}

#[test]
fn setup_builds_the_base_tree() {
    let h = Harness::new();
    let report = h.run(Command::Setup).unwrap();

    for path in [
        "src/demo/__init__.py",
        "src/demo/main.py",
        "tests/test_placeholder.py",
        ".env",
        ".gitignore",
        "README.md",
        "pyproject.toml",
        "src/pyproject.toml",
    ] {
        assert!(h.has(path), "missing {path}");
    }
    assert!(report.features.contains(&"base".to_string()));
    assert_eq!(
        h.runner.commands(),
        vec!["uv add --dev ruff pytest pytest-cov", "uv add python-dotenv"]
    );
}

#[test]
fn running_setup_twice_leaves_an_identical_tree() {
    let h = Harness::new();
    h.run(Command::Setup).unwrap();
    let first = h.fs.snapshot();

    let report = h.run(Command::Setup).unwrap();
    assert_eq!(h.fs.snapshot(), first);
    assert!(
        report
            .effects
            .iter()
            .any(|e| matches!(e, SideEffect::ManifestUnchanged { .. }))
    );
}

#[test]
fn user_edits_to_kept_files_survive() {
    let h = Harness::new();
    h.fs.seed_file("/proj/.env", "SECRET=1\n");
    h.fs.seed_file("/proj/README.md", "mine\n");

    h.run(Command::Setup).unwrap();

    assert_eq!(h.file(".env").as_deref(), Some("SECRET=1\n"));
    assert_eq!(h.file("README.md").as_deref(), Some("mine\n"));
}

#[test]
fn existing_manifest_keeps_user_entries() {
    let h = Harness::new();
    h.fs.seed_file(
        "/proj/pyproject.toml",
        "[project]\nname = \"demo\"\ndependencies = [\"requests>=2\"]\n",
    );

    h.run_with(
        add(&["llm"]),
        RouterConfig {
            install: false,
            ..RouterConfig::default()
        },
    )
    .unwrap();

    let manifest = h.file("pyproject.toml").unwrap();
    assert!(manifest.contains("requests>=2"));
    assert!(manifest.contains("openai"));
}

#[test]
fn unknown_feature_mutates_nothing() {
    let h = Harness::new();
    let before = h.fs.snapshot();

    let err = h.run(add(&["ml", "quantum"])).unwrap_err();

    assert!(err.to_string().contains("quantum"));
    assert_eq!(h.fs.snapshot(), before);
    assert!(h.runner.commands().is_empty());
}

#[test]
fn add_after_setup_only_adds() {
    let h = Harness::new();
    h.run(Command::Setup).unwrap();
    h.run(add(&["llm"])).unwrap();

    assert!(h.has("src/demo/prompts/__init__.py"));
    assert!(h.has("src/demo/prompts/system.md"));
    assert!(h.has("tests/test_placeholder.py"));
    assert_eq!(
        h.runner.commands().last().map(String::as_str),
        Some("uv add openai tiktoken langchain")
    );
}

#[test]
fn feature_order_does_not_matter() {
    let a = Harness::new();
    let b = Harness::new();
    let quiet = || RouterConfig {
        install: false,
        ..RouterConfig::default()
    };
    a.run_with(add(&["ml", "graph", "notebook"]), quiet()).unwrap();
    b.run_with(add(&["notebook", "ml", "graph"]), quiet()).unwrap();
    assert_eq!(a.fs.snapshot(), b.fs.snapshot());
}

#[test]
fn web_app_fetches_once() {
    let h = Harness::new();
    let quiet = RouterConfig {
        install: false,
        ..RouterConfig::default()
    };
    let first = h.run_with(add(&["fastapi"]), quiet.clone()).unwrap();
    assert!(h.has("app/backend/main.py"));
    assert!(
        first
            .effects
            .iter()
            .any(|e| matches!(e, SideEffect::Fetched { entries: 2, .. }))
    );

    let second = h.run_with(add(&["web-app"]), quiet).unwrap();
    assert!(
        second
            .effects
            .iter()
            .any(|e| matches!(e, SideEffect::SkippedFetch { .. }))
    );
}

#[test]
fn clean_removes_only_ephemeral_artifacts() {
    let h = Harness::new();
    h.run(Command::Setup).unwrap();
    h.fs.seed_file("/proj/.venv/bin/python", "");
    h.fs.seed_file("/proj/src/demo/__pycache__/main.cpython-312.pyc", "");
    h.fs.seed_file("/proj/.pytest_cache/v/cache", "");

    let report = h.run(Command::Clean).unwrap();

    assert!(!h.has(".venv"));
    assert!(!h.has("src/demo/__pycache__"));
    assert!(!h.has(".pytest_cache"));
    assert!(h.has("src/demo/main.py"));
    assert!(h.has("pyproject.toml"));
    assert_eq!(report.change_count(), 3);
}

#[test]
fn remove_all_keeps_user_owned_root_files() {
    let h = Harness::new();
    h.run(add(&["ml"])).unwrap();
    h.fs.seed_file("/proj/uv.lock", "");
    h.fs.seed_file("/proj/.git/HEAD", "ref: refs/heads/main");

    h.run(Command::RemoveAll).unwrap();

    for gone in ["src", "tests", "data", "models", "pyproject.toml", "uv.lock"] {
        assert!(!h.has(gone), "{gone} should be removed");
    }
    for kept in [".env", ".gitignore", "README.md", ".git/HEAD"] {
        assert!(h.has(kept), "{kept} should survive");
    }
}

#[test]
fn preview_reports_without_mutating() {
    let h = Harness::new();
    let before = h.fs.snapshot();
    let pipeline = CommandRouter::new(FeatureRegistry::builtin(), RouterConfig::default())
        .route(&add(&["ml"]), &ScaffoldOptions::new("demo"))
        .unwrap();

    let report = h.engine.preview(Path::new(ROOT), &pipeline).unwrap();

    assert!(report.dry_run);
    assert!(report.change_count() > 0);
    assert_eq!(h.fs.snapshot(), before);
    assert!(h.runner.commands().is_empty());
}

#[test]
fn failing_step_reports_what_completed() {
    let h = Harness::new();
    h.fs.fail_at("/proj/tests");

    let err = h.run(Command::Setup).unwrap_err();

    match err {
        KilnError::Application(ApplicationError::StepFailed {
            stage, completed, ..
        }) => {
            assert_eq!(stage, "materialize");
            assert!(
                completed
                    .iter()
                    .any(|e| matches!(e, SideEffect::CreatedDir { path } if path.to_string() == "src"))
            );
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(!h.has("pyproject.toml"));
}

#[test]
fn manifest_failure_reports_the_manifest_already_written() {
    let h = Harness::new();
    let broken = "[project]\ndependencies = \"numpy\"\n";
    h.fs.seed_file("/proj/src/pyproject.toml", broken);

    let err = h.run_with(Command::Setup, no_install()).unwrap_err();

    match err {
        KilnError::Application(ApplicationError::StepFailed {
            stage, completed, ..
        }) => {
            assert_eq!(stage, "compose-manifests");
            assert!(completed.iter().any(|e| matches!(
                e,
                SideEffect::UpdatedManifest { path, .. } if path.to_string() == "pyproject.toml"
            )));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(h.has("pyproject.toml"));
    assert_eq!(h.file("src/pyproject.toml").as_deref(), Some(broken));
}

#[test]
fn interrupted_fetch_is_retried_on_the_next_run() {
    let fs = MemoryFilesystem::with_dir(ROOT);
    let engine = Engine::new(
        Box::new(fs.clone()),
        Box::new(RecordingRunner::new()),
        Box::new(FlakyFetcher {
            fs: fs.clone(),
            failed_once: AtomicBool::new(false),
        }),
    );
    let pipeline = CommandRouter::new(FeatureRegistry::builtin(), no_install())
        .route(&add(&["web-app"]), &ScaffoldOptions::new("demo"))
        .unwrap();

    assert!(engine.execute(Path::new(ROOT), &pipeline).is_err());
    assert!(fs.is_dir(Path::new("/proj/app")));
    assert_eq!(fs.read_file("/proj/app/README.md"), None);

    let report = engine.execute(Path::new(ROOT), &pipeline).unwrap();
    assert!(
        report
            .effects
            .iter()
            .any(|e| matches!(e, SideEffect::Fetched { entries: 2, .. }))
    );
    assert_eq!(fs.read_file("/proj/app/README.md").as_deref(), Some("# skeleton"));
}

#[test]
fn tool_failure_keeps_its_exit_code() {
    let h = Harness::new();
    h.runner.fail_tool("pytest", 1);

    let err = h.run(Command::Test).unwrap_err();

    assert_eq!(err.tool_exit_code(), Some(1));
    assert_eq!(h.runner.calls()[0].1, Path::new(ROOT));
}

#[test]
fn missing_root_is_reported() {
    let fs = MemoryFilesystem::new();
    let engine = Engine::new(
        Box::new(fs.clone()),
        Box::new(RecordingRunner::new()),
        Box::new(FakeFetcher { fs }),
    );
    let pipeline = CommandRouter::new(FeatureRegistry::builtin(), RouterConfig::default())
        .route(&Command::Setup, &ScaffoldOptions::new("demo"))
        .unwrap();

    let err = engine.execute(Path::new("/missing"), &pipeline).unwrap_err();
    assert!(matches!(
        err,
        KilnError::Application(ApplicationError::RootMissing { .. })
    ));
}
