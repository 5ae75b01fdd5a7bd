//! Materializes a [`PathPlan`] onto a [`Filesystem`].

use tracing::{debug, instrument};

use crate::{
    application::{ApplicationError, ports::Filesystem, services::SideEffect},
    domain::{PathPlan, WritePolicy},
    error::KilnResult,
};

/// Applies directories first, then files according to their write policy.
///
/// Each applied step is pushed to the caller's effect list as it happens, so
/// after a failure the list holds exactly what was completed.
pub struct FileWriter<'a> {
    filesystem: &'a dyn Filesystem,
    dry_run: bool,
}

impl<'a> FileWriter<'a> {
    pub fn new(filesystem: &'a dyn Filesystem) -> Self {
        Self {
            filesystem,
            dry_run: false,
        }
    }

    /// Report what would happen without mutating anything.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[instrument(skip_all, fields(root = %plan.root().display(), dry_run = self.dry_run))]
    pub fn materialize(&self, plan: &PathPlan, effects: &mut Vec<SideEffect>) -> KilnResult<()> {
        if !self.filesystem.is_dir(plan.root()) {
            return Err(ApplicationError::RootMissing {
                path: plan.root().to_path_buf(),
            }
            .into());
        }

        for dir in plan.directories() {
            let path = plan.absolute(dir);
            if self.filesystem.is_dir(&path) {
                effects.push(SideEffect::DirExisted { path: dir.clone() });
                continue;
            }
            if !self.dry_run {
                self.filesystem.create_dir_all(&path)?;
            }
            debug!(path = %dir, "created directory");
            effects.push(SideEffect::CreatedDir { path: dir.clone() });
        }

        for file in plan.files() {
            let path = plan.absolute(&file.path);
            if file.policy == WritePolicy::CreateIfAbsent && self.filesystem.exists(&path) {
                debug!(path = %file.path, "kept existing file");
                effects.push(SideEffect::KeptFile {
                    path: file.path.clone(),
                });
                continue;
            }
            if !self.dry_run {
                self.filesystem.write_file(&path, &file.content)?;
            }
            debug!(path = %file.path, policy = %file.policy, "wrote file");
            effects.push(SideEffect::WroteFile {
                path: file.path.clone(),
                policy: file.policy,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockFilesystem;
    use crate::domain::{FeatureRegistry, ScaffoldOptions};
    use crate::error::KilnError;
    use std::path::{Path, PathBuf};

    fn base_plan() -> PathPlan {
        PathPlan::compute::<&str>(
            "/proj",
            &FeatureRegistry::builtin(),
            &[],
            &ScaffoldOptions::new("demo"),
        )
        .unwrap()
    }

    #[test]
    fn missing_root_fails_before_any_write() {
        let mut fs = MockFilesystem::new();
        fs.expect_is_dir().returning(|_| false);
        fs.expect_create_dir_all().never();
        fs.expect_write_file().never();

        let mut effects = Vec::new();
        let err = FileWriter::new(&fs)
            .materialize(&base_plan(), &mut effects)
            .unwrap_err();

        assert!(matches!(
            err,
            KilnError::Application(ApplicationError::RootMissing { .. })
        ));
        assert!(effects.is_empty());
    }

    #[test]
    fn existing_files_are_kept_except_always_overwrite() {
        let mut fs = MockFilesystem::new();
        fs.expect_is_dir().returning(|_| true);
        fs.expect_exists().returning(|_| true);
        fs.expect_create_dir_all().never();
        fs.expect_write_file()
            .withf(|path: &Path, _| path == Path::new("/proj/.gitignore"))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut effects = Vec::new();
        FileWriter::new(&fs)
            .materialize(&base_plan(), &mut effects)
            .unwrap();

        let written: Vec<String> = effects
            .iter()
            .filter_map(|e| match e {
                SideEffect::WroteFile { path, .. } => Some(path.to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(written, vec![".gitignore"]);
    }

    #[test]
    fn failure_reports_completed_steps() {
        let mut fs = MockFilesystem::new();
        fs.expect_is_dir()
            .returning(|p: &Path| p == Path::new("/proj"));
        fs.expect_create_dir_all().returning(|p: &Path| {
            if p.ends_with("data") {
                Err(ApplicationError::FilesystemError {
                    path: PathBuf::from(p),
                    reason: "disk full".into(),
                }
                .into())
            } else {
                Ok(())
            }
        });

        let mut effects = Vec::new();
        let result = FileWriter::new(&fs).materialize(&base_plan(), &mut effects);

        assert!(result.is_err());
        // "config" sorts before "data"; nothing after the failure is recorded.
        assert_eq!(effects.len(), 1);
        assert!(matches!(&effects[0], SideEffect::CreatedDir { path } if path.to_string() == "config"));
    }

    #[test]
    fn dry_run_never_mutates() {
        let mut fs = MockFilesystem::new();
        fs.expect_is_dir().returning(|p: &Path| p == Path::new("/proj"));
        fs.expect_exists().returning(|_| false);
        fs.expect_create_dir_all().never();
        fs.expect_write_file().never();

        let mut effects = Vec::new();
        FileWriter::new(&fs)
            .dry_run(true)
            .materialize(&base_plan(), &mut effects)
            .unwrap();
        assert!(effects.iter().any(|e| matches!(e, SideEffect::CreatedDir { .. })));
    }
}
