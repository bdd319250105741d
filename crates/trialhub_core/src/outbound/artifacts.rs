//! Artifact cleanup for deleted projects and dependents.
//!
//! Layout under the artifacts root:
//! - `projects/<project_id>` for project-level outputs.
//! - `<kind table>/<project_id>/<dependent_id>` for dependent outputs.

use crate::config::PlatformConfig;
use crate::model::lifecycle::Dependent;
use crate::model::project::Project;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ArtifactError {
    Io { path: PathBuf, source: io::Error },
}

impl Display for ArtifactError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to remove artifacts at {}: {source}", path.display())
            }
        }
    }
}

impl Error for ArtifactError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
        }
    }
}

/// Removes stored outputs. Missing artifacts count as already removed.
pub trait ArtifactCleaner {
    fn delete_project_artifacts(&self, project: &Project) -> Result<(), ArtifactError>;
    fn delete_dependent_artifacts(&self, dependent: &Dependent) -> Result<(), ArtifactError>;
}

/// Filesystem cleaner rooted at one artifacts directory.
#[derive(Debug, Clone)]
pub struct FsArtifactCleaner {
    root: PathBuf,
}

impl FsArtifactCleaner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn project_path(&self, project: &Project) -> PathBuf {
        self.root.join("projects").join(project.id.to_string())
    }

    pub fn dependent_path(&self, dependent: &Dependent) -> PathBuf {
        self.root
            .join(dependent.kind.table())
            .join(dependent.project_id.to_string())
            .join(dependent.id.to_string())
    }
}

impl ArtifactCleaner for FsArtifactCleaner {
    fn delete_project_artifacts(&self, project: &Project) -> Result<(), ArtifactError> {
        remove_path(&self.project_path(project))
    }

    fn delete_dependent_artifacts(&self, dependent: &Dependent) -> Result<(), ArtifactError> {
        remove_path(&self.dependent_path(dependent))
    }
}

/// Cleaner for deployments without local artifacts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopArtifactCleaner;

impl ArtifactCleaner for NoopArtifactCleaner {
    fn delete_project_artifacts(&self, _project: &Project) -> Result<(), ArtifactError> {
        Ok(())
    }

    fn delete_dependent_artifacts(&self, _dependent: &Dependent) -> Result<(), ArtifactError> {
        Ok(())
    }
}

/// Cleaner selected by `artifacts_root`: filesystem when set, no-op otherwise.
pub fn cleaner_from_config(config: &PlatformConfig) -> Box<dyn ArtifactCleaner> {
    match config.artifacts_root.as_ref() {
        Some(root) => {
            info!("event=artifacts_init module=artifacts status=ok backend=fs");
            Box::new(FsArtifactCleaner::new(root))
        }
        None => {
            info!("event=artifacts_init module=artifacts status=ok backend=noop");
            Box::new(NoopArtifactCleaner)
        }
    }
}

fn remove_path(path: &Path) -> Result<(), ArtifactError> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(source) => {
            return Err(ArtifactError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let removed = if metadata.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };

    match removed {
        Ok(()) => {
            info!("event=artifacts_delete module=artifacts status=ok");
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => {
            error!(
                "event=artifacts_delete module=artifacts status=error error={}",
                source
            );
            Err(ArtifactError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{cleaner_from_config, ArtifactCleaner, FsArtifactCleaner};
    use crate::config::PlatformConfig;
    use crate::model::ids::{ProjectId, UserId};
    use crate::model::lifecycle::{Dependent, DependentKind};
    use crate::model::project::Project;
    use std::fs;

    #[test]
    fn removes_project_and_dependent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let cleaner = FsArtifactCleaner::new(dir.path());
        let project = Project::draft("mnist", UserId::new());
        let dependent = Dependent::new(DependentKind::Experiment, project.id, "exp-1");

        let project_path = cleaner.project_path(&project);
        let dependent_path = cleaner.dependent_path(&dependent);
        fs::create_dir_all(project_path.join("outputs")).unwrap();
        fs::create_dir_all(&dependent_path).unwrap();
        fs::write(dependent_path.join("metrics.json"), b"{}").unwrap();

        cleaner.delete_project_artifacts(&project).unwrap();
        cleaner.delete_dependent_artifacts(&dependent).unwrap();

        assert!(!project_path.exists());
        assert!(!dependent_path.exists());
        assert!(dependent_path.starts_with(dir.path().join("experiments")));
    }

    #[test]
    fn missing_paths_are_treated_as_removed() {
        let dir = tempfile::tempdir().unwrap();
        let cleaner = FsArtifactCleaner::new(dir.path().join("absent"));
        let dependent = Dependent::new(DependentKind::Job, ProjectId::new(), "job-1");

        assert!(cleaner.delete_dependent_artifacts(&dependent).is_ok());
    }

    #[test]
    fn configured_root_selects_the_filesystem_cleaner() {
        let dir = tempfile::tempdir().unwrap();
        let config = PlatformConfig {
            artifacts_root: Some(dir.path().to_path_buf()),
            ..PlatformConfig::default()
        };
        let project = Project::draft("mnist", UserId::new());
        let project_path = FsArtifactCleaner::new(dir.path()).project_path(&project);
        fs::create_dir_all(&project_path).unwrap();

        cleaner_from_config(&config)
            .delete_project_artifacts(&project)
            .unwrap();

        assert!(!project_path.exists());
    }

    #[test]
    fn missing_root_selects_the_noop_cleaner() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::draft("mnist", UserId::new());
        let project_path = FsArtifactCleaner::new(dir.path()).project_path(&project);
        fs::create_dir_all(&project_path).unwrap();

        let cleaner = cleaner_from_config(&PlatformConfig::default());
        cleaner.delete_project_artifacts(&project).unwrap();

        assert!(project_path.exists());
    }
}
