use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Directories under the project root that are never edited: build output
/// and version control.
const FORBIDDEN_DIRS: [&str; 3] = ["bin", "obj", ".git"];

/// Keeps every step inside the project root.
#[derive(Debug, Clone)]
pub struct WorkspaceGuard {
    /// Canonical project root
    workspace_root: PathBuf,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("Path is outside workspace: {path} (workspace: {workspace})")]
    OutsideWorkspace { path: PathBuf, workspace: PathBuf },

    #[error("Path is in forbidden directory: {path} (forbidden: {forbidden})")]
    ForbiddenPath { path: PathBuf, forbidden: String },

    #[error("Failed to resolve {path}: {source}")]
    Canonicalize {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn canonicalize(path: &Path) -> Result<PathBuf, SafetyError> {
    path.canonicalize().map_err(|source| SafetyError::Canonicalize {
        path: path.to_path_buf(),
        source,
    })
}

impl WorkspaceGuard {
    /// The root is canonicalized so symlinked roots compare correctly.
    pub fn new(workspace_root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        Ok(Self {
            workspace_root: canonicalize(workspace_root.as_ref())?,
        })
    }

    /// Resolve an existing file relative to the root and check it.
    ///
    /// Returns the canonical absolute path.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let canonical = canonicalize(&self.absolute(path.as_ref()))?;
        self.check_canonical(&canonical)?;
        Ok(canonical)
    }

    /// Like [`validate_path`](Self::validate_path) for a file that may not
    /// exist yet; its parent directory must.
    pub fn validate_new_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let absolute = self.absolute(path.as_ref());
        let (Some(parent), Some(name)) = (absolute.parent(), absolute.file_name()) else {
            return Err(SafetyError::OutsideWorkspace {
                path: absolute,
                workspace: self.workspace_root.clone(),
            });
        };
        let canonical = canonicalize(parent)?.join(name);
        self.check_canonical(&canonical)?;
        Ok(canonical)
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        }
    }

    fn check_canonical(&self, canonical: &Path) -> Result<(), SafetyError> {
        let Ok(relative) = canonical.strip_prefix(&self.workspace_root) else {
            return Err(SafetyError::OutsideWorkspace {
                path: canonical.to_path_buf(),
                workspace: self.workspace_root.clone(),
            });
        };

        for component in relative.components() {
            if let Component::Normal(name) = component {
                if let Some(forbidden) = FORBIDDEN_DIRS.iter().find(|dir| name.to_str() == Some(**dir)) {
                    return Err(SafetyError::ForbiddenPath {
                        path: canonical.to_path_buf(),
                        forbidden: (*forbidden).to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_validate_relative_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let workspace = temp_dir.path();
        let guard = WorkspaceGuard::new(workspace).unwrap();

        let file = workspace.join("src/Playwright/Core/Page.cs");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, b"").unwrap();

        assert!(guard.validate_path("src/Playwright/Core/Page.cs").is_ok());
    }

    #[test]
    fn test_validate_path_outside_workspace() {
        let temp_dir = tempfile::tempdir().unwrap();
        let workspace = temp_dir.path().join("workspace");
        fs::create_dir_all(&workspace).unwrap();
        let guard = WorkspaceGuard::new(&workspace).unwrap();

        fs::write(temp_dir.path().join("outside.cs"), b"").unwrap();

        let result = guard.validate_path("../outside.cs");
        assert!(matches!(result, Err(SafetyError::OutsideWorkspace { .. })));
    }

    #[test]
    fn test_build_output_is_forbidden() {
        let temp_dir = tempfile::tempdir().unwrap();
        let workspace = temp_dir.path();
        let guard = WorkspaceGuard::new(workspace).unwrap();

        let file = workspace.join("src/Playwright/obj/Debug/Page.g.cs");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, b"").unwrap();

        let result = guard.validate_path(&file);
        assert!(matches!(
            result,
            Err(SafetyError::ForbiddenPath { forbidden, .. }) if forbidden == "obj"
        ));
    }

    #[test]
    fn test_new_path_needs_existing_parent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let workspace = temp_dir.path();
        fs::create_dir_all(workspace.join("build")).unwrap();
        let guard = WorkspaceGuard::new(workspace).unwrap();

        assert!(guard.validate_new_path("build/Patchright.targets").is_ok());
        assert!(matches!(
            guard.validate_new_path("missing/Patchright.targets"),
            Err(SafetyError::Canonicalize { .. })
        ));
    }

    #[test]
    #[cfg(unix)]
    fn test_validate_symlink_escape() {
        use std::os::unix::fs::symlink;

        let temp_dir = tempfile::tempdir().unwrap();
        let workspace = temp_dir.path().join("workspace");
        fs::create_dir_all(&workspace).unwrap();

        let outside = temp_dir.path().join("outside.cs");
        fs::write(&outside, b"").unwrap();

        let link = workspace.join("escape.cs");
        symlink(&outside, &link).unwrap();

        let guard = WorkspaceGuard::new(&workspace).unwrap();
        let result = guard.validate_path(&link);

        assert!(matches!(result, Err(SafetyError::OutsideWorkspace { .. })));
    }
}
