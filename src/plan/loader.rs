use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::plan::schema::{PatchPlan, ValidationError};

/// The Playwright → Patchright plan shipped with the binary.
pub const BUILTIN_PLAN: &str = include_str!("../../patches/patchright.toml");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read patch plan from {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse patch plan TOML{}: {source}", display_path(.path))]
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },

    #[error("invalid patch plan{}: {source}", display_path(.path))]
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" ({})", path.display()),
        None => String::new(),
    }
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

pub fn load_from_str(input: &str) -> Result<PatchPlan, ConfigError> {
    let plan: PatchPlan = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    plan.validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(plan)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<PatchPlan, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}

pub fn builtin() -> Result<PatchPlan, ConfigError> {
    load_from_str(BUILTIN_PLAN)
}
