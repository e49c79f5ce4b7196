//! Small JSON documents kept in the per-user data directory.

use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::core::config::data::path_display;
use crate::core::config::io::{project_dirs, write_atomically};

#[derive(Debug)]
pub enum StateError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    Write {
        path: PathBuf,
        source: Box<dyn StdError>,
    },
    NoProjectDirs,
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateError::Read { path, source } => {
                write!(f, "Failed to read {}: {}", path_display(path), source)
            }
            StateError::Parse { path, source } => {
                write!(f, "Failed to parse {}: {}", path_display(path), source)
            }
            StateError::Write { path, source } => {
                write!(f, "Failed to write {}: {}", path_display(path), source)
            }
            StateError::NoProjectDirs => {
                write!(f, "Failed to determine the data directory")
            }
        }
    }
}

impl StdError for StateError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            StateError::Read { source, .. } => Some(source),
            StateError::Parse { source, .. } => Some(source),
            StateError::Write { source, .. } => Some(source.as_ref()),
            StateError::NoProjectDirs => None,
        }
    }
}

pub fn state_path(file_name: &str) -> Result<PathBuf, StateError> {
    let dirs = project_dirs().map_err(|_| StateError::NoProjectDirs)?;
    Ok(dirs.data_local_dir().join(file_name))
}

/// Missing files load as `T::default()`.
pub fn load_json<T>(path: &Path) -> Result<T, StateError>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        return Ok(T::default());
    }
    let contents = fs::read_to_string(path).map_err(|source| StateError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| StateError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StateError> {
    let contents = serde_json::to_vec_pretty(value).map_err(|source| StateError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    write_atomically(path, &contents).map_err(|source| StateError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Remove a state file; a file that is already gone is not an error.
pub fn remove_state(path: &Path) -> Result<(), StateError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(StateError::Write {
            path: path.to_path_buf(),
            source: Box::new(source),
        }),
    }
}
