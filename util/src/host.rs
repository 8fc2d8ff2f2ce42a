//! Host platform utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::env;
use std::path::PathBuf;
use thiserror::Error;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Environment variable pointing at the software root directory.
pub const SW_ROOT_ENV_VAR: &str = "TWIDDLE_DRIVE_ROOT";

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum HostError {
    #[error("The software root ({0}) is not valid unicode")]
    InvalidSwRoot(String),

    #[error("Cannot get the current working directory: {0}")]
    NoWorkingDir(std::io::Error),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the root directory of the software.
///
/// This is the value of `TWIDDLE_DRIVE_ROOT` if it is set, otherwise the
/// current working directory. Parameter files and sessions are found relative
/// to this root.
pub fn get_sw_root() -> Result<PathBuf, HostError> {
    match env::var(SW_ROOT_ENV_VAR) {
        Ok(root) => Ok(PathBuf::from(root)),
        Err(env::VarError::NotUnicode(s)) => {
            Err(HostError::InvalidSwRoot(s.to_string_lossy().into_owned()))
        }
        Err(env::VarError::NotPresent) => env::current_dir().map_err(HostError::NoWorkingDir),
    }
}
