//! Dotenv file loading, via [`dotenvy`].
//!
//! Both loaders mutate the process environment and are meant to run before
//! environment resolution. [`read`] parses files without touching the
//! process environment, for callers that resolve against a snapshot.

use std::path::Path;

use crate::error::ClapenvError;

fn dotenv_error(file: &Path, source: dotenvy::Error) -> ClapenvError {
    ClapenvError::Dotenv {
        file: file.display().to_string(),
        source,
    }
}

/// Load dotenv files into the process environment. Variables that already
/// exist keep their current values.
pub fn load<P: AsRef<Path>>(files: &[P]) -> Result<(), ClapenvError> {
    for file in files {
        let file = file.as_ref();
        dotenvy::from_filename(file).map_err(|e| dotenv_error(file, e))?;
    }
    Ok(())
}

/// Load dotenv files into the process environment, overwriting variables
/// that already exist.
pub fn load_overwrite<P: AsRef<Path>>(files: &[P]) -> Result<(), ClapenvError> {
    for file in files {
        let file = file.as_ref();
        dotenvy::from_filename_override(file).map_err(|e| dotenv_error(file, e))?;
    }
    Ok(())
}

/// Parse dotenv files into key/value pairs without mutating the process
/// environment. Later files win on duplicate keys within the result.
pub fn read<P: AsRef<Path>>(files: &[P]) -> Result<Vec<(String, String)>, ClapenvError> {
    let mut pairs = Vec::new();
    for file in files {
        let file = file.as_ref();
        for item in dotenvy::from_filename_iter(file).map_err(|e| dotenv_error(file, e))? {
            pairs.push(item.map_err(|e| dotenv_error(file, e))?);
        }
    }
    Ok(pairs)
}
