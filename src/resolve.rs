//! Environment variable resolution with fixed precedence.
//!
//! Runs after all parameters are registered and after explicit inputs have
//! been applied, but before the command's logic. Precedence per parameter:
//! explicit input > environment variable > compiled-in default. An explicit
//! value stops resolution for that parameter — the environment is never
//! consulted for it.
//!
//! Takes an environment snapshot instead of reading the process environment,
//! so tests pass synthetic maps.

use std::collections::HashMap;

use crate::error::{ClapenvError, EnvValueError};
use crate::params::{EnvState, ParamSet};

/// Apply environment variables to every unset parameter with an env name.
///
/// Parse failures are aggregated: resolution continues through the whole
/// set so the caller can report every offending variable in one pass, then
/// fails with [`ClapenvError::InvalidEnvironment`].
pub fn apply_env(set: &mut ParamSet<'_>, vars: &HashMap<String, String>) -> Result<(), ClapenvError> {
    let mut errors = Vec::new();
    apply_env_collect(set, vars, &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ClapenvError::InvalidEnvironment(errors))
    }
}

/// Aggregation-friendly variant used when resolving several sets along a
/// command path: pushes field-level errors instead of failing.
pub(crate) fn apply_env_collect(
    set: &mut ParamSet<'_>,
    vars: &HashMap<String, String>,
    errors: &mut Vec<EnvValueError>,
) {
    for param in set.iter_mut() {
        let Some(env) = param.descriptor().env.clone() else {
            continue;
        };
        if param.changed() {
            // Explicit input wins; the variable is never consulted.
            param.env_state = EnvState::Declared;
            continue;
        }
        match vars.get(&env) {
            None => param.env_state = EnvState::Declared,
            Some(value) => match param.set(value) {
                Ok(()) => param.env_state = EnvState::Applied(value.clone()),
                Err(err) => {
                    param.env_state = EnvState::Invalid(value.clone());
                    errors.push(EnvValueError {
                        param: param.name().to_string(),
                        env,
                        message: err.to_string(),
                    });
                }
            },
        }
    }
}
