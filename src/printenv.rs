//! Environment dump rendering: the body of the `printenv` subcommand.
//!
//! Produces a sourceable, commented env file for the command's parameters:
//! changed parameters become live assignments, everything else a commented
//! default. Pure over a writer and the parameter sets, so it is testable
//! without process state.

use std::io;

use crate::params::ParamSet;

/// Render the environment dump for `sets` (root first, in path order).
pub fn render<W: io::Write>(
    out: &mut W,
    command_path: &str,
    sets: &[&ParamSet<'_>],
) -> io::Result<()> {
    writeln!(out, "# {command_path}")?;
    for set in sets {
        for param in set.iter() {
            let desc = param.descriptor();
            let Some(env) = desc.env.as_deref() else {
                continue;
            };
            write!(out, "\n# {}", desc.name)?;
            if !desc.usage.is_empty() {
                write!(out, ": {}", desc.usage)?;
            }
            if !desc.type_name.is_empty() {
                write!(out, " (type: {})", desc.type_name)?;
            }
            if desc.required {
                write!(out, " (required)")?;
            }
            writeln!(out)?;
            if param.changed() {
                writeln!(out, "{env}={}", shell_quote(&param.text()))?;
            } else {
                writeln!(out, "# {env}={}", shell_quote(param.default_text()))?;
            }
        }
    }
    Ok(())
}

/// Quote a value for shells unless it is a plain word. Cosmetics for the
/// generated file, not an escaping guarantee.
fn shell_quote(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        value.to_string()
    } else {
        format!("{value:?}")
    }
}
