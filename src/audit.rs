//! Unbound environment variable detection.
//!
//! An operator who exports `APP_PROT=90` instead of `APP_PORT=90` gets a
//! silent fallback to the default unless somebody notices. The auditor
//! catches this: every environment variable matching the command's prefix
//! must be claimed by some registered parameter, or resolution fails listing
//! the strays. The check is suspended wholesale by the CLI layer's lax
//! switch.

use crate::error::ClapenvError;

/// Environment names that start with `prefix` but appear in no claim,
/// sorted. `claims` are the env names of every parameter reachable from the
/// executing command path.
pub fn unclaimed<'a>(
    prefix: &str,
    claims: impl IntoIterator<Item = &'a str>,
    vars: impl IntoIterator<Item = (String, String)>,
) -> Vec<String> {
    let claimed: std::collections::HashSet<&str> = claims.into_iter().collect();
    let mut names: Vec<String> = vars
        .into_iter()
        .map(|(name, _)| name)
        .filter(|name| name.starts_with(prefix) && !claimed.contains(name.as_str()))
        .collect();
    names.sort();
    names
}

/// Fail with [`ClapenvError::UnboundEnvironment`] if any prefixed variable
/// is unclaimed.
pub fn check<'a>(
    prefix: &str,
    claims: impl IntoIterator<Item = &'a str>,
    vars: impl IntoIterator<Item = (String, String)>,
) -> Result<(), ClapenvError> {
    let names = unclaimed(prefix, claims, vars);
    if names.is_empty() {
        Ok(())
    } else {
        Err(ClapenvError::UnboundEnvironment(names))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn strays_are_reported_and_bound_names_are_not() {
        let env = vars(&[("PREFIX_FOO", "x"), ("PREFIX_BOGUS", "y"), ("OTHER_VAR", "z")]);
        let err = check("PREFIX_", ["PREFIX_FOO"], env).unwrap_err();
        let ClapenvError::UnboundEnvironment(names) = err else {
            panic!("expected UnboundEnvironment");
        };
        assert_eq!(names, ["PREFIX_BOGUS"]);
    }

    #[test]
    fn all_claimed_passes() {
        let env = vars(&[("PREFIX_FOO", "x")]);
        check("PREFIX_", ["PREFIX_FOO"], env).unwrap();
    }

    #[test]
    fn names_come_back_sorted() {
        let env = vars(&[("P_ZULU", "1"), ("P_ALPHA", "2"), ("P_MIKE", "3")]);
        assert_eq!(
            unclaimed("P_", [], env),
            ["P_ALPHA", "P_MIKE", "P_ZULU"]
        );
    }

    #[test]
    fn unrelated_variables_are_ignored() {
        let env = vars(&[("HOME", "/root"), ("PATH", "/bin")]);
        assert!(unclaimed("PREFIX_", [], env).is_empty());
    }
}
