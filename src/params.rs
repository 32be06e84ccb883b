//! The flat parameter set produced by a walk.
//!
//! A [`ParamSet`] borrows the schema it was built from: setting a parameter
//! through the set writes straight into the schema field. Declaration order
//! is preserved — help and environment dumps present parameters in the order
//! the schema declares them.

use std::collections::HashMap;

use crate::error::SchemaError;
use crate::value::{Arity, ParamValue, ValueError};

/// Everything derived about one parameter: names, help, flags, and shape.
#[derive(Debug, Clone)]
pub struct ParamDescriptor {
    /// Full kebab-case name, prefixed by ancestor record names.
    pub name: String,
    /// Optional one-character abbreviation.
    pub abbrev: Option<char>,
    /// Environment variable name, or `None` when suppressed.
    pub env: Option<String>,
    /// Help string, without any generated suffixes.
    pub usage: String,
    /// Visible to descendant commands.
    pub persistent: bool,
    /// Must be set by some input before the command runs.
    pub required: bool,
    /// Short value-type label (`int64`, `stringToString`, ...).
    pub type_name: String,
    /// How the parameter accepts input.
    pub arity: Arity,
}

/// Where a parameter's environment binding currently stands, for help text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) enum EnvState {
    /// No environment name, or resolution has not run yet.
    #[default]
    Unresolved,
    /// Declared but the variable was absent (or an explicit value won).
    Declared,
    /// Applied successfully; carries the applied text.
    Applied(String),
    /// Present but failed to parse; carries the offending text.
    Invalid(String),
}

/// One registered parameter: descriptor plus the live binding into the
/// schema field.
pub struct Param<'s> {
    desc: ParamDescriptor,
    value: Box<dyn ParamValue + 's>,
    default_text: String,
    changed: bool,
    pub(crate) env_state: EnvState,
}

impl<'s> Param<'s> {
    pub fn descriptor(&self) -> &ParamDescriptor {
        &self.desc
    }

    pub fn name(&self) -> &str {
        &self.desc.name
    }

    /// Current value, rendered as text.
    pub fn text(&self) -> String {
        self.value.text()
    }

    /// Compiled-in default, captured when the parameter was registered.
    pub fn default_text(&self) -> &str {
        &self.default_text
    }

    /// Whether any input (explicit or environment) has set this parameter.
    pub fn changed(&self) -> bool {
        self.changed
    }

    /// Parse `text` into the underlying field and mark the parameter as
    /// externally set.
    pub fn set(&mut self, text: &str) -> Result<(), ValueError> {
        self.value.set_text(text)?;
        self.changed = true;
        Ok(())
    }

    /// Usage string with generated suffixes reflecting the effective source:
    /// `(env NAME)` declared, `(env NAME="v")` applied, `(env NAME="v",
    /// invalid)` failed, plus `(required)`.
    pub fn usage_text(&self) -> String {
        let mut usage = self.desc.usage.clone();
        if let Some(env) = &self.desc.env {
            match &self.env_state {
                EnvState::Unresolved | EnvState::Declared => {
                    space_append(&mut usage, &format!("(env {env})"));
                }
                EnvState::Applied(value) => {
                    space_append(&mut usage, &format!("(env {env}={value:?})"));
                }
                EnvState::Invalid(value) => {
                    space_append(&mut usage, &format!("(env {env}={value:?}, invalid)"));
                }
            }
        }
        if self.desc.required {
            space_append(&mut usage, "(required)");
        }
        usage
    }
}

fn space_append(s: &mut String, suffix: &str) {
    if !s.is_empty() {
        s.push(' ');
    }
    s.push_str(suffix);
}

/// Flat, ordered set of parameters for one command, borrowing the schema it
/// was walked from.
#[derive(Default)]
pub struct ParamSet<'s> {
    params: Vec<Param<'s>>,
}

impl std::fmt::Debug for ParamSet<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParamSet")
            .field(
                "params",
                &self.params.iter().map(Param::name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<'s> ParamSet<'s> {
    pub(crate) fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Register a parameter, enforcing name/abbreviation/env uniqueness.
    pub(crate) fn push(
        &mut self,
        desc: ParamDescriptor,
        value: Box<dyn ParamValue + 's>,
    ) -> Result<(), SchemaError> {
        for existing in &self.params {
            if existing.desc.name == desc.name {
                return Err(SchemaError::DuplicateParam(desc.name));
            }
            if let (Some(a), Some(b)) = (existing.desc.abbrev, desc.abbrev) {
                if a == b {
                    return Err(SchemaError::DuplicateAbbrev {
                        name: desc.name,
                        abbrev: b,
                    });
                }
            }
            if let (Some(a), Some(b)) = (&existing.desc.env, &desc.env) {
                if a == b {
                    return Err(SchemaError::DuplicateEnv {
                        name: desc.name,
                        env: b.clone(),
                    });
                }
            }
        }
        let default_text = value.text();
        self.params.push(Param {
            desc,
            value,
            default_text,
            changed: false,
            env_state: EnvState::default(),
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Parameters in schema declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Param<'s>> {
        self.params.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Param<'s>> {
        self.params.iter_mut()
    }

    pub fn get(&self, name: &str) -> Option<&Param<'s>> {
        self.params.iter().find(|p| p.desc.name == name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Param<'s>> {
        self.params.iter_mut().find(|p| p.desc.name == name)
    }

    /// Set a parameter by name, writing through to the schema field and
    /// marking it as explicitly set.
    pub fn set(&mut self, name: &str, text: &str) -> Result<(), ValueError> {
        match self.get_mut(name) {
            Some(param) => param.set(text),
            None => Err(ValueError::new(format!("unknown parameter {name:?}"))),
        }
    }

    /// Environment names claimed by this set's parameters.
    pub fn env_claims(&self) -> impl Iterator<Item = &str> {
        self.params.iter().filter_map(|p| p.desc.env.as_deref())
    }

    /// Snapshot of the process environment, for handing to the resolver and
    /// auditor. Tests pass synthetic maps instead.
    pub fn process_env() -> HashMap<String, String> {
        std::env::vars().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Binder, Record, Walker};

    #[derive(Default)]
    struct Level2 {
        inner: String,
    }

    impl Record for Level2 {
        fn fields<'s>(&'s mut self, w: &mut Walker<'s, '_>) -> Result<(), SchemaError> {
            w.field("Inner", "usage=innermost value", &mut self.inner)
        }
    }

    #[derive(Default)]
    struct Level1 {
        level2: Level2,
    }

    impl Record for Level1 {
        fn fields<'s>(&'s mut self, w: &mut Walker<'s, '_>) -> Result<(), SchemaError> {
            w.record("Level2", "", &mut self.level2)
        }
    }

    #[derive(Default)]
    struct Nested {
        level1: Level1,
    }

    impl Record for Nested {
        fn fields<'s>(&'s mut self, w: &mut Walker<'s, '_>) -> Result<(), SchemaError> {
            w.record("Level1", "", &mut self.level1)
        }
    }

    #[test]
    fn set_mutates_nested_field_in_place() {
        let mut cfg = Nested::default();
        let mut set = Binder::new().env_prefix("TEST").bind(&mut cfg).unwrap();
        assert_eq!(set.len(), 1);
        {
            let param = set.get("level1-level2-inner").unwrap();
            assert_eq!(
                param.descriptor().env.as_deref(),
                Some("TEST_LEVEL1_LEVEL2_INNER")
            );
            assert!(!param.changed());
        }
        set.set("level1-level2-inner", "foo").unwrap();
        assert!(set.get("level1-level2-inner").unwrap().changed());
        drop(set);
        assert_eq!(cfg.level1.level2.inner, "foo");
    }

    #[test]
    fn unknown_parameter_is_an_error() {
        let mut cfg = Nested::default();
        let mut set = Binder::new().bind(&mut cfg).unwrap();
        let err = set.set("nope", "x").unwrap_err();
        assert!(err.to_string().contains("unknown parameter"));
    }

    #[test]
    fn usage_text_suffixes() {
        let mut cfg = Level2 {
            inner: "d".to_string(),
        };
        let mut set = Binder::new().env_prefix("APP").bind(&mut cfg).unwrap();
        assert_eq!(
            set.get("inner").unwrap().usage_text(),
            "innermost value (env APP_INNER)"
        );
        if let Some(param) = set.get_mut("inner") {
            param.env_state = EnvState::Applied("x".to_string());
        }
        assert_eq!(
            set.get("inner").unwrap().usage_text(),
            "innermost value (env APP_INNER=\"x\")"
        );
        if let Some(param) = set.get_mut("inner") {
            param.env_state = EnvState::Invalid("x".to_string());
        }
        assert_eq!(
            set.get("inner").unwrap().usage_text(),
            "innermost value (env APP_INNER=\"x\", invalid)"
        );
    }
}
