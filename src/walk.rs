//! Recursive schema traversal.
//!
//! A schema is any type implementing [`Record`]: its `fields` method hands
//! each field to the [`Walker`] together with its annotation tag. The walker
//! derives names, merges inherited options, dispatches the field's type, and
//! registers a leaf parameter — or recurses into nested records, extending
//! the parameter and environment prefixes.
//!
//! Dispatch entry points, in the fixed precedence order:
//!
//! 1. Any entry point consults the [`TypeRegistry`] first — a registration
//!    overrides everything, built-ins included.
//! 2. [`Walker::field`] — built-in types; anything else is an
//!    unsupported-type error, which is what makes registry-served
//!    third-party types work through this same entry point.
//! 3. [`Walker::field_with`] — types implementing [`ParamValue`] themselves.
//! 4. [`Walker::field_text`] — `FromStr + Display` types carrying the
//!    [`TypeDesc`] marker.
//! 5. [`Walker::record`] — nested records, walked recursively.

use std::any::{Any, TypeId};
use std::fmt::Display;
use std::str::FromStr;

use crate::error::SchemaError;
use crate::params::{ParamDescriptor, ParamSet};
use crate::registry::{RegisteredValue, TypeRegistry};
use crate::tags::{Annotation, FieldOpts, ResolvedField};
use crate::value::{Leaf, ParamValue, TextValue, builtin_leaf};

/// Prefixes and inherited options threaded through the recursion.
#[derive(Debug, Clone)]
pub struct PrefixContext {
    /// Accumulated kebab-case prefix, `""` at the root, `"pool-"` inside a
    /// record bound as `pool`.
    pub(crate) param_prefix: String,
    /// Accumulated env prefix including its trailing underscore, or `None`
    /// when derived environment names are suppressed at this level.
    pub(crate) env_prefix: Option<String>,
    /// Kill switch: when false, no parameter binds an environment name,
    /// explicit annotations included.
    pub(crate) env_enabled: bool,
    /// Options ORed down from ancestor records.
    pub(crate) inherited: FieldOpts,
}

/// A bindable schema node: hands each field (in declaration order) to the
/// walker, together with its annotation tag.
pub trait Record {
    fn fields<'s>(&'s mut self, walker: &mut Walker<'s, '_>) -> Result<(), SchemaError>;
}

/// Visitor driving one schema walk. Borrows the parameter set being built
/// (`'w`) and registers bindings that borrow the schema (`'s`).
pub struct Walker<'s, 'w> {
    set: &'w mut ParamSet<'s>,
    registry: &'w TypeRegistry,
    ctx: PrefixContext,
}

impl<'s, 'w> Walker<'s, 'w> {
    /// Bind a built-in-typed field (or any type served by the registry).
    pub fn field<T: Any>(
        &mut self,
        name: &str,
        tag: &str,
        value: &'s mut T,
    ) -> Result<(), SchemaError> {
        let f = self.resolve_field(name, tag)?;
        if let Some(reg) = self.registry.lookup(TypeId::of::<T>()).cloned() {
            return self.push_registered(f, value, reg);
        }
        match builtin_leaf(&f, value as &mut dyn Any)? {
            Some(leaf) => self.push(f, leaf),
            None => Err(SchemaError::UnsupportedType {
                name: f.name,
                type_name: std::any::type_name::<T>(),
            }),
        }
    }

    /// Bind a field whose type implements [`ParamValue`] itself.
    pub fn field_with<T: Any + ParamValue>(
        &mut self,
        name: &str,
        tag: &str,
        value: &'s mut T,
    ) -> Result<(), SchemaError> {
        let f = self.resolve_field(name, tag)?;
        if let Some(reg) = self.registry.lookup(TypeId::of::<T>()).cloned() {
            return self.push_registered(f, value, reg);
        }
        self.reject_encoding(&f)?;
        self.push(f, Leaf::singular(value))
    }

    /// Bind a text-codec field: `FromStr + Display` plus the [`TypeDesc`]
    /// marker capability.
    pub fn field_text<T>(&mut self, name: &str, tag: &str, value: &'s mut T) -> Result<(), SchemaError>
    where
        T: Any + FromStr + Display + crate::value::TypeDesc,
        T::Err: Display,
    {
        let f = self.resolve_field(name, tag)?;
        if let Some(reg) = self.registry.lookup(TypeId::of::<T>()).cloned() {
            return self.push_registered(f, value, reg);
        }
        self.reject_encoding(&f)?;
        self.push(f, Leaf::singular(TextValue(value)))
    }

    /// Recurse into a nested record, extending prefixes. A registry entry
    /// for the record type binds it as a single leaf instead.
    pub fn record<T: Any + Record>(
        &mut self,
        name: &str,
        tag: &str,
        value: &'s mut T,
    ) -> Result<(), SchemaError> {
        let f = self.resolve_field(name, tag)?;
        if let Some(reg) = self.registry.lookup(TypeId::of::<T>()).cloned() {
            return self.push_registered(f, value, reg);
        }
        self.reject_encoding(&f)?;
        let ctx = PrefixContext {
            param_prefix: format!("{}-", f.name),
            env_prefix: f.env.as_ref().map(|env| format!("{env}_")),
            env_enabled: self.ctx.env_enabled,
            inherited: f.opts,
        };
        let mut child = Walker {
            set: &mut *self.set,
            registry: self.registry,
            ctx,
        };
        value.fields(&mut child)
    }

    fn resolve_field(&self, name: &str, tag: &str) -> Result<ResolvedField, SchemaError> {
        Annotation::parse(name, tag)?.resolve(name, &self.ctx)
    }

    fn reject_encoding(&self, f: &ResolvedField) -> Result<(), SchemaError> {
        match f.encoding {
            None => Ok(()),
            Some(enc) => Err(SchemaError::BadEncoding {
                name: f.name.clone(),
                expected: "no encoding",
                got: enc.as_str(),
            }),
        }
    }

    fn push_registered<T: Any>(
        &mut self,
        f: ResolvedField,
        value: &'s mut T,
        reg: crate::registry::TypeRegistration,
    ) -> Result<(), SchemaError> {
        self.reject_encoding(&f)?;
        let target: &'s mut dyn Any = value;
        self.push(f, Leaf::singular(RegisteredValue::new(target, reg)))
    }

    fn push(&mut self, f: ResolvedField, leaf: Leaf<'s>) -> Result<(), SchemaError> {
        let desc = ParamDescriptor {
            name: f.name,
            abbrev: f.abbrev,
            env: f.env,
            usage: f.usage,
            persistent: f.opts.persistent,
            required: f.opts.required,
            type_name: leaf.value.type_name(),
            arity: leaf.arity,
        };
        self.set.push(desc, leaf.value)
    }
}

/// Entry point: validates the environment prefix, walks a schema, and
/// produces its [`ParamSet`].
///
/// ```
/// use clapenv::{Binder, Record, SchemaError, Walker};
///
/// #[derive(Default)]
/// struct Config {
///     host: String,
///     port: u16,
/// }
///
/// impl Record for Config {
///     fn fields<'s>(&'s mut self, w: &mut Walker<'s, '_>) -> Result<(), SchemaError> {
///         w.field("Host", "usage=listen address", &mut self.host)?;
///         w.field("Port", "param=port,p usage=listen port", &mut self.port)
///     }
/// }
///
/// let mut cfg = Config::default();
/// let set = Binder::new().env_prefix("APP").bind(&mut cfg)?;
/// assert_eq!(set.get("port").unwrap().descriptor().env.as_deref(), Some("APP_PORT"));
/// # Ok::<(), SchemaError>(())
/// ```
#[derive(Debug)]
pub struct Binder {
    registry: TypeRegistry,
    env_prefix: Option<String>,
    env_enabled: bool,
}

impl Default for Binder {
    fn default() -> Self {
        Self::new()
    }
}

impl Binder {
    pub fn new() -> Self {
        Self {
            registry: TypeRegistry::new(),
            env_prefix: None,
            env_enabled: true,
        }
    }

    /// Set the environment prefix for derived names. Must be uppercase and
    /// must not end with an underscore (one is appended automatically);
    /// violations surface from [`bind`](Self::bind). Without a prefix,
    /// derived environment names are suppressed and only explicit `env=`
    /// annotations bind.
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Disable environment binding entirely, explicit annotations included.
    pub fn no_env(mut self) -> Self {
        self.env_enabled = false;
        self
    }

    /// Use this registry for custom type dispatch.
    pub fn registry(mut self, registry: TypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Register a custom type on the binder's registry.
    pub fn register<T, E>(
        mut self,
        parse: impl Fn(&str) -> Result<T, E> + Send + Sync + 'static,
        display: impl Fn(&T) -> String + Send + Sync + 'static,
    ) -> Self
    where
        T: Any,
        E: Display,
    {
        self.registry.register(parse, display);
        self
    }

    /// Walk `cfg` and produce its parameter set. The set borrows `cfg`
    /// mutably; drop it to use the bound values.
    pub fn bind<'s, T: Record>(&self, cfg: &'s mut T) -> Result<ParamSet<'s>, SchemaError> {
        let env_prefix = match &self.env_prefix {
            None => None,
            Some(prefix) => {
                if prefix.is_empty() {
                    return Err(SchemaError::PrefixEmpty);
                }
                if *prefix != prefix.to_uppercase() {
                    return Err(SchemaError::PrefixNotUppercase(prefix.clone()));
                }
                if prefix.ends_with('_') {
                    return Err(SchemaError::PrefixTrailingUnderscore(prefix.clone()));
                }
                Some(format!("{prefix}_"))
            }
        };
        let mut set = ParamSet::new();
        let mut walker = Walker {
            set: &mut set,
            registry: &self.registry,
            ctx: PrefixContext {
                param_prefix: String::new(),
                env_prefix: if self.env_enabled { env_prefix } else { None },
                env_enabled: self.env_enabled,
                inherited: FieldOpts::default(),
            },
        };
        cfg.fields(&mut walker)?;
        Ok(set)
    }
}
