//! Per-field annotations: the string tag grammar and its structured form.
//!
//! Annotations are written as a compact, space-separated tag string:
//!
//! ```text
//! opts=persistent,required param=pool-size,p env=POOL encoding=csv usage=max pool connections
//! ```
//!
//! | key        | value                                   | effect                                   |
//! |------------|-----------------------------------------|------------------------------------------|
//! | `opts`     | comma-separated `persistent`/`required` | inheritable flags (alias: `option-set`)  |
//! | `param`    | `name`, `name,a`, or a single char      | overrides derived name / abbreviation    |
//! | `env`      | `SCREAMING_SNAKE_CASE` name, or `-`     | overrides derived env name, or suppresses|
//! | `encoding` | `hex`/`base64`/`count`/`csv`/`raw`      | selects among representations of a type  |
//! | `usage`    | free text, greedy to end of string      | help string                              |
//!
//! The tag is parsed once into an [`Annotation`]; the same structure can be
//! built directly through the fluent methods, bypassing string parsing.

use crate::error::SchemaError;
use crate::name::{to_phrase, to_screaming_snake};
use crate::walk::PrefixContext;

/// Type-specific value representation selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Byte sequences as hexadecimal text.
    Hex,
    /// Byte sequences as standard base64 text.
    Base64,
    /// Integers as occurrence counters (`-vvv`); repeat-only, no env binding.
    Count,
    /// String lists as one comma-joined value.
    Csv,
    /// String lists as one element per occurrence; repeat-only, no env binding.
    Raw,
}

impl Encoding {
    pub(crate) fn parse(field: &str, text: &str) -> Result<Self, SchemaError> {
        match text {
            "hex" => Ok(Self::Hex),
            "base64" => Ok(Self::Base64),
            "count" => Ok(Self::Count),
            "csv" => Ok(Self::Csv),
            "raw" => Ok(Self::Raw),
            _ => Err(SchemaError::UnknownEncoding {
                field: field.to_string(),
                encoding: text.to_string(),
            }),
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Hex => "hex",
            Self::Base64 => "base64",
            Self::Count => "count",
            Self::Csv => "csv",
            Self::Raw => "raw",
        }
    }
}

/// Inheritable per-field flags. A record field ORs its own options into its
/// children's inherited options; nothing is ever subtracted on the way down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldOpts {
    /// Parameter is visible to descendant commands, not just the one that
    /// declared it.
    pub persistent: bool,
    /// Omitting the parameter from every input is an error reported before
    /// the command runs.
    pub required: bool,
}

impl FieldOpts {
    pub(crate) fn or(self, other: Self) -> Self {
        Self {
            persistent: self.persistent || other.persistent,
            required: self.required || other.required,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum EnvTag {
    /// Derive from the field name under the ancestor env prefix.
    #[default]
    Derived,
    /// Bind this exact name, un-prefixed.
    Named(String),
    /// `env=-`: never bind an environment variable.
    Suppressed,
}

/// Structured form of one field's annotation.
///
/// Obtained from [`Annotation::parse`] or built fluently:
///
/// ```
/// use clapenv::Annotation;
///
/// let ann = Annotation::new().required().param("pool-size").usage("max pool connections");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Annotation {
    opts: FieldOpts,
    encoding: Option<Encoding>,
    param: Option<String>,
    abbrev: Option<String>,
    env: EnvTag,
    usage: String,
}

impl Annotation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a tag string. `field` is the schema field name, used in error
    /// messages. An empty tag is valid and means "all defaults".
    pub fn parse(field: &str, tag: &str) -> Result<Self, SchemaError> {
        let mut ann = Self::default();
        let mut rest = tag.trim();
        while !rest.is_empty() {
            // usage= swallows the remainder verbatim, spaces included.
            if let Some(usage) = rest.strip_prefix("usage=") {
                ann.usage = usage.to_string();
                break;
            }
            let (token, tail) = match rest.split_once(char::is_whitespace) {
                Some((token, tail)) => (token, tail.trim_start()),
                None => (rest, ""),
            };
            rest = tail;

            let Some((key, value)) = token.split_once('=') else {
                return Err(SchemaError::UnknownTagKey {
                    field: field.to_string(),
                    key: token.to_string(),
                });
            };
            match key {
                "opts" | "option-set" => {
                    for option in value.split(',').filter(|o| !o.is_empty()) {
                        match option {
                            "persistent" => ann.opts.persistent = true,
                            "required" => ann.opts.required = true,
                            _ => {
                                return Err(SchemaError::UnknownOption {
                                    field: field.to_string(),
                                    option: option.to_string(),
                                });
                            }
                        }
                    }
                }
                "param" => {
                    let (name, abbrev) = match value.split_once(',') {
                        Some((name, abbrev)) => (name, Some(abbrev)),
                        None => (value, None),
                    };
                    ann.param = (!name.is_empty()).then(|| name.to_string());
                    ann.abbrev = abbrev
                        .filter(|a| !a.is_empty())
                        .map(|a| a.to_string())
                        .or(ann.abbrev);
                }
                "env" => {
                    ann.env = match value {
                        "" => EnvTag::Derived,
                        "-" => EnvTag::Suppressed,
                        name => EnvTag::Named(name.to_string()),
                    };
                }
                "encoding" => ann.encoding = Some(Encoding::parse(field, value)?),
                _ => {
                    return Err(SchemaError::UnknownTagKey {
                        field: field.to_string(),
                        key: key.to_string(),
                    });
                }
            }
        }
        Ok(ann)
    }

    /// Mark the parameter as visible to descendant commands.
    pub fn persistent(mut self) -> Self {
        self.opts.persistent = true;
        self
    }

    /// Mark the parameter as required.
    pub fn required(mut self) -> Self {
        self.opts.required = true;
        self
    }

    /// Override the derived parameter name. A single-character name is
    /// reinterpreted as an abbreviation, with the long name staying derived.
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.param = Some(name.into());
        self
    }

    /// Set a one-character abbreviation (`-p` style).
    pub fn abbrev(mut self, abbrev: char) -> Self {
        self.abbrev = Some(abbrev.to_string());
        self
    }

    /// Bind this exact environment name instead of the derived one.
    pub fn env(mut self, name: impl Into<String>) -> Self {
        self.env = EnvTag::Named(name.into());
        self
    }

    /// Never bind an environment variable for this parameter.
    pub fn no_env(mut self) -> Self {
        self.env = EnvTag::Suppressed;
        self
    }

    /// Select a value representation for types that have several.
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Human-readable help string.
    pub fn usage(mut self, text: impl Into<String>) -> Self {
        self.usage = text.into();
        self
    }

    /// Resolve the annotation against a field name and the ancestor prefix
    /// context, producing final names and validating every naming rule.
    pub(crate) fn resolve(
        &self,
        field_name: &str,
        ctx: &PrefixContext,
    ) -> Result<ResolvedField, SchemaError> {
        let mut param = self.param.clone();
        let mut abbrev = self.abbrev.clone();

        // A 1-char name slot is shorthand for the abbreviation; a 1-char name
        // next to an explicit abbreviation is a mistake.
        if param.as_ref().is_some_and(|p| p.chars().count() == 1) {
            if abbrev.is_some() {
                return Err(SchemaError::ParamTooShort {
                    param: param.take().unwrap_or_default(),
                });
            }
            abbrev = param.take();
        }

        let name = match param {
            Some(p) => format!("{}{}", ctx.param_prefix, p),
            None => format!("{}{}", ctx.param_prefix, to_phrase(field_name, '-')),
        };

        let abbrev = match abbrev {
            None => None,
            Some(a) => {
                let mut chars = a.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(c),
                    _ => {
                        return Err(SchemaError::AbbrevTooLong {
                            name,
                            abbrev: a,
                        });
                    }
                }
            }
        };

        let env = if !ctx.env_enabled {
            None
        } else {
            match &self.env {
                EnvTag::Suppressed => None,
                EnvTag::Named(e) => {
                    if *e != e.to_uppercase() {
                        return Err(SchemaError::EnvNotScreamingSnake {
                            name,
                            env: e.clone(),
                        });
                    }
                    Some(e.clone())
                }
                EnvTag::Derived => ctx
                    .env_prefix
                    .as_ref()
                    .map(|prefix| format!("{prefix}{}", to_screaming_snake(field_name))),
            }
        };

        Ok(ResolvedField {
            name,
            abbrev,
            env,
            usage: self.usage.clone(),
            opts: self.opts.or(ctx.inherited),
            encoding: self.encoding,
        })
    }
}

/// A field annotation after prefix application and validation: final names,
/// merged options, and the encoding hint the type dispatcher will check.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedField {
    pub name: String,
    pub abbrev: Option<char>,
    pub env: Option<String>,
    pub usage: String,
    pub opts: FieldOpts,
    pub encoding: Option<Encoding>,
}
