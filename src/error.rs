use thiserror::Error;

/// Binding-time schema errors: programmer mistakes in the schema or its
/// annotations, detected once while parameters are being registered.
///
/// These are fatal — the schema is wrong, not the input — so callers are
/// expected to surface them during process startup. Every message names the
/// offending field or parameter and the rule it violated.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("env prefix {0:?} must be all uppercase")]
    PrefixNotUppercase(String),

    #[error("env prefix {0:?} must not end with an underscore, it is added automatically")]
    PrefixTrailingUnderscore(String),

    #[error("env prefix must not be empty (omit it to disable derived environment names)")]
    PrefixEmpty,

    #[error("unknown annotation key {key:?} for field {field:?}")]
    UnknownTagKey { field: String, key: String },

    #[error("unknown option {option:?} for field {field:?}, expected \"persistent\" or \"required\"")]
    UnknownOption { field: String, option: String },

    #[error("unknown encoding {encoding:?} for field {field:?}")]
    UnknownEncoding { field: String, encoding: String },

    #[error("abbreviation {abbrev:?} for {name:?} must be a single character")]
    AbbrevTooLong { name: String, abbrev: String },

    #[error("param {param:?} must be at least two characters")]
    ParamTooShort { param: String },

    #[error("env name {env:?} for {name:?} must be SCREAMING_SNAKE_CASE")]
    EnvNotScreamingSnake { name: String, env: String },

    #[error("expected {expected} for {name:?}, got encoding {got:?}")]
    BadEncoding {
        name: String,
        expected: &'static str,
        got: &'static str,
    },

    #[error("encoding {encoding:?} for {name:?} requires a suppressed environment name (env=-): a single environment string cannot be evaluated repeatedly")]
    EncodingNeedsNoEnv { name: String, encoding: &'static str },

    #[error("unsupported field type {type_name} for {name:?}")]
    UnsupportedType {
        name: String,
        type_name: &'static str,
    },

    #[error("duplicate parameter name {0:?}")]
    DuplicateParam(String),

    #[error("duplicate abbreviation {abbrev:?} for {name:?}")]
    DuplicateAbbrev { name: String, abbrev: char },

    #[error("duplicate environment name {env:?} for {name:?}")]
    DuplicateEnv { name: String, env: String },
}

/// One environment variable whose value failed to parse into its parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvValueError {
    /// Full parameter name (kebab-case, without leading dashes).
    pub param: String,
    /// Environment variable name that carried the bad value.
    pub env: String,
    /// Underlying parse error message.
    pub message: String,
}

impl std::fmt::Display for EnvValueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (--{}): {}", self.env, self.param, self.message)
    }
}

/// Errors surfaced while resolving and running a bound command.
///
/// Resolution-class errors ([`InvalidEnvironment`](Self::InvalidEnvironment),
/// [`UnboundEnvironment`](Self::UnboundEnvironment),
/// [`MissingRequired`](Self::MissingRequired)) aggregate every offending entry
/// before failing, so operators see the full list in one pass instead of one
/// error per invocation.
#[derive(Debug, Error)]
pub enum ClapenvError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("invalid environment variables:\n{}", bullet_lines(.0))]
    InvalidEnvironment(Vec<EnvValueError>),

    #[error("unbound environment variables:\n{}", bullet_lines(.0))]
    UnboundEnvironment(Vec<String>),

    #[error("missing required parameters: {}", .0.join(", "))]
    MissingRequired(Vec<String>),

    #[error("invalid value for --{param}: {message}")]
    InvalidValue { param: String, message: String },

    #[error("load dotenv {file}: {source}")]
    Dotenv {
        file: String,
        source: dotenvy::Error,
    },

    #[error("write output: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "clap")]
    #[error(transparent)]
    Usage(#[from] clap::Error),

    #[error("{0}")]
    Hook(Box<dyn std::error::Error + Send + Sync>),
}

fn bullet_lines<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| format!("  {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_value_error_formats() {
        let err = EnvValueError {
            param: "port".into(),
            env: "APP_PORT".into(),
            message: "invalid digit found in string".into(),
        };
        assert_eq!(
            err.to_string(),
            "APP_PORT (--port): invalid digit found in string"
        );
    }

    #[test]
    fn invalid_environment_lists_every_entry() {
        let err = ClapenvError::InvalidEnvironment(vec![
            EnvValueError {
                param: "port".into(),
                env: "APP_PORT".into(),
                message: "bad".into(),
            },
            EnvValueError {
                param: "rate".into(),
                env: "APP_RATE".into(),
                message: "worse".into(),
            },
        ]);
        let msg = err.to_string();
        assert!(msg.starts_with("invalid environment variables:\n"));
        assert!(msg.contains("  APP_PORT (--port): bad"));
        assert!(msg.contains("  APP_RATE (--rate): worse"));
    }

    #[test]
    fn unbound_environment_lists_names() {
        let err = ClapenvError::UnboundEnvironment(vec!["APP_BOGUS".into(), "APP_TYPO".into()]);
        let msg = err.to_string();
        assert!(msg.contains("unbound environment variables:"));
        assert!(msg.contains("  APP_BOGUS"));
        assert!(msg.contains("  APP_TYPO"));
    }

    #[test]
    fn schema_error_names_the_rule() {
        let err = SchemaError::AbbrevTooLong {
            name: "foo".into(),
            abbrev: "bar".into(),
        };
        assert!(err.to_string().contains("must be a single character"));

        let err = SchemaError::ParamTooShort { param: "f".into() };
        assert!(err.to_string().contains("must be at least two characters"));

        let err = SchemaError::EnvNotScreamingSnake {
            name: "foo".into(),
            env: "lowercase".into(),
        };
        assert!(err.to_string().contains("SCREAMING_SNAKE_CASE"));
    }
}
