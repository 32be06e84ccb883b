//! Schema-driven flag and environment variable binding. Define a struct,
//! describe its fields, and every knob becomes a `--flag` and an `ENV_VAR`.
//!
//! Clapenv turns a nested configuration struct into a flat set of typed
//! parameters: each leaf field gets a kebab-case command-line switch and a
//! SCREAMING_SNAKE_CASE environment variable, derived from the field name
//! and the record path. Values resolve with a fixed precedence, and stray
//! environment variables are caught instead of silently ignored.
//!
//! ```
//! use clapenv::{Binder, Record, SchemaError, Walker};
//!
//! #[derive(Default)]
//! struct PoolConfig {
//!     size: usize,
//! }
//!
//! impl Record for PoolConfig {
//!     fn fields<'s>(&'s mut self, w: &mut Walker<'s, '_>) -> Result<(), SchemaError> {
//!         w.field("Size", "usage=connections kept open", &mut self.size)
//!     }
//! }
//!
//! #[derive(Default)]
//! struct AppConfig {
//!     host: String,
//!     pool: PoolConfig,
//! }
//!
//! impl Record for AppConfig {
//!     fn fields<'s>(&'s mut self, w: &mut Walker<'s, '_>) -> Result<(), SchemaError> {
//!         w.field("Host", "usage=listen address", &mut self.host)?;
//!         w.record("Pool", "", &mut self.pool)
//!     }
//! }
//!
//! let mut cfg = AppConfig::default();
//! let set = Binder::new().env_prefix("MYAPP").bind(&mut cfg)?;
//! assert_eq!(set.get("pool-size").unwrap().descriptor().env.as_deref(),
//!            Some("MYAPP_POOL_SIZE"));
//! # Ok::<(), SchemaError>(())
//! ```
//!
//! # Why clapenv
//!
//! Tools with many configuration knobs need them reachable two ways: flags
//! for interactive operators, environment variables for deployments. Wiring
//! both by hand means every knob is declared twice (three times counting the
//! default), and the pairs drift. Clapenv derives both from one schema: add
//! a field and the flag, the environment variable, the help text, and the
//! precedence handling all exist.
//!
//! # Design: struct as source of truth
//!
//! Your config struct implements [`Record`], handing each field to the
//! [`Walker`] with a compact annotation tag:
//!
//! - the **field name** drives both derived names (`PoolSize` →
//!   `--pool-size`, `PREFIX_POOL_SIZE`), with acronym runs collapsed
//!   (`IPMask` → `--ip-mask`);
//! - the **current field values** are the compiled-in defaults — there is no
//!   second place where defaults live;
//! - **nested records** extend the prefixes, so `pool.size` and
//!   `PREFIX_POOL_SIZE` stay in lockstep;
//! - **annotations** (`opts=`, `param=`, `env=`, `encoding=`, `usage=`)
//!   cover the exceptions: renames, abbreviations, suppressed environment
//!   binding, alternative representations. See [`Annotation`] for the
//!   grammar, or build one fluently and skip the strings.
//!
//! # Value precedence
//!
//! ```text
//! Compiled defaults     the field values at bind time
//!        ↑ overridden by
//! Environment vars      PREFIX_FIELD
//!        ↑ overridden by
//! Explicit flags        --field
//! ```
//!
//! An explicitly supplied flag stops resolution for that parameter: the
//! environment variable is never even consulted. Environment values that
//! fail to parse are aggregated — every offending variable is reported in
//! one error, not one per run.
//!
//! # Environment hygiene
//!
//! `MYAPP_PROT=90` falling back to a default port is the worst kind of
//! quiet failure. After resolution, the auditor scans the environment for
//! variables matching the command's prefix that no parameter claimed, and
//! fails listing them (sorted). Operators can suspend the check with the
//! CLI layer's `--env-lax` switch.
//!
//! # Type dispatch
//!
//! Built-ins cover booleans, every integer width (plus `encoding=count`
//! occurrence counters), floats, strings, byte buffers (`encoding=hex` or
//! `base64`), lists (comma-joined, or `encoding=raw` repeat-only), string
//! maps, [`Duration`](std::time::Duration) in humantime notation, IP
//! addresses, socket addresses, and IP networks. Beyond those:
//!
//! - implement [`ParamValue`] on your own type and bind it with
//!   [`Walker::field_with`];
//! - or, for `FromStr + Display` types, implement the [`TypeDesc`] marker
//!   and bind with [`Walker::field_text`];
//! - or register a parse/display pair for any type — your own or a third
//!   party's — in a [`TypeRegistry`]. Registrations are consulted first and
//!   override built-ins, so they can also redefine how a supported type
//!   binds.
//!
//! # Core library — CLI framework optional
//!
//! Everything above lives in the clap-free core: [`Binder`] produces a
//! [`ParamSet`] you can inspect, set, resolve
//! ([`apply_env`](resolve::apply_env)), and audit yourself. The [`cli`]
//! module (behind the `clap` Cargo feature, on by default) is the adapter
//! that turns parameter sets into a real command tree: clap args and
//! subcommands, persistent flags, dotenv loading (`--env-file`), required
//! aggregation, and a `printenv` dump of effective values. To use the core
//! alone:
//!
//! ```toml
//! clapenv = { version = "...", default-features = false }
//! ```
//!
//! # Error handling
//!
//! Schema mistakes (bad annotations, unsupported types, naming violations)
//! are [`SchemaError`]s: fatal, detected at bind time, and phrased to name
//! the offending field and rule. Operator-facing resolution failures are
//! [`ClapenvError`]s and aggregate everything they can before surfacing.
//! Binding is synchronous and single-threaded; a [`ParamSet`] lives for one
//! command invocation, and the only state that outlives it is the
//! [`TypeRegistry`] you own.

pub mod audit;
#[cfg(feature = "clap")]
pub mod cli;
pub mod dotenv;
pub mod printenv;
pub mod resolve;

mod error;
mod name;
mod params;
mod registry;
mod tags;
mod value;
mod walk;

pub use error::{ClapenvError, EnvValueError, SchemaError};
pub use name::{to_phrase, to_screaming_snake};
pub use params::{Param, ParamDescriptor, ParamSet};
pub use registry::TypeRegistry;
pub use tags::{Annotation, Encoding, FieldOpts};
pub use value::{Arity, ParamValue, TypeDesc, ValueError};
pub use walk::{Binder, PrefixContext, Record, Walker};
