//! Clap adapter: command trees wired to bound schemas.
//!
//! This module is the integration layer between the framework-agnostic core
//! (walker, resolver, auditor) and the [clap](https://docs.rs/clap) parser.
//! It is compiled only when the `clap` Cargo feature is enabled (on by
//! default).
//!
//! A [`Command`] owns a schema value (the compiled defaults), optional
//! hooks, and child commands. Executing the tree:
//!
//! 1. binds every node's schema into a parameter set and builds the clap
//!    command tree from the descriptors (persistent parameters become
//!    `global` args, visible to descendants);
//! 2. parses argv with clap (help, version, and unknown-argument handling
//!    stay clap's);
//! 3. loads `--env-file` dotenv files, then applies explicit values, then
//!    environment variables (explicit wins), aggregating every bad variable;
//! 4. audits for unbound environment variables under the command's prefix
//!    (suppressed by `--env-lax`), and aggregates missing required
//!    parameters;
//! 5. runs setup hooks from the root down the executed path, then the leaf
//!    `run` hook, with the bound schema values.
//!
//! Environment prefixes derive from the command path: command `app`,
//! subcommand `serve` → `APP_SERVE_*`. Resolution-class failures print the
//! command's usage (with per-parameter environment state) to stderr and
//! return the typed error.

use std::collections::HashMap;
use std::ffi::OsString;
use std::process;

use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command as ClapCommand};

use crate::audit;
use crate::dotenv;
use crate::error::{ClapenvError, EnvValueError, SchemaError};
use crate::name::to_screaming_snake;
use crate::params::{Param, ParamSet};
use crate::printenv;
use crate::registry::TypeRegistry;
use crate::resolve;
use crate::value::Arity;
use crate::walk::{Binder, Record};

/// Error type user hooks may return; wrapped into [`ClapenvError::Hook`].
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

type Hook<T> = Box<dyn FnMut(&T) -> Result<(), HookError>>;

/// How a node derives its environment prefix from its parent.
#[derive(Clone)]
enum EnvInherit {
    Root,
    Prefix(String),
    Disabled,
}

/// One bound node: the parameter set (borrowing the node's schema) plus the
/// metadata needed to rebuild the clap tree and route matches.
struct NodePlan<'n> {
    name: String,
    about: String,
    version: Option<String>,
    env_prefix: Option<String>,
    has_run: bool,
    set: ParamSet<'n>,
    children: Vec<NodePlan<'n>>,
}

/// Object-safe view of a command node, so children with different schema
/// types can live in one tree.
trait Node {
    fn node_name(&self) -> &str;
    fn plan<'n>(
        &'n mut self,
        inherit: EnvInherit,
        registry: &TypeRegistry,
    ) -> Result<NodePlan<'n>, SchemaError>;
    fn dispatch(&mut self, path: &[String]) -> Result<(), ClapenvError>;
}

/// A command with a bound configuration schema, hooks, and subcommands.
///
/// ```no_run
/// use clapenv::cli::Command;
/// use clapenv::{Record, SchemaError, Walker};
///
/// #[derive(Default)]
/// struct ServeConfig {
///     port: u16,
/// }
///
/// impl Record for ServeConfig {
///     fn fields<'s>(&'s mut self, w: &mut Walker<'s, '_>) -> Result<(), SchemaError> {
///         w.field("Port", "param=port,p usage=listen port", &mut self.port)
///     }
/// }
///
/// Command::new("serve", "Serve the thing", ServeConfig { port: 8080 })
///     .run(|cfg| {
///         println!("listening on {}", cfg.port);
///         Ok(())
///     })
///     .execute();
/// ```
pub struct Command<T: Record + 'static> {
    name: String,
    about: String,
    version: Option<String>,
    cfg: T,
    setup: Option<Hook<T>>,
    run: Option<Hook<T>>,
    children: Vec<Box<dyn Node>>,
    env_prefix: Option<String>,
    no_env: bool,
    registry: TypeRegistry,
    with_printenv: bool,
}

impl<T: Record + 'static> Command<T> {
    /// Create a command around a schema value. The field values in `cfg`
    /// are the compiled-in defaults.
    pub fn new(name: impl Into<String>, about: impl Into<String>, cfg: T) -> Self {
        Self {
            name: name.into(),
            about: about.into(),
            version: None,
            cfg,
            setup: None,
            run: None,
            children: Vec::new(),
            env_prefix: None,
            no_env: false,
            registry: TypeRegistry::new(),
            with_printenv: false,
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Override the derived environment prefix for this node's subtree.
    /// Defaults to the SCREAMING_SNAKE_CASE of the command path.
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Disable environment variable binding for this node's subtree.
    pub fn no_env(mut self) -> Self {
        self.no_env = true;
        self
    }

    /// Use this registry for custom type dispatch. Only the root command's
    /// registry is consulted; it serves the whole tree.
    pub fn registry(mut self, registry: TypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Register a custom type on this command's registry.
    pub fn register<U, E>(
        mut self,
        parse: impl Fn(&str) -> Result<U, E> + Send + Sync + 'static,
        display: impl Fn(&U) -> String + Send + Sync + 'static,
    ) -> Self
    where
        U: std::any::Any,
        E: std::fmt::Display,
    {
        self.registry.register(parse, display);
        self
    }

    /// Hook run for this node whenever it is on the executed path, before
    /// the leaf's `run`. Runs root-first.
    pub fn setup(mut self, hook: impl FnMut(&T) -> Result<(), HookError> + 'static) -> Self {
        self.setup = Some(Box::new(hook));
        self
    }

    /// Hook run when this node is the executed leaf.
    pub fn run(mut self, hook: impl FnMut(&T) -> Result<(), HookError> + 'static) -> Self {
        self.run = Some(Box::new(hook));
        self
    }

    /// Attach a subcommand. Its environment prefix extends this node's.
    pub fn subcommand<U: Record + 'static>(mut self, child: Command<U>) -> Self {
        self.children.push(Box::new(child));
        self
    }

    /// Add a `printenv` subcommand that dumps the command's environment
    /// variable assignments and defaults.
    pub fn printenv(mut self) -> Self {
        self.with_printenv = true;
        self
    }

    /// Parse, resolve, and run against the real process environment.
    pub fn try_execute<I, A>(&mut self, argv: I) -> Result<(), ClapenvError>
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString> + Clone,
    {
        self.exec(argv, None)
    }

    /// Like [`try_execute`](Self::try_execute), but resolves against the
    /// given environment snapshot instead of the process environment.
    /// Dotenv files named on the command line are merged into the snapshot
    /// without mutating the process environment.
    pub fn try_execute_with<I, A>(
        &mut self,
        argv: I,
        vars: HashMap<String, String>,
    ) -> Result<(), ClapenvError>
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString> + Clone,
    {
        self.exec(argv, Some(vars))
    }

    /// Process entry point: parse `std::env::args_os()`, run, and exit.
    /// Schema errors and resolution errors abort with a message; usage and
    /// version requests exit through clap.
    pub fn execute(mut self) -> ! {
        let argv: Vec<OsString> = std::env::args_os().collect();
        match self.try_execute(argv) {
            Ok(()) => process::exit(0),
            Err(ClapenvError::Usage(err)) => err.exit(),
            Err(err) => {
                eprintln!("Error: {err}");
                process::exit(1);
            }
        }
    }

    fn exec<I, A>(&mut self, argv: I, vars: Option<HashMap<String, String>>) -> Result<(), ClapenvError>
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString> + Clone,
    {
        let registry = self.registry.clone();
        let with_printenv = self.with_printenv;
        let mut plan = Node::plan(self, EnvInherit::Root, &registry)?;
        let cmd = assemble(&plan, true, with_printenv);
        let matches = cmd.try_get_matches_from(argv)?;

        let env_files: Vec<String> = matches
            .get_many::<String>("env-file")
            .map(|files| files.cloned().collect())
            .unwrap_or_default();
        let overwrite = matches.get_flag("env-overwrite");
        let lax = matches.get_flag("env-lax");

        // Dotenv runs before the environment snapshot is taken.
        let vars = match vars {
            None => {
                if !env_files.is_empty() {
                    if overwrite {
                        dotenv::load_overwrite(&env_files)?;
                    } else {
                        dotenv::load(&env_files)?;
                    }
                }
                ParamSet::process_env()
            }
            Some(mut map) => {
                for (key, value) in dotenv::read(&env_files)? {
                    if overwrite {
                        map.insert(key, value);
                    } else {
                        map.entry(key).or_insert(value);
                    }
                }
                map
            }
        };

        // The executed path through the tree, as subcommand names.
        let mut path = Vec::new();
        let mut want_printenv = false;
        {
            let mut level = &matches;
            while let Some((name, sub)) = level.subcommand() {
                if with_printenv && path.is_empty() && name == "printenv" {
                    want_printenv = true;
                    break;
                }
                path.push(name.to_string());
                level = sub;
            }
        }

        // Explicit command-line values first: they win over everything.
        apply_explicit_path(&mut plan, &matches)?;

        // Environment precedence, aggregated across the whole path.
        let mut env_errors = Vec::new();
        apply_env_path(&mut plan, &matches, &vars, &mut env_errors);
        if !env_errors.is_empty() {
            eprint_usage(&plan, &path, with_printenv);
            return Err(ClapenvError::InvalidEnvironment(env_errors));
        }

        if want_printenv {
            let mut out = Vec::new();
            printenv::render(&mut out, &plan.name, &[&plan.set])?;
            let mut stdout = std::io::stdout().lock();
            std::io::Write::write_all(&mut stdout, &out)?;
            return Ok(());
        }

        // Unbound environment audit under the root prefix.
        if !lax {
            if let Some(prefix) = plan.env_prefix.clone() {
                let mut claims = Vec::new();
                collect_claims_path(&plan, &matches, &mut claims);
                audit::check(
                    &format!("{prefix}_"),
                    claims.iter().map(String::as_str),
                    vars,
                )?;
            }
        }

        // Required parameters, aggregated across the path.
        let mut missing = Vec::new();
        collect_missing_path(&plan, &matches, &mut missing);
        if !missing.is_empty() {
            eprint_usage(&plan, &path, with_printenv);
            return Err(ClapenvError::MissingRequired(missing));
        }

        // A leaf without a run hook gets help instead of silence.
        if !leaf_has_run(&plan, &path) {
            let mut help = assemble(&plan, true, with_printenv);
            for name in &path {
                match help.find_subcommand(name.as_str()) {
                    Some(sub) => help = sub.clone(),
                    None => break,
                }
            }
            println!("{}", help.render_help());
            return Ok(());
        }

        drop(plan);
        self.dispatch(&path)
    }
}

impl<T: Record + 'static> Node for Command<T> {
    fn node_name(&self) -> &str {
        &self.name
    }

    fn plan<'n>(
        &'n mut self,
        inherit: EnvInherit,
        registry: &TypeRegistry,
    ) -> Result<NodePlan<'n>, SchemaError> {
        let env_prefix: Option<String> = if self.no_env {
            None
        } else if let Some(prefix) = &self.env_prefix {
            Some(prefix.clone())
        } else {
            match &inherit {
                EnvInherit::Root => Some(to_screaming_snake(&self.name)),
                EnvInherit::Prefix(parent) => {
                    Some(format!("{parent}_{}", to_screaming_snake(&self.name)))
                }
                EnvInherit::Disabled => None,
            }
        };

        let mut binder = Binder::new().registry(registry.clone());
        binder = match &env_prefix {
            Some(prefix) => binder.env_prefix(prefix.clone()),
            None => binder.no_env(),
        };
        let set = binder.bind(&mut self.cfg)?;

        let child_inherit = match &env_prefix {
            Some(prefix) => EnvInherit::Prefix(prefix.clone()),
            None => EnvInherit::Disabled,
        };
        let mut children = Vec::with_capacity(self.children.len());
        for child in &mut self.children {
            children.push(child.plan(child_inherit.clone(), registry)?);
        }

        Ok(NodePlan {
            name: self.name.clone(),
            about: self.about.clone(),
            version: self.version.clone(),
            env_prefix,
            has_run: self.run.is_some(),
            set,
            children,
        })
    }

    fn dispatch(&mut self, path: &[String]) -> Result<(), ClapenvError> {
        if let Some(setup) = &mut self.setup {
            setup(&self.cfg).map_err(ClapenvError::Hook)?;
        }
        match path.split_first() {
            None => {
                if let Some(run) = &mut self.run {
                    run(&self.cfg).map_err(ClapenvError::Hook)?;
                }
                Ok(())
            }
            Some((head, rest)) => {
                match self
                    .children
                    .iter_mut()
                    .find(|child| child.node_name() == head.as_str())
                {
                    Some(child) => child.dispatch(rest),
                    // clap validated the path; an unknown name means an
                    // empty selection, nothing to run.
                    None => Ok(()),
                }
            }
        }
    }
}

// --- Plan traversal ---------------------------------------------------------

fn child_plan<'a, 'n>(plan: &'a mut NodePlan<'n>, name: &str) -> Option<&'a mut NodePlan<'n>> {
    plan.children.iter_mut().find(|child| child.name == name)
}

fn apply_explicit_path(plan: &mut NodePlan<'_>, matches: &ArgMatches) -> Result<(), ClapenvError> {
    apply_explicit(&mut plan.set, matches)?;
    if let Some((name, sub)) = matches.subcommand() {
        if let Some(child) = child_plan(plan, name) {
            apply_explicit_path(child, sub)?;
        }
    }
    Ok(())
}

fn apply_explicit(set: &mut ParamSet<'_>, matches: &ArgMatches) -> Result<(), ClapenvError> {
    let specs: Vec<(String, Arity)> = set
        .iter()
        .map(|p| (p.name().to_string(), p.descriptor().arity))
        .collect();
    for (name, arity) in specs {
        if matches.value_source(&name) != Some(ValueSource::CommandLine) {
            continue;
        }
        let applied = match arity {
            Arity::Count => set.set(&name, &matches.get_count(&name).to_string()),
            Arity::Repeat => {
                let values: Vec<String> = matches
                    .get_many::<String>(&name)
                    .map(|v| v.cloned().collect())
                    .unwrap_or_default();
                values.iter().try_for_each(|value| set.set(&name, value))
            }
            Arity::Singular | Arity::Switch => match matches.get_one::<String>(&name) {
                Some(value) => set.set(&name, value),
                None => Ok(()),
            },
        };
        applied.map_err(|err| ClapenvError::InvalidValue {
            param: name.clone(),
            message: err.to_string(),
        })?;
    }
    Ok(())
}

fn apply_env_path(
    plan: &mut NodePlan<'_>,
    matches: &ArgMatches,
    vars: &HashMap<String, String>,
    errors: &mut Vec<EnvValueError>,
) {
    resolve::apply_env_collect(&mut plan.set, vars, errors);
    if let Some((name, sub)) = matches.subcommand() {
        if let Some(child) = child_plan(plan, name) {
            apply_env_path(child, sub, vars, errors);
        }
    }
}

fn collect_claims_path(plan: &NodePlan<'_>, matches: &ArgMatches, out: &mut Vec<String>) {
    out.extend(plan.set.env_claims().map(str::to_string));
    if let Some((name, sub)) = matches.subcommand() {
        if let Some(child) = plan.children.iter().find(|child| child.name == name) {
            collect_claims_path(child, sub, out);
        }
    }
}

fn collect_missing_path(plan: &NodePlan<'_>, matches: &ArgMatches, out: &mut Vec<String>) {
    let child = matches.subcommand().and_then(|(name, sub)| {
        plan.children
            .iter()
            .find(|child| child.name == name)
            .map(|child| (child, sub))
    });
    // An ancestor's local parameters are not part of the executed command's
    // set; only its persistent partition reaches descendants.
    let is_leaf = child.is_none();
    for param in plan.set.iter() {
        let desc = param.descriptor();
        if desc.required && !param.changed() && (is_leaf || desc.persistent) {
            out.push(param.name().to_string());
        }
    }
    if let Some((child, sub)) = child {
        collect_missing_path(child, sub, out);
    }
}

fn leaf_has_run(plan: &NodePlan<'_>, path: &[String]) -> bool {
    match path.split_first() {
        None => plan.has_run,
        Some((head, rest)) => plan
            .children
            .iter()
            .find(|child| child.name == head.as_str())
            .is_some_and(|child| leaf_has_run(child, rest)),
    }
}

// --- Clap assembly ----------------------------------------------------------

fn assemble(plan: &NodePlan<'_>, is_root: bool, with_printenv: bool) -> ClapCommand {
    let mut cmd = ClapCommand::new(plan.name.clone());
    if !plan.about.is_empty() {
        cmd = cmd.about(plan.about.clone());
    }
    if let Some(version) = &plan.version {
        cmd = cmd.version(version.clone());
    }
    for param in plan.set.iter() {
        cmd = cmd.arg(make_arg(param));
    }
    if is_root {
        cmd = cmd
            .arg(
                Arg::new("env-file")
                    .long("env-file")
                    .global(true)
                    .action(ArgAction::Append)
                    .value_name("FILE")
                    .help("load dotenv file (repeat for multiple files)"),
            )
            .arg(
                Arg::new("env-overwrite")
                    .long("env-overwrite")
                    .global(true)
                    .action(ArgAction::SetTrue)
                    .help("give precedence to dotenv environment variables"),
            )
            .arg(
                Arg::new("env-lax")
                    .long("env-lax")
                    .global(true)
                    .action(ArgAction::SetTrue)
                    .help("skip the unbound environment variable check"),
            );
    }
    for child in &plan.children {
        cmd = cmd.subcommand(assemble(child, false, false));
    }
    if is_root && with_printenv {
        cmd = cmd.subcommand(ClapCommand::new("printenv").about(
            "Print all environment variable values or defaults for this command",
        ));
    }
    cmd
}

fn make_arg(param: &Param<'_>) -> Arg {
    let desc = param.descriptor();
    let mut arg = Arg::new(desc.name.clone())
        .long(desc.name.clone())
        .help(param.usage_text());
    if let Some(abbrev) = desc.abbrev {
        arg = arg.short(abbrev);
    }
    if desc.persistent {
        arg = arg.global(true);
    }
    match desc.arity {
        Arity::Switch => arg
            .action(ArgAction::Set)
            .num_args(0..=1)
            .require_equals(true)
            .default_missing_value("true"),
        Arity::Count => arg.action(ArgAction::Count),
        Arity::Repeat => arg
            .action(ArgAction::Append)
            .value_name(desc.type_name.clone()),
        Arity::Singular => arg.action(ArgAction::Set).value_name(desc.type_name.clone()),
    }
}

fn eprint_usage(plan: &NodePlan<'_>, path: &[String], with_printenv: bool) {
    let mut cmd = assemble(plan, true, with_printenv);
    for name in path {
        match cmd.find_subcommand(name.as_str()) {
            Some(sub) => cmd = sub.clone(),
            None => break,
        }
    }
    eprintln!("{}", cmd.render_help());
}
