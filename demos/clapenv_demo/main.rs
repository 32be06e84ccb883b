//! # clapenv demo application
//!
//! A sample CLI tool that showcases how to integrate
//! [clapenv](https://docs.rs/clapenv) into a real application. This is
//! **not** a real app — it exists purely to demonstrate and manually verify
//! clapenv's features.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example clapenv_demo -- serve
//! cargo run --example clapenv_demo -- printenv
//! ```
//!
//! ## Features demonstrated
//!
//! | Feature                  | How to exercise it                                                      |
//! |--------------------------|-------------------------------------------------------------------------|
//! | Compiled defaults        | `cargo run --example clapenv_demo -- serve`                             |
//! | Derived env vars         | `CLAPENV_DEMO_SERVE_PORT=9999 cargo run --example clapenv_demo -- serve`|
//! | Flag beats env           | `CLAPENV_DEMO_SERVE_PORT=9999 ... -- serve --port 8080`                 |
//! | Nested records           | `CLAPENV_DEMO_SERVE_POOL_SIZE=32 cargo run --example clapenv_demo -- serve` |
//! | Count flags              | `cargo run --example clapenv_demo -- -vv serve`                         |
//! | Custom registered type   | `cargo run --example clapenv_demo -- serve --tier gold`                 |
//! | Unbound env detection    | `CLAPENV_DEMO_TYPO=1 cargo run --example clapenv_demo -- serve`         |
//! | Lax mode                 | `CLAPENV_DEMO_TYPO=1 ... -- serve --env-lax`                            |
//! | Dotenv loading           | `echo CLAPENV_DEMO_SERVE_HOST=10.0.0.1 > demo.env; ... -- --env-file demo.env serve` |
//! | Env dump                 | `cargo run --example clapenv_demo -- printenv`                          |

use std::time::Duration;

use clapenv::cli::Command;
use clapenv::{Record, SchemaError, Walker};

/// Service tier, bound through the type registry.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Tier {
    Free,
    Gold,
}

fn parse_tier(text: &str) -> Result<Tier, String> {
    match text {
        "free" => Ok(Tier::Free),
        "gold" => Ok(Tier::Gold),
        _ => Err(format!("unknown tier {text:?}, expected free or gold")),
    }
}

fn tier_name(tier: &Tier) -> String {
    match tier {
        Tier::Free => "free".to_string(),
        Tier::Gold => "gold".to_string(),
    }
}

#[derive(Debug, Clone, Default)]
struct RootConfig {
    verbose: u8,
}

impl Record for RootConfig {
    fn fields<'s>(&'s mut self, w: &mut Walker<'s, '_>) -> Result<(), SchemaError> {
        w.field(
            "Verbose",
            "param=verbose,v encoding=count env=- opts=persistent usage=increase output, repeatable",
            &mut self.verbose,
        )
    }
}

#[derive(Debug, Clone)]
struct PoolConfig {
    size: usize,
    idle_timeout: Duration,
}

impl Record for PoolConfig {
    fn fields<'s>(&'s mut self, w: &mut Walker<'s, '_>) -> Result<(), SchemaError> {
        w.field("Size", "usage=connections kept open", &mut self.size)?;
        w.field("IdleTimeout", "usage=drop idle connections after", &mut self.idle_timeout)
    }
}

#[derive(Debug, Clone)]
struct ServeConfig {
    host: String,
    port: u16,
    tier: Tier,
    pool: PoolConfig,
}

impl Record for ServeConfig {
    fn fields<'s>(&'s mut self, w: &mut Walker<'s, '_>) -> Result<(), SchemaError> {
        w.field("Host", "usage=listen address", &mut self.host)?;
        w.field("Port", "param=port,p usage=listen port", &mut self.port)?;
        w.field("Tier", "usage=service tier (free, gold)", &mut self.tier)?;
        w.record("Pool", "", &mut self.pool)
    }
}

fn main() {
    let serve_defaults = ServeConfig {
        host: "127.0.0.1".to_string(),
        port: 8080,
        tier: Tier::Free,
        pool: PoolConfig {
            size: 8,
            idle_timeout: Duration::from_secs(90),
        },
    };

    Command::new("clapenv-demo", "clapenv demo — schema-driven flags and env vars", RootConfig::default())
        .version(env!("CARGO_PKG_VERSION"))
        .register(parse_tier, tier_name)
        .printenv()
        .setup(|cfg: &RootConfig| {
            if cfg.verbose > 1 {
                eprintln!("[setup] verbosity {}", cfg.verbose);
            }
            Ok(())
        })
        .subcommand(
            Command::new("serve", "Pretend to serve traffic", serve_defaults).run(|cfg| {
                println!("serving on {}:{} ({} tier)", cfg.host, cfg.port, tier_name(&cfg.tier));
                println!(
                    "pool: {} connections, idle timeout {}",
                    cfg.pool.size,
                    humantime::format_duration(cfg.pool.idle_timeout)
                );
                Ok(())
            }),
        )
        .execute();
}
