//! Command-line/environment configuration, grounded on the teacher's
//! `service::config::Config`: a `clap::Parser` struct, `.env` loaded first
//! via `dotenvy`, every field also settable as an environment variable.
//! Narrowed to what a reactive runtime with no database needs, plus the new
//! timing knobs SPEC_FULL.md §6.1 calls for (delayed-cleanup grace, SSE
//! keepalive/poll interval, patch queue capacity).

use std::fmt;
use std::str::FromStr;

use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// A list of full CORS origin URLs allowed to receive server responses.
    #[arg(long, env, value_delimiter = ',', default_value = "http://localhost:3000,https://localhost:3000")]
    pub allowed_origins: Vec<String>,

    /// The host interface to listen for incoming connections on.
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: String,

    /// The host TCP port to listen for incoming connections on.
    #[arg(short, long, env, default_value_t = 4000)]
    pub port: u16,

    /// Log level verbosity threshold controlling what gets displayed on console output.
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
    )]
    pub log_level_filter: LevelFilter,

    /// The Rust runtime environment to use.
    #[arg(
        long,
        env,
        default_value_t = RustEnv::Development,
        value_parser = clap::builder::PossibleValuesParser::new(["development", "production", "staging"])
            .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,

    /// The bounded patch queue capacity per context (spec.md §4.7 "drop oldest").
    #[arg(long, env, default_value_t = 5)]
    pub patch_queue_capacity: usize,

    /// How often the SSE pump drains a context's patch queue, in milliseconds.
    #[arg(long, env, default_value_t = 100)]
    pub sse_poll_interval_ms: u64,

    /// How long a connected SSE stream may sit silent before a keepalive
    /// comment is sent, in seconds.
    #[arg(long, env, default_value_t = 30)]
    pub sse_keepalive_interval_seconds: u64,

    /// Grace window after a disconnect before a context is torn down, in
    /// seconds -- a reconnect inside this window cancels the teardown
    /// (spec.md §4.8).
    #[arg(long, env, default_value_t = 5)]
    pub delayed_cleanup_grace_seconds: u64,

    /// Session cookie max age, in days.
    #[arg(long, env, default_value_t = 30)]
    pub session_cookie_max_age_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        dotenv().ok();
        Config::parse()
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_env_parses_case_insensitively() {
        assert_eq!("Production".parse::<RustEnv>(), Ok(RustEnv::Production));
        assert_eq!("STAGING".parse::<RustEnv>(), Ok(RustEnv::Staging));
        assert!("nonsense".parse::<RustEnv>().is_err());
    }

    #[test]
    fn rust_env_display_round_trips_through_parse() {
        for env in [RustEnv::Development, RustEnv::Production, RustEnv::Staging] {
            assert_eq!(env.to_string().parse::<RustEnv>().unwrap(), env);
        }
    }
}
