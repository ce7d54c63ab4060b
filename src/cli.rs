//! Command-line interface definitions using clap derive macros.
//!
//! Contains the top-level [`Cli`] parser, the [`Commands`] enum for
//! subcommands (run, health), and their associated argument structs.
//! Every flag has an environment variable equivalent for container
//! deployments.

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "spraycast",
    version,
    about = "Webhook broadcast reverse proxy",
    propagate_version = true,
    after_help = "\x1b[1mQuick start:\x1b[0m\n  \
        spraycast run --backend http://localhost:8081 --backend http://localhost:8082\n  \
        spraycast run --insecure-skip-webhook-verify    Local dev, no secret needed\n  \
        spraycast health                                Check a running instance"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the broadcast proxy server
    Run(Box<RunArgs>),

    /// Check health of a running instance
    Health(HealthArgs),
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        spraycast run --backend http://ci:8081 --backend http://audit:8082\n  \
        spraycast run --enable-dynamic-backends         Allow runtime (un)registration\n  \
        spraycast run --pretty -l debug                 Local dev mode")]
pub struct RunArgs {
    /// Backend origin to forward requests to. Use more than once.
    #[arg(
        short,
        long = "backend",
        env = "SPRAYCAST_BACKENDS",
        value_delimiter = ','
    )]
    pub backends: Vec<String>,

    /// Listen port
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Listen address
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Allow registering and unregistering backends at runtime
    #[arg(long, env = "SPRAYCAST_ENABLE_DYNAMIC_BACKENDS")]
    pub enable_dynamic_backends: bool,

    // -- Security --
    /// Skip TLS verification on all backends. INSECURE - do not use in production.
    #[arg(
        long,
        env = "SPRAYCAST_INSECURE_SKIP_TLS_VERIFY",
        help_heading = "Security"
    )]
    pub insecure_skip_tls_verify: bool,

    /// Skip webhook payload verification. INSECURE - do not use in production.
    #[arg(
        long,
        env = "SPRAYCAST_INSECURE_SKIP_WEBHOOK_VERIFY",
        help_heading = "Security"
    )]
    pub insecure_skip_webhook_verify: bool,

    /// Webhook validation secret. Required unless verification is skipped.
    #[arg(
        long,
        env = "GH_APP_WEBHOOK_SECRET",
        hide_env_values = true,
        help_heading = "Security"
    )]
    pub webhook_secret: Option<String>,

    // -- Logging --
    /// Log level
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Force pretty (human-readable) log output
    #[arg(long)]
    pub pretty: bool,

    /// Force JSON log output (overrides TTY detection)
    #[arg(long, conflicts_with = "pretty")]
    pub json: bool,

    // -- Tuning --
    /// Per-backend forwarding timeout in milliseconds
    #[arg(
        long,
        env = "SPRAYCAST_FORWARD_TIMEOUT_MS",
        default_value_t = 15_000,
        help_heading = "Tuning"
    )]
    pub timeout: u64,

    /// Max request body size in bytes (default matches the GitHub webhook cap)
    #[arg(
        long,
        env = "SPRAYCAST_MAX_REQUEST_SIZE",
        default_value_t = 25 * 1024 * 1024,
        help_heading = "Tuning"
    )]
    pub max_request_size: usize,
}

#[derive(Args)]
pub struct HealthArgs {
    /// URL of the running instance
    #[arg(default_value = "http://localhost:8080")]
    pub url: String,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}
