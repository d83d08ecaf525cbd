//! resonance — online analytics over a stream of ecosystem moments
//!
//! Usage:
//!   resonance                         → start the gateway with defaults
//!   resonance gateway --port 9000     → start the gateway
//!   resonance replay moments.jsonl    → replay a recording and print a report
//!   resonance config                  → print the default config as TOML
//!   resonance version                 → show version

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use resonance::{parser, replay};
use resonance_core::{AuthMode, BindMode, ResonanceConfig};
use resonance_engine::{Clock, SystemClock};
use resonance_gateway::{start_gateway, ServerConfig};
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

#[derive(Parser)]
#[command(
    name = "resonance",
    about = "Pattern, coupling and harmony detection over a stream of moments",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the config file (TOML)
    #[arg(short, long, global = true, default_value = "resonance.toml")]
    config: PathBuf,

    /// Write logs to a file (in addition to stderr)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the WebSocket/HTTP gateway
    Gateway {
        /// Port (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
        /// Bind mode: lan or loopback
        #[arg(short, long)]
        bind: Option<String>,
        /// Auth token (or set RESONANCE_GATEWAY_TOKEN)
        #[arg(short, long)]
        token: Option<String>,
        /// Disable authentication
        #[arg(long, default_value_t = false)]
        no_auth: bool,
    },
    /// Replay a JSONL recording of moments and print the resulting analysis
    Replay {
        /// One moment per line
        file: PathBuf,
        /// Print the report as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the default configuration as TOML
    Config,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("resonance v{}", env!("CARGO_PKG_VERSION"));
        }

        Some(Commands::Config) => {
            print!("{}", ResonanceConfig::default().to_toml());
        }

        Some(Commands::Replay { ref file, json }) => {
            let _guard = init_tracing(cli.log_file.as_deref())?;
            let config = ResonanceConfig::load(&cli.config)?;
            let parsed = parser::parse_file(file)?;
            for error in &parsed.errors {
                warn!("{}:{}: {}", file.display(), error.line, error.message);
            }
            let report = replay::replay(
                &parsed.records,
                parsed.errors,
                config.engine,
                SystemClock.now(),
            )?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report.to_json())?);
            } else {
                print!("{}", report.render());
            }
        }

        Some(Commands::Gateway {
            port,
            ref bind,
            ref token,
            no_auth,
        }) => {
            let _guard = init_tracing(cli.log_file.as_deref())?;
            let mut config = ResonanceConfig::load(&cli.config)?;
            if let Some(port) = port {
                config.gateway.port = port;
            }
            if let Some(bind) = bind {
                config.gateway.bind = BindMode::from_arg(bind);
            }
            if let Some(token) = token {
                config.gateway.auth.token = Some(token.clone());
            }
            if no_auth {
                config.gateway.auth.mode = AuthMode::None;
                config.gateway.auth.token = None;
            }
            run_gateway(config).await?;
        }

        None => {
            let _guard = init_tracing(cli.log_file.as_deref())?;
            run_gateway(ResonanceConfig::load(&cli.config)?).await?;
        }
    }

    Ok(())
}

async fn run_gateway(config: ResonanceConfig) -> anyhow::Result<()> {
    start_gateway(ServerConfig {
        gateway: config.gateway,
        engine: config.engine,
    })
    .await
}

/// Install the global subscriber. Keep the returned guard alive for the
/// life of the process or buffered file output is lost.
fn init_tracing(
    log_file: Option<&std::path::Path>,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "resonance=info,tower_http=info".into())
    };

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
            let name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("invalid log file path: {}", path.display()))?;
            let dir = dir.unwrap_or_else(|| std::path::Path::new("."));
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(filter()),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}
