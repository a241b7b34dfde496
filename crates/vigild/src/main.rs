//! vigild — the Vigil daemon.
//!
//! Single binary that assembles the monitor:
//! - Configuration (defaults → optional TOML file → environment)
//! - Target registry
//! - EC2 resolver/controller, SSH executor, SMTP notifier
//! - Scheduler tick loop with graceful shutdown on SIGINT/SIGTERM
//!
//! # Usage
//!
//! ```text
//! MONITOR_INSTANCES=i-0abc:nginx EMAIL_ADDRESS=… EMAIL_PASSWORD=… TO_EMAIL=… vigild
//! vigild --config /etc/vigil/vigil.toml --log-format json
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio::sync::watch;
use tracing::{info, warn};

use vigil_core::{Registry, VigilConfig};
use vigil_health::{Collaborators, EngineSettings, HttpProber, RemediationEngine, Scheduler};
use vigil_remote::{Ec2Fleet, SmtpNotifier, SshExecutor};

mod signals;

#[derive(Parser)]
#[command(name = "vigild", about = "Vigil self-healing monitor daemon", version)]
struct Cli {
    /// Optional TOML config file; environment variables override it.
    #[arg(long, env = "VIGIL_CONFIG")]
    config: Option<PathBuf>,

    /// Log output format.
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    let config = VigilConfig::load(cli.config.as_deref())?;
    run(config).await
}

fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info,vigild=debug,vigil=debug"))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}

async fn run(config: VigilConfig) -> anyhow::Result<()> {
    info!("Vigil daemon starting");

    // ── Targets ────────────────────────────────────────────────

    let registry = Registry::parse(&config.monitor.targets);
    if registry.is_empty() {
        warn!("no valid targets configured, monitor will idle");
    }
    for target in registry.iter() {
        info!(target_id = %target.target_id, label = %target.remediation_label, "monitoring target");
    }

    // ── Collaborators ──────────────────────────────────────────

    let executor = SshExecutor::from_config(&config.ssh)?;
    info!(user = %config.ssh.user, key = ?executor.key_path(), "ssh executor ready");

    let notifier = SmtpNotifier::new(&config.smtp)?;
    info!(server = %config.smtp.server, port = config.smtp.port, "smtp notifier ready");

    let fleet = Arc::new(Ec2Fleet::connect(&config.aws.region).await);

    let collab = Collaborators {
        resolver: fleet.clone(),
        prober: Arc::new(HttpProber::from_config(&config.probe)),
        executor: Arc::new(executor),
        notifier: Arc::new(notifier),
        controller: fleet,
    };

    let engine = RemediationEngine::new(collab, EngineSettings::from_config(&config));
    let scheduler = Scheduler::new(registry, engine, config.monitor.check_interval());

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let signal_handle = tokio::spawn(signals::wait_for_shutdown(shutdown_tx));

    // ── Monitor loop ───────────────────────────────────────────

    scheduler.run(shutdown_rx).await;
    signal_handle.abort();

    info!("Vigil daemon stopped");
    Ok(())
}
