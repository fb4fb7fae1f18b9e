//! `portal` - diagnose the connection to the hosted backend

mod logging;
mod output;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use portal_backend::RestStore;
use portal_connection::{ChannelNotifier, ConnectionMonitor, MonitorConfig, Notification};
use portal_core::{DevMode, PortalConfig};
use tokio::sync::{broadcast, mpsc};

use logging::{LogFormat, LoggingConfig};

#[derive(Parser)]
#[command(name = "portal")]
#[command(about = "Check and watch the connection to the portal backend")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true, env = "PORTAL_CONFIG")]
    config: Option<PathBuf>,

    /// Enable Dev Mode (verbose probe logging)
    #[arg(long, global = true)]
    dev_mode: bool,

    /// Console log format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Also write JSON logs to the default log directory
    #[arg(long, global = true)]
    log_file: bool,

    /// Write JSON logs to this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one user-visible connection check and print the result
    Check {
        /// Print the state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the background monitor until interrupted
    Watch {
        /// Override the background check interval
        #[arg(long)]
        interval_secs: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let log_dir = cli
        .log_dir
        .clone()
        .or_else(|| cli.log_file.then(logging::log_directory));
    let _log_guard = logging::init(
        &LoggingConfig::default()
            .with_format(cli.log_format)
            .with_log_dir(log_dir),
    )
    .context("Failed to initialize logging")?;

    let config = load_config(cli.config.as_deref())?;
    let dev_mode = DevMode::new(cli.dev_mode || config.monitor.dev_mode);
    let store = RestStore::from_settings(&config.backend).context("Invalid backend settings")?;

    let mut monitor_config = MonitorConfig::from_config(&config);
    if let Command::Watch {
        interval_secs: Some(secs),
    } = cli.command
    {
        monitor_config = monitor_config.with_check_interval(Duration::from_secs(secs.max(1)));
    }

    let (notifier, notifications) = ChannelNotifier::new();
    let monitor = ConnectionMonitor::builder(Arc::new(store))
        .config(monitor_config)
        .notifier(Arc::new(notifier))
        .dev_mode(dev_mode)
        .build();

    match cli.command {
        Command::Check { json } => check(&monitor, notifications, json).await,
        Command::Watch { .. } => watch(&monitor, notifications).await,
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PortalConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => PortalConfig::default_path()?,
    };

    let mut config = PortalConfig::load(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    config.apply_env_overrides();
    config.validate().with_context(|| {
        format!(
            "Invalid configuration (edit {} or set PORTAL_BACKEND_URL and PORTAL_ANON_KEY)",
            path.display()
        )
    })?;
    Ok(config)
}

async fn check(
    monitor: &Arc<ConnectionMonitor>,
    mut notifications: mpsc::UnboundedReceiver<Notification>,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let connected = monitor.check_connection(false).await;
    let state = monitor.snapshot();

    let mut raised = Vec::new();
    while let Ok(notification) = notifications.try_recv() {
        raised.push(notification);
    }

    if json {
        let report = serde_json::json!({
            "state": state,
            "notifications": raised,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", output::state_table(&state));
        for notification in &raised {
            println!("{}", output::notification_line(notification));
        }
    }

    Ok(if connected {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn watch(
    monitor: &Arc<ConnectionMonitor>,
    mut notifications: mpsc::UnboundedReceiver<Notification>,
) -> anyhow::Result<ExitCode> {
    let mut events = monitor.reconnect_events();
    let handle = monitor.spawn_background();
    println!(
        "watching {} every {}s, Ctrl-C to stop",
        monitor.config().probe_query.table,
        monitor.config().check_interval.as_secs()
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result.context("Failed to listen for Ctrl-C")?;
                break;
            }
            Some(notification) = notifications.recv() => {
                println!("{}", output::notification_line(&notification));
            }
            event = events.recv() => match event {
                Ok(event) => println!("{}", output::event_line(&event)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "reconnect events lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    handle.shutdown().await;
    println!("{}", monitor.snapshot().summary());
    Ok(ExitCode::SUCCESS)
}
