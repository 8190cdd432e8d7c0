//! `am43` command-line entry point.

use am43_control::{ActionOutcome, CancelToken, FleetDispatcher};
use am43_metrics::metric_defs;
use am43_runner::{
    bind_and_serve, format_outcome, init_tracing, RunnerConfig, RunnerError, RunnerResult,
    DEFAULT_CONFIG_PATH,
};
use clap::{ArgAction, Parser, Subcommand};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

const DEFAULT_BIND: &str = "0.0.0.0:5000";

#[derive(Parser, Debug)]
#[command(name = "am43", version, about = "Drive a fleet of AM43 blind actuators")]
struct Cli {
    /// Fleet configuration file.
    #[arg(long, short, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Drive simulated actuators built from the configuration.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    simulate: bool,

    /// Log at debug level regardless of RUST_LOG.
    #[arg(long, short)]
    verbose: bool,

    /// Serve Prometheus metrics on this address.
    #[cfg(feature = "prometheus")]
    #[arg(long)]
    metrics_bind: Option<SocketAddr>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Run one action (Open, Close, Stop, Status) across the fleet.
    Action {
        /// Action name. Unknown names report status only.
        name: String,

        /// Print the full outcome as JSON.
        #[arg(long)]
        json: bool,

        /// Abort the action after this many seconds.
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Answer `GET /<Action>` over HTTP.
    Serve {
        /// Listen address.
        #[arg(long, default_value = DEFAULT_BIND)]
        bind: SocketAddr,
    },
    /// Validate the configuration, list the devices and the metrics recorded.
    Check,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "am43 failed");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> RunnerResult<ExitCode> {
    let config = RunnerConfig::load(&cli.config)?;
    info!(
        path = %cli.config.display(),
        devices = config.fleet.devices.len(),
        "configuration loaded"
    );

    if let Command::Check = cli.command {
        print_devices(&config);
        print_metrics();
        return Ok(ExitCode::SUCCESS);
    }

    if !cli.simulate {
        return Err(RunnerError::NoBackend);
    }

    #[cfg(feature = "prometheus")]
    if let Some(addr) = cli.metrics_bind {
        match am43_metrics::install_prometheus(addr) {
            Ok(()) => info!(%addr, "metrics exporter listening"),
            Err(e) => warn!(error = %e, "metrics exporter not installed"),
        }
    }

    let mut dispatcher = FleetDispatcher::new(config.build_simulator(), config.fleet.clone())?;

    let shutdown = CancelToken::new();
    let handler_token = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
        warn!(error = %e, "Ctrl-C handler not installed");
    }

    match cli.command {
        Command::Action {
            name,
            json,
            timeout_secs,
        } => {
            let cancel = match timeout_secs {
                Some(secs) => {
                    shutdown.child_with_deadline(Instant::now() + Duration::from_secs(secs))
                }
                None => shutdown,
            };
            let outcome = dispatcher.perform_action(&name, &cancel);
            print_outcome(&outcome, json);
            Ok(if outcome.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Serve { bind } => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(RunnerError::Server)?;
            let dispatcher = Arc::new(Mutex::new(dispatcher));
            runtime
                .block_on(bind_and_serve(bind, dispatcher, shutdown))
                .map_err(RunnerError::Server)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Check => Ok(ExitCode::SUCCESS),
    }
}

fn print_outcome(outcome: &ActionOutcome, json: bool) {
    if json {
        match serde_json::to_string_pretty(outcome) {
            Ok(text) => println!("{}", text),
            Err(e) => warn!(error = %e, "could not serialize outcome"),
        }
        return;
    }

    println!("{}", format_outcome(outcome));
    for report in outcome.failures() {
        if let Some(error) = &report.error {
            eprintln!("{} ({}): {}", report.name, report.address, error);
        }
    }
    if outcome.cancelled {
        eprintln!("cancelled before every device was processed");
    }
}

fn print_devices(config: &RunnerConfig) {
    let session = &config.fleet.session;
    let retry = &config.fleet.retry;
    println!(
        "{} device(s), response timeout {} ms, {} attempt(s) {} ms apart",
        config.fleet.devices.len(),
        session.response_timeout_ms,
        retry.max_attempts,
        retry.delay_ms
    );
    for device in &config.fleet.devices {
        let simulated = if config.simulator.contains_key(&device.name) {
            " (custom simulator profile)"
        } else {
            ""
        };
        println!("  {:20} {}{}", device.name, device.address, simulated);
    }
}

fn print_metrics() {
    println!();
    println!("metrics:");
    for metric in metric_defs::ALL {
        println!("  {}", metric.summary());
    }
}
