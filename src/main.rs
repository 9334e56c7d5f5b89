//! svcctl - install, start, stop and inspect services from a services file.

use std::env;
use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use svcctl::agent::{Action, ManagedService, ServiceAgent};
use svcctl::config::{read_service_config, Settings, DEFAULT_SETTINGS_PATH};
use svcctl::controller::ServiceController;
use svcctl::executor::{CancelToken, SystemRunner};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const NAME: &str = env!("CARGO_PKG_NAME");

/// How long a stuck worker may delay process exit after shutdown.
const WORKER_GRACE: Duration = Duration::from_secs(2);

/// Parsed command line.
struct Cli {
    config: Option<String>,
    services: Option<String>,
    command: Option<String>,
    operand: Option<String>,
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return ExitCode::SUCCESS;
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("{} {}", NAME, VERSION);
        return ExitCode::SUCCESS;
    }

    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(message) => {
            eprintln!("Error: {}", message);
            eprintln!("Run '{} --help' for usage.", NAME);
            return ExitCode::FAILURE;
        }
    };

    // An explicit --config must exist; the default location is optional.
    let settings = match &cli.config {
        Some(path) => Settings::load(path),
        None => Settings::load_or_default(DEFAULT_SETTINGS_PATH),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&settings) {
        eprintln!("Error initializing logging: {}", e);
        return ExitCode::FAILURE;
    }

    let result = match cli.command.as_deref() {
        Some("version") => print_package_version(&settings, cli.operand.as_deref()),
        Some("show-config") => print_service_config(cli.operand.as_deref()),
        Some(command) => match command.parse::<Action>() {
            Ok(action) => run_agent(settings, action, cli.services),
            Err(e) => Err(e.into()),
        },
        None => Err("missing command".into()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "svcctl failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn parse_args(args: &[String]) -> Result<Cli, String> {
    let mut cli = Cli {
        config: None,
        services: None,
        command: None,
        operand: None,
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if let Some(path) = arg.strip_prefix("--config=") {
            cli.config = Some(path.to_string());
        } else if let Some(path) = arg.strip_prefix("--services=") {
            cli.services = Some(path.to_string());
        } else if arg == "--config" || arg == "-c" {
            cli.config = Some(iter.next().ok_or("--config requires a path")?.clone());
        } else if arg == "--services" || arg == "-s" {
            cli.services = Some(iter.next().ok_or("--services requires a path")?.clone());
        } else if arg.starts_with('-') {
            return Err(format!("unknown option '{}'", arg));
        } else if cli.command.is_none() {
            cli.command = Some(arg.clone());
        } else if cli.operand.is_none() {
            cli.operand = Some(arg.clone());
        } else {
            return Err(format!("unexpected argument '{}'", arg));
        }
    }

    Ok(cli)
}

fn run_agent(
    settings: Settings,
    action: Action,
    services: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let services_file = services
        .map(PathBuf::from)
        .unwrap_or_else(|| settings.paths.services_file.clone());

    info!("Starting {} v{}", NAME, VERSION);
    info!("Services file: {}", services_file.display());

    block_on_bounded(async_main(settings, action, services_file))?
}

/// Run `future` on a fresh runtime, then shut the runtime down without
/// waiting more than [`WORKER_GRACE`] for blocking tasks still running.
fn block_on_bounded<F: Future>(future: F) -> std::io::Result<F::Output> {
    let runtime = tokio::runtime::Runtime::new()?;
    let output = runtime.block_on(future);
    runtime.shutdown_timeout(WORKER_GRACE);
    Ok(output)
}

/// Runs the agent on a blocking thread so signals can interrupt it.
async fn async_main(
    settings: Settings,
    action: Action,
    services_file: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = CancelToken::new();
    let controller = ServiceController::new(
        SystemRunner::new(cancel.clone()),
        settings.commands.clone(),
    );

    let mut agent = ServiceAgent::new(controller, action, cancel);
    agent.initialize(&services_file)?;
    let agent = Arc::new(agent);

    let worker = Arc::clone(&agent);
    let mut task = tokio::task::spawn_blocking(move || worker.run());

    tokio::select! {
        result = &mut task => {
            result??;
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received, cancelling running commands...");
            agent.stop();

            let drain_timeout = Duration::from_secs(10);
            match tokio::time::timeout(drain_timeout, &mut task).await {
                Ok(result) => result??,
                Err(_) => {
                    warn!(
                        "Shutdown timeout after {}s, abandoning worker",
                        drain_timeout.as_secs()
                    );
                    return Err("interrupted".into());
                }
            }
        }
    }

    if action == Action::Status {
        for status in agent.statuses() {
            let version = agent
                .controller()
                .package_version(&status.service.package_name)
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{}\t{}\t{}",
                status.service.name,
                status.status.as_deref().unwrap_or("unknown"),
                version
            );
        }
    }

    Ok(())
}

fn print_package_version(
    settings: &Settings,
    package: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let package = package.ok_or("version requires a package name")?;
    let controller = ServiceController::new(SystemRunner::default(), settings.commands.clone());

    match controller.probe_package_version(package)? {
        Some(version) => {
            println!("{}", version);
            Ok(())
        }
        None => Err(format!("no version reported for '{}'", package).into()),
    }
}

fn print_service_config(path: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let path = path.ok_or("show-config requires a path")?;
    let config = read_service_config(path)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn print_help() {
    println!(
        r#"{} {}
Manage OS services and their packages through systemctl and apt.

USAGE:
    {} [OPTIONS] <COMMAND>

COMMANDS:
    status                 Show the state of every service
    install                Install the package of every service
    start                  Start every service that is not running
    remove                 Stop every service and remove its package
    version <PACKAGE>      Print the available version of a package
    show-config <PATH>     Print a service config file with defaults applied

OPTIONS:
    -c, --config <PATH>    Path to settings file
                           [default: {}]
    -s, --services <PATH>  Path to services file (overrides settings)
    -h, --help             Print help information
    -V, --version          Print version information
"#,
        NAME, VERSION, NAME, DEFAULT_SETTINGS_PATH
    );
}

/// Initialize logging based on settings.
fn init_logging(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.logging.level))?;

    // Logs go to stderr so command output on stdout stays parseable.
    match settings.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init()?;
        }
    }

    Ok(())
}
