//! servocap command line front end
//!
//! Connects the driver, runs one timer tick so the position is seeded, applies
//! a single request and prints the resulting status.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use servocap_driver::{
    properties, CapDriver, CapRequest, CapStatus, DriverConfig, ElementValue, FileParkStore,
};
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "servocap", about = "Servo dust cap and flat light control")]
struct Cli {
    /// Settings file
    #[arg(long, default_value = "servocap.json")]
    config: PathBuf,

    /// Park status file
    #[arg(long, default_value = "servocap_park.json")]
    park_file: PathBuf,

    /// Also write a daily rolling log file into this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Use a simulated servo and skip the dependency check
    #[arg(long)]
    simulate: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Close the cap
    Park,
    /// Open the cap
    Unpark,
    /// Set the servo straight to an angle (0-180)
    Move { degrees: f64 },
    /// Switch the flat light
    Light { state: Switch },
    /// Print the current status
    Status,
    /// Update a property, e.g. `set ROOF_PREFERED_LIMITS LIMIT_OPEN=90`
    Set {
        property: String,
        #[arg(required = true)]
        elements: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Switch {
    On,
    Off,
}

/// Guard keeping the non-blocking log writer alive until exit
type LogGuard = Option<tracing_appender::non_blocking::WorkerGuard>;

fn init_logging(log_dir: Option<&Path>) -> Result<LogGuard> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            let file_appender = tracing_appender::rolling::daily(dir, "servocap.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            let console_layer = fmt::layer().with_target(false).with_ansi(true);
            let file_layer = fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(non_blocking);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .with(file_layer)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
            Ok(None)
        }
    }
}

/// Parse `ELEMENT=VALUE`; On/Off become switches, numbers numbers, the rest text
fn parse_element(raw: &str) -> Result<(String, ElementValue)> {
    let Some((name, value)) = raw.split_once('=') else {
        bail!("expected ELEMENT=VALUE, got '{}'", raw);
    };
    let value = match value {
        "On" | "on" => ElementValue::Switch(true),
        "Off" | "off" => ElementValue::Switch(false),
        other => match other.parse::<f64>() {
            Ok(n) => ElementValue::Number(n),
            Err(_) => ElementValue::Text(other.to_string()),
        },
    };
    Ok((name.to_string(), value))
}

fn to_request(command: &Command, config: &DriverConfig) -> Result<Option<CapRequest>> {
    let request = match command {
        Command::Park => CapRequest::Park,
        Command::Unpark => CapRequest::Unpark,
        Command::Move { degrees } => CapRequest::decode(
            properties::STEPP_MOVE,
            &[(properties::STEPP_ABS, ElementValue::Number(*degrees))],
            config,
        )?,
        Command::Light { state } => CapRequest::Light(matches!(state, Switch::On)),
        Command::Status => return Ok(None),
        Command::Set { property, elements } => {
            let parsed = elements
                .iter()
                .map(|raw| parse_element(raw))
                .collect::<Result<Vec<_>>>()?;
            let borrowed: Vec<(&str, ElementValue)> = parsed
                .iter()
                .map(|(name, value)| (name.as_str(), value.clone()))
                .collect();
            CapRequest::decode(property, &borrowed, config)?
        }
    };
    Ok(Some(request))
}

fn print_status(status: &CapStatus) {
    println!("Device:     {}", status.device_name);
    println!("Connected:  {}", status.connected);
    println!("Cover:      {}", status.cover_state);
    println!("Light:      {} ({:?})", status.calibrator_state, status.light_type);
    println!("Position:   {:6.2} degrees", status.position);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.log_dir.as_deref())?;

    let mut config = DriverConfig::load(&cli.config)
        .with_context(|| format!("loading settings from {}", cli.config.display()))?;
    if cli.simulate {
        config.simulation = true;
    }

    let request = to_request(&cli.command, &config)?;
    let saves_settings = matches!(cli.command, Command::Set { .. });

    let mut driver = CapDriver::from_config(config, Box::new(FileParkStore::new(&cli.park_file)));
    driver.connect().await?;
    driver.tick();

    if let Some(request) = request {
        let state = driver.handle(request).await?;
        tracing::debug!("Request finished with state {:?}", state);
    }

    if saves_settings {
        driver
            .config()
            .save(&cli.config)
            .with_context(|| format!("saving settings to {}", cli.config.display()))?;
    }

    print_status(&driver.status());
    driver.disconnect();
    Ok(())
}
