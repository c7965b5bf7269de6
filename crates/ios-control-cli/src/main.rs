//! Command-line interface for controlling iOS devices.
//!
//! Every device-bound subcommand connects to the requested device (or the
//! first one attached), performs one operation, and disconnects.
//!
//! # Usage
//!
//! ```bash
//! # List attached devices
//! ios-control devices
//!
//! # Show device info as JSON
//! ios-control --format json info
//!
//! # Target a specific device
//! ios-control --udid 00008110-001A0C123456789A screenshot -o home.png
//!
//! # Gestures
//! ios-control tap 100 200
//! ios-control swipe 200 600 200 200 --duration 0.3
//! ios-control longpress 50 50 --duration 2
//! ios-control input "hello world"
//! ios-control home
//! ios-control back
//!
//! # Tap an element by its on-screen text
//! ios-control tap-text "Sign In" --exact
//!
//! # Wait up to 20s for an element to appear
//! ios-control wait-for "Welcome" -t 20
//! ```

mod render;

use std::fmt;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use ios_control_core::config::{ConfigError, ControlConfig};
use ios_control_core::device::list_devices;
use ios_control_core::{ControlError, IosDevice, SystemRunner};
use tracing_subscriber::EnvFilter;

/// Command-line interface for controlling iOS devices.
#[derive(Parser)]
#[command(name = "ios-control")]
#[command(about = "iOS Control CLI - Control iOS devices from command line")]
#[command(version)]
struct Cli {
    /// Specific device UDID to use
    #[arg(short, long, global = true, env = "IOS_CONTROL_UDID")]
    udid: Option<String>,

    /// Config file (defaults to ~/.ios-control/config.json)
    #[arg(short, long, global = true, env = "IOS_CONTROL_CONFIG")]
    config: Option<PathBuf>,

    /// Output format: text or json
    #[arg(short, long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// List all available iOS devices
    Devices,

    /// Show detailed device information
    Info,

    /// Take a screenshot
    Screenshot {
        /// Output file path
        #[arg(short, long, default_value = "screenshot.png")]
        output: String,
    },

    /// List installed apps
    Apps,

    /// Install an app from an .ipa file
    Install {
        /// Path to the .ipa file
        path: String,
    },

    /// Uninstall an app
    Uninstall {
        /// Bundle identifier (e.g., com.example.MyApp)
        bundle_id: String,
    },

    /// Reboot the device
    Reboot,

    /// Tap at coordinates
    Tap {
        /// X coordinate
        x: i32,
        /// Y coordinate
        y: i32,
    },

    /// Tap element by text
    TapText {
        /// Text to search for
        text: String,
        /// Exact text match
        #[arg(long)]
        exact: bool,
    },

    /// Wait for an element with the given text to appear
    WaitFor {
        /// Text to search for
        text: String,
        /// Exact text match
        #[arg(long)]
        exact: bool,
        /// Timeout in seconds (defaults to the configured wait timeout)
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// Swipe between coordinates
    Swipe {
        /// Start X coordinate
        x1: i32,
        /// Start Y coordinate
        y1: i32,
        /// End X coordinate
        x2: i32,
        /// End Y coordinate
        y2: i32,
        /// Swipe duration in seconds
        #[arg(long, default_value = "0.5")]
        duration: f64,
    },

    /// Input text
    Input {
        /// Text to input
        text: String,
    },

    /// Press home button
    Home,

    /// Perform back gesture
    Back,

    /// Long press at coordinates
    Longpress {
        /// X coordinate
        x: i32,
        /// Y coordinate
        y: i32,
        /// Press duration in seconds
        #[arg(long, default_value = "1.0")]
        duration: f64,
    },

    /// Show the screen size in points
    ScreenSize,

    /// Dump the current UI hierarchy as JSON
    Hierarchy,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug)]
enum CliError {
    Device(ControlError),
    Config(ConfigError),
    NoDevices,
    Timeout(String),
    Output(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Device(e) if e.is_not_found() => write!(f, "No iOS device found: {}", e.message()),
            CliError::Device(e) => write!(f, "{}", e),
            CliError::Config(e) => write!(f, "{}", e),
            CliError::NoDevices => write!(f, "No iOS devices found."),
            CliError::Timeout(msg) => write!(f, "{}", msg),
            CliError::Output(msg) => write!(f, "Output error: {}", msg),
        }
    }
}

impl From<ControlError> for CliError {
    fn from(e: ControlError) -> Self {
        CliError::Device(e)
    }
}

/// A completed device action, for reporting.
struct Action {
    name: &'static str,
    target: String,
    message: String,
}

fn load_config(cli: &Cli) -> Result<ControlConfig, CliError> {
    match &cli.config {
        Some(path) => ControlConfig::load_from(path).map_err(CliError::Config),
        None => Ok(ControlConfig::load()),
    }
}

/// Connects, runs `op` against the session, and disconnects on every path.
fn with_session<T>(
    cli: &Cli,
    config: ControlConfig,
    op: impl FnOnce(&IosDevice) -> ios_control_core::Result<T>,
) -> Result<T, CliError> {
    let mut device = IosDevice::with_runner(cli.udid.clone(), SystemRunner, config);
    let session = device.session()?;
    let value = op(&session)?;
    Ok(value)
}

fn print_json(value: &serde_json::Value) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| CliError::Output(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

fn perform(
    cli: &Cli,
    config: ControlConfig,
    action: Action,
    op: impl FnOnce(&IosDevice) -> ios_control_core::Result<()>,
) -> Result<(), CliError> {
    let start = Instant::now();
    with_session(cli, config, op)?;
    report(cli, &action, start.elapsed())
}

fn report(cli: &Cli, action: &Action, elapsed: Duration) -> Result<(), CliError> {
    if cli.format == OutputFormat::Json {
        return print_json(&serde_json::json!({
            "success": true,
            "action": action.name,
            "target": action.target,
            "message": action.message,
        }));
    }

    println!("{}", action.message);
    if !cli.quiet {
        let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3fZ");
        eprintln!("|{}|{}|{}|{}ms|", now, action.name, action.target, elapsed.as_millis());
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let config = load_config(cli)?;

    match &cli.command {
        Command::Devices => {
            let devices = list_devices(&SystemRunner, &config.tools);
            if cli.format == OutputFormat::Json {
                let value = serde_json::to_value(&devices).map_err(|e| CliError::Output(e.to_string()))?;
                print_json(&value)?;
            } else if !devices.is_empty() {
                print!("{}", render::devices(&devices));
            }
            if devices.is_empty() {
                return Err(CliError::NoDevices);
            }
            Ok(())
        }
        Command::Info => {
            let info = with_session(cli, config, |device| device.get_device_info())?;
            if cli.format == OutputFormat::Json {
                let value = serde_json::to_value(&info).map_err(|e| CliError::Output(e.to_string()))?;
                print_json(&value)
            } else {
                print!("{}", render::device_info(&info));
                Ok(())
            }
        }
        Command::Apps => {
            let apps = with_session(cli, config, |device| device.list_apps())?;
            if cli.format == OutputFormat::Json {
                let value = serde_json::to_value(&apps).map_err(|e| CliError::Output(e.to_string()))?;
                print_json(&value)
            } else {
                print!("{}", render::apps(&apps));
                Ok(())
            }
        }
        Command::ScreenSize => {
            let (width, height) = with_session(cli, config, |device| device.get_screen_size())?;
            if cli.format == OutputFormat::Json {
                print_json(&serde_json::json!({ "width": width, "height": height }))
            } else {
                println!("{}x{}", width, height);
                Ok(())
            }
        }
        Command::Hierarchy => {
            let dump = with_session(cli, config, |device| device.hierarchy())?;
            print_json(&dump.to_value())
        }
        Command::WaitFor { text, exact, timeout } => {
            let timeout = timeout.map(Duration::from_secs).unwrap_or_else(|| config.wait_timeout());
            let start = Instant::now();
            let found = with_session(cli, config, |device| {
                device.wait_for_element_by_text(text, timeout, *exact)
            })?;
            if !found {
                return Err(CliError::Timeout(format!(
                    "Element with text '{}' did not appear within {}s",
                    text,
                    timeout.as_secs()
                )));
            }
            let action = Action {
                name: "wait-for",
                target: text.clone(),
                message: format!("Found element with text '{}' ({} match)", text, render::match_kind(*exact)),
            };
            report(cli, &action, start.elapsed())
        }
        Command::Screenshot { output } => perform(
            cli,
            config,
            Action {
                name: "screenshot",
                target: output.clone(),
                message: format!("Screenshot saved to: {}", output),
            },
            |device| device.screenshot(output).map(|_| ()),
        ),
        Command::Install { path } => perform(
            cli,
            config,
            Action {
                name: "install",
                target: path.clone(),
                message: format!("Installed {}", path),
            },
            |device| device.install_app(path),
        ),
        Command::Uninstall { bundle_id } => perform(
            cli,
            config,
            Action {
                name: "uninstall",
                target: bundle_id.clone(),
                message: format!("Uninstalled {}", bundle_id),
            },
            |device| device.uninstall_app(bundle_id),
        ),
        Command::Reboot => perform(
            cli,
            config,
            Action {
                name: "reboot",
                target: String::new(),
                message: "Reboot command sent".to_string(),
            },
            |device| device.reboot(),
        ),
        Command::Tap { x, y } => perform(
            cli,
            config,
            Action {
                name: "tap",
                target: format!("({}, {})", x, y),
                message: format!("Tapped at ({}, {})", x, y),
            },
            |device| device.tap(*x, *y),
        ),
        Command::TapText { text, exact } => perform(
            cli,
            config,
            Action {
                name: "tap-text",
                target: text.clone(),
                message: format!("Tapped element with text '{}' ({} match)", text, render::match_kind(*exact)),
            },
            |device| device.tap_by_text(text, *exact),
        ),
        Command::Swipe { x1, y1, x2, y2, duration } => perform(
            cli,
            config,
            Action {
                name: "swipe",
                target: format!("({}, {}) -> ({}, {})", x1, y1, x2, y2),
                message: format!(
                    "Swiped from ({}, {}) to ({}, {}) in {}",
                    x1,
                    y1,
                    x2,
                    y2,
                    render::seconds(*duration)
                ),
            },
            |device| device.swipe(*x1, *y1, *x2, *y2, *duration),
        ),
        Command::Input { text } => perform(
            cli,
            config,
            Action {
                name: "input",
                target: text.clone(),
                message: format!("Input text: {}", text),
            },
            |device| device.input_text(text),
        ),
        Command::Home => perform(
            cli,
            config,
            Action {
                name: "home",
                target: String::new(),
                message: "Pressed home button".to_string(),
            },
            |device| device.home_button(),
        ),
        Command::Back => perform(
            cli,
            config,
            Action {
                name: "back",
                target: String::new(),
                message: "Performed back gesture".to_string(),
            },
            |device| device.back_button(),
        ),
        Command::Longpress { x, y, duration } => perform(
            cli,
            config,
            Action {
                name: "longpress",
                target: format!("({}, {})", x, y),
                message: format!("Long pressed at ({}, {}) for {}", x, y, render::seconds(*duration)),
            },
            |device| device.long_press(*x, *y, *duration),
        ),
    }
}
