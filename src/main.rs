use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use adb_qr_mirror::driver::{MirrorStatus, Tool};
use adb_qr_mirror::pairing::qr;
use adb_qr_mirror::{run_shell, Config, ConnectionTarget, Driver, DriverError, PairingPayload};

#[derive(Parser)]
#[command(name = "adb-qr-mirror")]
#[command(version)]
#[command(about = "Pair Android devices over Wi-Fi with a QR code and mirror them with scrcpy", long_about = None)]
struct Cli {
    /// Path to the adb executable (default: search PATH)
    #[arg(long, global = true)]
    adb: Option<PathBuf>,

    /// Path to the scrcpy executable (default: search PATH)
    #[arg(long, global = true)]
    scrcpy: Option<PathBuf>,

    /// Kill adb commands that run longer than this many seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Config file (default: ~/.adb-qr-mirror/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive session (default)
    Shell,

    /// Print a fresh pairing QR code
    Qr {
        /// Also write the QR code as SVG
        #[arg(long)]
        svg: Option<PathBuf>,
    },

    /// Pair with a device: adb pair <ip>:<port> <code>
    Pair {
        /// Device pairing endpoint, e.g. 192.168.1.102:39083
        target: String,

        /// Pairing code shown on the device
        code: String,
    },

    /// Connect to a paired device: adb connect <ip>:<port>
    Connect {
        /// Device endpoint, e.g. 192.168.1.102:5555
        target: String,
    },

    /// Mirror a connected device with scrcpy
    Mirror {
        /// Device serial, e.g. 192.168.1.102:5555
        serial: String,

        /// Stay until the scrcpy window is closed
        #[arg(long, default_value = "false")]
        wait: bool,
    },

    /// List devices known to adb
    Devices {
        /// Print as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// How long a freshly launched scrcpy is watched for an immediate failure
const MIRROR_STARTUP_WINDOW: Duration = Duration::from_secs(1);

fn fail(err: DriverError) -> anyhow::Error {
    if let Some(output) = err.output() {
        eprintln!("  {}", output.dimmed());
    }
    anyhow::anyhow!(err.user_message())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let mut config = Config::load(cli.config.as_deref())?;
    if cli.adb.is_some() {
        config.adb_path = cli.adb;
    }
    if cli.scrcpy.is_some() {
        config.scrcpy_path = cli.scrcpy;
    }
    if cli.timeout.is_some() {
        config.command_timeout_secs = cli.timeout;
    }

    let driver = Driver::new(config.resolver()).with_timeout(config.timeout());

    match cli.command.unwrap_or(Commands::Shell) {
        Commands::Shell => {
            run_shell(config, Arc::new(driver)).await?;
        }

        Commands::Qr { svg } => {
            let payload = PairingPayload::generate(config.name_length, config.password_length);
            println!("{}", qr::render_terminal(&payload)?);
            println!("QR ready: {}", payload.qr_payload().cyan());
            println!("Manual pairing: adb pair IP:PORT {}", payload.password);
            if let Some(path) = svg {
                std::fs::write(&path, qr::render_svg(&payload)?)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("{} Saved SVG to {}", "✓".green(), path.display());
            }
            println!(
                "\nScan it from Settings > Developer options > Wireless debugging > Pair device with QR code."
            );
        }

        Commands::Pair { target, code } => {
            let target = ConnectionTarget::from_endpoint(&target).map_err(fail)?;
            let pb = spinner(format!("Pairing with {}…", target));
            let result = driver.pair(&target, &code).await;
            pb.finish_and_clear();
            let result = result.map_err(fail)?;
            println!("{}", result.output());
            println!("{} Paired with device", "✔".green());
            println!(
                "  Next: adb-qr-mirror connect {}:{}",
                target.host, config.default_connect_port
            );
        }

        Commands::Connect { target } => {
            let target = ConnectionTarget::from_endpoint(&target).map_err(fail)?;
            let pb = spinner(format!("Connecting to {}…", target));
            let result = driver.connect(&target).await;
            pb.finish_and_clear();
            let result = result.map_err(fail)?;
            println!("{}", result.output());
            println!("{} Connected over Wi-Fi", "✔".green());
            println!("  Next: adb-qr-mirror mirror {}", target.serial());
        }

        Commands::Mirror { serial, wait } => {
            let mut handle = driver.mirror(&serial).map_err(fail)?;
            let status = handle
                .wait_for_early_exit(MIRROR_STARTUP_WINDOW)
                .await
                .context("Failed to poll scrcpy")?;
            match status {
                MirrorStatus::Exited(code) if code != 0 => anyhow::bail!(
                    "{} exited with code {} for {}. Check the device is connected and authorized.",
                    Tool::Scrcpy,
                    code,
                    handle.serial()
                ),
                MirrorStatus::Exited(_) => {
                    println!("scrcpy {} for {}", status, handle.serial());
                    return Ok(());
                }
                MirrorStatus::Running => println!(
                    "{} {} started for {}",
                    "▶".green(),
                    Tool::Scrcpy,
                    handle.serial().cyan()
                ),
            }
            if wait {
                loop {
                    match handle.poll().context("Failed to poll scrcpy")? {
                        MirrorStatus::Running => {
                            tokio::time::sleep(Duration::from_millis(500)).await;
                        }
                        MirrorStatus::Exited(code) if code != 0 => {
                            anyhow::bail!("{} exited with code {}", Tool::Scrcpy, code)
                        }
                        status => {
                            println!("scrcpy {}", status);
                            break;
                        }
                    }
                }
            }
        }

        Commands::Devices { json } => {
            let devices = driver.devices().await.map_err(fail)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&devices)?);
            } else if devices.is_empty() {
                println!("  No Android devices connected");
            } else {
                println!("  Found {} device(s):", devices.len());
                for device in devices {
                    println!(
                        "    {} {} ({})",
                        "•".green(),
                        device.serial.white().bold(),
                        device.state.dimmed()
                    );
                }
            }
        }
    }

    Ok(())
}
