use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;

use super::events::{EventEmitter, Notice, SessionEvent};
use super::executor::SessionExecutor;
use super::state::SessionState;
use crate::driver::{ConnectionTarget, Driver, DriverError, MirrorStatus};
use crate::pairing::{qr, PairingPayload};
use crate::utils::config::Config;
use crate::utils::network;

/// How often a launched scrcpy is checked for having exited
const MIRROR_CHECK_INTERVAL: Duration = Duration::from_secs(1);

const HINT: &str = "\
1) On phone: Settings > Developer options > Wireless debugging > Pair device with QR code
2) Or note the IP, pairing port and pairing code under 'Pair device with pairing code'
3) Run 'pair <ip>:<port> <code>'
4) After pairing, run 'connect <ip>:<port>' with port 5555 or the port shown under the device name
5) Run 'mirror' to start scrcpy";

const HELP: &str = "\
Commands:
  qr                          show the pairing QR code
  regen                       generate a new QR name/password
  pair [ip[:port] [port]] [code]   pair with a device (code defaults to the QR password)
  connect [ip[:port] [port]]  connect over Wi-Fi
  mirror [serial]             start scrcpy for the connected or given device
  devices                     list adb devices
  status                      show the current session
  help                        show this help
  exit | quit                 leave the shell";

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Qr,
    Regen,
    Pair {
        host: Option<String>,
        port: Option<String>,
        code: Option<String>,
    },
    Connect {
        host: Option<String>,
        port: Option<String>,
    },
    Mirror {
        serial: Option<String>,
    },
    Devices,
    Status,
    Help,
    Exit,
}

/// Parse a shell line. `ip:port` and `ip port` are both accepted.
pub fn parse_command(line: &str) -> Result<ShellCommand, String> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Err("empty command".to_string());
    };
    let args: Vec<String> = words.map(str::to_string).collect();

    let too_many = || format!("Too many arguments for '{}'. Type 'help'.", name);

    match name {
        "qr" | "show" => Ok(ShellCommand::Qr),
        "regen" | "regenerate" => Ok(ShellCommand::Regen),
        "pair" => {
            let (host, port, rest) = split_endpoint(&args);
            if rest.len() > 1 {
                return Err(too_many());
            }
            Ok(ShellCommand::Pair {
                host,
                port,
                code: rest.first().cloned(),
            })
        }
        "connect" => {
            let (host, port, rest) = split_endpoint(&args);
            if !rest.is_empty() {
                return Err(too_many());
            }
            Ok(ShellCommand::Connect { host, port })
        }
        "mirror" | "scrcpy" => match args.as_slice() {
            [] => Ok(ShellCommand::Mirror { serial: None }),
            [serial] => Ok(ShellCommand::Mirror {
                serial: Some(serial.clone()),
            }),
            _ => Err(too_many()),
        },
        "devices" => Ok(ShellCommand::Devices),
        "status" => Ok(ShellCommand::Status),
        "help" | "?" => Ok(ShellCommand::Help),
        "exit" | "quit" => Ok(ShellCommand::Exit),
        other => Err(format!("Unknown command: {}. Type 'help'.", other)),
    }
}

fn split_endpoint(args: &[String]) -> (Option<String>, Option<String>, &[String]) {
    match args {
        [] => (None, None, args),
        [first, rest @ ..] if first.contains(':') => match first.rsplit_once(':') {
            Some((host, port)) => (Some(host.to_string()), Some(port.to_string()), rest),
            None => (None, None, args),
        },
        [host] => (Some(host.clone()), None, &args[1..]),
        [host, port, rest @ ..] => (Some(host.clone()), Some(port.clone()), rest),
    }
}

/// Fill missing endpoint fields from what the session already knows
fn resolve_target(
    host: Option<String>,
    port: Option<String>,
    known: Option<&ConnectionTarget>,
) -> Result<ConnectionTarget, DriverError> {
    let host = host
        .or_else(|| known.map(|t| t.host.clone()))
        .unwrap_or_default();
    let port = port
        .or_else(|| known.map(|t| t.port.to_string()))
        .unwrap_or_default();
    ConnectionTarget::parse(&host, &port)
}

/// Interactive session: the terminal counterpart of the pairing window
pub struct Session {
    config: Config,
    state: SessionState,
    executor: SessionExecutor,
}

impl Session {
    pub fn new(config: Config, driver: Arc<Driver>, emitter: EventEmitter) -> Self {
        let payload = PairingPayload::generate(config.name_length, config.password_length);
        let executor = SessionExecutor::new(driver, emitter, config.default_connect_port);
        Self {
            config,
            state: SessionState::new(payload),
            executor,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    /// Prefill pair/connect targets from the host's LAN address
    pub fn prefill_targets(&mut self) -> Vec<Notice> {
        if !self.config.auto_detect_ip {
            return vec![];
        }
        match network::local_ipv4() {
            Some(local) => {
                let suggested =
                    network::suggest_device_ip(local, self.config.suggested_host_octet).to_string();
                self.state.pair_target = Some(ConnectionTarget {
                    host: suggested.clone(),
                    port: self.config.default_pairing_port,
                });
                self.state.connect_target = Some(ConnectionTarget {
                    host: suggested.clone(),
                    port: self.config.default_connect_port,
                });
                vec![Notice::Info(format!(
                    "Auto-detected network: {}. Suggested IP: {}",
                    local, suggested
                ))]
            }
            None => vec![Notice::Info(
                "Could not auto-detect network IP. Please enter manually.".to_string(),
            )],
        }
    }

    pub fn check_adb(&self) {
        self.executor.check_adb();
    }

    fn show_qr(&self) -> Vec<Notice> {
        let payload = &self.state.payload;
        let mut notices = match qr::render_terminal(payload) {
            Ok(rendered) => vec![Notice::Block(rendered)],
            Err(err) => vec![Notice::Error(format!("❌ {:#}", err))],
        };
        notices.push(Notice::Info(format!("QR ready: {}", payload.qr_payload())));
        notices.push(Notice::Info(format!(
            "Manual pairing: adb pair IP:PORT {}",
            payload.password
        )));
        notices
    }

    /// Act on one command. Returns `None` when the shell should exit.
    pub fn handle(&mut self, command: ShellCommand) -> Option<Vec<Notice>> {
        let notices = match command {
            ShellCommand::Exit => return None,
            ShellCommand::Help => vec![Notice::Block(HELP.to_string())],
            ShellCommand::Qr => self.show_qr(),
            ShellCommand::Regen => {
                self.state.payload =
                    PairingPayload::generate(self.config.name_length, self.config.password_length);
                let mut notices = self.show_qr();
                notices.push(Notice::Info(
                    "Regenerated QR. Tap 'Pair device with QR code' again on the phone and rescan."
                        .to_string(),
                ));
                notices
            }
            ShellCommand::Pair { host, port, code } => {
                match resolve_target(host, port, self.state.pair_target.as_ref()) {
                    Ok(target) => {
                        let code = code.unwrap_or_else(|| self.state.payload.password.clone());
                        self.state.pair_target = Some(target.clone());
                        let notice =
                            Notice::Info(format!("Attempting manual pairing with {}", target));
                        self.executor.pair(target, code);
                        vec![notice]
                    }
                    Err(err) => vec![Notice::Error(format!("❌ {}", err.user_message()))],
                }
            }
            ShellCommand::Connect { host, port } => {
                match resolve_target(host, port, self.state.connect_target.as_ref()) {
                    Ok(target) => {
                        self.state.connect_target = Some(target.clone());
                        let notice = Notice::Info(format!("Attempting connection to {}", target));
                        self.executor.connect(target);
                        vec![notice]
                    }
                    Err(err) => vec![Notice::Error(format!("❌ {}", err.user_message()))],
                }
            }
            ShellCommand::Mirror { serial } => {
                let connected = self.state.connected_serial();
                self.executor.mirror(serial, connected);
                vec![]
            }
            ShellCommand::Devices => {
                self.executor.devices();
                vec![]
            }
            ShellCommand::Status => self.state.describe(),
        };
        Some(notices)
    }
}

pub fn print_notice(notice: &Notice) {
    let stamp = chrono::Local::now().format("[%H:%M:%S]").to_string().dimmed();
    match notice {
        Notice::Info(msg) => println!("{} {}", stamp, msg),
        Notice::Success(msg) => println!("{} {}", stamp, msg.green()),
        Notice::Error(msg) => println!("{} {}", stamp, msg.red()),
        Notice::Output(output) => {
            for line in output.lines() {
                println!("           {}", line.dimmed());
            }
        }
        Notice::Block(text) => println!("{}", text),
    }
}

fn prompt() -> io::Result<()> {
    print!("{} ", "adb-qr>".blue().bold());
    io::stdout().flush()
}

pub async fn run_shell(config: Config, driver: Arc<Driver>) -> Result<()> {
    let (emitter, mut events) = EventEmitter::new();
    let mut session = Session::new(config, driver, emitter);

    println!("\n{}", "=== Wireless ADB + scrcpy (QR) ===".bold().green());
    for notice in session.handle(ShellCommand::Qr).unwrap_or_default() {
        print_notice(&notice);
    }
    println!("\n{}\n", HINT);
    for notice in session.prefill_targets() {
        print_notice(&notice);
    }
    session.check_adb();
    println!("Type 'help' for commands.\n");

    drive(&mut session, &mut events, BufReader::new(tokio::io::stdin())).await?;

    if let Some(handle) = session.state_mut().mirror.as_mut() {
        if let Ok(MirrorStatus::Running) = handle.poll() {
            println!("scrcpy keeps running for {}", handle.serial());
        }
    }
    println!("\nExiting shell. Goodbye!");
    Ok(())
}

/// Interface loop: user input, background events and mirror checks until
/// `exit` or end of input
async fn drive<R>(
    session: &mut Session,
    events: &mut UnboundedReceiver<SessionEvent>,
    input: R,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut mirror_check = tokio::time::interval(MIRROR_CHECK_INTERVAL);
    prompt()?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break, // EOF
                    Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                        print_notice(&Notice::Error(
                            "⚠ Could not read that line (not valid UTF-8). Please retype it.".to_string(),
                        ));
                        prompt()?;
                        continue;
                    }
                    Err(err) => return Err(err.into()),
                };
                let line = line.trim();
                if line.is_empty() {
                    prompt()?;
                    continue;
                }
                let notices = match parse_command(line) {
                    Ok(command) => match session.handle(command) {
                        Some(notices) => notices,
                        None => break,
                    },
                    Err(msg) => vec![Notice::Error(format!("⚠ {}", msg))],
                };
                for notice in &notices {
                    print_notice(notice);
                }
                prompt()?;
            }
            Some(event) = events.recv() => {
                print!("\r");
                for notice in session.state_mut().apply(event) {
                    print_notice(&notice);
                }
                prompt()?;
            }
            _ = mirror_check.tick() => {
                if let Some(event) = session.state_mut().poll_mirror() {
                    print!("\r");
                    for notice in session.state_mut().apply(event) {
                        print_notice(&notice);
                    }
                    prompt()?;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::fake::FakeRunner;

    fn session(runner: Arc<FakeRunner>) -> (Session, UnboundedReceiver<SessionEvent>) {
        let driver = Arc::new(Driver::with_runner(FakeRunner::resolver(), runner));
        let (emitter, events) = EventEmitter::new();
        let config = Config {
            auto_detect_ip: false,
            ..Config::default()
        };
        (Session::new(config, driver, emitter), events)
    }

    async fn next_event(events: &mut UnboundedReceiver<SessionEvent>) -> SessionEvent {
        tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("channel closed")
    }

    #[test]
    fn test_parse_pair_forms() {
        assert_eq!(
            parse_command("pair 192.168.1.102:39083 123456"),
            Ok(ShellCommand::Pair {
                host: Some("192.168.1.102".to_string()),
                port: Some("39083".to_string()),
                code: Some("123456".to_string()),
            })
        );
        assert_eq!(
            parse_command("pair 192.168.1.102 39083"),
            Ok(ShellCommand::Pair {
                host: Some("192.168.1.102".to_string()),
                port: Some("39083".to_string()),
                code: None,
            })
        );
        assert_eq!(
            parse_command("pair"),
            Ok(ShellCommand::Pair {
                host: None,
                port: None,
                code: None,
            })
        );
        assert!(parse_command("pair 1.2.3.4 5 6 7").is_err());
    }

    #[test]
    fn test_parse_other_commands() {
        assert_eq!(
            parse_command("connect 192.168.1.102:5555"),
            Ok(ShellCommand::Connect {
                host: Some("192.168.1.102".to_string()),
                port: Some("5555".to_string()),
            })
        );
        assert_eq!(
            parse_command("  mirror   192.168.1.102:5555 "),
            Ok(ShellCommand::Mirror {
                serial: Some("192.168.1.102:5555".to_string())
            })
        );
        assert_eq!(parse_command("quit"), Ok(ShellCommand::Exit));
        assert!(parse_command("reboot").is_err());
    }

    #[test]
    fn test_resolve_target_uses_known_fields() {
        let known = ConnectionTarget {
            host: "192.168.1.102".to_string(),
            port: 39083,
        };
        let target = resolve_target(None, Some("40111".to_string()), Some(&known)).unwrap();
        assert_eq!(target.serial(), "192.168.1.102:40111");
        assert!(resolve_target(None, None, None).is_err());
    }

    #[tokio::test]
    async fn test_pair_without_target_is_rejected() {
        let runner = Arc::new(FakeRunner::new());
        let (mut session, _events) = session(runner.clone());

        let notices = session
            .handle(ShellCommand::Pair {
                host: None,
                port: None,
                code: None,
            })
            .unwrap();

        assert_eq!(
            notices,
            vec![Notice::Error("❌ Please enter both IP and port".to_string())]
        );
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_pair_defaults_to_qr_password_then_connects() {
        let runner = Arc::new(FakeRunner::new());
        runner.reply("pair", 0, "Successfully paired to 192.168.1.102:39083");
        runner.reply("connect", 0, "connected to 192.168.1.102:5555");
        let (mut session, mut events) = session(runner.clone());
        let password = session.state().payload.password.clone();

        session.handle(parse_command("pair 192.168.1.102:39083").unwrap());
        loop {
            let event = next_event(&mut events).await;
            let done = matches!(event, SessionEvent::Paired { .. } | SessionEvent::Failed { .. });
            session.state_mut().apply(event);
            if done {
                break;
            }
        }
        assert_eq!(
            runner.calls(),
            vec![format!("pair 192.168.1.102:39083 {}", password)]
        );
        assert_eq!(
            session.state().connect_target.as_ref().map(|t| t.serial()),
            Some("192.168.1.102:5555".to_string())
        );

        // Connect with no arguments uses the target filled in by pairing
        session.handle(ShellCommand::Connect {
            host: None,
            port: None,
        });
        loop {
            let event = next_event(&mut events).await;
            let done = matches!(event, SessionEvent::Connected { .. } | SessionEvent::Failed { .. });
            session.state_mut().apply(event);
            if done {
                break;
            }
        }
        assert_eq!(
            session.state().connected_serial().as_deref(),
            Some("192.168.1.102:5555")
        );
    }

    #[tokio::test]
    async fn test_regen_replaces_payload() {
        let (mut session, _events) = session(Arc::new(FakeRunner::new()));
        let before = session.state().payload.clone();

        let notices = session.handle(ShellCommand::Regen).unwrap();

        assert_ne!(session.state().payload, before);
        assert!(matches!(&notices[0], Notice::Block(_)));
        assert!(notices
            .iter()
            .any(|n| matches!(n, Notice::Info(m) if m.starts_with("QR ready: WIFI:T:ADB;S:"))));
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_keeps_session_running() {
        let runner = Arc::new(FakeRunner::new());
        let (mut session, mut events) = session(runner.clone());
        let input: &[u8] = b"\xff\xfe\nconnect 192.168.1.102:5555\nexit\n";

        drive(&mut session, &mut events, BufReader::new(input))
            .await
            .unwrap();

        assert_eq!(
            session.state().connect_target.as_ref().map(|t| t.serial()),
            Some("192.168.1.102:5555".to_string())
        );
    }
}
