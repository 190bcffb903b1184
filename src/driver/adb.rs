use serde::Serialize;

use super::command::{CommandResult, CommandSpec};
use super::error::DriverError;
use super::target::ConnectionTarget;
use super::Driver;

/// Marker `adb pair` prints when the device accepted the code
const PAIRED_MARKER: &str = "successfully paired";

/// Marker `adb connect` prints for new and existing connections
const CONNECTED_MARKER: &str = "connected";

/// Represents an Android device as listed by `adb devices`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    pub serial: String,
    pub state: String,
}

impl Device {
    pub fn is_online(&self) -> bool {
        self.state == "device"
    }
}

impl Driver {
    /// `adb pair <ip>:<port> <code>`
    pub async fn pair(
        &self,
        target: &ConnectionTarget,
        code: &str,
    ) -> Result<CommandResult, DriverError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(DriverError::InvalidInput(
                "Please enter the pairing code".to_string(),
            ));
        }
        let spec = CommandSpec::pair(&target.host, target.port, code);
        let result = self.run(&spec).await?;
        expect_marker(spec, result, PAIRED_MARKER)
    }

    /// `adb connect <ip>:<port>`
    pub async fn connect(&self, target: &ConnectionTarget) -> Result<CommandResult, DriverError> {
        let spec = CommandSpec::connect(&target.host, target.port);
        let result = self.run(&spec).await?;
        expect_marker(spec, result, CONNECTED_MARKER)
    }

    /// Get list of devices known to the adb server
    pub async fn devices(&self) -> Result<Vec<Device>, DriverError> {
        let spec = CommandSpec::devices();
        let result = self.run(&spec).await?;
        if !result.success() {
            return Err(DriverError::NonZeroExit {
                command: spec,
                result,
            });
        }
        if !result.stderr.trim().is_empty() {
            log::debug!("adb devices stderr:\n{}", result.stderr);
        }
        Ok(parse_devices(&result.stdout))
    }

    /// Check adb is usable and make sure its server is running.
    ///
    /// Returns the `adb version` banner.
    pub async fn check_adb(&self) -> Result<String, DriverError> {
        let spec = CommandSpec::version();
        let version = self.run(&spec).await?;
        if !version.success() {
            return Err(DriverError::NonZeroExit {
                command: spec,
                result: version,
            });
        }

        let spec = CommandSpec::start_server();
        let started = self.run(&spec).await?;
        if !started.success() {
            log::warn!("adb start-server failed: {}", started.output());
        }

        Ok(version.output().to_string())
    }
}

fn expect_marker(
    command: CommandSpec,
    result: CommandResult,
    marker: &str,
) -> Result<CommandResult, DriverError> {
    if !result.success() {
        Err(DriverError::NonZeroExit { command, result })
    } else if !result.output_contains(marker) {
        Err(DriverError::UnexpectedOutput { command, result })
    } else {
        Ok(result)
    }
}

/// Parse `adb devices` output, skipping the header line
pub fn parse_devices(stdout: &str) -> Vec<Device> {
    stdout
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some(serial), Some(state)) => Some(Device {
                    serial: serial.to_string(),
                    state: state.to_string(),
                }),
                _ => None,
            }
        })
        .collect()
}

/// Pick the wireless device to mirror for the session's connected serial.
///
/// The connected serial itself wins when it is online. Otherwise another online
/// endpoint on the same host is used (adb may list the device under a new port).
pub fn select_wireless_serial(devices: &[Device], connected_serial: &str) -> Option<String> {
    let online: Vec<&Device> = devices.iter().filter(|d| d.is_online()).collect();

    if let Some(device) = online.iter().find(|d| d.serial == connected_serial) {
        return Some(device.serial.clone());
    }

    let host = connected_serial
        .rsplit_once(':')
        .map_or(connected_serial, |(host, _)| host);
    if host.is_empty() {
        return None;
    }
    let prefix = format!("{}:", host);
    online
        .iter()
        .find(|d| d.serial.starts_with(&prefix))
        .map(|d| d.serial.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::fake::FakeRunner;
    use crate::driver::Tool;
    use crate::utils::binary_resolver::BinaryResolver;
    use std::sync::Arc;
    use std::time::Duration;

    fn fake_driver() -> (Driver, Arc<FakeRunner>) {
        let runner = Arc::new(FakeRunner::new());
        (
            Driver::with_runner(FakeRunner::resolver(), runner.clone()),
            runner,
        )
    }

    fn phone(port: u16) -> ConnectionTarget {
        ConnectionTarget {
            host: "192.168.1.102".to_string(),
            port,
        }
    }

    #[tokio::test]
    async fn test_pair_success() {
        let (driver, runner) = fake_driver();
        runner.reply(
            "pair",
            0,
            "Successfully paired to 192.168.1.102:39083 [guid=adb-R58M-abcdef]\n",
        );

        let result = driver.pair(&phone(39083), "123456").await.unwrap();

        assert!(result.output().starts_with("Successfully paired"));
        assert_eq!(runner.calls(), vec!["pair 192.168.1.102:39083 123456"]);
    }

    #[tokio::test]
    async fn test_pair_wrong_code_is_failure() {
        let (driver, runner) = fake_driver();
        runner.reply("pair", 0, "Failed: Wrong password or connection was dropped.");

        let err = driver.pair(&phone(39083), "000000").await.unwrap_err();

        assert!(matches!(err, DriverError::UnexpectedOutput { .. }));
        assert_eq!(
            err.user_message(),
            "Pairing failed. Check the pairing code and try again."
        );
    }

    #[tokio::test]
    async fn test_pair_non_zero_exit() {
        let (driver, runner) = fake_driver();
        runner.reply("pair", 1, "error: unknown host service");

        let err = driver.pair(&phone(39083), "123456").await.unwrap_err();

        match err {
            DriverError::NonZeroExit { command, result } => {
                assert_eq!(command.to_string(), "adb pair 192.168.1.102:39083 123456");
                assert_eq!(result.exit_code, 1);
            }
            other => panic!("expected NonZeroExit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_pair_without_adb_starts_nothing() {
        let runner = Arc::new(FakeRunner::new());
        let resolver = BinaryResolver::new().with_search_path("/nonexistent-adb-qr-mirror-dir");
        let driver = Driver::with_runner(resolver, runner.clone());

        let err = driver.pair(&phone(39083), "123456").await.unwrap_err();

        assert!(matches!(
            err,
            DriverError::BinaryNotFound { tool: Tool::Adb, .. }
        ));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_pair_requires_code() {
        let (driver, runner) = fake_driver();
        let err = driver.pair(&phone(39083), "  ").await.unwrap_err();
        assert!(matches!(err, DriverError::InvalidInput(_)));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_connect_outcomes() {
        let (driver, runner) = fake_driver();

        runner.reply("connect", 0, "connected to 192.168.1.102:5555");
        assert!(driver.connect(&phone(5555)).await.is_ok());

        runner.reply("connect", 0, "already connected to 192.168.1.102:5555");
        assert!(driver.connect(&phone(5555)).await.is_ok());

        runner.reply(
            "connect",
            1,
            "failed to connect to '192.168.1.102:5555': Connection refused",
        );
        let err = driver.connect(&phone(5555)).await.unwrap_err();
        assert!(matches!(err, DriverError::NonZeroExit { .. }));
        assert_eq!(
            err.output(),
            Some("failed to connect to '192.168.1.102:5555': Connection refused")
        );

        assert_eq!(
            runner.calls(),
            vec![
                "connect 192.168.1.102:5555",
                "connect 192.168.1.102:5555",
                "connect 192.168.1.102:5555"
            ]
        );
    }

    #[tokio::test]
    async fn test_connect_failure_with_zero_exit() {
        let (driver, runner) = fake_driver();

        // adb reports a failed connect on stdout but still exits 0
        for output in [
            "failed to connect to '192.168.1.102:5555': Connection refused",
            "cannot connect to 192.168.1.102:5555: No route to host (113)",
        ] {
            runner.reply("connect", 0, output);
            let err = driver.connect(&phone(5555)).await.unwrap_err();
            assert!(matches!(err, DriverError::UnexpectedOutput { .. }));
            assert_eq!(
                err.user_message(),
                "adb connect failed. Ensure Wireless debugging is ON and same Wi-Fi."
            );
            assert_eq!(err.output(), Some(output));
        }
    }

    #[tokio::test]
    async fn test_connect_timeout() {
        let runner = Arc::new(FakeRunner::new());
        runner.reply_timeout("connect");
        let driver = Driver::with_runner(FakeRunner::resolver(), runner.clone())
            .with_timeout(Some(Duration::from_secs(3)));

        let err = driver.connect(&phone(5555)).await.unwrap_err();

        assert!(matches!(err, DriverError::TimedOut { after, .. } if after == Duration::from_secs(3)));
        assert_eq!(err.user_message(), "Connection timed out. Please try again.");
    }

    #[tokio::test]
    async fn test_devices_and_check_adb() {
        let (driver, runner) = fake_driver();
        runner.reply("devices", 0, DEVICES_OUTPUT);
        runner.reply("version", 0, "Android Debug Bridge version 1.0.41\n");

        let devices = driver.devices().await.unwrap();
        assert_eq!(devices.len(), 3);

        let banner = driver.check_adb().await.unwrap();
        assert_eq!(banner, "Android Debug Bridge version 1.0.41");
        assert_eq!(runner.calls(), vec!["devices", "version", "start-server"]);
    }

    const DEVICES_OUTPUT: &str = "List of devices attached\n\
        emulator-5554\tdevice\n\
        192.168.1.102:5555\tdevice\n\
        192.168.1.40:41235\toffline\n\
        \n";

    #[test]
    fn test_parse_devices() {
        let devices = parse_devices(DEVICES_OUTPUT);
        assert_eq!(devices.len(), 3);
        assert_eq!(devices[1].serial, "192.168.1.102:5555");
        assert!(devices[1].is_online());
        assert!(!devices[2].is_online());
        assert!(parse_devices("List of devices attached\n").is_empty());
    }

    #[test]
    fn test_select_exact_connected_serial() {
        let devices = parse_devices(
            "List of devices attached\n192.168.1.102:5555\tdevice\n192.168.1.102:40000\tdevice\n",
        );
        assert_eq!(
            select_wireless_serial(&devices, "192.168.1.102:40000").as_deref(),
            Some("192.168.1.102:40000")
        );
    }

    #[test]
    fn test_select_host_prefix_needs_port_separator() {
        let devices = parse_devices(
            "List of devices attached\n192.168.1.102:5555\tdevice\n192.168.1.10:5555\tdevice\n",
        );
        assert_eq!(
            select_wireless_serial(&devices, "192.168.1.10:5555").as_deref(),
            Some("192.168.1.10:5555")
        );
        // Same host under a new port
        assert_eq!(
            select_wireless_serial(&devices, "192.168.1.10:41000").as_deref(),
            Some("192.168.1.10:5555")
        );
        assert_eq!(select_wireless_serial(&devices, "192.168.1.1:5555"), None);
    }

    #[test]
    fn test_select_ignores_offline() {
        let devices = parse_devices(DEVICES_OUTPUT);
        assert_eq!(select_wireless_serial(&devices, "192.168.1.40:41235"), None);
        assert_eq!(
            select_wireless_serial(&devices, "192.168.1.102:5555").as_deref(),
            Some("192.168.1.102:5555")
        );
    }
}
