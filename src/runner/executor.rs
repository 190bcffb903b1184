//! Runs driver operations off the interface loop and reports back via events.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use super::events::{EventEmitter, SessionEvent};
use crate::driver::adb::select_wireless_serial;
use crate::driver::{ConnectionTarget, Driver, DriverError, MirrorStatus};

/// How long a fresh scrcpy is watched for an immediate failure
const MIRROR_STARTUP_WINDOW: Duration = Duration::from_secs(1);

pub struct SessionExecutor {
    driver: Arc<Driver>,
    emitter: EventEmitter,
    connect_port: u16,
}

impl SessionExecutor {
    /// `connect_port` is the adb TCP port suggested after a successful pair
    pub fn new(driver: Arc<Driver>, emitter: EventEmitter, connect_port: u16) -> Self {
        Self {
            driver,
            emitter,
            connect_port,
        }
    }

    pub fn check_adb(&self) -> JoinHandle<()> {
        let driver = self.driver.clone();
        let emitter = self.emitter.clone();
        tokio::spawn(async move {
            match driver.check_adb().await {
                Ok(banner) => emitter.log(banner),
                Err(err) => report(&emitter, &err),
            }
        })
    }

    pub fn pair(&self, target: ConnectionTarget, code: String) -> JoinHandle<()> {
        let driver = self.driver.clone();
        let emitter = self.emitter.clone();
        let connect_port = self.connect_port;
        tokio::spawn(async move {
            emitter.log(format!("Pairing with {}…", target));
            match driver.pair(&target, &code).await {
                Ok(result) => {
                    emitter.log(result.output());
                    let connect_target = ConnectionTarget {
                        host: target.host.clone(),
                        port: connect_port,
                    };
                    emitter.emit(SessionEvent::Paired {
                        target,
                        connect_target,
                    });
                }
                Err(err) => report(&emitter, &err),
            }
        })
    }

    pub fn connect(&self, target: ConnectionTarget) -> JoinHandle<()> {
        let driver = self.driver.clone();
        let emitter = self.emitter.clone();
        tokio::spawn(async move {
            emitter.log(format!("Connecting to {}…", target));
            match driver.connect(&target).await {
                Ok(result) => {
                    emitter.log(result.output());
                    emitter.emit(SessionEvent::Connected { target });
                }
                Err(err) => report(&emitter, &err),
            }
        })
    }

    /// Launch scrcpy for `serial`, or for the session's `connected_serial`
    /// when no serial is given
    pub fn mirror(
        &self,
        serial: Option<String>,
        connected_serial: Option<String>,
    ) -> JoinHandle<()> {
        let driver = self.driver.clone();
        let emitter = self.emitter.clone();
        tokio::spawn(async move {
            let serial = match serial {
                Some(serial) => serial,
                None => match find_mirror_serial(&driver, connected_serial.as_deref()).await {
                    Ok(serial) => serial,
                    Err(message) => {
                        emitter.emit(SessionEvent::Failed {
                            message,
                            output: None,
                        });
                        return;
                    }
                },
            };

            emitter.log(format!("Starting scrcpy with device: {}...", serial));
            let mut handle = match driver.mirror(&serial) {
                Ok(handle) => handle,
                Err(err) => return report(&emitter, &err),
            };
            match handle.wait_for_early_exit(MIRROR_STARTUP_WINDOW).await {
                Ok(MirrorStatus::Exited(code)) if code != 0 => {
                    emitter.emit(mirror_failed(handle.serial(), code))
                }
                _ => emitter.emit(SessionEvent::MirrorStarted(handle)),
            }
        })
    }

    pub fn devices(&self) -> JoinHandle<()> {
        let driver = self.driver.clone();
        let emitter = self.emitter.clone();
        tokio::spawn(async move {
            match driver.devices().await {
                Ok(devices) if devices.is_empty() => emitter.log("No devices connected"),
                Ok(devices) => {
                    for device in devices {
                        emitter.log(format!("• {} ({})", device.serial, device.state));
                    }
                }
                Err(err) => report(&emitter, &err),
            }
        })
    }
}

async fn find_mirror_serial(
    driver: &Driver,
    connected_serial: Option<&str>,
) -> Result<String, String> {
    const NOT_CONNECTED: &str = "No devices connected. Please connect first.";

    let Some(connected) = connected_serial else {
        return Err(NOT_CONNECTED.to_string());
    };
    let devices = driver.devices().await.map_err(|err| err.user_message())?;
    if !devices.iter().any(|d| d.is_online()) {
        return Err(NOT_CONNECTED.to_string());
    }
    select_wireless_serial(&devices, connected)
        .ok_or_else(|| "Wireless device not found. Please connect first.".to_string())
}

/// Event for a scrcpy that exited with a non-zero code
pub fn mirror_failed(serial: &str, code: i32) -> SessionEvent {
    log::warn!("scrcpy for {} exited with code {}", serial, code);
    SessionEvent::Failed {
        message: format!(
            "scrcpy exited with code {} for {}. Check the device is connected and authorized.",
            code, serial
        ),
        output: None,
    }
}

fn report(emitter: &EventEmitter, err: &DriverError) {
    log::warn!("{}", err);
    emitter.emit(SessionEvent::Failed {
        message: err.user_message(),
        output: err.output().map(str::to_string),
    });
}
