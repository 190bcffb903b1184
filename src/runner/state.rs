use super::events::{Notice, SessionEvent};
use super::executor::mirror_failed;
use crate::driver::{ConnectionTarget, MirrorHandle, MirrorStatus};
use crate::pairing::PairingPayload;

/// Everything the interface remembers between user actions.
///
/// Owned by the interface loop; background tasks only report events.
#[derive(Debug)]
pub struct SessionState {
    pub payload: PairingPayload,
    pub pair_target: Option<ConnectionTarget>,
    pub connect_target: Option<ConnectionTarget>,
    pub connected: Option<ConnectionTarget>,
    pub mirror: Option<MirrorHandle>,
}

impl SessionState {
    pub fn new(payload: PairingPayload) -> Self {
        Self {
            payload,
            pair_target: None,
            connect_target: None,
            connected: None,
            mirror: None,
        }
    }

    pub fn connected_serial(&self) -> Option<String> {
        self.connected.as_ref().map(ConnectionTarget::serial)
    }

    /// Fold a background event into the state, returning what to log
    pub fn apply(&mut self, event: SessionEvent) -> Vec<Notice> {
        match event {
            SessionEvent::Log(message) => vec![Notice::Info(message)],
            SessionEvent::Paired {
                target,
                connect_target,
            } => {
                let notices = vec![
                    Notice::Success(format!("✔ Paired with device {}", target)),
                    Notice::Info(format!("Ready to connect to {}", connect_target)),
                    Notice::Info("Run 'connect' to establish the connection".to_string()),
                ];
                self.connect_target = Some(connect_target);
                notices
            }
            SessionEvent::Connected { target } => {
                self.connected = Some(target.clone());
                self.connect_target = Some(target);
                vec![Notice::Success(
                    "✔ Connected over Wi-Fi. Ready to launch scrcpy…".to_string(),
                )]
            }
            SessionEvent::MirrorStarted(handle) => {
                let notice = Notice::Success(format!("scrcpy started for {}", handle.serial()));
                self.mirror = Some(handle);
                vec![notice]
            }
            SessionEvent::Failed { message, output } => {
                let mut notices = vec![Notice::Error(format!("❌ {}", message))];
                notices.extend(output.map(Notice::Output));
                notices
            }
        }
    }

    /// Check a launched scrcpy; once it has exited, drop the handle and
    /// return the event describing how it ended
    pub fn poll_mirror(&mut self) -> Option<SessionEvent> {
        let handle = self.mirror.as_mut()?;
        let event = match handle.poll() {
            Ok(MirrorStatus::Running) => return None,
            Ok(MirrorStatus::Exited(0)) => {
                SessionEvent::Log(format!("scrcpy closed for {}", handle.serial()))
            }
            Ok(MirrorStatus::Exited(code)) => mirror_failed(handle.serial(), code),
            Err(err) => SessionEvent::Failed {
                message: format!("Lost track of scrcpy for {}: {}", handle.serial(), err),
                output: None,
            },
        };
        self.mirror = None;
        Some(event)
    }

    /// Summary lines for the `status` command
    pub fn describe(&mut self) -> Vec<Notice> {
        let or_unset = |t: &Option<ConnectionTarget>| {
            t.as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "-".to_string())
        };
        let mut notices = vec![
            Notice::Info(format!("QR payload: {}", self.payload.qr_payload())),
            Notice::Info(format!("Pair target: {}", or_unset(&self.pair_target))),
            Notice::Info(format!("Connect target: {}", or_unset(&self.connect_target))),
            Notice::Info(format!("Connected: {}", or_unset(&self.connected))),
        ];
        let mirror = match self.mirror.as_mut() {
            None => "not started".to_string(),
            Some(handle) => match handle.poll() {
                Ok(MirrorStatus::Running) => format!(
                    "{} running (pid {})",
                    handle.serial(),
                    handle.pid().map(|p| p.to_string()).unwrap_or_default()
                ),
                Ok(status) => format!("{} {}", handle.serial(), status),
                Err(err) => format!("{} unknown ({})", handle.serial(), err),
            },
        };
        notices.push(Notice::Info(format!("Mirror: {}", mirror)));
        notices
    }
}
