use tokio::sync::mpsc;

use crate::driver::{ConnectionTarget, MirrorHandle};

/// Outcomes delivered from background driver tasks to the interface loop
#[derive(Debug)]
pub enum SessionEvent {
    Log(String),
    Paired {
        target: ConnectionTarget,
        connect_target: ConnectionTarget,
    },
    Connected {
        target: ConnectionTarget,
    },
    MirrorStarted(MirrorHandle),
    Failed {
        message: String,
        output: Option<String>,
    },
}

/// A line for the session log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Success(String),
    Error(String),
    /// Raw process output, shown indented
    Output(String),
    /// Pre-rendered text printed as-is (QR codes)
    Block(String),
}

/// Sends session events to the single interface loop
#[derive(Debug, Clone)]
pub struct EventEmitter {
    sender: mpsc::UnboundedSender<SessionEvent>,
}

impl EventEmitter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn emit(&self, event: SessionEvent) {
        // Receiver gone means the interface is shutting down
        let _ = self.sender.send(event);
    }

    pub fn log(&self, message: impl Into<String>) {
        self.emit(SessionEvent::Log(message.into()));
    }
}
