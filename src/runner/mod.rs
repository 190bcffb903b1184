pub mod events;
pub mod executor;
pub mod shell;
pub mod state;

pub use events::{EventEmitter, Notice, SessionEvent};
pub use executor::SessionExecutor;
pub use state::SessionState;
