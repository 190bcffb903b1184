pub mod driver;
pub mod pairing;
pub mod runner;
pub mod utils;

// Re-export common items
pub use driver::{CommandResult, ConnectionTarget, Driver, DriverError};
pub use pairing::PairingPayload;
pub use runner::shell::run_shell;
pub use utils::config::Config;
