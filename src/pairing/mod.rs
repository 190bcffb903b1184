pub mod payload;
pub mod qr;

pub use payload::PairingPayload;
