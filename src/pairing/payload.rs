use rand::{distributions::Alphanumeric, Rng};

/// Default length of the random service name advertised in the QR code
pub const DEFAULT_NAME_LENGTH: usize = 5;

/// Default length of the random pairing password
pub const DEFAULT_PASSWORD_LENGTH: usize = 6;

/// Name/password pair announced to Android's "Pair device with QR code" scanner.
///
/// Both fields only ever contain `[A-Za-z0-9]`, so the `;` and `:` delimiters of
/// the QR schema never need escaping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingPayload {
    pub name: String,
    pub password: String,
}

impl PairingPayload {
    /// Generate a fresh random pair
    pub fn generate(name_len: usize, password_len: usize) -> Self {
        Self {
            name: rand_text(name_len),
            password: rand_text(password_len),
        }
    }

    /// Wireless debugging QR string: `WIFI:T:ADB;S:<name>;P:<password>;;`
    pub fn qr_payload(&self) -> String {
        format!("WIFI:T:ADB;S:{};P:{};;", self.name, self.password)
    }
}

impl Default for PairingPayload {
    fn default() -> Self {
        Self::generate(DEFAULT_NAME_LENGTH, DEFAULT_PASSWORD_LENGTH)
    }
}

fn rand_text(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
