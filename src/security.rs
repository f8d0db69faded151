use std::fmt;
use std::time::{Duration, Instant};

use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::settings::SecurityMode;

const SALT_BYTES: usize = 16;
const PIN_LENGTH: std::ops::RangeInclusive<usize> = 4..=6;
const MIN_PASSWORD_LENGTH: usize = 6;

/// How often the lock screen checks for inactivity
pub const WATCHDOG_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Salted one-way hash of a PIN or password, stored as `<salt hex>$<sha256 hex>`
pub fn hash_credential(credential: &str) -> String {
	let mut salt = [0u8; SALT_BYTES];
	rand::thread_rng().fill_bytes(&mut salt);
	let salt = hex::encode(salt);
	let digest = salted_digest(&salt, credential);
	format!("{}${}", salt, digest)
}

/// Checks `credential` against a hash produced by `hash_credential`.
/// A malformed hash never verifies.
pub fn verify_credential(credential: &str, stored_hash: &str) -> bool {
	let (salt, expected) = match stored_hash.split_once('$') {
		Some((salt, expected)) if !salt.is_empty() && !expected.contains('$') => (salt, expected),
		_ => return false,
	};
	let actual = salted_digest(salt, credential);
	constant_time_eq(actual.as_bytes(), expected.as_bytes())
}

fn salted_digest(salt: &str, credential: &str) -> String {
	let mut hasher = Sha256::new();
	hasher.update(salt.as_bytes());
	hasher.update(credential.as_bytes());
	hex::encode(hasher.finalize())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
	if a.len() != b.len() {
		return false;
	}
	a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// A credential that does not suit the chosen security mode
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum CredentialError {
	PinFormat,
	PasswordTooShort,
}

impl fmt::Display for CredentialError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			CredentialError::PinFormat => write!(f, "PIN must be 4 to 6 digits"),
			CredentialError::PasswordTooShort => {
				write!(f, "password must be at least {} characters", MIN_PASSWORD_LENGTH)
			}
		}
	}
}

impl std::error::Error for CredentialError {}

/// Checks a new credential against the rules of `mode`.
/// `SystemAuth` keeps no credential of its own, so anything passes.
pub fn validate_credential(mode: SecurityMode, credential: &str) -> Result<(), CredentialError> {
	match mode {
		SecurityMode::Pin => {
			let digits = credential.chars().all(|c| c.is_ascii_digit());
			if digits && PIN_LENGTH.contains(&credential.len()) {
				Ok(())
			} else {
				Err(CredentialError::PinFormat)
			}
		}
		SecurityMode::Password => {
			if credential.chars().count() >= MIN_PASSWORD_LENGTH {
				Ok(())
			} else {
				Err(CredentialError::PasswordTooShort)
			}
		}
		SecurityMode::SystemAuth => Ok(()),
	}
}

/// Tracks operator activity and decides when the ledger should lock
///
/// Polled every `WATCHDOG_POLL_INTERVAL` by whatever drives the interface. Locking only
/// gates further interaction; it never interrupts an operation already running.
#[derive(Debug)]
pub struct InactivityWatchdog {
	timeout: Duration,
	last_interaction: Instant,
	locked: bool,
}

impl InactivityWatchdog {
	pub fn new(timeout: Duration, now: Instant) -> Self {
		InactivityWatchdog { timeout, last_interaction: now, locked: false }
	}

	/// Records an interaction. Ignored while locked; use `unlock` instead.
	pub fn touch(&mut self, now: Instant) {
		if !self.locked {
			self.last_interaction = now;
		}
	}

	/// Returns true on the poll that locks the ledger
	pub fn poll(&mut self, now: Instant) -> bool {
		if self.locked || self.timeout.is_zero() {
			return false;
		}
		if now.saturating_duration_since(self.last_interaction) >= self.timeout {
			self.locked = true;
			return true;
		}
		false
	}

	pub fn unlock(&mut self, now: Instant) {
		self.locked = false;
		self.last_interaction = now;
	}

	pub fn is_locked(&self) -> bool {
		self.locked
	}
}
