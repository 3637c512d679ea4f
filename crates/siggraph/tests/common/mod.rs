//! Helpers for writing histories in tests.

#![allow(dead_code)]

use ed25519_dalek::SigningKey;
use siggraph::{Action, Error, SecretKey, SignatureGraph, SignedEnvelope, Timestamp};

pub const T0: Timestamp = 1_600_000_000;

/// A deterministic key, registered under `kid`.
pub fn secret(kid: &str, seed: u8) -> SecretKey {
	SecretKey::new(kid, SigningKey::from_bytes(&[seed; 32]))
}

/// A history being written, along with the graph it produces.
#[derive(Debug, Default)]
pub struct Ledger {
	pub graph: SignatureGraph,
	pub history: Vec<String>,
}

impl Ledger {
	/// Signs the next operation and appends it, if the graph accepts it.
	pub fn append(
		&mut self,
		signer: &SecretKey,
		timestamp: Timestamp,
		actions: Vec<Action>,
	) -> Result<SignedEnvelope, Error> {
		let op = self.graph.next_operation(timestamp, actions);
		let envelope = SignedEnvelope::sign(&op, signer);
		self.graph.execute_envelope(&envelope)?;
		self.history.push(envelope.to_json());
		Ok(envelope)
	}
}

/// Scenario A: recovery key "1", and device key "2" for device "1".
pub fn genesis() -> (Ledger, SecretKey, SecretKey) {
	let recovery = secret("1", 1);
	let device = secret("2", 2);
	let mut ledger = Ledger::default();
	ledger
		.append(
			&device,
			T0,
			vec![
				Action::add_recovery_key("1", recovery.public_key(), T0),
				Action::add_device_key("2", "1", device.public_key(), T0),
			],
		)
		.expect("genesis is valid");
	(ledger, recovery, device)
}
