//! The in-memory projection of every accepted operation.
//!
//! [`GraphState`] is only ever changed by the [executor](crate::executor).
//! Accepted operations are kept in an arena indexed by sequence number, and
//! keys and devices are kept in insertion order with an index by id on the
//! side. Nothing is ever removed: revoking a key only stamps it.

use std::collections::HashMap;

use crate::{
	action::{AddKey, DeviceId, KeyId, KeyKind, Timestamp},
	crypto::PubKey,
	envelope::SignedEnvelope,
};

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct KeyState {
	pub kid: KeyId,
	pub kind: KeyKind,
	/// Only set for device keys.
	pub device: Option<DeviceId>,
	pub public_key: PubKey,
	/// The `effective_from` of the action that added the key.
	pub added_at: Timestamp,
	/// Sequence of the operation that added the key.
	pub added_in: u64,
	/// The `effective_from` of the action that revoked the key.
	pub revoked_at: Option<Timestamp>,
	pub revoked_in: Option<u64>,
}

impl KeyState {
	pub(crate) fn added(add: &AddKey, sequence: u64) -> Self {
		Self {
			kid: add.kid.clone(),
			kind: add.subject.kind(),
			device: add.subject.device_id().cloned(),
			public_key: add.key,
			added_at: add.effective_from,
			added_in: sequence,
			revoked_at: None,
			revoked_in: None,
		}
	}

	pub fn is_revoked(&self) -> bool {
		self.revoked_at.is_some()
	}
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DeviceState {
	pub did: DeviceId,
	/// The most recently added key of the device that is not revoked. Only
	/// when every key of the device is revoked is this the last one added,
	/// and the device is inactive.
	pub current: KeyId,
	/// Keys previously current for this device, oldest first.
	pub superseded: Vec<KeyId>,
}

/// The sequence number and signature of the last accepted operation.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ChainHead<'a> {
	pub sequence: u64,
	pub signature: &'a str,
}

/// An operation that has been accepted into the graph.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AcceptedOperation {
	pub envelope: SignedEnvelope,
}

impl AcceptedOperation {
	pub fn sequence(&self) -> u64 {
		self.envelope.operation().sequence()
	}
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct GraphState {
	/// `operations[i]` has sequence `i + 1`.
	operations: Vec<AcceptedOperation>,
	keys: Vec<KeyState>,
	key_index: HashMap<KeyId, usize>,
	devices: Vec<DeviceState>,
	device_index: HashMap<DeviceId, usize>,
	/// Latest `effective_from` over every accepted action.
	watermark: Option<Timestamp>,
}

impl GraphState {
	pub fn chain_head(&self) -> Option<ChainHead<'_>> {
		self.operations.last().map(|accepted| ChainHead {
			sequence: accepted.sequence(),
			signature: accepted.envelope.signature(),
		})
	}

	pub fn operations(&self) -> &[AcceptedOperation] {
		&self.operations
	}

	pub fn operation(&self, sequence: u64) -> Option<&AcceptedOperation> {
		let index = usize::try_from(sequence.checked_sub(1)?).ok()?;
		self.operations.get(index)
	}

	pub fn key(&self, kid: &str) -> Option<&KeyState> {
		self.key_index.get(kid).map(|&i| &self.keys[i])
	}

	/// All keys, in the order they were added.
	pub fn keys(&self) -> &[KeyState] {
		&self.keys
	}

	pub fn device(&self, did: &str) -> Option<&DeviceState> {
		self.device_index.get(did).map(|&i| &self.devices[i])
	}

	/// All devices, in the order they were introduced.
	pub fn devices(&self) -> &[DeviceState] {
		&self.devices
	}

	pub fn watermark(&self) -> Option<Timestamp> {
		self.watermark
	}

	pub fn is_empty(&self) -> bool {
		self.operations.is_empty()
	}

	// ---- mutation, only reachable from the executor ----

	/// Adds a key that is known not to exist yet.
	pub(crate) fn insert_key(&mut self, key: KeyState) {
		debug_assert!(!self.key_index.contains_key(&key.kid));
		if let Some(did) = &key.device {
			match self.device_index.get(did) {
				Some(&i) => {
					let device = &mut self.devices[i];
					let previous = std::mem::replace(&mut device.current, key.kid.clone());
					device.superseded.push(previous);
				}
				None => {
					self.device_index.insert(did.clone(), self.devices.len());
					self.devices.push(DeviceState {
						did: did.clone(),
						current: key.kid.clone(),
						superseded: Vec::new(),
					});
				}
			}
		}
		self.key_index.insert(key.kid.clone(), self.keys.len());
		self.keys.push(key);
	}

	/// Stamps a key that is known to exist and not be revoked yet.
	pub(crate) fn revoke_key(&mut self, kid: &KeyId, at: Timestamp, sequence: u64) {
		let i = self.key_index[kid];
		let key = &mut self.keys[i];
		debug_assert!(key.revoked_at.is_none());
		key.revoked_at = Some(at);
		key.revoked_in = Some(sequence);

		let Some(&d) = key.device.as_ref().and_then(|did| self.device_index.get(did))
		else {
			return;
		};
		if &self.devices[d].current != kid {
			return;
		}
		// fall back to the newest older key that is still valid
		let fallback = self.devices[d].superseded.iter().rposition(|older| {
			self.key_index
				.get(older)
				.is_some_and(|&k| !self.keys[k].is_revoked())
		});
		if let Some(position) = fallback {
			let device = &mut self.devices[d];
			let restored = device.superseded.remove(position);
			let revoked = std::mem::replace(&mut device.current, restored);
			device.superseded.push(revoked);
		}
	}

	pub(crate) fn advance_watermark(&mut self, to: Timestamp) {
		self.watermark = Some(self.watermark.map_or(to, |w| w.max(to)));
	}

	pub(crate) fn push_operation(&mut self, envelope: SignedEnvelope) {
		debug_assert_eq!(
			envelope.operation().sequence(),
			self.operations.len() as u64 + 1
		);
		self.operations.push(AcceptedOperation { envelope });
	}
}
