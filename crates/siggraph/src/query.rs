//! Read-only queries over a [`SignatureGraph`].

use crate::{
	action::{DeviceId, KeyId, KeyKind, Timestamp},
	crypto::PubKey,
	error::Error,
	graph::SignatureGraph,
	state::{DeviceState, KeyState},
};

impl SignatureGraph {
	/// Every key id, in the order the keys were added. Includes revoked keys.
	pub fn keys(&self) -> impl ExactSizeIterator<Item = &KeyId> + '_ {
		self.state().keys().iter().map(|key| &key.kid)
	}

	/// Every device id ever introduced, in the order they were introduced.
	pub fn devices(&self) -> impl ExactSizeIterator<Item = &DeviceId> + '_ {
		self.state().devices().iter().map(|device| &device.did)
	}

	pub fn key(&self, kid: &str) -> Result<&KeyState, Error> {
		self.state().key(kid).ok_or_else(|| Error::UnknownKey {
			action: None,
			kid: KeyId::from(kid),
		})
	}

	pub fn device(&self, did: &str) -> Result<&DeviceState, Error> {
		self.state().device(did).ok_or_else(|| Error::UnknownDevice {
			did: DeviceId::from(did),
		})
	}

	/// The most recent unrevoked key of a device. If every key of the device
	/// is revoked, this is the last one added, see [`Self::active_device`].
	pub fn current_key_id(&self, did: &str) -> Result<&KeyId, Error> {
		Ok(&self.device(did)?.current)
	}

	/// The device that a device key belongs to.
	pub fn device_id(&self, kid: &str) -> Result<&DeviceId, Error> {
		let key = self.key(kid)?;
		key.device.as_ref().ok_or_else(|| Error::NotDeviceKey {
			kid: key.kid.clone(),
			kind: key.kind,
		})
	}

	pub fn public_key(&self, kid: &str) -> Result<&PubKey, Error> {
		Ok(&self.key(kid)?.public_key)
	}

	/// When a key was revoked, or `None` if it never was.
	pub fn revoked_at(&self, kid: &str) -> Result<Option<Timestamp>, Error> {
		Ok(self.key(kid)?.revoked_at)
	}

	/// Succeeds with the device's current key, if that key is not revoked.
	///
	/// A device is inactive once all of its keys are revoked, until a new key
	/// is added for it.
	pub fn active_device(&self, did: &str) -> Result<&KeyId, Error> {
		let device = self.device(did)?;
		let key = self.key(device.current.as_str())?;
		if key.is_revoked() {
			return Err(Error::DeviceInactive {
				did: device.did.clone(),
				kid: key.kid.clone(),
			});
		}
		Ok(&key.kid)
	}

	/// Keys that are not revoked, in the order they were added.
	pub fn active_keys(&self) -> impl Iterator<Item = &KeyState> + '_ {
		self.state().keys().iter().filter(|key| !key.is_revoked())
	}

	/// The recovery keys that are not revoked.
	pub fn active_recovery_keys(&self) -> impl Iterator<Item = &KeyState> + '_ {
		self.active_keys()
			.filter(|key| key.kind == KeyKind::RecoveryKey)
	}

	/// The sequence number the next operation must have.
	pub fn next_sequence(&self) -> u64 {
		self.state().chain_head().map_or(1, |head| head.sequence + 1)
	}

	/// The signature the next operation must reference, `None` if the graph is
	/// empty.
	pub fn previous_signature(&self) -> Option<&str> {
		self.state().chain_head().map(|head| head.signature)
	}

	pub fn is_empty(&self) -> bool {
		self.state().is_empty()
	}

	/// A key id that has not been used yet, following the convention of
	/// numbering keys from 1 in the order they are added.
	pub fn next_key_id(&self) -> KeyId {
		self.nth_unused_key_id(1)
	}

	/// Like [`Self::next_key_id`], but returns the `n`th unused id (1-based).
	/// Useful when an operation adds several keys at once.
	pub fn nth_unused_key_id(&self, n: usize) -> KeyId {
		let state = self.state();
		let mut remaining = n.max(1);
		let mut candidate = state.keys().len();
		loop {
			candidate += 1;
			let id = candidate.to_string();
			if state.key(&id).is_none() {
				remaining -= 1;
				if remaining == 0 {
					return KeyId::new(id);
				}
			}
		}
	}

	/// A device id that has not been used yet, numbered like key ids.
	pub fn next_device_id(&self) -> DeviceId {
		let state = self.state();
		let mut candidate = state.devices().len() + 1;
		while state.device(&candidate.to_string()).is_some() {
			candidate += 1;
		}
		DeviceId::new(candidate.to_string())
	}
}
