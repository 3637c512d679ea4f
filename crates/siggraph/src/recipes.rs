//! Ready-made action lists for the common ways of extending a graph.
//!
//! Each recipe only *proposes* actions. The caller still turns them into an
//! operation with [`SignatureGraph::next_operation`], signs it, and checks it
//! with [`SignatureGraph::execute_envelope`].

use crate::{
	action::{Action, DeviceId, KeyId, KeyKind, Timestamp},
	crypto::PubKey,
	error::Error,
	graph::SignatureGraph,
};

/// Actions for a new operation, along with the ids they allocate.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Proposal {
	pub actions: Vec<Action>,
	/// The device that gets a new key, if any.
	pub device: Option<DeviceId>,
	/// The id of the new device key, if any.
	pub device_key: Option<KeyId>,
	/// The id of the new recovery key, if any.
	pub recovery_key: Option<KeyId>,
}

/// Adds a new device, with `key` as its first key.
pub fn create_device(graph: &SignatureGraph, key: PubKey, now: Timestamp) -> Proposal {
	let kid = graph.next_key_id();
	let did = graph.next_device_id();
	Proposal {
		actions: vec![Action::add_device_key(&kid, &did, key, now)],
		device: Some(did),
		device_key: Some(kid),
		recovery_key: None,
	}
}

/// Replaces the key of an existing device with `key`.
///
/// The device's current key is revoked in the same operation, unless it was
/// revoked already, in which case the device is simply given a new key.
pub fn cycle_device(
	graph: &SignatureGraph,
	did: &str,
	key: PubKey,
	now: Timestamp,
) -> Result<Proposal, Error> {
	let device = graph.device(did)?;
	let mut actions = Vec::with_capacity(2);
	if graph.active_device(did).is_ok() {
		actions.push(Action::revoke_device_key(&device.current, now));
	}
	let kid = graph.next_key_id();
	actions.push(Action::add_device_key(&kid, &device.did, key, now));
	Ok(Proposal {
		actions,
		device: Some(device.did.clone()),
		device_key: Some(kid),
		recovery_key: None,
	})
}

/// Revokes the current key of a device. The device falls back to its newest
/// older key that is still valid, or becomes inactive if there is none.
pub fn revoke_device(
	graph: &SignatureGraph,
	did: &str,
	effective_from: Timestamp,
) -> Result<Proposal, Error> {
	let kid = graph.active_device(did)?;
	Ok(Proposal {
		actions: vec![Action::revoke_device_key(kid, effective_from)],
		device: None,
		device_key: None,
		recovery_key: None,
	})
}

/// Recovers an account using the recovery key `recovery_kid`.
///
/// The recovery key is revoked as of `effective_from`, and replaced by
/// `recovery_key`. A new device is added with `device_key` as its key. The
/// resulting operation is meant to be signed by the recovery key being
/// revoked.
pub fn recover_account(
	graph: &SignatureGraph,
	recovery_kid: &str,
	device_key: PubKey,
	recovery_key: PubKey,
	now: Timestamp,
	effective_from: Timestamp,
) -> Result<Proposal, Error> {
	let existing = graph.key(recovery_kid)?;
	if existing.kind != KeyKind::RecoveryKey {
		return Err(Error::KeyKindMismatch {
			action: 0,
			kid: existing.kid.clone(),
			expected: KeyKind::RecoveryKey,
			actual: existing.kind,
		});
	}
	if existing.is_revoked() {
		return Err(Error::AlreadyRevoked {
			action: Some(0),
			kid: existing.kid.clone(),
		});
	}

	let recovery_kid = graph.nth_unused_key_id(1);
	let device_kid = graph.nth_unused_key_id(2);
	let did = graph.next_device_id();
	Ok(Proposal {
		actions: vec![
			Action::revoke_recovery_key(&existing.kid, effective_from),
			Action::add_device_key(&device_kid, &did, device_key, now),
			Action::add_recovery_key(&recovery_kid, recovery_key, now),
		],
		device: Some(did),
		device_key: Some(device_kid),
		recovery_key: Some(recovery_kid),
	})
}
