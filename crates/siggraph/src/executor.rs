//! Validates operations and applies them to a [`GraphState`].
//!
//! Every check happens before anything is written, so a rejected operation
//! leaves the state exactly as it was. The checks run in this order:
//!
//! 1. the envelope decodes ([`Error::MalformedInput`])
//! 2. the sequence number follows the chain head ([`Error::SequenceViolation`])
//! 3. `previous` is the chain head's signature ([`Error::ChainMismatch`])
//! 4. the signer may sign this operation ([`Error::UnauthorizedSigner`])
//! 5. the signature verifies with the signer's key ([`Error::InvalidSignature`])
//! 6. each action, in order, against the state plus the actions before it
//!
//! The signer's public key is only known once the signer has been resolved,
//! which is why the signature is checked after the signer.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace};

use crate::{
	action::{Action, KeyId, KeyKind, Timestamp},
	crypto::PubKey,
	envelope::SignedEnvelope,
	error::Error,
	operation::Operation,
	state::{GraphState, KeyState},
};

/// Decodes `envelope` and applies it to a copy of `state`.
pub fn execute(state: &GraphState, envelope: &[u8]) -> Result<GraphState, Error> {
	let envelope = SignedEnvelope::decode(envelope)?;
	execute_envelope(state, &envelope)
}

/// Applies an already decoded envelope to a copy of `state`.
pub fn execute_envelope(
	state: &GraphState,
	envelope: &SignedEnvelope,
) -> Result<GraphState, Error> {
	let mut next = state.clone();
	apply(&mut next, envelope.clone())?;
	Ok(next)
}

/// Validates `envelope` and applies it to `state` in place. On error, `state`
/// is untouched.
pub(crate) fn apply(
	state: &mut GraphState,
	envelope: SignedEnvelope,
) -> Result<(), Error> {
	let op = envelope.operation();
	check_sequence(state, op)?;
	check_chain(state, op)?;
	let signer_key = resolve_signer(state, &envelope)?;
	envelope.verify(&signer_key)?;
	let changes = plan(state, op)?;

	let sequence = op.sequence();
	debug!(
		sequence,
		signer = %envelope.signer(),
		actions = op.actions().len(),
		"accepted operation"
	);
	for change in changes {
		match change {
			Change::Add(key) => {
				trace!(sequence, kid = %key.kid, kind = %key.kind, "adding key");
				state.advance_watermark(key.added_at);
				state.insert_key(key);
			}
			Change::Revoke { kid, at } => {
				trace!(sequence, %kid, at, "revoking key");
				state.advance_watermark(at);
				state.revoke_key(&kid, at, sequence);
			}
		}
	}
	state.push_operation(envelope);
	Ok(())
}

fn check_sequence(state: &GraphState, op: &Operation) -> Result<(), Error> {
	let expected = state.chain_head().map_or(1, |head| head.sequence + 1);
	if op.sequence() != expected {
		return Err(Error::SequenceViolation {
			expected,
			actual: op.sequence(),
		});
	}
	Ok(())
}

fn check_chain(state: &GraphState, op: &Operation) -> Result<(), Error> {
	let expected = state.chain_head().map(|head| head.signature);
	if op.previous() != expected {
		return Err(Error::ChainMismatch {
			sequence: op.sequence(),
			expected: expected.map(str::to_owned),
			actual: op.previous().map(str::to_owned),
		});
	}
	Ok(())
}

/// Finds the public key that must have signed `envelope`.
fn resolve_signer(
	state: &GraphState,
	envelope: &SignedEnvelope,
) -> Result<PubKey, Error> {
	let op = envelope.operation();
	let signer = envelope.signer();
	let unauthorized = || Error::UnauthorizedSigner {
		sequence: op.sequence(),
		kid: signer.clone(),
	};

	// The first operation vouches for itself, and must be signed by one of the
	// keys that it adds.
	if op.sequence() == 1 {
		return op
			.actions()
			.iter()
			.find_map(|action| match action {
				Action::Add(add) if &add.kid == signer => Some(add.key),
				_ => None,
			})
			.ok_or_else(unauthorized);
	}

	match state.key(signer.as_str()) {
		Some(key) if !key.is_revoked() && key.added_at <= op.timestamp() => {
			Ok(key.public_key)
		}
		_ => Err(unauthorized()),
	}
}

enum Change {
	Add(KeyState),
	Revoke { kid: KeyId, at: Timestamp },
}

/// Checks every action of `op` against `state`, taking earlier actions of the
/// same operation into account, and collects what to write.
fn plan(state: &GraphState, op: &Operation) -> Result<Vec<Change>, Error> {
	let mut added: HashMap<&KeyId, KeyKind> = HashMap::new();
	let mut revoked: HashSet<&KeyId> = HashSet::new();
	let watermark = state.watermark();
	let mut changes = Vec::with_capacity(op.actions().len());

	for (index, action) in op.actions().iter().enumerate() {
		let effective_from = action.effective_from();
		if let Some(watermark) = watermark.filter(|&w| effective_from < w) {
			return Err(Error::EffectiveFromRegression {
				action: index,
				effective_from,
				watermark,
			});
		}

		match action {
			Action::Add(add) => {
				if state.key(add.kid.as_str()).is_some() || added.contains_key(&add.kid) {
					return Err(Error::KeyReuse {
						action: index,
						kid: add.kid.clone(),
					});
				}
				added.insert(&add.kid, add.subject.kind());
				changes.push(Change::Add(KeyState::added(add, op.sequence())));
			}
			Action::Revoke(revoke) => {
				let existing = state.key(revoke.kid.as_str());
				let Some(kind) = existing
					.map(|key| key.kind)
					.or_else(|| added.get(&revoke.kid).copied())
				else {
					return Err(Error::UnknownKey {
						action: Some(index),
						kid: revoke.kid.clone(),
					});
				};
				if revoked.contains(&revoke.kid)
					|| existing.is_some_and(KeyState::is_revoked)
				{
					return Err(Error::AlreadyRevoked {
						action: Some(index),
						kid: revoke.kid.clone(),
					});
				}
				if kind != revoke.kind {
					return Err(Error::KeyKindMismatch {
						action: index,
						kid: revoke.kid.clone(),
						expected: revoke.kind,
						actual: kind,
					});
				}
				revoked.insert(&revoke.kid);
				changes.push(Change::Revoke {
					kid: revoke.kid.clone(),
					at: effective_from,
				});
			}
		}
	}
	Ok(changes)
}
