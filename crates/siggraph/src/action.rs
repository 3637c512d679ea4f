//! The actions that an [`Operation`](crate::Operation) applies to a graph.
//!
//! Every action either adds or revokes a single key. What each action must
//! carry depends on the kind of key and the verb, and [`Action`] encodes that
//! in its shape: an add always has key material, a device key add always has a
//! device, and a revoke never has either. Malformed actions are rejected while
//! decoding and cannot be constructed at all.

use std::{borrow::Borrow, fmt::Display};

use serde::{Deserialize, Serialize};

use crate::crypto::{PubKey, PubKeyError};

/// Unix time, in seconds.
pub type Timestamp = i64;

macro_rules! string_id {
	($(#[$meta:meta])* $name:ident) => {
		$(#[$meta])*
		#[derive(Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Clone, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(String);

		impl $name {
			pub fn new(id: impl Into<String>) -> Self {
				Self(id.into())
			}

			pub fn as_str(&self) -> &str {
				&self.0
			}
		}

		impl Display for $name {
			fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
				self.0.fmt(f)
			}
		}

		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}

		impl From<String> for $name {
			fn from(value: String) -> Self {
				Self(value)
			}
		}

		impl From<&str> for $name {
			fn from(value: &str) -> Self {
				Self(value.to_owned())
			}
		}

		impl From<&$name> for $name {
			fn from(value: &$name) -> Self {
				value.clone()
			}
		}
	};
}

string_id!(
	/// Identifies a key. Unique within a graph, and never reused.
	KeyId
);
string_id!(
	/// Identifies a device of the identity. Unique within a graph.
	DeviceId
);

#[derive(Debug, Eq, PartialEq, Hash, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
	/// A key bound to a specific device.
	DeviceKey,
	/// A key that authorizes account recovery. Not tied to a device.
	RecoveryKey,
}

impl Display for KeyKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			Self::DeviceKey => "device_key",
			Self::RecoveryKey => "recovery_key",
		})
	}
}

#[derive(Debug, Eq, PartialEq, Hash, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verb {
	Add,
	Revoke,
}

/// What a newly added key belongs to.
#[derive(Debug, Eq, PartialEq, Hash, Clone)]
pub enum Subject {
	Device(DeviceId),
	Recovery,
}

impl Subject {
	pub fn kind(&self) -> KeyKind {
		match self {
			Self::Device(_) => KeyKind::DeviceKey,
			Self::Recovery => KeyKind::RecoveryKey,
		}
	}

	pub fn device_id(&self) -> Option<&DeviceId> {
		match self {
			Self::Device(did) => Some(did),
			Self::Recovery => None,
		}
	}
}

/// Introduces a new key into the graph.
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct AddKey {
	pub kid: KeyId,
	pub subject: Subject,
	pub key: PubKey,
	pub effective_from: Timestamp,
}

/// Marks an existing key as revoked.
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct RevokeKey {
	pub kid: KeyId,
	/// The kind the revoked key is expected to have.
	pub kind: KeyKind,
	pub effective_from: Timestamp,
}

#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize)]
#[serde(try_from = "WireAction", into = "WireAction")]
pub enum Action {
	Add(AddKey),
	Revoke(RevokeKey),
}

impl Action {
	pub fn add_device_key(
		kid: impl Into<KeyId>,
		did: impl Into<DeviceId>,
		key: PubKey,
		effective_from: Timestamp,
	) -> Self {
		Self::Add(AddKey {
			kid: kid.into(),
			subject: Subject::Device(did.into()),
			key,
			effective_from,
		})
	}

	pub fn add_recovery_key(
		kid: impl Into<KeyId>,
		key: PubKey,
		effective_from: Timestamp,
	) -> Self {
		Self::Add(AddKey {
			kid: kid.into(),
			subject: Subject::Recovery,
			key,
			effective_from,
		})
	}

	pub fn revoke_device_key(kid: impl Into<KeyId>, effective_from: Timestamp) -> Self {
		Self::Revoke(RevokeKey {
			kid: kid.into(),
			kind: KeyKind::DeviceKey,
			effective_from,
		})
	}

	pub fn revoke_recovery_key(
		kid: impl Into<KeyId>,
		effective_from: Timestamp,
	) -> Self {
		Self::Revoke(RevokeKey {
			kid: kid.into(),
			kind: KeyKind::RecoveryKey,
			effective_from,
		})
	}

	pub fn kid(&self) -> &KeyId {
		match self {
			Self::Add(add) => &add.kid,
			Self::Revoke(revoke) => &revoke.kid,
		}
	}

	pub fn kind(&self) -> KeyKind {
		match self {
			Self::Add(add) => add.subject.kind(),
			Self::Revoke(revoke) => revoke.kind,
		}
	}

	pub fn verb(&self) -> Verb {
		match self {
			Self::Add(_) => Verb::Add,
			Self::Revoke(_) => Verb::Revoke,
		}
	}

	pub fn effective_from(&self) -> Timestamp {
		match self {
			Self::Add(add) => add.effective_from,
			Self::Revoke(revoke) => revoke.effective_from,
		}
	}
}

// ---- wire format ----

/// The loosely typed json form of an [`Action`].
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireAction {
	kid: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	did: Option<String>,
	#[serde(rename = "type")]
	kind: KeyKind,
	action: Verb,
	effective_from: Timestamp,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	key: Option<String>,
}

impl TryFrom<WireAction> for Action {
	type Error = ActionError;

	fn try_from(value: WireAction) -> Result<Self, Self::Error> {
		let WireAction {
			kid,
			did,
			kind,
			action,
			effective_from,
			key,
		} = value;
		if kid.is_empty() {
			return Err(ActionError::EmptyKeyId);
		}
		// An empty device id is how omitted ids get written by some clients.
		let did = did.filter(|did| !did.is_empty());
		let kid = KeyId(kid);

		match action {
			Verb::Add => {
				let Some(key) = key else {
					return Err(ActionError::MissingKey(kid));
				};
				let key = PubKey::from_base64(&key)
					.map_err(|source| ActionError::InvalidKey { kid: kid.clone(), source })?;
				let subject = match kind {
					KeyKind::DeviceKey => Subject::Device(DeviceId(
						did.ok_or_else(|| ActionError::MissingDeviceId(kid.clone()))?,
					)),
					KeyKind::RecoveryKey => Subject::Recovery,
				};
				Ok(Self::Add(AddKey {
					kid,
					subject,
					key,
					effective_from,
				}))
			}
			// Revokes name only the key. A device id is sometimes sent along
			// with it, and is ignored.
			Verb::Revoke => {
				if key.is_some() {
					return Err(ActionError::UnexpectedKey(kid));
				}
				Ok(Self::Revoke(RevokeKey {
					kid,
					kind,
					effective_from,
				}))
			}
		}
	}
}

impl From<Action> for WireAction {
	fn from(value: Action) -> Self {
		match value {
			Action::Add(AddKey {
				kid,
				subject,
				key,
				effective_from,
			}) => Self {
				kid: kid.0,
				kind: subject.kind(),
				did: subject.device_id().map(|did| did.0.clone()),
				action: Verb::Add,
				effective_from,
				key: Some(key.to_base64()),
			},
			Action::Revoke(RevokeKey {
				kid,
				kind,
				effective_from,
			}) => Self {
				kid: kid.0,
				did: None,
				kind,
				action: Verb::Revoke,
				effective_from,
				key: None,
			},
		}
	}
}

#[derive(thiserror::Error, Debug)]
pub enum ActionError {
	#[error("action has an empty key id")]
	EmptyKeyId,
	#[error("add action for key {0} is missing its public key")]
	MissingKey(KeyId),
	#[error("device key add action for key {0} is missing its device id")]
	MissingDeviceId(KeyId),
	#[error("revoke action for key {0} must not carry a public key")]
	UnexpectedKey(KeyId),
	#[error("add action for key {kid} has an invalid public key")]
	InvalidKey {
		kid: KeyId,
		#[source]
		source: PubKeyError,
	},
}
