//! Failures reported while building, extending, and querying a graph.

use crate::action::{ActionError, DeviceId, KeyId, KeyKind, Timestamp};

/// Everything that can go wrong while validating or querying a graph.
///
/// Each variant carries enough context to explain the failure. Use
/// [`Error::kind`] to match on the kind of failure alone.
#[derive(thiserror::Error, Debug)]
pub enum Error {
	#[error("malformed input")]
	MalformedInput(#[from] DecodeError),
	#[error("the signature of operation {sequence} does not verify with key {kid}")]
	InvalidSignature { sequence: u64, kid: KeyId },
	#[error("expected operation with sequence {expected} but got sequence {actual}")]
	SequenceViolation { expected: u64, actual: u64 },
	#[error(
		"operation {sequence} does not link to the signature of the previous operation"
	)]
	ChainMismatch {
		sequence: u64,
		expected: Option<String>,
		actual: Option<String>,
	},
	#[error("key {kid} is not authorized to sign operation {sequence}")]
	UnauthorizedSigner { sequence: u64, kid: KeyId },
	#[error("action {action}: key {kid} already exists")]
	KeyReuse { action: usize, kid: KeyId },
	#[error("unknown key {kid}{}", fmt_action(.action))]
	UnknownKey { action: Option<usize>, kid: KeyId },
	#[error("unknown device {did}")]
	UnknownDevice { did: DeviceId },
	#[error("key {kid} is a {kind}, not a device key")]
	NotDeviceKey { kid: KeyId, kind: KeyKind },
	#[error("key {kid} has already been revoked{}", fmt_action(.action))]
	AlreadyRevoked { action: Option<usize>, kid: KeyId },
	#[error("device {did} is inactive, its current key {kid} has been revoked")]
	DeviceInactive { did: DeviceId, kid: KeyId },
	#[error("action {action}: cannot revoke {kid} as a {expected}, it is a {actual}")]
	KeyKindMismatch {
		action: usize,
		kid: KeyId,
		expected: KeyKind,
		actual: KeyKind,
	},
	#[error(
		"action {action}: effective_from {effective_from} is earlier than {watermark}, the latest accepted effective_from"
	)]
	EffectiveFromRegression {
		action: usize,
		effective_from: Timestamp,
		watermark: Timestamp,
	},
}

fn fmt_action(action: &Option<usize>) -> String {
	match action {
		Some(index) => format!(" (action {index})"),
		None => String::new(),
	}
}

/// The kind of an [`Error`], without any of its context.
#[derive(Debug, Eq, PartialEq, Hash, Clone, Copy)]
pub enum ErrorKind {
	MalformedInput,
	InvalidSignature,
	SequenceViolation,
	ChainMismatch,
	UnauthorizedSigner,
	KeyReuse,
	UnknownKey,
	UnknownDevice,
	NotDeviceKey,
	AlreadyRevoked,
	DeviceInactive,
	KeyKindMismatch,
	EffectiveFromRegression,
}

impl Error {
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::MalformedInput(_) => ErrorKind::MalformedInput,
			Self::InvalidSignature { .. } => ErrorKind::InvalidSignature,
			Self::SequenceViolation { .. } => ErrorKind::SequenceViolation,
			Self::ChainMismatch { .. } => ErrorKind::ChainMismatch,
			Self::UnauthorizedSigner { .. } => ErrorKind::UnauthorizedSigner,
			Self::KeyReuse { .. } => ErrorKind::KeyReuse,
			Self::UnknownKey { .. } => ErrorKind::UnknownKey,
			Self::UnknownDevice { .. } => ErrorKind::UnknownDevice,
			Self::NotDeviceKey { .. } => ErrorKind::NotDeviceKey,
			Self::AlreadyRevoked { .. } => ErrorKind::AlreadyRevoked,
			Self::DeviceInactive { .. } => ErrorKind::DeviceInactive,
			Self::KeyKindMismatch { .. } => ErrorKind::KeyKindMismatch,
			Self::EffectiveFromRegression { .. } => ErrorKind::EffectiveFromRegression,
		}
	}

	/// The index of the offending action within its operation, if the failure
	/// is specific to one action.
	pub fn action_index(&self) -> Option<usize> {
		match self {
			Self::KeyReuse { action, .. }
			| Self::KeyKindMismatch { action, .. }
			| Self::EffectiveFromRegression { action, .. } => Some(*action),
			Self::UnknownKey { action, .. } | Self::AlreadyRevoked { action, .. } => {
				*action
			}
			_ => None,
		}
	}
}

/// Reasons why an envelope could not be decoded.
#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
	#[error("envelope is not valid utf-8")]
	NotUtf8(#[from] std::str::Utf8Error),
	#[error("compact envelope must have exactly three `.` separated parts")]
	CompactParts,
	#[error("envelope {part} is not url-safe base64")]
	Base64 {
		part: &'static str,
		#[source]
		source: base64::DecodeError,
	},
	#[error("envelope {part} is not valid json")]
	Json {
		part: &'static str,
		#[source]
		source: serde_json::Error,
	},
	#[error("unsupported signature algorithm {0:?}, expected \"EdDSA\"")]
	UnsupportedAlgorithm(String),
	#[error("the protected header has an empty `kid`")]
	MissingSigner,
	#[error("expected a signature of length 64 but got length {0}")]
	SignatureLength(usize),
	#[error("unsupported operation version {0:?}")]
	UnsupportedVersion(String),
	#[error("operation sequence numbers start at 1")]
	ZeroSequence,
	#[error("operation has no actions")]
	NoActions,
	#[error(transparent)]
	Action(#[from] ActionError),
}

/// Returned by [`SignatureGraph::build`](crate::SignatureGraph::build) when an
/// entry of the history is rejected. Nothing of the history is kept.
#[derive(thiserror::Error, Debug)]
#[error("history entry {position} was rejected")]
pub struct BuildError {
	/// 0-based position of the offending entry.
	pub position: usize,
	#[source]
	pub source: Error,
}

impl BuildError {
	pub fn kind(&self) -> ErrorKind {
		self.source.kind()
	}
}
