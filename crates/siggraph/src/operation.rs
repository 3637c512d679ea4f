//! Operations, the signed and sequenced records that make up a history.

use serde::{Deserialize, Serialize};

use crate::{
	action::{Action, Timestamp, WireAction},
	error::DecodeError,
};

/// The only operation format version understood by this crate.
pub const VERSION: &str = "1.0.0";

/// One entry of a signature graph's history.
///
/// `previous` is the signature of the operation before this one, and is only
/// absent for the first operation. Operations always have at least one
/// action.
#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize)]
#[serde(try_from = "WireOperation", into = "WireOperation")]
pub struct Operation {
	sequence: u64,
	previous: Option<String>,
	timestamp: Timestamp,
	actions: Vec<Action>,
}

impl Operation {
	/// # Panics
	/// Panics if `sequence` is 0 or `actions` is empty.
	pub fn new(
		sequence: u64,
		previous: Option<String>,
		timestamp: Timestamp,
		actions: Vec<Action>,
	) -> Self {
		assert!(sequence >= 1, "operation sequence numbers start at 1");
		assert!(!actions.is_empty(), "an operation needs at least one action");
		Self {
			sequence,
			previous: previous.filter(|p| !p.is_empty()),
			timestamp,
			actions,
		}
	}

	pub fn sequence(&self) -> u64 {
		self.sequence
	}

	pub fn version(&self) -> &'static str {
		VERSION
	}

	/// The signature of the previous operation, or `None` for the first one.
	pub fn previous(&self) -> Option<&str> {
		self.previous.as_deref()
	}

	pub fn timestamp(&self) -> Timestamp {
		self.timestamp
	}

	pub fn actions(&self) -> &[Action] {
		&self.actions
	}

	/// The json payload that gets signed.
	pub fn to_json(&self) -> Vec<u8> {
		serde_json::to_vec(self).expect("infallible")
	}

	/// Parses the json payload of an envelope.
	pub fn from_json(payload: &[u8]) -> Result<Self, DecodeError> {
		let wire: WireOperation =
			serde_json::from_slice(payload).map_err(|source| DecodeError::Json {
				part: "payload",
				source,
			})?;
		Self::try_from(wire)
	}
}

/// The json form of an [`Operation`]. Field order matches the order the
/// fields are written in.
#[derive(Debug, Serialize, Deserialize)]
struct WireOperation {
	sequence: u64,
	version: String,
	#[serde(default)]
	previous: String,
	timestamp: Timestamp,
	actions: Vec<WireAction>,
}

impl TryFrom<WireOperation> for Operation {
	type Error = DecodeError;

	fn try_from(value: WireOperation) -> Result<Self, Self::Error> {
		if value.version != VERSION {
			return Err(DecodeError::UnsupportedVersion(value.version));
		}
		if value.sequence == 0 {
			return Err(DecodeError::ZeroSequence);
		}
		if value.actions.is_empty() {
			return Err(DecodeError::NoActions);
		}
		let actions = value
			.actions
			.into_iter()
			.map(Action::try_from)
			.collect::<Result<Vec<_>, _>>()?;
		Ok(Self {
			sequence: value.sequence,
			previous: Some(value.previous).filter(|p| !p.is_empty()),
			timestamp: value.timestamp,
			actions,
		})
	}
}

impl From<Operation> for WireOperation {
	fn from(value: Operation) -> Self {
		Self {
			sequence: value.sequence,
			version: VERSION.to_owned(),
			previous: value.previous.unwrap_or_default(),
			timestamp: value.timestamp,
			actions: value.actions.into_iter().map(WireAction::from).collect(),
		}
	}
}
