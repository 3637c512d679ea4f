use tracing::debug;

use crate::{
	action::{Action, Timestamp},
	envelope::SignedEnvelope,
	error::{BuildError, Error},
	executor,
	operation::Operation,
	state::GraphState,
};

/// The validated key history of a single identity.
///
/// A graph can only be obtained by replaying a history that is valid from
/// start to end, and only grows through [`Self::execute`], which rejects
/// anything that would break the chain. See the [crate] docs for the overall
/// flow, and the query methods for what can be read back out.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct SignatureGraph {
	state: GraphState,
}

impl SignatureGraph {
	/// Creates a graph with no history.
	pub fn new() -> Self {
		Self::default()
	}

	/// Replays `history`, in order, from an empty graph.
	///
	/// Fails on the first entry that does not decode or does not validate,
	/// reporting its position. No graph is returned in that case, not even the
	/// part of the history before the bad entry.
	pub fn build<I>(history: I) -> Result<Self, BuildError>
	where
		I: IntoIterator,
		I::Item: AsRef<[u8]>,
	{
		let mut state = GraphState::default();
		for (position, entry) in history.into_iter().enumerate() {
			SignedEnvelope::decode(entry.as_ref())
				.map_err(Error::from)
				.and_then(|envelope| executor::apply(&mut state, envelope))
				.map_err(|source| {
					debug!(position, %source, "rejected history entry");
					BuildError { position, source }
				})?;
		}
		debug!(
			operations = state.operations().len(),
			keys = state.keys().len(),
			devices = state.devices().len(),
			"built signature graph"
		);
		Ok(Self { state })
	}

	/// Validates and appends one raw envelope. The graph is unchanged if the
	/// envelope is rejected.
	pub fn execute(&mut self, envelope: &[u8]) -> Result<(), Error> {
		let envelope = SignedEnvelope::decode(envelope)?;
		executor::apply(&mut self.state, envelope)
	}

	/// Same as [`Self::execute`], for an envelope that is already decoded, such
	/// as one that was just signed.
	pub fn execute_envelope(&mut self, envelope: &SignedEnvelope) -> Result<(), Error> {
		executor::apply(&mut self.state, envelope.clone())
	}

	/// Creates the operation that would come next in this graph.
	///
	/// # Panics
	/// Panics if `actions` is empty.
	pub fn next_operation(&self, timestamp: Timestamp, actions: Vec<Action>) -> Operation {
		Operation::new(
			self.next_sequence(),
			self.previous_signature().map(str::to_owned),
			timestamp,
			actions,
		)
	}

	pub fn state(&self) -> &GraphState {
		&self.state
	}
}

impl From<GraphState> for SignatureGraph {
	fn from(state: GraphState) -> Self {
		Self { state }
	}
}
