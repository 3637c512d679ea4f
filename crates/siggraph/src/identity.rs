//! The identity document served by the network, which carries the history.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::{error::BuildError, graph::SignatureGraph};

/// An identity along with its full history.
///
/// History entries are kept as raw json, since signatures cover their exact
/// encoding.
#[derive(Debug, Serialize, Deserialize)]
pub struct Identity {
	pub self_id: String,
	#[serde(rename = "type")]
	pub kind: String,
	pub history: Vec<Box<RawValue>>,
}

impl Identity {
	/// Builds the signature graph from the identity's history.
	pub fn signature_graph(&self) -> Result<SignatureGraph, BuildError> {
		SignatureGraph::build(self.history.iter().map(|entry| entry.get()))
	}
}

#[cfg(test)]
mod test {
	use super::*;

	use ed25519_dalek::SigningKey;

	use crate::{Action, SecretKey, SignedEnvelope};

	#[test]
	fn test_signature_graph_from_document() -> eyre::Result<()> {
		let key = SecretKey::new("1", SigningKey::from_bytes(&[1; 32]));
		let genesis = SignatureGraph::new().next_operation(
			10,
			vec![Action::add_device_key("1", "1", key.public_key(), 10)],
		);
		let signed = SignedEnvelope::sign(&genesis, &key);
		let document = serde_json::json!({
			"self_id": "84099724068",
			"type": "individual",
			"history": [signed],
		})
		.to_string();

		let identity: Identity = serde_json::from_str(&document)?;
		assert_eq!(identity.kind, "individual");
		let graph = identity.signature_graph()?;
		assert_eq!(graph.next_sequence(), 2);
		assert_eq!(graph.previous_signature(), Some(signed.signature()));
		Ok(())
	}
}
