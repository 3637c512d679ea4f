//! Loading histories from disk.

use std::{io::Read as _, path::Path};

use color_eyre::eyre::{Result, WrapErr as _};
use serde_json::value::RawValue;
use siggraph::{Identity, SignatureGraph};
use tracing::info;

/// Reads and validates a history. `-` reads from stdin.
pub fn load(path: &Path) -> Result<SignatureGraph> {
	let bytes = if path == Path::new("-") {
		let mut buf = Vec::new();
		std::io::stdin()
			.read_to_end(&mut buf)
			.wrap_err("failed to read history from stdin")?;
		buf
	} else {
		std::fs::read(path).wrap_err_with(|| {
			format!("failed to read history from {}", path.display())
		})?
	};
	parse(&bytes)
}

/// Parses and validates a history, given as either an identity document or a
/// bare json array of envelopes.
pub fn parse(bytes: &[u8]) -> Result<SignatureGraph> {
	let entries = match serde_json::from_slice::<Identity>(bytes) {
		Ok(identity) => {
			info!(self_id = %identity.self_id, "loaded identity document");
			identity.history
		}
		Err(_) => serde_json::from_slice::<Vec<Box<RawValue>>>(bytes)
			.wrap_err("expected an identity document or an array of envelopes")?,
	};
	let graph = SignatureGraph::build(entries.iter().map(|entry| entry.get()))
		.wrap_err("the history failed validation")?;
	info!(
		operations = graph.state().operations().len(),
		"validated history"
	);
	Ok(graph)
}
