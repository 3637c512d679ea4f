//! Turning recipes into signed, pre-validated envelopes.

use color_eyre::eyre::{Result, WrapErr as _};
use siggraph::{
	recipes::{self, Proposal},
	SecretKey, SignatureGraph, SignedEnvelope, Timestamp,
};
use tracing::{debug, info};

use crate::keygen::NewKey;

/// A signed operation, along with any secret keys generated for it.
#[derive(Debug)]
pub struct Produced {
	pub envelope: SignedEnvelope,
	pub generated: Vec<Generated>,
}

#[derive(Debug)]
pub struct Generated {
	pub label: &'static str,
	pub secret: SecretKey,
}

pub fn create_device(
	graph: &SignatureGraph,
	signer: &SecretKey,
	device_public_key: Option<&str>,
	now: Timestamp,
) -> Result<Produced> {
	let device_key = NewKey::resolve(device_public_key)?;
	let proposal = recipes::create_device(graph, device_key.public_key(), now);
	let generated = collect_generated(&proposal, Some(&device_key), None);
	finish(graph, signer, proposal, generated, now)
}

pub fn cycle_device(
	graph: &SignatureGraph,
	signer: &SecretKey,
	did: &str,
	device_public_key: Option<&str>,
	now: Timestamp,
) -> Result<Produced> {
	let device_key = NewKey::resolve(device_public_key)?;
	let proposal = recipes::cycle_device(graph, did, device_key.public_key(), now)
		.wrap_err_with(|| format!("can't cycle device {did}"))?;
	let generated = collect_generated(&proposal, Some(&device_key), None);
	finish(graph, signer, proposal, generated, now)
}

pub fn revoke_device(
	graph: &SignatureGraph,
	signer: &SecretKey,
	did: &str,
	effective_from: Option<Timestamp>,
	now: Timestamp,
) -> Result<Produced> {
	let proposal = recipes::revoke_device(graph, did, effective_from.unwrap_or(now))
		.wrap_err_with(|| format!("can't revoke device {did}"))?;
	finish(graph, signer, proposal, Vec::new(), now)
}

/// Signs with `recovery`, which gets revoked and replaced.
pub fn recover_account(
	graph: &SignatureGraph,
	recovery: &SecretKey,
	device_public_key: Option<&str>,
	recovery_public_key: Option<&str>,
	effective_from: Option<Timestamp>,
	now: Timestamp,
) -> Result<Produced> {
	let device_key = NewKey::resolve(device_public_key)?;
	let recovery_key = NewKey::resolve(recovery_public_key)?;
	let proposal = recipes::recover_account(
		graph,
		recovery.kid().as_str(),
		device_key.public_key(),
		recovery_key.public_key(),
		now,
		effective_from.unwrap_or(now),
	)
	.wrap_err("can't recover account")?;
	let generated =
		collect_generated(&proposal, Some(&device_key), Some(&recovery_key));
	finish(graph, recovery, proposal, generated, now)
}

fn collect_generated(
	proposal: &Proposal,
	device_key: Option<&NewKey>,
	recovery_key: Option<&NewKey>,
) -> Vec<Generated> {
	let device = proposal
		.device_key
		.as_ref()
		.zip(device_key)
		.and_then(|(kid, key)| key.secret(kid))
		.map(|secret| Generated {
			label: "device key",
			secret,
		});
	let recovery = proposal
		.recovery_key
		.as_ref()
		.zip(recovery_key)
		.and_then(|(kid, key)| key.secret(kid))
		.map(|secret| Generated {
			label: "recovery key",
			secret,
		});
	device.into_iter().chain(recovery).collect()
}

/// Signs the proposal and checks it against a copy of the graph, so that only
/// operations the graph would accept are ever handed out.
fn finish(
	graph: &SignatureGraph,
	signer: &SecretKey,
	proposal: Proposal,
	generated: Vec<Generated>,
	now: Timestamp,
) -> Result<Produced> {
	let operation = graph.next_operation(now, proposal.actions);
	debug!(sequence = operation.sequence(), signer = %signer.kid(), "signing operation");
	let envelope = SignedEnvelope::sign(&operation, signer);
	graph
		.clone()
		.execute_envelope(&envelope)
		.wrap_err("the new operation would be rejected by the graph")?;
	info!(sequence = operation.sequence(), "produced valid operation");
	Ok(Produced {
		envelope,
		generated,
	})
}
