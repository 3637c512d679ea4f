mod common;

use common::{genesis, secret, T0};
use siggraph::{recipes, Action, ErrorKind, KeyKind, SignatureGraph};

const NOW: i64 = T0 + 600;

#[test]
fn create_device_allocates_fresh_ids() -> eyre::Result<()> {
	let (mut ledger, _, device) = genesis();
	let new_key = secret("3", 3);
	let proposal = recipes::create_device(&ledger.graph, new_key.public_key(), NOW);
	assert_eq!(proposal.device_key.as_ref().map(|k| k.as_str()), Some("3"));
	assert_eq!(proposal.device.as_ref().map(|d| d.as_str()), Some("2"));
	assert_eq!(proposal.recovery_key, None);

	ledger.append(&device, NOW, proposal.actions)?;
	assert_eq!(ledger.graph.active_device("2")?.as_str(), "3");
	assert_eq!(ledger.graph.public_key("3")?, &new_key.public_key());
	Ok(())
}

#[test]
fn cycle_device_revokes_and_replaces() -> eyre::Result<()> {
	let (mut ledger, _, device) = genesis();
	let proposal =
		recipes::cycle_device(&ledger.graph, "1", secret("3", 3).public_key(), NOW)?;
	assert_eq!(proposal.actions.len(), 2);
	assert_eq!(proposal.actions[0], Action::revoke_device_key("2", NOW));

	ledger.append(&device, NOW, proposal.actions)?;
	assert_eq!(ledger.graph.current_key_id("1")?.as_str(), "3");
	assert_eq!(ledger.graph.revoked_at("2")?, Some(NOW));
	ledger.graph.active_device("1")?;
	Ok(())
}

#[test]
fn cycle_inactive_device_only_adds() -> eyre::Result<()> {
	let (mut ledger, recovery, _) = genesis();
	let proposal = recipes::revoke_device(&ledger.graph, "1", NOW)?;
	ledger.append(&recovery, NOW, proposal.actions)?;

	let proposal =
		recipes::cycle_device(&ledger.graph, "1", secret("3", 3).public_key(), NOW)?;
	assert_eq!(proposal.actions.len(), 1);
	ledger.append(&recovery, NOW, proposal.actions)?;
	assert_eq!(ledger.graph.active_device("1")?.as_str(), "3");
	Ok(())
}

#[test]
fn revoke_device_requires_active_device() -> eyre::Result<()> {
	let (mut ledger, recovery, _) = genesis();
	let proposal = recipes::revoke_device(&ledger.graph, "1", NOW)?;
	ledger.append(&recovery, NOW, proposal.actions)?;
	assert_eq!(ledger.graph.revoked_at("2")?, Some(NOW));

	let err = recipes::revoke_device(&ledger.graph, "1", NOW).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::DeviceInactive);
	let err = recipes::revoke_device(&ledger.graph, "5", NOW).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::UnknownDevice);
	Ok(())
}

#[test]
fn recover_account_with_recovery_key() -> eyre::Result<()> {
	let (mut ledger, recovery, _) = genesis();
	let device_key = secret("x", 30);
	let recovery_key = secret("y", 31);
	let proposal = recipes::recover_account(
		&ledger.graph,
		"1",
		device_key.public_key(),
		recovery_key.public_key(),
		NOW,
		NOW,
	)?;
	let new_recovery = proposal.recovery_key.clone().unwrap();
	let new_device_key = proposal.device_key.clone().unwrap();
	let new_device = proposal.device.clone().unwrap();
	assert_eq!(new_recovery.as_str(), "3");
	assert_eq!(new_device_key.as_str(), "4");
	assert_eq!(new_device.as_str(), "2");

	// signed by the very recovery key that gets revoked
	ledger.append(&recovery, NOW, proposal.actions)?;
	let graph = SignatureGraph::build(&ledger.history)?;
	assert_eq!(graph.revoked_at("1")?, Some(NOW));
	assert_eq!(graph.active_device(new_device.as_str())?, &new_device_key);
	let recovery_keys: Vec<_> = graph.active_recovery_keys().map(|k| &k.kid).collect();
	assert_eq!(recovery_keys, [&new_recovery]);
	assert_eq!(graph.key("3")?.kind, KeyKind::RecoveryKey);

	// the old recovery key can't be used again
	let err = recipes::recover_account(
		&graph,
		"1",
		device_key.public_key(),
		recovery_key.public_key(),
		NOW,
		NOW,
	)
	.unwrap_err();
	assert_eq!(err.kind(), ErrorKind::AlreadyRevoked);
	Ok(())
}

#[test]
fn recover_account_rejects_device_keys() {
	let (ledger, _, _) = genesis();
	let err = recipes::recover_account(
		&ledger.graph,
		"2",
		secret("x", 30).public_key(),
		secret("y", 31).public_key(),
		NOW,
		NOW,
	)
	.unwrap_err();
	assert_eq!(err.kind(), ErrorKind::KeyKindMismatch);
}
