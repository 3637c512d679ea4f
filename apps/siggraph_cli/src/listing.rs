//! Human readable views of a graph.

use std::{cmp::Ordering, fmt::Write as _};

use siggraph::{DeviceId, KeyId, SignatureGraph, Timestamp};

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DeviceRow {
	pub kid: KeyId,
	pub did: DeviceId,
	pub revoked_at: Option<Timestamp>,
}

/// One row per device key, revoked ones included, ordered by key id.
pub fn device_rows(graph: &SignatureGraph) -> Vec<DeviceRow> {
	let mut rows: Vec<DeviceRow> = graph
		.state()
		.keys()
		.iter()
		.filter_map(|key| {
			Some(DeviceRow {
				kid: key.kid.clone(),
				did: key.device.clone()?,
				revoked_at: key.revoked_at,
			})
		})
		.collect();
	rows.sort_by(|a, b| id_order(a.kid.as_str(), b.kid.as_str()));
	rows
}

/// Orders numeric ids by value, and puts them before any other ids, which
/// are ordered lexically.
pub fn id_order(a: &str, b: &str) -> Ordering {
	match (a.parse::<u64>(), b.parse::<u64>()) {
		(Ok(a), Ok(b)) => a.cmp(&b),
		(Ok(_), Err(_)) => Ordering::Less,
		(Err(_), Ok(_)) => Ordering::Greater,
		(Err(_), Err(_)) => a.cmp(b),
	}
}

pub fn render_devices(rows: &[DeviceRow]) -> String {
	let mut out = format!("{:<8} {:<8} {}\n", "KID", "DID", "REVOKED");
	for row in rows {
		let revoked = row
			.revoked_at
			.map_or_else(|| "-".to_owned(), |t| t.to_string());
		writeln!(out, "{:<8} {:<8} {}", row.kid, row.did, revoked)
			.expect("infallible");
	}
	out
}

/// A short description of a validated graph.
pub fn summarize(graph: &SignatureGraph) -> String {
	let active_devices = graph
		.devices()
		.filter(|did| graph.active_device(did.as_str()).is_ok())
		.count();
	format!(
		"valid history: head at sequence {}, {} keys ({} active), {} devices ({} active), {} recovery keys active",
		graph.next_sequence() - 1,
		graph.keys().len(),
		graph.active_keys().count(),
		graph.devices().len(),
		active_devices,
		graph.active_recovery_keys().count(),
	)
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_id_order() {
		let mut ids = vec!["10", "b", "2", "a", "1"];
		ids.sort_by(|a, b| id_order(a, b));
		assert_eq!(ids, ["1", "2", "10", "a", "b"]);
	}

	#[test]
	fn test_render_devices() {
		let rows = [
			DeviceRow {
				kid: KeyId::from("2"),
				did: DeviceId::from("1"),
				revoked_at: Some(42),
			},
			DeviceRow {
				kid: KeyId::from("3"),
				did: DeviceId::from("1"),
				revoked_at: None,
			},
		];
		let rendered = render_devices(&rows);
		let lines: Vec<&str> = rendered.lines().collect();
		assert_eq!(lines.len(), 3);
		assert!(lines[0].starts_with("KID"));
		assert!(lines[1].starts_with("2 ") && lines[1].ends_with("42"));
		assert!(lines[2].starts_with("3 ") && lines[2].ends_with('-'));
	}
}
