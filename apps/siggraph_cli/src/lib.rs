//! Offline tooling for inspecting and extending signature graphs.
//!
//! Nothing here talks to the network. Histories are read from files, and new
//! operations are printed for the caller to submit however they like.

pub mod commands;
pub mod history;
pub mod keygen;
pub mod listing;

use std::time::{SystemTime, UNIX_EPOCH};

use siggraph::Timestamp;

/// The current unix time, in seconds.
pub fn now() -> Timestamp {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map_or(0, |d| d.as_secs() as Timestamp)
}
