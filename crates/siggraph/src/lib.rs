//! A crate to validate and query signature graphs.
//!
//! A signature graph is the key history of a single identity. It is an append
//! only list of signed operations, where each operation adds or revokes keys
//! and links to the signature of the operation before it. Replaying the list
//! from the start tells you which keys are currently valid for the identity,
//! which device each key belongs to, and when any key was revoked.
//!
//! The typical flow for a client looks like this:
//!
//! 1. Fetch the identity's history (the transport is up to you) and
//!    [`SignatureGraph::build`] it. This verifies every signature and every
//!    link in the chain, and fails on the first invalid entry.
//! 2. Inspect the graph to decide what to do next, e.g. with
//!    [`SignatureGraph::current_key_id`] or [`SignatureGraph::active_device`].
//! 3. Create the next [`Operation`] with [`SignatureGraph::next_operation`],
//!    sign it with [`SignedEnvelope::sign`], and check it locally with
//!    [`SignatureGraph::execute_envelope`] before submitting it.
//!
//! The remote ledger stays authoritative. A locally accepted operation may
//! still be rejected if someone else appended to the history in the meantime,
//! in which case the caller should re-fetch and try again.
//!
//! Nothing in this crate does I/O or holds global state, so graphs for
//! different identities can be built and queried in parallel.

#![forbid(unsafe_code)]

pub mod action;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod executor;
pub mod identity;
pub mod operation;
pub mod recipes;
pub mod state;

mod graph;
mod query;

pub use crate::{
	action::{Action, AddKey, DeviceId, KeyId, KeyKind, RevokeKey, Subject, Timestamp, Verb},
	crypto::{PubKey, SecretKey},
	envelope::SignedEnvelope,
	error::{BuildError, DecodeError, Error, ErrorKind},
	graph::SignatureGraph,
	identity::Identity,
	operation::Operation,
};
