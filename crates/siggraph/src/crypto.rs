//! ed25519 key material for signing and verifying operations.

use std::str::FromStr;

use base64::{
	alphabet,
	engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
	prelude::{Engine as _, BASE64_URL_SAFE_NO_PAD},
};
use ed25519_dalek::{Signer as _, SigningKey, VerifyingKey};

use crate::action::KeyId;

/// Standard alphabet, written without padding but tolerant of it when reading.
const SEED_ENCODING: GeneralPurpose = GeneralPurpose::new(
	&alphabet::STANDARD,
	GeneralPurposeConfig::new()
		.with_encode_padding(false)
		.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// An ed25519 public key.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub struct PubKey(VerifyingKey);

impl PubKey {
	pub const LEN: usize = ed25519_dalek::PUBLIC_KEY_LENGTH;

	/// Instantiates `PubKey` from some bytes. Performs all necessary validation
	/// that the key is valid and of sufficient strength.
	///
	/// Note that we will reject any keys that are too weak (aka low order).
	pub fn try_from_bytes(bytes: &[u8; Self::LEN]) -> Result<Self, PubKeyError> {
		let key =
			VerifyingKey::from_bytes(bytes).map_err(|_| PubKeyError::NotOnCurve)?;
		if key.is_weak() {
			return Err(PubKeyError::WeakKey);
		}
		Ok(Self(key))
	}

	/// Decodes a key from its wire form, which is unpadded url-safe base64.
	pub fn from_base64(encoded: &str) -> Result<Self, PubKeyError> {
		let decoded = BASE64_URL_SAFE_NO_PAD.decode(encoded)?;
		let bytes: &[u8; Self::LEN] = decoded
			.as_slice()
			.try_into()
			.map_err(|_| PubKeyError::WrongLength(decoded.len()))?;
		Self::try_from_bytes(bytes)
	}

	pub fn to_base64(&self) -> String {
		BASE64_URL_SAFE_NO_PAD.encode(self.0.as_bytes())
	}

	pub fn as_bytes(&self) -> &[u8; Self::LEN] {
		self.0.as_bytes()
	}

	pub fn into_inner(self) -> VerifyingKey {
		self.0
	}

	/// Strict verification, which also rejects non-canonical signatures.
	pub(crate) fn verify(
		&self,
		msg: &[u8],
		signature: &ed25519_dalek::Signature,
	) -> Result<(), SignatureError> {
		self.0.verify_strict(msg, signature)?;
		Ok(())
	}
}

#[derive(thiserror::Error, Debug)]
pub enum PubKeyError {
	#[error("expected url-safe base64 encoded public key")]
	InvalidBase64(#[from] base64::DecodeError),
	#[error("expected a public key of length {} but got length {0}", PubKey::LEN)]
	WrongLength(usize),
	#[error(
		"the provided bytes was not the y coordinate of a valid point on the curve"
	)]
	NotOnCurve,
	#[error("public key has a low order and is too weak, which would allow the key to generate signatures that work for almost any message. To prevent this, we reject weak keys.")]
	WeakKey,
}

/// Errors which may occur while processing signatures and keypairs.
#[derive(thiserror::Error, Debug)]
#[error("invalid signature")]
pub struct SignatureError(#[from] ed25519_dalek::SignatureError);

/// A signing key along with the key id it is registered under in a graph.
///
/// The text form is `<kid>:<seed>`, where the seed is the 32 byte ed25519
/// secret in standard base64. A 64 byte keypair (seed followed by public key)
/// is also accepted in place of the seed.
#[derive(Clone)]
pub struct SecretKey {
	kid: KeyId,
	key: SigningKey,
}

impl SecretKey {
	pub fn new(kid: impl Into<KeyId>, key: SigningKey) -> Self {
		Self {
			kid: kid.into(),
			key,
		}
	}

	pub fn kid(&self) -> &KeyId {
		&self.kid
	}

	pub fn public_key(&self) -> PubKey {
		PubKey(self.key.verifying_key())
	}

	/// Encodes the key back into its `<kid>:<seed>` text form.
	pub fn to_encoded(&self) -> String {
		format!("{}:{}", self.kid, SEED_ENCODING.encode(self.key.to_bytes()))
	}

	pub(crate) fn sign(&self, msg: &[u8]) -> ed25519_dalek::Signature {
		self.key.sign(msg)
	}
}

// Skip the secret half.
impl std::fmt::Debug for SecretKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SecretKey")
			.field("kid", &self.kid)
			.field("public_key", &self.public_key().to_base64())
			.finish_non_exhaustive()
	}
}

impl FromStr for SecretKey {
	type Err = SecretKeyError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let (kid, seed) = s
			.trim()
			.split_once(':')
			.ok_or(SecretKeyError::MissingSeparator)?;
		if kid.is_empty() {
			return Err(SecretKeyError::EmptyKeyId);
		}
		let decoded = SEED_ENCODING.decode(seed)?;
		let key = if let Ok(seed) = <&[u8; ed25519_dalek::SECRET_KEY_LENGTH]>::try_from(
			decoded.as_slice(),
		) {
			SigningKey::from_bytes(seed)
		} else if let Ok(keypair) =
			<&[u8; ed25519_dalek::KEYPAIR_LENGTH]>::try_from(decoded.as_slice())
		{
			SigningKey::from_keypair_bytes(keypair)
				.map_err(|_| SecretKeyError::MismatchedKeypair)?
		} else {
			return Err(SecretKeyError::WrongLength(decoded.len()));
		};
		Ok(Self::new(kid, key))
	}
}

#[derive(thiserror::Error, Debug)]
pub enum SecretKeyError {
	#[error("expected a secret key of the form `<kid>:<base64 seed>`")]
	MissingSeparator,
	#[error("the secret key has an empty key id")]
	EmptyKeyId,
	#[error("expected standard base64 encoded seed")]
	InvalidBase64(#[from] base64::DecodeError),
	#[error("expected a seed of length 32 or a keypair of length 64 but got length {0}")]
	WrongLength(usize),
	#[error("the public half of the keypair does not match its seed")]
	MismatchedKeypair,
}
