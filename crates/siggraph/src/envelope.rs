//! The signed envelope that wraps every [`Operation`].
//!
//! Envelopes are JSON Web Signatures using EdDSA over ed25519. The protected
//! header names the signing key (`kid`), and the payload is the json encoded
//! operation. The signature covers `base64url(header) "." base64url(payload)`.
//!
//! Two serializations are accepted when decoding: the flattened json form
//! `{"payload": .., "protected": .., "signature": ..}` and the compact
//! `header.payload.signature` form. Encoding always produces the flattened
//! form.
//!
//! The base64url text of the signature doubles as the reference that the next
//! operation puts in its `previous` field.

use base64::prelude::{Engine as _, BASE64_URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};

use crate::{
	action::KeyId,
	crypto::{PubKey, SecretKey},
	error::{DecodeError, Error},
	operation::Operation,
};

/// The only signature algorithm in use.
pub const ALGORITHM: &str = "EdDSA";

#[derive(Debug, Serialize, Deserialize)]
struct ProtectedHeader {
	alg: String,
	kid: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct FlattenedJws {
	payload: String,
	protected: String,
	signature: String,
}

/// A decoded envelope. Having one of these does *not* mean the signature is
/// valid, only that it is well formed. See [`Self::verify`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SignedEnvelope {
	/// The encoded parts, kept verbatim since the signature covers them.
	protected: String,
	payload: String,
	signature: String,
	signer: KeyId,
	decoded_signature: ed25519_dalek::Signature,
	operation: Operation,
}

impl SignedEnvelope {
	/// Parses an envelope in either the flattened json or compact form.
	pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
		let text = std::str::from_utf8(bytes)?.trim();
		let jws = if text.starts_with('{') {
			serde_json::from_str::<FlattenedJws>(text).map_err(|source| {
				DecodeError::Json {
					part: "envelope",
					source,
				}
			})?
		} else if text.starts_with('"') {
			// A compact envelope embedded as a json string.
			let compact = serde_json::from_str::<String>(text).map_err(|source| {
				DecodeError::Json {
					part: "envelope",
					source,
				}
			})?;
			split_compact(&compact)?
		} else {
			split_compact(text)?
		};
		Self::from_parts(jws)
	}

	fn from_parts(jws: FlattenedJws) -> Result<Self, DecodeError> {
		let header_bytes = decode_part("protected header", &jws.protected)?;
		let header: ProtectedHeader =
			serde_json::from_slice(&header_bytes).map_err(|source| {
				DecodeError::Json {
					part: "protected header",
					source,
				}
			})?;
		if header.alg != ALGORITHM {
			return Err(DecodeError::UnsupportedAlgorithm(header.alg));
		}
		if header.kid.is_empty() {
			return Err(DecodeError::MissingSigner);
		}

		let operation = Operation::from_json(&decode_part("payload", &jws.payload)?)?;

		let signature_bytes = decode_part("signature", &jws.signature)?;
		let signature_bytes: &[u8; ed25519_dalek::SIGNATURE_LENGTH] = signature_bytes
			.as_slice()
			.try_into()
			.map_err(|_| DecodeError::SignatureLength(signature_bytes.len()))?;

		Ok(Self {
			protected: jws.protected,
			payload: jws.payload,
			signature: jws.signature,
			signer: KeyId::new(header.kid),
			decoded_signature: ed25519_dalek::Signature::from_bytes(signature_bytes),
			operation,
		})
	}

	/// Signs `operation` with `key`, naming the key's id as the signer.
	pub fn sign(operation: &Operation, key: &SecretKey) -> Self {
		let header = ProtectedHeader {
			alg: ALGORITHM.to_owned(),
			kid: key.kid().as_str().to_owned(),
		};
		let protected = BASE64_URL_SAFE_NO_PAD
			.encode(serde_json::to_vec(&header).expect("infallible"));
		let payload = BASE64_URL_SAFE_NO_PAD.encode(operation.to_json());
		let decoded_signature = key.sign(signing_input(&protected, &payload).as_bytes());
		Self {
			protected,
			payload,
			signature: BASE64_URL_SAFE_NO_PAD.encode(decoded_signature.to_bytes()),
			signer: key.kid().clone(),
			decoded_signature,
			operation: operation.clone(),
		}
	}

	/// Checks the signature against `key`, which should be the key registered
	/// under [`Self::signer`].
	pub fn verify(&self, key: &PubKey) -> Result<(), Error> {
		key.verify(
			signing_input(&self.protected, &self.payload).as_bytes(),
			&self.decoded_signature,
		)
		.map_err(|_| Error::InvalidSignature {
			sequence: self.operation.sequence(),
			kid: self.signer.clone(),
		})
	}

	/// The id of the key that claims to have signed this envelope.
	pub fn signer(&self) -> &KeyId {
		&self.signer
	}

	pub fn operation(&self) -> &Operation {
		&self.operation
	}

	pub fn into_operation(self) -> Operation {
		self.operation
	}

	/// The signature as url-safe base64, as referenced by the next operation.
	pub fn signature(&self) -> &str {
		&self.signature
	}

	/// The flattened json serialization.
	pub fn to_json(&self) -> String {
		serde_json::to_string(&FlattenedJws {
			payload: self.payload.clone(),
			protected: self.protected.clone(),
			signature: self.signature.clone(),
		})
		.expect("infallible")
	}

	/// The compact `header.payload.signature` serialization.
	pub fn to_compact(&self) -> String {
		format!("{}.{}.{}", self.protected, self.payload, self.signature)
	}
}

impl Serialize for SignedEnvelope {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		FlattenedJws {
			payload: self.payload.clone(),
			protected: self.protected.clone(),
			signature: self.signature.clone(),
		}
		.serialize(serializer)
	}
}

fn signing_input(protected: &str, payload: &str) -> String {
	format!("{protected}.{payload}")
}

fn split_compact(compact: &str) -> Result<FlattenedJws, DecodeError> {
	let mut parts = compact.split('.');
	let (Some(protected), Some(payload), Some(signature), None) =
		(parts.next(), parts.next(), parts.next(), parts.next())
	else {
		return Err(DecodeError::CompactParts);
	};
	Ok(FlattenedJws {
		payload: payload.to_owned(),
		protected: protected.to_owned(),
		signature: signature.to_owned(),
	})
}

fn decode_part(part: &'static str, encoded: &str) -> Result<Vec<u8>, DecodeError> {
	BASE64_URL_SAFE_NO_PAD
		.decode(encoded)
		.map_err(|source| DecodeError::Base64 { part, source })
}

#[cfg(test)]
mod test {
	use super::*;

	use ed25519_dalek::SigningKey;
	use eyre::WrapErr;

	use crate::action::Action;

	fn secret(kid: &str, seed: u8) -> SecretKey {
		SecretKey::new(kid, SigningKey::from_bytes(&[seed; 32]))
	}

	fn genesis(key: &SecretKey) -> Operation {
		Operation::new(
			1,
			None,
			1_000,
			vec![Action::add_recovery_key(key.kid(), key.public_key(), 1_000)],
		)
	}

	#[test]
	fn test_sign_then_decode() -> eyre::Result<()> {
		let key = secret("1", 1);
		let signed = SignedEnvelope::sign(&genesis(&key), &key);
		signed.verify(&key.public_key())?;

		for encoded in [signed.to_json(), signed.to_compact()] {
			let decoded = SignedEnvelope::decode(encoded.as_bytes())
				.wrap_err_with(|| format!("failed to decode {encoded}"))?;
			assert_eq!(decoded, signed);
			assert_eq!(decoded.signer().as_str(), "1");
			decoded.verify(&key.public_key())?;
		}

		let quoted = serde_json::to_string(&signed.to_compact())?;
		assert_eq!(SignedEnvelope::decode(quoted.as_bytes())?, signed);
		Ok(())
	}

	#[test]
	fn test_header_and_serialization_shape() -> eyre::Result<()> {
		let key = secret("1", 1);
		let signed = SignedEnvelope::sign(&genesis(&key), &key);
		let value: serde_json::Value = serde_json::from_str(&signed.to_json())?;
		assert_eq!(value["signature"], signed.signature());
		assert_eq!(serde_json::to_value(&signed)?, value);

		let header = BASE64_URL_SAFE_NO_PAD.decode(value["protected"].as_str().unwrap())?;
		let header: serde_json::Value = serde_json::from_slice(&header)?;
		assert_eq!(header, serde_json::json!({"alg": "EdDSA", "kid": "1"}));
		Ok(())
	}

	#[test]
	fn test_verify_rejects_wrong_key() {
		let key = secret("1", 1);
		let signed = SignedEnvelope::sign(&genesis(&key), &key);
		let err = signed.verify(&secret("1", 2).public_key()).unwrap_err();
		assert_eq!(err.kind(), crate::ErrorKind::InvalidSignature);
	}

	#[test]
	fn test_verify_rejects_tampered_payload() -> eyre::Result<()> {
		let key = secret("1", 1);
		let signed = SignedEnvelope::sign(&genesis(&key), &key);
		let mut tampered = genesis(&key).to_json();
		tampered.extend_from_slice(b" ");
		let forged = format!(
			"{}.{}.{}",
			signed.protected,
			BASE64_URL_SAFE_NO_PAD.encode(tampered),
			signed.signature
		);
		let decoded = SignedEnvelope::decode(forged.as_bytes())?;
		assert!(decoded.verify(&key.public_key()).is_err());
		Ok(())
	}

	#[test]
	fn test_decode_rejects_malformed() {
		let key = secret("1", 1);
		let signed = SignedEnvelope::sign(&genesis(&key), &key);
		let other_header = |header: &str| {
			format!(
				"{}.{}.{}",
				BASE64_URL_SAFE_NO_PAD.encode(header),
				signed.payload,
				signed.signature
			)
		};

		assert!(matches!(
			SignedEnvelope::decode(b"a.b"),
			Err(DecodeError::CompactParts)
		));
		assert!(matches!(
			SignedEnvelope::decode(b"a.b.c.d"),
			Err(DecodeError::CompactParts)
		));
		assert!(matches!(
			SignedEnvelope::decode(b"{\"payload\": 1}"),
			Err(DecodeError::Json { .. })
		));
		assert!(matches!(
			SignedEnvelope::decode(b"!!.b.c"),
			Err(DecodeError::Base64 { part: "protected header", .. })
		));
		assert!(matches!(
			SignedEnvelope::decode(other_header(r#"{"alg":"RS256","kid":"1"}"#).as_bytes()),
			Err(DecodeError::UnsupportedAlgorithm(alg)) if alg == "RS256"
		));
		assert!(matches!(
			SignedEnvelope::decode(other_header(r#"{"alg":"EdDSA","kid":""}"#).as_bytes()),
			Err(DecodeError::MissingSigner)
		));

		let short_signature =
			format!("{}.{}.AAAA", signed.protected, signed.payload);
		assert!(matches!(
			SignedEnvelope::decode(short_signature.as_bytes()),
			Err(DecodeError::SignatureLength(3))
		));
	}
}
