use color_eyre::eyre::{Result, WrapErr as _};
use ed25519_dalek::SigningKey;
use siggraph::{KeyId, PubKey, SecretKey};

/// The public key for a new key, either supplied by the user or generated
/// here. Only generated keys have a secret to hand back.
#[derive(Debug)]
pub struct NewKey {
	public_key: PubKey,
	generated: Option<SigningKey>,
}

impl NewKey {
	/// Uses `supplied` (url-safe base64) if present, otherwise generates a key.
	pub fn resolve(supplied: Option<&str>) -> Result<Self> {
		match supplied {
			Some(encoded) => Ok(Self {
				public_key: PubKey::from_base64(encoded)
					.wrap_err_with(|| format!("invalid public key {encoded}"))?,
				generated: None,
			}),
			None => Self::generate(),
		}
	}

	pub fn generate() -> Result<Self> {
		let key = SigningKey::generate(&mut rand::rngs::OsRng);
		let public_key = PubKey::try_from_bytes(key.verifying_key().as_bytes())
			.wrap_err("generated an unusable key")?;
		Ok(Self {
			public_key,
			generated: Some(key),
		})
	}

	pub fn public_key(&self) -> PubKey {
		self.public_key
	}

	/// The secret key, registered under `kid`, if it was generated here.
	pub fn secret(&self, kid: &KeyId) -> Option<SecretKey> {
		self.generated
			.as_ref()
			.map(|key| SecretKey::new(kid, key.clone()))
	}
}
