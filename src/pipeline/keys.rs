//! Signing key material handed to mutators.

use std::fmt;

use crate::error::PipelineError;

/// A symmetric signing key.
///
/// The secret never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    key_id: String,
    secret: Vec<u8>,
}

impl KeyMaterial {
    pub fn new(key_id: impl Into<String>, secret: impl Into<Vec<u8>>) -> Result<Self, PipelineError> {
        let secret = secret.into();
        if secret.len() < 32 {
            return Err(PipelineError::Configuration(
                "signing secret must be at least 32 bytes long".into(),
            ));
        }
        Ok(Self {
            key_id: key_id.into(),
            secret,
        })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn secret(&self) -> &[u8] {
        &self.secret
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("key_id", &self.key_id)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
