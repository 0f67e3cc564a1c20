#[cfg(not(target_arch = "wasm32"))]
use std::path::Path;

use crate::errors::CoreError;
use crate::models::state::ClientState;

use super::encryption::{self, KdfParams};
use super::format::{self, StateFileHeader, NONCE_LEN, SALT_LEN};

/// Save/load the client state as an encrypted blob or file.
///
/// Flow: ClientState → bincode → AES-256-GCM(Argon2id(password)) → BIDS bytes
pub struct StorageManager;

impl StorageManager {
    pub fn save_to_bytes(state: &ClientState, password: &str) -> Result<Vec<u8>, CoreError> {
        Self::save_with_params(state, password, KdfParams::default())
    }

    /// Like [`save_to_bytes`](Self::save_to_bytes) with explicit KDF costs.
    pub fn save_with_params(
        state: &ClientState,
        password: &str,
        kdf_params: KdfParams,
    ) -> Result<Vec<u8>, CoreError> {
        kdf_params.validate()?;
        let plaintext = bincode::serialize(state)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize client state: {e}")))?;

        let salt = encryption::random_bytes::<SALT_LEN>()?;
        let nonce = encryption::random_bytes::<NONCE_LEN>()?;
        let key = encryption::derive_key(password, &salt, &kdf_params)?;
        let ciphertext = encryption::seal(&plaintext, &key, &nonce)?;

        let header = StateFileHeader {
            version: format::CURRENT_VERSION,
            kdf_params,
            salt,
            nonce,
            ciphertext_len: ciphertext.len() as u64,
        };
        tracing::debug!(bytes = ciphertext.len(), "client state encrypted");
        Ok(format::encode(&header, &ciphertext))
    }

    pub fn load_from_bytes(data: &[u8], password: &str) -> Result<ClientState, CoreError> {
        let (header, ciphertext) = format::decode(data)?;
        let key = encryption::derive_key(password, &header.salt, &header.kdf_params)?;
        let plaintext = encryption::open(ciphertext, &key, &header.nonce)?;
        bincode::deserialize(&plaintext)
            .map_err(|e| CoreError::Deserialization(format!("Failed to deserialize client state: {e}")))
    }

    /// Write atomically: a sibling temp file is renamed over the target, so
    /// a crash mid-write never leaves a half-written state file.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_file(state: &ClientState, path: impl AsRef<Path>, password: &str) -> Result<(), CoreError> {
        let path = path.as_ref();
        let bytes = Self::save_to_bytes(state, password)?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, path)?;
        tracing::info!(path = %path.display(), "client state saved");
        Ok(())
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_file(path: impl AsRef<Path>, password: &str) -> Result<ClientState, CoreError> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::load_from_bytes(&bytes, password)
    }
}
