use crate::errors::CoreError;
use super::encryption::KdfParams;

/// Magic bytes identifying a BIDS (BI Dashboard State) file.
pub const MAGIC: &[u8; 4] = b"BIDS";

/// Current file format version.
pub const CURRENT_VERSION: u16 = 1;

pub const SALT_LEN: usize = 16;
pub const NONCE_LEN: usize = 12;

/// Fixed header size in bytes:
/// magic(4) + version(2) + kdf_params(12) + salt(16) + nonce(12) + ciphertext_len(8) = 54
pub const HEADER_SIZE: usize = 4 + 2 + 12 + SALT_LEN + NONCE_LEN + 8;

/// Header of an encrypted client-state file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateFileHeader {
    pub version: u16,
    pub kdf_params: KdfParams,
    pub salt: [u8; SALT_LEN],
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext_len: u64,
}

/// Serialize header + ciphertext.
///
/// Layout (all integers little-endian):
/// ```text
/// [BIDS: 4B] [version: 2B] [memory_cost: 4B] [time_cost: 4B] [parallelism: 4B]
/// [salt: 16B] [nonce: 12B] [ciphertext_len: 8B] [ciphertext + GCM tag]
/// ```
pub fn encode(header: &StateFileHeader, ciphertext: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_SIZE + ciphertext.len());
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&header.version.to_le_bytes());
    buf.extend_from_slice(&header.kdf_params.memory_cost.to_le_bytes());
    buf.extend_from_slice(&header.kdf_params.time_cost.to_le_bytes());
    buf.extend_from_slice(&header.kdf_params.parallelism.to_le_bytes());
    buf.extend_from_slice(&header.salt);
    buf.extend_from_slice(&header.nonce);
    buf.extend_from_slice(&(ciphertext.len() as u64).to_le_bytes());
    buf.extend_from_slice(ciphertext);
    buf
}

/// Little-endian cursor over the header bytes. Callers check the total
/// length up front, so reads past the end report a format error rather
/// than panicking.
struct HeaderReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> HeaderReader<'a> {
    fn take<const N: usize>(&mut self, what: &str) -> Result<[u8; N], CoreError> {
        let end = self.offset + N;
        let bytes: [u8; N] = self
            .data
            .get(self.offset..end)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| CoreError::InvalidFileFormat(format!("Failed to read {what}")))?;
        self.offset = end;
        Ok(bytes)
    }

    fn u16(&mut self, what: &str) -> Result<u16, CoreError> {
        self.take::<2>(what).map(u16::from_le_bytes)
    }

    fn u32(&mut self, what: &str) -> Result<u32, CoreError> {
        self.take::<4>(what).map(u32::from_le_bytes)
    }

    fn u64(&mut self, what: &str) -> Result<u64, CoreError> {
        self.take::<8>(what).map(u64::from_le_bytes)
    }
}

/// Parse a state file into its header and ciphertext slice.
pub fn decode(data: &[u8]) -> Result<(StateFileHeader, &[u8]), CoreError> {
    if data.len() < HEADER_SIZE {
        return Err(CoreError::InvalidFileFormat(
            "File too small to be a dashboard state file".into(),
        ));
    }
    if &data[0..4] != MAGIC {
        return Err(CoreError::InvalidFileFormat(
            "Invalid magic bytes, not a dashboard state file".into(),
        ));
    }

    let mut reader = HeaderReader { data, offset: 4 };
    let version = reader.u16("version")?;
    if version == 0 || version > CURRENT_VERSION {
        return Err(CoreError::UnsupportedVersion(version));
    }

    let kdf_params = KdfParams {
        memory_cost: reader.u32("KDF memory_cost")?,
        time_cost: reader.u32("KDF time_cost")?,
        parallelism: reader.u32("KDF parallelism")?,
    };
    // A crafted header must not make us allocate gigabytes or spin for minutes.
    kdf_params.validate()?;

    let salt = reader.take::<SALT_LEN>("salt")?;
    let nonce = reader.take::<NONCE_LEN>("nonce")?;
    let ciphertext_len = reader.u64("ciphertext length")?;

    let start = reader.offset;
    let available = (data.len() - start) as u64;
    if available < ciphertext_len {
        return Err(CoreError::InvalidFileFormat(format!(
            "File truncated: expected {ciphertext_len} bytes of ciphertext, got {available}"
        )));
    }
    let ciphertext = &data[start..start + ciphertext_len as usize];

    Ok((
        StateFileHeader {
            version,
            kdf_params,
            salt,
            nonce,
            ciphertext_len,
        },
        ciphertext,
    ))
}
