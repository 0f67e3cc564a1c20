use thiserror::Error;

/// Error type of bi-dashboard-core. Fallible public functions return
/// `Result<T, CoreError>`; host shells show `to_string()` in their error banner.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Storage / File ──────────────────────────────────────────────
    #[error("Invalid state file: {0}")]
    InvalidFileFormat(String),

    #[error("Unsupported state file version: {0}")]
    UnsupportedVersion(u16),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Could not decrypt the client state: wrong password or corrupted file")]
    Decryption,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ── File I/O (native only) ──────────────────────────────────────
    #[error("File I/O error: {0}")]
    FileIO(String),

    // ── API / Network ───────────────────────────────────────────────
    #[error("API error ({endpoint}, status {status}): {message}")]
    Api {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Not logged in: a bearer token is required for {0}")]
    Unauthenticated(String),

    // ── Dashboard Logic ─────────────────────────────────────────────
    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Bookmark not found: {0}")]
    BookmarkNotFound(String),

    #[error("Bookmark already exists: {0}")]
    BookmarkExists(String),

    // ── Rendering / Export ──────────────────────────────────────────
    #[error("Rasterization failed for {chart}: {message}")]
    Rasterization { chart: String, message: String },

    #[error("Export failed: {0}")]
    Export(String),
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::FileIO(e.to_string())
    }
}

impl From<bincode::Error> for CoreError {
    fn from(e: bincode::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest errors can embed the full request URL; drop the query string
        // so nothing user-supplied ends up in banners or logs.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::Network(sanitized)
    }
}

impl From<aes_gcm::Error> for CoreError {
    fn from(_: aes_gcm::Error) -> Self {
        CoreError::Decryption
    }
}

impl From<rust_xlsxwriter::XlsxError> for CoreError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        CoreError::Export(format!("spreadsheet: {e}"))
    }
}

impl From<printpdf::Error> for CoreError {
    fn from(e: printpdf::Error) -> Self {
        CoreError::Export(format!("document: {e}"))
    }
}
