use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Artifact format a report can be delivered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Pdf,
    Xlsx,
    Png,
    Csv,
}

impl ReportFormat {
    #[must_use]
    pub fn mime_type(&self) -> &'static str {
        match self {
            ReportFormat::Pdf => "application/pdf",
            ReportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ReportFormat::Png => "image/png",
            ReportFormat::Csv => "text/csv",
        }
    }

    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Pdf => "pdf",
            ReportFormat::Xlsx => "xlsx",
            ReportFormat::Png => "png",
            ReportFormat::Csv => "csv",
        }
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(ReportFormat::Pdf),
            "xlsx" | "excel" => Ok(ReportFormat::Xlsx),
            "png" => Ok(ReportFormat::Png),
            "csv" => Ok(ReportFormat::Csv),
            other => Err(CoreError::ValidationError(format!("Unknown report format '{other}'"))),
        }
    }
}

/// How often a scheduled report is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl std::str::FromStr for Frequency {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            other => Err(CoreError::ValidationError(format!("Unknown frequency '{other}'"))),
        }
    }
}

/// A file attached to an emailed report, base64-encoded for the JSON body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub mime_type: String,
    /// Standard base64 of the file bytes
    pub content: String,
}

impl Attachment {
    pub fn from_bytes(filename: impl Into<String>, format: ReportFormat, bytes: &[u8]) -> Self {
        Self {
            filename: filename.into(),
            mime_type: format.mime_type().to_string(),
            content: STANDARD.encode(bytes),
        }
    }

    /// Decoded size in bytes.
    #[must_use]
    pub fn decoded_len(&self) -> usize {
        STANDARD.decode(&self.content).map(|b| b.len()).unwrap_or(0)
    }
}

/// Body of `POST /api/email_me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailReport {
    pub recipient: String,
    pub message: String,
    pub attachments: Vec<Attachment>,
}

/// Body of `POST /api/schedule_report`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleReport {
    pub frequency: Frequency,
    /// Local send time, `HH:MM`
    pub time: String,
    pub format: ReportFormat,
    pub recipient: String,
}

impl ScheduleReport {
    /// Build a schedule request, validating the time and recipient.
    pub fn new(
        frequency: Frequency,
        time: &str,
        format: ReportFormat,
        recipient: &str,
    ) -> Result<Self, CoreError> {
        let parsed = NaiveTime::parse_from_str(time.trim(), "%H:%M").map_err(|_| {
            CoreError::ValidationError(format!("Invalid time '{time}': expected HH:MM"))
        })?;
        validate_recipient(recipient)?;
        Ok(Self {
            frequency,
            time: parsed.format("%H:%M").to_string(),
            format,
            recipient: recipient.trim().to_string(),
        })
    }
}

/// Minimal `local@domain.tld` shape check.
pub fn validate_recipient(recipient: &str) -> Result<(), CoreError> {
    let r = recipient.trim();
    let valid = match r.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
                && !r.contains(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(CoreError::ValidationError(format!(
            "Invalid recipient address '{recipient}'"
        )))
    }
}
