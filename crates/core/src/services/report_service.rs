use crate::errors::CoreError;
use crate::models::report::{
    validate_recipient, Attachment, EmailReport, Frequency, ReportFormat, ScheduleReport,
};

/// Assembles email and schedule requests for the report endpoints.
pub struct ReportService;

impl ReportService {
    pub fn new() -> Self {
        Self
    }

    /// Wrap exported bytes as a base64 attachment named `{stem}.{ext}`.
    #[must_use]
    pub fn attachment(&self, stem: &str, format: ReportFormat, bytes: &[u8]) -> Attachment {
        let stem = stem.trim();
        let stem = if stem.is_empty() { "dashboard" } else { stem };
        Attachment::from_bytes(format!("{stem}.{}", format.extension()), format, bytes)
    }

    /// Validate and build an email request. At least one attachment is required.
    pub fn email(
        &self,
        recipient: &str,
        message: &str,
        attachments: Vec<Attachment>,
    ) -> Result<EmailReport, CoreError> {
        validate_recipient(recipient)?;
        if attachments.is_empty() {
            return Err(CoreError::ValidationError(
                "An emailed report needs at least one attachment".into(),
            ));
        }
        Ok(EmailReport {
            recipient: recipient.trim().to_string(),
            message: message.to_string(),
            attachments,
        })
    }

    /// Validate and build a schedule request. Only documents and workbooks
    /// can be scheduled.
    pub fn schedule(
        &self,
        frequency: Frequency,
        time: &str,
        format: ReportFormat,
        recipient: &str,
    ) -> Result<ScheduleReport, CoreError> {
        if !matches!(format, ReportFormat::Pdf | ReportFormat::Xlsx) {
            return Err(CoreError::ValidationError(format!(
                "Scheduled reports must be pdf or xlsx, not {}",
                format.extension()
            )));
        }
        ScheduleReport::new(frequency, time, format, recipient)
    }
}

impl Default for ReportService {
    fn default() -> Self {
        Self::new()
    }
}
