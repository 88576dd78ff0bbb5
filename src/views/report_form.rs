use std::time::Duration;

use time::OffsetDateTime;

use crate::api::{ApiClient, ApiError};
use crate::core::timestamp::{form_default, parse_instant};
use crate::core::{AbuseType, NewReport, Report};
use crate::views::ValidationError;
use crate::views::validation::{is_valid_domain, normalize_domain};

/// Delay between a successful submission and the dashboard-wide reload.
pub const RELOAD_DELAY: Duration = Duration::from_millis(500);

pub const CREATE_FAILED: &str = "Failed to create report.";
pub const CREATED: &str = "Report created.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPhase {
    Idle,
    Invalid(ValidationError),
    Submitting,
    Created(Report),
    Failed(String),
}

/// Raw field values as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportForm {
    pub domain: String,
    pub source: String,
    pub abuse_type: AbuseType,
    pub confidence: String,
    pub timestamp: String,
    phase: FormPhase,
}

impl Default for ReportForm {
    fn default() -> Self {
        Self::new(OffsetDateTime::now_utc())
    }
}

impl ReportForm {
    pub fn new(now: OffsetDateTime) -> Self {
        Self {
            domain: String::new(),
            source: String::new(),
            abuse_type: AbuseType::Phishing,
            confidence: "80".to_string(),
            timestamp: form_default(now),
            phase: FormPhase::Idle,
        }
    }

    pub fn phase(&self) -> &FormPhase {
        &self.phase
    }

    pub fn is_submitting(&self) -> bool {
        self.phase == FormPhase::Submitting
    }

    /// Short line shown under the form, if any.
    pub fn message(&self) -> Option<String> {
        match &self.phase {
            FormPhase::Idle | FormPhase::Submitting => None,
            FormPhase::Invalid(err) => Some(err.to_string()),
            FormPhase::Created(_) => Some(CREATED.to_string()),
            FormPhase::Failed(msg) => Some(msg.clone()),
        }
    }

    /// Builds the request body, or explains which field is wrong.
    ///
    /// A timestamp without an offset is read as UTC; one with an offset is converted.
    pub fn validate(&self) -> Result<NewReport, ValidationError> {
        let domain_name = normalize_domain(&self.domain);
        if !is_valid_domain(&domain_name) {
            return Err(ValidationError::InvalidDomain);
        }
        let reporter_source = self.source.trim();
        if reporter_source.is_empty() {
            return Err(ValidationError::MissingSource);
        }
        let confidence_score = self
            .confidence
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|c| (0..=100).contains(c))
            .ok_or(ValidationError::ConfidenceOutOfRange)? as u8;
        let timestamp =
            parse_instant(&self.timestamp).map_err(|_| ValidationError::InvalidTimestamp)?;

        Ok(NewReport {
            domain_name,
            reporter_source: reporter_source.to_string(),
            abuse_type: self.abuse_type,
            timestamp,
            confidence_score,
        })
    }

    /// Validates and moves to `Submitting`. Returns `None` when the request must not be
    /// sent: invalid input, or a submission already in flight.
    pub fn begin_submit(&mut self) -> Option<NewReport> {
        if self.is_submitting() {
            return None;
        }
        match self.validate() {
            Ok(payload) => {
                self.phase = FormPhase::Submitting;
                Some(payload)
            }
            Err(err) => {
                tracing::debug!(error = %err, "report form rejected locally");
                self.phase = FormPhase::Invalid(err);
                None
            }
        }
    }

    pub fn finish_submit(&mut self, result: Result<Report, ApiError>) {
        self.phase = match result {
            Ok(report) => {
                tracing::info!(
                    report_id = report.report_id,
                    domain = %report.domain_name,
                    "report created"
                );
                FormPhase::Created(report)
            }
            Err(err) => {
                tracing::warn!(error = %err, "creating report failed");
                FormPhase::Failed(CREATE_FAILED.to_string())
            }
        };
    }

    /// Full round trip. `None` when the report was not created; see [`Self::phase`].
    pub async fn submit(&mut self, client: &ApiClient) -> Option<&Report> {
        let payload = self.begin_submit()?;
        let result = client.create_report(&payload).await;
        self.finish_submit(result);
        match &self.phase {
            FormPhase::Created(report) => Some(report),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn filled() -> ReportForm {
        let mut form = ReportForm::new(datetime!(2025-09-19 08:30:00 UTC));
        form.domain = "  Verify-PayPal-Online.online ".to_string();
        form.source = " Netcraft ".to_string();
        form.confidence = "10".to_string();
        form
    }

    #[test]
    fn defaults_mirror_the_blank_form() {
        let form = ReportForm::new(datetime!(2025-09-19 08:30:12.5 UTC));
        assert_eq!(form.abuse_type, AbuseType::Phishing);
        assert_eq!(form.confidence, "80");
        assert_eq!(form.timestamp, "2025-09-19T08:30:12");
        assert_eq!(form.phase(), &FormPhase::Idle);
    }

    #[test]
    fn valid_form_normalizes_fields() {
        let payload = filled().validate().expect("valid");
        assert_eq!(payload.domain_name, "verify-paypal-online.online");
        assert_eq!(payload.reporter_source, "Netcraft");
        assert_eq!(payload.confidence_score, 10);
        assert_eq!(payload.timestamp, datetime!(2025-09-19 08:30:00 UTC));
    }

    #[test]
    fn explicit_offset_is_converted_not_relabelled() {
        let mut form = filled();
        form.timestamp = "2025-09-19T10:30:00+02:00".to_string();
        let payload = form.validate().expect("valid");
        assert_eq!(payload.timestamp, datetime!(2025-09-19 08:30:00 UTC));
    }

    #[test]
    fn domain_without_dot_is_rejected() {
        let mut form = filled();
        form.domain = "example".to_string();
        assert_eq!(form.validate(), Err(ValidationError::InvalidDomain));
        assert!(form.begin_submit().is_none());
        assert_eq!(form.phase(), &FormPhase::Invalid(ValidationError::InvalidDomain));
        assert_eq!(form.message().as_deref(), Some("Enter a valid domain."));
    }

    #[test]
    fn domain_with_inner_whitespace_is_rejected() {
        let mut form = filled();
        form.domain = "bad domain.com".to_string();
        assert_eq!(form.validate(), Err(ValidationError::InvalidDomain));
    }

    #[test]
    fn blank_source_is_rejected() {
        let mut form = filled();
        form.source = "   ".to_string();
        assert_eq!(form.validate(), Err(ValidationError::MissingSource));
    }

    #[test]
    fn confidence_must_be_an_integer_in_range() {
        for bad in ["-1", "101", "abc", "", "50.5"] {
            let mut form = filled();
            form.confidence = bad.to_string();
            assert_eq!(
                form.validate(),
                Err(ValidationError::ConfidenceOutOfRange),
                "confidence={bad:?}"
            );
        }
        for good in ["0", "100", " 42 "] {
            let mut form = filled();
            form.confidence = good.to_string();
            assert!(form.validate().is_ok(), "confidence={good:?}");
        }
    }

    #[test]
    fn unparseable_timestamp_is_rejected() {
        let mut form = filled();
        form.timestamp = "19/09/2025".to_string();
        assert_eq!(form.validate(), Err(ValidationError::InvalidTimestamp));
    }

    #[test]
    fn submit_is_blocked_while_in_flight() {
        let mut form = filled();
        assert!(form.begin_submit().is_some());
        assert!(form.is_submitting());
        assert!(form.begin_submit().is_none());
    }

    #[test]
    fn server_failure_yields_generic_message() {
        let mut form = filled();
        form.begin_submit();
        form.finish_submit(Err(ApiError::Rejected {
            status: reqwest::StatusCode::UNPROCESSABLE_ENTITY,
            detail: "confidence_score".to_string(),
        }));
        assert_eq!(form.message().as_deref(), Some(CREATE_FAILED));
        assert!(!form.is_submitting());
    }
}
