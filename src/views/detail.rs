use crate::api::{ApiClient, ApiError};
use crate::core::{DomainDetail, ReviewStatus, StatusUpdate};
use crate::views::ValidationError;
use crate::views::validation::normalize_domain;

pub const NOT_FOUND: &str = "Domain not found.";
pub const LOOKUP_FAILED: &str = "Failed to fetch domain details.";
pub const STATUS_FAILED: &str = "Failed to update status.";
pub const STATUS_SAVED: &str = "Status updated.";

/// Column width of `reviewer_initials` on the server.
pub const MAX_INITIALS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupState {
    Idle,
    Loading,
    Found(DomainDetail),
    NotFoundOrError(String),
}

/// Domain lookup box: one explicit submission, one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainLookup {
    pub query: String,
    state: LookupState,
    invalid: Option<ValidationError>,
    requested: Option<String>,
}

impl Default for DomainLookup {
    fn default() -> Self {
        Self {
            query: String::new(),
            state: LookupState::Idle,
            invalid: None,
            requested: None,
        }
    }
}

/// Lower-cased, trimmed domain that is worth asking the server about.
pub fn prepare_query(input: &str) -> Result<String, ValidationError> {
    let domain = normalize_domain(input);
    if domain.is_empty() || !domain.contains('.') {
        return Err(ValidationError::InvalidDomain);
    }
    Ok(domain)
}

impl DomainLookup {
    pub fn state(&self) -> &LookupState {
        &self.state
    }

    pub fn detail(&self) -> Option<&DomainDetail> {
        match &self.state {
            LookupState::Found(detail) => Some(detail),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<String> {
        if let Some(err) = &self.invalid {
            return Some(err.to_string());
        }
        match &self.state {
            LookupState::NotFoundOrError(msg) => Some(msg.clone()),
            _ => None,
        }
    }

    /// Validates the query. On success moves to `Loading` and returns the domain to fetch.
    /// On failure only the validation message changes.
    pub fn begin_lookup(&mut self) -> Option<String> {
        match prepare_query(&self.query) {
            Ok(domain) => {
                self.invalid = None;
                self.state = LookupState::Loading;
                self.requested = Some(domain.clone());
                Some(domain)
            }
            Err(err) => {
                self.invalid = Some(err);
                None
            }
        }
    }

    /// Re-fetch of a domain already on screen, bypassing the query box.
    pub fn begin_refresh(&mut self, domain: &str) -> String {
        self.invalid = None;
        self.state = LookupState::Loading;
        self.requested = Some(domain.to_string());
        domain.to_string()
    }

    pub fn finish_lookup(&mut self, result: Result<DomainDetail, ApiError>) {
        let requested = self.requested.take().unwrap_or_default();
        self.state = match result {
            Ok(detail) => {
                tracing::debug!(
                    domain = %detail.domain.domain_name,
                    reports = detail.reports.len(),
                    history = detail.status_history.len(),
                    "domain detail loaded"
                );
                LookupState::Found(detail)
            }
            Err(ApiError::NotFound) => {
                tracing::info!(domain = %requested, "domain not found");
                LookupState::NotFoundOrError(NOT_FOUND.to_string())
            }
            Err(err) => {
                tracing::warn!(domain = %requested, error = %err, "fetching domain detail failed");
                LookupState::NotFoundOrError(LOOKUP_FAILED.to_string())
            }
        };
    }

    pub async fn lookup(&mut self, client: &ApiClient) {
        let Some(domain) = self.begin_lookup() else {
            return;
        };
        let result = client.get_domain_detail(&domain).await;
        self.finish_lookup(result);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveState {
    Idle,
    Invalid(ValidationError),
    Saving,
    Success,
    Failure(String),
}

/// Reviewer status form, bound to the domain currently displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusForm {
    domain: String,
    pub new_status: ReviewStatus,
    pub initials: String,
    pub notes: String,
    state: SaveState,
}

impl StatusForm {
    pub fn new(domain: impl Into<String>, default_initials: &str) -> Self {
        Self {
            domain: domain.into(),
            new_status: ReviewStatus::Reviewed,
            initials: default_initials.to_string(),
            notes: String::new(),
            state: SaveState::Idle,
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn state(&self) -> &SaveState {
        &self.state
    }

    pub fn is_saving(&self) -> bool {
        self.state == SaveState::Saving
    }

    pub fn message(&self) -> Option<String> {
        match &self.state {
            SaveState::Idle | SaveState::Saving => None,
            SaveState::Invalid(err) => Some(err.to_string()),
            SaveState::Success => Some(STATUS_SAVED.to_string()),
            SaveState::Failure(msg) => Some(msg.clone()),
        }
    }

    /// Initials are trimmed and required; blank notes become `None`.
    pub fn validate(&self) -> Result<StatusUpdate, ValidationError> {
        let initials = self.initials.trim();
        if initials.is_empty() {
            return Err(ValidationError::MissingInitials);
        }
        if initials.chars().count() > MAX_INITIALS {
            return Err(ValidationError::InitialsTooLong { max: MAX_INITIALS });
        }
        let notes = self.notes.trim();
        Ok(StatusUpdate {
            new_status: self.new_status,
            reviewer_initials: initials.to_string(),
            notes: (!notes.is_empty()).then(|| notes.to_string()),
        })
    }

    pub fn begin_save(&mut self) -> Option<StatusUpdate> {
        if self.is_saving() {
            return None;
        }
        match self.validate() {
            Ok(payload) => {
                self.state = SaveState::Saving;
                Some(payload)
            }
            Err(err) => {
                tracing::debug!(error = %err, "status form rejected locally");
                self.state = SaveState::Invalid(err);
                None
            }
        }
    }

    /// Returns `true` when the save went through and the lookup should be re-run.
    pub fn finish_save(&mut self, result: Result<(), ApiError>) -> bool {
        match result {
            Ok(()) => {
                tracing::info!(domain = %self.domain, status = %self.new_status, "status updated");
                self.state = SaveState::Success;
                true
            }
            Err(err) => {
                tracing::warn!(domain = %self.domain, error = %err, "status update failed");
                self.state = SaveState::Failure(STATUS_FAILED.to_string());
                false
            }
        }
    }
}

/// Lookup plus status form. A successful save re-runs the lookup instead of
/// appending the new history entry locally.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DomainDetailView {
    pub lookup: DomainLookup,
    pub status: Option<StatusForm>,
    default_initials: String,
}

impl DomainDetailView {
    pub fn new(default_initials: impl Into<String>) -> Self {
        Self {
            lookup: DomainLookup::default(),
            status: None,
            default_initials: default_initials.into(),
        }
    }

    pub fn begin_lookup(&mut self) -> Option<String> {
        self.lookup.begin_lookup()
    }

    pub fn finish_lookup(&mut self, result: Result<DomainDetail, ApiError>) {
        self.lookup.finish_lookup(result);
        match self.lookup.detail() {
            Some(detail) => {
                let shown = detail.domain.domain_name.as_str();
                if self.status.as_ref().map(StatusForm::domain) != Some(shown) {
                    self.status = Some(StatusForm::new(shown, &self.default_initials));
                }
            }
            None => {
                if !matches!(self.lookup.state(), LookupState::Loading) {
                    self.status = None;
                }
            }
        }
    }

    /// Returns the target domain and body, or `None` if nothing should be sent.
    pub fn begin_save(&mut self) -> Option<(String, StatusUpdate)> {
        self.lookup.detail()?;
        let form = self.status.as_mut()?;
        let payload = form.begin_save()?;
        Some((form.domain().to_string(), payload))
    }

    /// On success switches the lookup to `Loading` and returns the domain to re-fetch.
    ///
    /// Returns `None` when the form was replaced by another lookup, or when a newer
    /// lookup is already in flight; that lookup's result is what gets shown.
    pub fn finish_save(&mut self, result: Result<(), ApiError>) -> Option<String> {
        let form = self.status.as_mut().filter(|f| f.is_saving())?;
        if !form.finish_save(result) {
            return None;
        }
        if matches!(self.lookup.state(), LookupState::Loading) {
            tracing::debug!(domain = %form.domain(), "refresh skipped, newer lookup pending");
            return None;
        }
        let domain = form.domain().to_string();
        Some(self.lookup.begin_refresh(&domain))
    }

    pub async fn lookup(&mut self, client: &ApiClient) {
        let Some(domain) = self.begin_lookup() else {
            return;
        };
        let result = client.get_domain_detail(&domain).await;
        self.finish_lookup(result);
    }

    /// Saves the status, then re-reads the aggregate from the server.
    pub async fn save_status(&mut self, client: &ApiClient) {
        let Some((domain, payload)) = self.begin_save() else {
            return;
        };
        let result = client.update_domain_status(&domain, &payload).await;
        if let Some(domain) = self.finish_save(result) {
            let refreshed = client.get_domain_detail(&domain).await;
            self.finish_lookup(refreshed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Domain, StatusHistoryEntry};
    use time::macros::datetime;

    fn detail(domain: &str, history: usize) -> DomainDetail {
        DomainDetail {
            domain: Domain {
                domain_id: Some(1),
                domain_name: domain.to_string(),
                current_status: "UNDER_REVIEW".to_string(),
            },
            reports: vec![],
            status_history: (0..history)
                .map(|i| StatusHistoryEntry {
                    status_id: i as i64 + 1,
                    new_status: ReviewStatus::Reviewed,
                    reviewer_initials: "SD".to_string(),
                    notes: None,
                    created_at: datetime!(2025-09-19 08:40:00 UTC),
                })
                .collect(),
        }
    }

    #[test]
    fn query_is_trimmed_lowercased_and_needs_a_dot() {
        assert_eq!(prepare_query("  Example.COM "), Ok("example.com".to_string()));
        assert_eq!(prepare_query("localhost"), Err(ValidationError::InvalidDomain));
        assert_eq!(prepare_query("   "), Err(ValidationError::InvalidDomain));
    }

    #[test]
    fn invalid_query_keeps_previous_result() {
        let mut view = DomainDetailView::new("SD");
        view.lookup.query = "example.com".to_string();
        assert_eq!(view.begin_lookup().as_deref(), Some("example.com"));
        view.finish_lookup(Ok(detail("example.com", 0)));

        view.lookup.query = "nodot".to_string();
        assert!(view.begin_lookup().is_none());
        assert!(view.lookup.detail().is_some());
        assert_eq!(view.lookup.message().as_deref(), Some("Enter a valid domain."));
    }

    #[test]
    fn not_found_and_other_failures_have_distinct_messages() {
        let mut lookup = DomainLookup::default();
        lookup.finish_lookup(Err(ApiError::NotFound));
        assert_eq!(lookup.message().as_deref(), Some(NOT_FOUND));

        lookup.finish_lookup(Err(ApiError::Server {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
        }));
        assert_eq!(lookup.message().as_deref(), Some(LOOKUP_FAILED));
    }

    #[test]
    fn found_detail_creates_status_form_with_default_initials() {
        let mut view = DomainDetailView::new("SD");
        view.finish_lookup(Ok(detail("example.com", 0)));
        let form = view.status.as_ref().expect("status form");
        assert_eq!(form.domain(), "example.com");
        assert_eq!(form.initials, "SD");
        assert_eq!(form.new_status, ReviewStatus::Reviewed);
    }

    #[test]
    fn empty_initials_block_the_save() {
        let mut view = DomainDetailView::new("");
        view.finish_lookup(Ok(detail("example.com", 0)));
        if let Some(form) = view.status.as_mut() {
            form.initials = "   ".to_string();
        }
        assert!(view.begin_save().is_none());
        assert_eq!(
            view.status.as_ref().map(StatusForm::state),
            Some(&SaveState::Invalid(ValidationError::MissingInitials))
        );
    }

    #[test]
    fn overlong_initials_are_rejected() {
        let mut form = StatusForm::new("example.com", "ABCDEFGHI");
        assert_eq!(
            form.begin_save(),
            None,
            "nine characters exceed the server column"
        );
        assert_eq!(
            form.state(),
            &SaveState::Invalid(ValidationError::InitialsTooLong { max: MAX_INITIALS })
        );
    }

    #[test]
    fn blank_notes_are_sent_as_none() {
        let mut form = StatusForm::new("example.com", " sd ");
        form.notes = "   ".to_string();
        let payload = form.validate().expect("valid");
        assert_eq!(payload.reviewer_initials, "sd");
        assert_eq!(payload.notes, None);

        form.notes = " takedown requested ".to_string();
        assert_eq!(
            form.validate().expect("valid").notes.as_deref(),
            Some("takedown requested")
        );
    }

    #[test]
    fn successful_save_triggers_refetch_of_displayed_domain() {
        let mut view = DomainDetailView::new("SD");
        view.finish_lookup(Ok(detail("example.com", 0)));
        view.lookup.query = "something-else.org".to_string();

        let (domain, _) = view.begin_save().expect("save starts");
        assert_eq!(domain, "example.com");
        assert!(view.status.as_ref().is_some_and(StatusForm::is_saving));
        assert!(view.begin_save().is_none(), "second save while in flight");

        let refetch = view.finish_save(Ok(()));
        assert_eq!(refetch.as_deref(), Some("example.com"));
        assert_eq!(view.lookup.state(), &LookupState::Loading);

        view.finish_lookup(Ok(detail("example.com", 1)));
        assert_eq!(view.lookup.detail().map(|d| d.status_history.len()), Some(1));
        assert_eq!(
            view.status.as_ref().and_then(StatusForm::message).as_deref(),
            Some(STATUS_SAVED)
        );
    }

    #[test]
    fn newer_lookup_is_not_replaced_by_save_refresh() {
        let mut view = DomainDetailView::new("SD");
        view.finish_lookup(Ok(detail("a.com", 0)));
        view.begin_save().expect("save starts");

        view.lookup.query = "b.com".to_string();
        assert_eq!(view.begin_lookup().as_deref(), Some("b.com"));

        assert_eq!(view.finish_save(Ok(())), None);
        assert_eq!(view.lookup.state(), &LookupState::Loading);

        view.finish_lookup(Ok(detail("b.com", 0)));
        assert_eq!(
            view.lookup.detail().map(|d| d.domain.domain_name.as_str()),
            Some("b.com")
        );
        assert_eq!(view.status.as_ref().map(StatusForm::domain), Some("b.com"));
    }

    #[test]
    fn save_result_for_a_replaced_form_is_ignored() {
        let mut view = DomainDetailView::new("SD");
        view.finish_lookup(Ok(detail("a.com", 0)));
        view.begin_save().expect("save starts");
        view.finish_lookup(Ok(detail("b.com", 0)));

        assert_eq!(view.finish_save(Ok(())), None);
        assert_eq!(
            view.status.as_ref().map(StatusForm::state),
            Some(&SaveState::Idle)
        );
    }

    #[test]
    fn not_found_is_logged_with_the_domain() {
        use std::io;
        use std::sync::{Arc, Mutex};

        #[derive(Clone)]
        struct Captured(Arc<Mutex<Vec<u8>>>);

        impl io::Write for Captured {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.lock().expect("lock").extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let captured = Captured(Arc::new(Mutex::new(Vec::new())));
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();

        let mut lookup = DomainLookup::default();
        lookup.query = "Missing.Example".to_string();
        tracing::subscriber::with_default(subscriber, || {
            lookup.begin_lookup().expect("valid query");
            lookup.finish_lookup(Err(ApiError::NotFound));
        });

        let out = String::from_utf8(captured.0.lock().expect("lock").clone()).expect("utf8");
        assert!(out.contains("domain not found"), "{out}");
        assert!(out.contains("missing.example"), "{out}");
    }

    #[test]
    fn failed_save_does_not_refetch() {
        let mut view = DomainDetailView::new("SD");
        view.finish_lookup(Ok(detail("example.com", 0)));
        view.begin_save().expect("save starts");
        assert_eq!(view.finish_save(Err(ApiError::NotFound)), None);
        assert!(view.lookup.detail().is_some());
        assert_eq!(
            view.status.as_ref().and_then(StatusForm::message).as_deref(),
            Some(STATUS_FAILED)
        );
    }

    #[test]
    fn looking_up_another_domain_resets_the_status_form() {
        let mut view = DomainDetailView::new("SD");
        view.finish_lookup(Ok(detail("example.com", 0)));
        if let Some(form) = view.status.as_mut() {
            form.notes = "draft".to_string();
        }
        view.finish_lookup(Ok(detail("other.net", 0)));
        let form = view.status.as_ref().expect("status form");
        assert_eq!(form.domain(), "other.net");
        assert!(form.notes.is_empty());
    }
}
