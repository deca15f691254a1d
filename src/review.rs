//! Doctor report review: client-side filtering of the report list and the
//! review dialog.
//!
//! The list is fetched once per `refresh`; filtering never touches the
//! network. A report's `reviewed` flag only moves from false to true in the
//! local cache, whatever a stale listing says.

use chrono::NaiveDate;

use crate::api::{ApiError, ReviewApi};
use crate::models::{
    DoctorReview, Report, ReportQuery, ReviewDecision, ReviewStatus, UrgencyBucket,
};
use crate::notify::{Notification, RetryAction};

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("No review dialog is open")]
    NoDialog,
    #[error("Report not found: {0}")]
    UnknownReport(String),
    #[error("A review is already being submitted")]
    Busy,
    #[error(transparent)]
    Api(#[from] ApiError),
}

// ═══════════════════════════════════════════════════════════
// Filter
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewMode {
    /// Unreviewed reports.
    #[default]
    Pending,
    /// Reviewed reports.
    Approved,
    /// All reports matching a non-empty search.
    Search,
}

impl ViewMode {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Pending => "Pending Reviews",
            Self::Approved => "Approved Reports",
            Self::Search => "Patient Search",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UrgencyFilter {
    #[default]
    All,
    /// emergency, critical, urgent, high
    Critical,
    /// routine, normal, low
    Routine,
    /// Lowercase label compared verbatim.
    Exact(String),
}

impl UrgencyFilter {
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "" | "all" => Self::All,
            "critical" => Self::Critical,
            "routine" => Self::Routine,
            other => Self::Exact(other.to_string()),
        }
    }

    fn matches(&self, report: &Report) -> bool {
        let urgency = report.urgency();
        match self {
            Self::All => true,
            Self::Critical => urgency.bucket() == UrgencyBucket::Critical,
            Self::Routine => urgency.bucket() == UrgencyBucket::Routine,
            Self::Exact(label) => urgency.as_str() == label,
        }
    }
}

/// Inclusive range of calendar days. Without `to` it covers `from` only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn day(day: NaiveDate) -> Self {
        Self { from: day, to: None }
    }

    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to: Some(to) }
    }

    /// An inverted range contains nothing.
    pub fn contains(&self, day: NaiveDate) -> bool {
        let end = self.to.unwrap_or(self.from);
        self.from <= day && day <= end
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilter {
    pub view: ViewMode,
    pub search: String,
    pub urgency: UrgencyFilter,
    pub range: Option<DateRange>,
}

impl ReportFilter {
    pub fn matches(&self, report: &Report) -> bool {
        match self.view {
            ViewMode::Approved if !report.reviewed => return false,
            ViewMode::Pending if report.reviewed => return false,
            _ => {}
        }

        let query = self.search.trim().to_lowercase();
        if query.is_empty() {
            if self.view == ViewMode::Search {
                return false;
            }
        } else {
            let name_hit = report
                .patient_name
                .as_deref()
                .is_some_and(|name| name.to_lowercase().contains(&query));
            let id_hit = report.patient_id.to_lowercase().contains(&query);
            if !name_hit && !id_hit {
                return false;
            }
        }

        if !self.urgency.matches(report) {
            return false;
        }

        match self.range {
            Some(range) => report.created_date().is_some_and(|day| range.contains(day)),
            None => true,
        }
    }

    pub fn apply<'a>(&self, reports: &'a [Report]) -> Vec<&'a Report> {
        reports.iter().filter(|r| self.matches(r)).collect()
    }
}

// ═══════════════════════════════════════════════════════════
// Review dialog
// ═══════════════════════════════════════════════════════════

/// Draft decision for one report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewDialog {
    pub report_id: String,
    pub status: ReviewStatus,
    pub comments: String,
}

impl ReviewDialog {
    fn for_report(report: &Report) -> Self {
        match &report.doctor_review {
            Some(review) => Self {
                report_id: report.report_id.clone(),
                status: review.status,
                comments: review.comments.clone().unwrap_or_default(),
            },
            None => Self {
                report_id: report.report_id.clone(),
                status: ReviewStatus::Approved,
                comments: String::new(),
            },
        }
    }

    pub fn decision(&self) -> ReviewDecision {
        ReviewDecision::new(self.status, &self.comments)
    }
}

// ═══════════════════════════════════════════════════════════
// ReviewFlow
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct ReviewFlow {
    reports: Vec<Report>,
    loaded: bool,
    load_error: Option<ApiError>,
    filter: ReportFilter,
    detail: Option<Report>,
    dialog: Option<ReviewDialog>,
    submitting: bool,
    notifications: Vec<Notification>,
}

impl ReviewFlow {
    pub fn new(view: ViewMode) -> Self {
        Self {
            filter: ReportFilter {
                view,
                ..ReportFilter::default()
            },
            ..Self::default()
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn load_error(&self) -> Option<&ApiError> {
        self.load_error.as_ref()
    }

    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    pub fn filter(&self) -> &ReportFilter {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut ReportFilter {
        &mut self.filter
    }

    /// Reports passing the current filter, in listing order.
    pub fn rows(&self) -> Vec<&Report> {
        self.filter.apply(&self.reports)
    }

    pub fn pending_count(&self) -> usize {
        self.reports.iter().filter(|r| !r.reviewed).count()
    }

    pub fn detail(&self) -> Option<&Report> {
        self.detail.as_ref()
    }

    pub fn dialog(&self) -> Option<&ReviewDialog> {
        self.dialog.as_ref()
    }

    pub fn dialog_mut(&mut self) -> Option<&mut ReviewDialog> {
        self.dialog.as_mut()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    // ── Fetching ─────────────────────────────────────────────

    /// Fetch the whole report list once. The pagination cursor is not
    /// followed.
    pub async fn refresh<A: ReviewApi>(&mut self, api: &A) -> Result<(), ReviewError> {
        match api.list_doctor_reports(&ReportQuery::default()).await {
            Ok(fresh) => {
                self.reports = fresh
                    .into_iter()
                    .map(|report| {
                        let known = self.reports.iter().find(|r| r.report_id == report.report_id);
                        keep_reviewed(report, known)
                    })
                    .collect();
                self.loaded = true;
                self.load_error = None;
                tracing::debug!(count = self.reports.len(), "Doctor reports loaded");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load doctor reports");
                self.notifications.push(Notification::from_error(
                    "Failed to load reports",
                    &e,
                    RetryAction::LoadReports,
                ));
                self.load_error = Some(e.clone());
                Err(e.into())
            }
        }
    }

    /// Fetch one report for the detail view.
    pub async fn open_detail<A: ReviewApi>(
        &mut self,
        api: &A,
        report_id: &str,
    ) -> Result<&Report, ReviewError> {
        let fetched = api.get_doctor_report(report_id).await?;
        let known = self
            .detail
            .as_ref()
            .filter(|r| r.report_id == report_id)
            .or_else(|| self.reports.iter().find(|r| r.report_id == report_id));
        let report = keep_reviewed(fetched, known);
        self.upsert(&report);
        Ok(self.detail.insert(report))
    }

    // ── Reviewing ────────────────────────────────────────────

    /// Open the dialog for `report_id`, pre-filled from any earlier
    /// decision.
    pub fn open_review(&mut self, report_id: &str) -> Result<&mut ReviewDialog, ReviewError> {
        let report = self
            .detail
            .as_ref()
            .filter(|r| r.report_id == report_id)
            .or_else(|| self.reports.iter().find(|r| r.report_id == report_id))
            .ok_or_else(|| ReviewError::UnknownReport(report_id.to_string()))?;
        let dialog = ReviewDialog::for_report(report);
        Ok(self.dialog.insert(dialog))
    }

    pub fn cancel_review(&mut self) {
        self.dialog = None;
    }

    /// Submit the open dialog. On success the dialog closes and both the
    /// list and the detail are fetched again. On failure the dialog stays
    /// open and a retryable notification is raised.
    pub async fn submit<A: ReviewApi>(&mut self, api: &A) -> Result<(), ReviewError> {
        if self.submitting {
            return Err(ReviewError::Busy);
        }
        let dialog = self.dialog.clone().ok_or(ReviewError::NoDialog)?;
        let decision = dialog.decision();

        self.submitting = true;
        let result = api.submit_review(&dialog.report_id, &decision).await;
        self.submitting = false;

        if let Err(e) = result {
            tracing::warn!(report_id = %dialog.report_id, error = %e, "Review submission failed");
            self.notifications.push(Notification::from_error(
                "Failed to submit review",
                &e,
                RetryAction::SubmitReview {
                    report_id: dialog.report_id.clone(),
                },
            ));
            return Err(e.into());
        }

        tracing::info!(report_id = %dialog.report_id, status = %decision.status, "Review submitted");
        self.dialog = None;
        self.mark_local(&dialog.report_id, &decision);
        self.notifications.push(Notification::info(
            "Review submitted",
            format!("Report marked as {}", decision.status),
        ));

        // The decision is recorded; refetch failures only raise notifications.
        if let Err(e) = self.refresh(api).await {
            tracing::warn!(error = %e, "Failed to reload reports after review");
        }
        if let Err(e) = self.open_detail(api, &dialog.report_id).await {
            tracing::warn!(report_id = %dialog.report_id, error = %e, "Failed to reload report");
        }
        Ok(())
    }

    fn mark_local(&mut self, report_id: &str, decision: &ReviewDecision) {
        let review = DoctorReview {
            status: decision.status,
            comments: decision.comments.clone(),
            reviewed_at: None,
            reviewed_by: None,
        };
        let targets = self
            .reports
            .iter_mut()
            .chain(self.detail.as_mut())
            .filter(|r| r.report_id == report_id);
        for report in targets {
            report.reviewed = true;
            report.doctor_review = Some(review.clone());
        }
    }

    fn upsert(&mut self, report: &Report) {
        if let Some(slot) = self.reports.iter_mut().find(|r| r.report_id == report.report_id) {
            *slot = report.clone();
        }
    }
}

/// Carry a known review over a fetched copy that says "not reviewed".
fn keep_reviewed(mut fetched: Report, known: Option<&Report>) -> Report {
    if let Some(known) = known.filter(|k| k.reviewed && !fetched.reviewed) {
        fetched.reviewed = true;
        if fetched.doctor_review.is_none() {
            fetched.doctor_review = known.doctor_review.clone();
        }
        if fetched.reviewed_at.is_none() {
            fetched.reviewed_at = known.reviewed_at.clone();
        }
    }
    fetched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DoctorReport, UrgencyLevel};
    use crate::notify::Severity;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        List,
        Get(String),
        Submit(String, ReviewDecision),
    }

    #[derive(Default)]
    struct MockReviewApi {
        calls: Mutex<Vec<Call>>,
        listings: Mutex<VecDeque<Result<Vec<Report>, ApiError>>>,
        details: Mutex<VecDeque<Result<Report, ApiError>>>,
        submits: Mutex<VecDeque<Result<(), ApiError>>>,
    }

    impl MockReviewApi {
        fn listing(self, reports: Vec<Report>) -> Self {
            self.listings.lock().unwrap().push_back(Ok(reports));
            self
        }

        fn listing_err(self, error: ApiError) -> Self {
            self.listings.lock().unwrap().push_back(Err(error));
            self
        }

        fn detail(self, report: Report) -> Self {
            self.details.lock().unwrap().push_back(Ok(report));
            self
        }

        fn submit_result(self, result: Result<(), ApiError>) -> Self {
            self.submits.lock().unwrap().push_back(result);
            self
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ReviewApi for MockReviewApi {
        async fn list_doctor_reports(&self, _query: &ReportQuery) -> Result<Vec<Report>, ApiError> {
            self.calls.lock().unwrap().push(Call::List);
            self.listings
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn get_doctor_report(&self, report_id: &str) -> Result<Report, ApiError> {
            self.calls.lock().unwrap().push(Call::Get(report_id.to_string()));
            self.details
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ApiError::NotFound(report_id.to_string())))
        }

        async fn submit_review(&self, report_id: &str, decision: &ReviewDecision) -> Result<(), ApiError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Submit(report_id.to_string(), decision.clone()));
            self.submits.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }
    }

    fn report(id: &str, name: &str, urgency: &str, created: &str, reviewed: bool) -> Report {
        Report {
            report_id: id.into(),
            patient_id: format!("pat-{id}"),
            patient_name: Some(name.into()),
            chat_id: format!("chat-{id}"),
            chat_title: None,
            doctor_report: DoctorReport {
                urgency: UrgencyLevel::parse(urgency),
                ..DoctorReport::default()
            },
            patient_summary: String::new(),
            keywords: Vec::new(),
            created_at: Some(created.into()),
            reviewed,
            reviewed_at: None,
            doctor_review: None,
            patient_read: None,
            doctor_details: None,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ids(rows: &[&Report]) -> Vec<String> {
        rows.iter().map(|r| r.report_id.clone()).collect()
    }

    fn sample() -> Vec<Report> {
        vec![
            report("r1", "Alice Martin", "Urgent", "2025-03-10T08:00:00", false),
            report("r2", "Bob Stone", "Low", "2025-03-11T12:00:00", false),
            report("r3", "Carla Diaz", "routine", "2025-03-12T23:59:00", true),
            report("r4", "alice cooper", "Emergency", "2025-03-12T00:00:00", false),
        ]
    }

    // ── Filter ───────────────────────────────────────────────

    #[test]
    fn view_mode_splits_on_reviewed() {
        let reports = sample();
        let pending = ReportFilter::default();
        assert_eq!(ids(&pending.apply(&reports)), ["r1", "r2", "r4"]);

        let approved = ReportFilter { view: ViewMode::Approved, ..ReportFilter::default() };
        assert_eq!(ids(&approved.apply(&reports)), ["r3"]);
    }

    #[test]
    fn search_view_with_empty_query_shows_nothing() {
        let reports = sample();
        let mut filter = ReportFilter { view: ViewMode::Search, ..ReportFilter::default() };
        assert!(filter.apply(&reports).is_empty());

        filter.search = "   ".into();
        assert!(filter.apply(&reports).is_empty());

        filter.search = "ALICE".into();
        assert_eq!(ids(&filter.apply(&reports)), ["r1", "r4"]);
    }

    #[test]
    fn search_matches_patient_id() {
        let reports = sample();
        let filter = ReportFilter { search: "PAT-R2".into(), ..ReportFilter::default() };
        assert_eq!(ids(&filter.apply(&reports)), ["r2"]);
    }

    #[test]
    fn urgency_buckets() {
        let reports = sample();
        let critical = ReportFilter { urgency: UrgencyFilter::Critical, ..ReportFilter::default() };
        assert_eq!(ids(&critical.apply(&reports)), ["r1", "r4"]);

        let routine = ReportFilter { urgency: UrgencyFilter::Routine, ..ReportFilter::default() };
        assert_eq!(ids(&routine.apply(&reports)), ["r2"]);

        let exact = ReportFilter { urgency: UrgencyFilter::parse("Emergency"), ..ReportFilter::default() };
        assert_eq!(ids(&exact.apply(&reports)), ["r4"]);
    }

    #[test]
    fn urgency_filter_parse() {
        assert_eq!(UrgencyFilter::parse("all"), UrgencyFilter::All);
        assert_eq!(UrgencyFilter::parse("Critical"), UrgencyFilter::Critical);
        assert_eq!(UrgencyFilter::parse("ROUTINE"), UrgencyFilter::Routine);
        assert_eq!(UrgencyFilter::parse("High"), UrgencyFilter::Exact("high".into()));
    }

    #[test]
    fn from_only_range_covers_a_single_day() {
        let reports = sample();
        let filter = ReportFilter {
            view: ViewMode::Search,
            search: "pat".into(),
            range: Some(DateRange::day(day(2025, 3, 12))),
            ..ReportFilter::default()
        };
        assert_eq!(ids(&filter.apply(&reports)), ["r3", "r4"]);
    }

    #[test]
    fn range_is_inclusive_on_both_ends() {
        let reports = sample();
        let filter = ReportFilter {
            range: Some(DateRange::between(day(2025, 3, 10), day(2025, 3, 11))),
            ..ReportFilter::default()
        };
        assert_eq!(ids(&filter.apply(&reports)), ["r1", "r2"]);

        let inverted = ReportFilter {
            range: Some(DateRange::between(day(2025, 3, 11), day(2025, 3, 10))),
            ..ReportFilter::default()
        };
        assert!(inverted.apply(&reports).is_empty());
    }

    #[test]
    fn range_excludes_reports_without_dates() {
        let mut undated = report("r5", "Dan", "routine", "", false);
        undated.created_at = None;
        let garbled = report("r6", "Eve", "routine", "not a date", false);
        let reports = vec![undated, garbled];

        assert_eq!(ReportFilter::default().apply(&reports).len(), 2);
        let filter = ReportFilter {
            range: Some(DateRange::day(day(2025, 3, 10))),
            ..ReportFilter::default()
        };
        assert!(filter.apply(&reports).is_empty());
    }

    #[test]
    fn filters_compose() {
        let reports = sample();
        let filter = ReportFilter {
            view: ViewMode::Pending,
            search: "alice".into(),
            urgency: UrgencyFilter::Critical,
            range: Some(DateRange::day(day(2025, 3, 10))),
        };
        assert_eq!(ids(&filter.apply(&reports)), ["r1"]);
    }

    // ── Flow ─────────────────────────────────────────────────

    #[tokio::test]
    async fn refresh_fetches_once_and_filters_locally() {
        let api = MockReviewApi::default().listing(sample());
        let mut flow = ReviewFlow::new(ViewMode::Pending);

        flow.refresh(&api).await.unwrap();
        assert!(flow.is_loaded());
        assert_eq!(ids(&flow.rows()), ["r1", "r2", "r4"]);
        assert_eq!(flow.pending_count(), 3);

        flow.filter_mut().urgency = UrgencyFilter::Routine;
        assert_eq!(ids(&flow.rows()), ["r2"]);
        assert_eq!(api.calls(), vec![Call::List]);
    }

    #[tokio::test]
    async fn refresh_failure_notifies_with_retry() {
        let api = MockReviewApi::default().listing_err(ApiError::Network("offline".into()));
        let mut flow = ReviewFlow::default();

        assert!(flow.refresh(&api).await.is_err());
        assert!(!flow.is_loaded());
        assert!(flow.load_error().is_some());
        let notes = flow.take_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].retry, Some(RetryAction::LoadReports));
    }

    #[tokio::test]
    async fn reviewed_flag_never_moves_back() {
        let mut stale = sample();
        stale[2].reviewed = false;
        let api = MockReviewApi::default().listing(sample()).listing(stale);
        let mut flow = ReviewFlow::new(ViewMode::Approved);

        flow.refresh(&api).await.unwrap();
        assert_eq!(ids(&flow.rows()), ["r3"]);
        flow.refresh(&api).await.unwrap();
        assert_eq!(ids(&flow.rows()), ["r3"]);
    }

    #[tokio::test]
    async fn open_review_prefills_existing_decision() {
        let mut reports = sample();
        reports[2].doctor_review = Some(DoctorReview {
            status: ReviewStatus::Rejected,
            comments: Some("Order imaging first".into()),
            reviewed_at: None,
            reviewed_by: None,
        });
        let api = MockReviewApi::default().listing(reports);
        let mut flow = ReviewFlow::default();
        flow.refresh(&api).await.unwrap();

        let dialog = flow.open_review("r3").unwrap();
        assert_eq!(dialog.status, ReviewStatus::Rejected);
        assert_eq!(dialog.comments, "Order imaging first");

        let dialog = flow.open_review("r1").unwrap();
        assert_eq!(dialog.status, ReviewStatus::Approved);
        assert!(dialog.comments.is_empty());

        assert!(matches!(flow.open_review("missing"), Err(ReviewError::UnknownReport(_))));
    }

    #[tokio::test]
    async fn submit_success_closes_dialog_and_refetches() {
        let mut reviewed = sample()[0].clone();
        reviewed.reviewed = true;
        let api = MockReviewApi::default()
            .listing(sample())
            .listing(sample())
            .detail(reviewed);
        let mut flow = ReviewFlow::default();
        flow.refresh(&api).await.unwrap();

        let dialog = flow.open_review("r1").unwrap();
        dialog.status = ReviewStatus::Rejected;
        dialog.comments = "  Needs follow-up  ".into();
        flow.submit(&api).await.unwrap();

        assert!(flow.dialog().is_none());
        assert_eq!(
            api.calls(),
            vec![
                Call::List,
                Call::Submit(
                    "r1".into(),
                    ReviewDecision {
                        status: ReviewStatus::Rejected,
                        comments: Some("Needs follow-up".into()),
                    }
                ),
                Call::List,
                Call::Get("r1".into()),
            ]
        );
        // Second listing is stale but the local decision holds.
        assert!(!ids(&flow.rows()).contains(&"r1".to_string()));
        assert_eq!(flow.detail().map(|r| r.reviewed), Some(true));
        let notes = flow.take_notifications();
        assert!(notes.iter().any(|n| n.severity == Severity::Info));
    }

    #[tokio::test]
    async fn submit_succeeds_when_reload_fails() {
        let api = MockReviewApi::default()
            .listing(sample())
            .listing_err(ApiError::Network("offline".into()));
        let mut flow = ReviewFlow::default();
        flow.refresh(&api).await.unwrap();
        flow.open_review("r2").unwrap();

        flow.submit(&api).await.unwrap();
        assert!(flow.dialog().is_none());
        assert!(flow.reports()[1].reviewed);
        assert!(flow.load_error().is_some());

        let notes = flow.take_notifications();
        assert!(notes.iter().any(|n| n.severity == Severity::Info));
        assert!(notes.iter().any(|n| n.retry == Some(RetryAction::LoadReports)));
    }

    #[tokio::test]
    async fn submit_failure_keeps_dialog_open() {
        let api = MockReviewApi::default()
            .listing(sample())
            .submit_result(Err(ApiError::Server { status: 503, message: "busy".into() }));
        let mut flow = ReviewFlow::default();
        flow.refresh(&api).await.unwrap();
        flow.open_review("r2").unwrap();

        assert!(matches!(flow.submit(&api).await, Err(ReviewError::Api(_))));
        assert_eq!(flow.dialog().map(|d| d.report_id.as_str()), Some("r2"));
        assert!(!flow.is_submitting());
        assert!(!flow.reports()[1].reviewed);

        let notes = flow.take_notifications();
        assert_eq!(
            notes[0].retry,
            Some(RetryAction::SubmitReview { report_id: "r2".into() })
        );
        assert_eq!(api.calls().len(), 2);
    }

    #[tokio::test]
    async fn submit_without_dialog_is_rejected() {
        let api = MockReviewApi::default();
        let mut flow = ReviewFlow::default();
        assert!(matches!(flow.submit(&api).await, Err(ReviewError::NoDialog)));
        assert!(api.calls().is_empty());
    }
}
