use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::enums::{ReviewStatus, UrgencyLevel};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    #[serde(default, deserialize_with = "super::de::null_as_default")]
    pub name: String,
    /// 0.0 to 1.0.
    #[serde(default, deserialize_with = "super::de::null_as_default")]
    pub confidence: f32,
}

impl Hypothesis {
    pub fn confidence_percent(&self) -> u32 {
        (self.confidence.clamp(0.0, 1.0) * 100.0).round() as u32
    }
}

/// Diagnosis preview produced once per chat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    #[serde(default, deserialize_with = "super::de::null_as_default")]
    pub primary_hypothesis: Hypothesis,
    #[serde(default, deserialize_with = "super::de::null_as_default")]
    pub differentials: Vec<Hypothesis>,
    #[serde(default, deserialize_with = "super::de::null_as_default")]
    pub red_flags: Vec<String>,
    #[serde(default)]
    pub urgency: UrgencyLevel,
    #[serde(default, deserialize_with = "super::de::null_as_default")]
    pub rationale: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    #[serde(default, deserialize_with = "super::de::null_as_default")]
    pub primary_diagnosis: Hypothesis,
    #[serde(default, deserialize_with = "super::de::null_as_default")]
    pub differentials: Vec<Hypothesis>,
}

/// Structured clinician-facing report body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoctorReport {
    #[serde(deserialize_with = "super::de::null_as_default")]
    pub patient_id: String,
    #[serde(deserialize_with = "super::de::null_as_default")]
    pub chief_complaint: String,
    #[serde(deserialize_with = "super::de::null_as_default")]
    pub history_of_present_illness: String,
    #[serde(deserialize_with = "super::de::null_as_default")]
    pub pertinent_history: Vec<String>,
    pub exam_findings: Option<String>,
    #[serde(deserialize_with = "super::de::null_as_default")]
    pub assessment: Assessment,
    #[serde(deserialize_with = "super::de::null_as_default")]
    pub red_flags: Vec<String>,
    pub urgency: UrgencyLevel,
    #[serde(deserialize_with = "super::de::null_as_default")]
    pub plan_recommendations: Vec<String>,
    #[serde(deserialize_with = "super::de::null_as_default")]
    pub keywords: Vec<String>,
    #[serde(deserialize_with = "super::de::null_as_default")]
    pub llm_rationale: String,
}

/// Terminal decision recorded by a doctor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorReview {
    pub status: ReviewStatus,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub reviewed_at: Option<String>,
    #[serde(default)]
    pub reviewed_by: Option<String>,
}

/// Snapshot of the reviewing doctor shown to the patient.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoctorDetails {
    pub name: String,
    pub specialty: String,
    pub bio: String,
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub report_id: String,
    pub patient_id: String,
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default, deserialize_with = "super::de::null_as_default")]
    pub chat_id: String,
    #[serde(default)]
    pub chat_title: Option<String>,
    #[serde(default, deserialize_with = "super::de::null_as_default")]
    pub doctor_report: DoctorReport,
    #[serde(default, deserialize_with = "super::de::null_as_default")]
    pub patient_summary: String,
    #[serde(default, deserialize_with = "super::de::null_as_default")]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "super::de::null_as_default")]
    pub reviewed: bool,
    #[serde(default)]
    pub reviewed_at: Option<String>,
    #[serde(default)]
    pub doctor_review: Option<DoctorReview>,
    #[serde(default)]
    pub patient_read: Option<bool>,
    #[serde(default)]
    pub doctor_details: Option<DoctorDetails>,
}

impl Report {
    pub fn urgency(&self) -> &UrgencyLevel {
        &self.doctor_report.urgency
    }

    /// Calendar day of `created_at`. Accepts RFC 3339 (converted to UTC),
    /// naive ISO timestamps as written by the backend, and bare dates.
    pub fn created_date(&self) -> Option<NaiveDate> {
        self.created_at.as_deref().and_then(parse_day)
    }

    pub fn review_status(&self) -> Option<ReviewStatus> {
        self.doctor_review.as_ref().map(|review| review.status)
    }

    /// Reviewed by a doctor but not yet opened by the patient.
    pub fn is_unread_review(&self) -> bool {
        self.reviewed && !self.patient_read.unwrap_or(false)
    }
}

/// Badge count of the patient header.
pub fn unread_review_count(reports: &[Report]) -> usize {
    reports.iter().filter(|r| r.is_unread_review()).count()
}

pub(crate) fn parse_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc().date());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(dt.date());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Doctor report listing. Older backends return a bare array, newer ones
/// wrap it with a pagination cursor. The cursor is not followed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ReportPage {
    Paged {
        items: Vec<Report>,
        #[serde(default)]
        cursor: Option<String>,
    },
    Bare(Vec<Report>),
}

impl ReportPage {
    pub fn into_items(self) -> Vec<Report> {
        match self {
            Self::Paged { items, .. } => items,
            Self::Bare(items) => items,
        }
    }
}

/// Optional query of the report listing endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// Body of `POST /doctor/reports/{id}/review`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewDecision {
    pub status: ReviewStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

impl ReviewDecision {
    pub fn new(status: ReviewStatus, comments: &str) -> Self {
        let trimmed = comments.trim();
        Self {
            status,
            comments: (!trimmed.is_empty()).then(|| trimmed.to_string()),
        }
    }
}

/// Body of the legacy `PATCH /doctor/reports/{id}/review`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkReviewed {
    pub reviewed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

/// Response of `POST /agents/diagnosis/run`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DiagnosisOutcome {
    pub diagnostic: Diagnostic,
    pub report_id: String,
    #[serde(default)]
    pub chat_title: Option<String>,
    #[serde(default)]
    pub patient_summary: Option<String>,
    #[serde(default, deserialize_with = "super::de::null_as_default")]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosisRequest<'a> {
    pub chat_id: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRunRequest<'a> {
    pub chat_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<&'a Diagnostic>,
}

/// Response of `POST /agents/report/run`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReportRunResponse {
    pub report_id: String,
    pub doctor_report: DoctorReport,
    #[serde(default, deserialize_with = "super::de::null_as_default")]
    pub patient_summary: String,
    #[serde(default, deserialize_with = "super::de::null_as_default")]
    pub keywords: Vec<String>,
}
