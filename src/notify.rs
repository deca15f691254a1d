//! User-facing notifications raised by the flows.

use crate::api::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

/// Operation a "Retry" button re-invokes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryAction {
    StartChat,
    LoadChat { chat_id: String },
    /// Re-send the optimistic message with this local id.
    SendMessage { chat_id: String, local_id: u64 },
    RunDiagnosis { chat_id: String },
    LoadReports,
    SubmitReview { report_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub retry: Option<RetryAction>,
}

impl Notification {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Info,
            retry: None,
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Error,
            retry: None,
        }
    }

    /// Error notification for a failed call. `retry` is kept only when the
    /// error is one a retry can fix (network or server failure).
    pub fn from_error(title: impl Into<String>, error: &ApiError, retry: RetryAction) -> Self {
        let mut notification = Self::error(title, error.to_string());
        if error.is_retryable() {
            notification.retry = Some(retry);
        }
        notification
    }

    pub fn is_retryable(&self) -> bool {
        self.retry.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_errors_keep_retry() {
        let err = ApiError::Network("connection reset".into());
        let n = Notification::from_error("Failed to start chat", &err, RetryAction::StartChat);
        assert_eq!(n.severity, Severity::Error);
        assert_eq!(n.retry, Some(RetryAction::StartChat));
        assert!(n.description.contains("connection reset"));
    }

    #[test]
    fn validation_errors_drop_retry() {
        let err = ApiError::Validation("bad".into());
        let n = Notification::from_error("Failed", &err, RetryAction::LoadReports);
        assert!(!n.is_retryable());
    }
}
