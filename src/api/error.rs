//! Error taxonomy of the HTTP layer and the UI reaction each one calls for.

use serde::Deserialize;

/// Errors returned by every backend call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Missing, bad or expired token (HTTP 401).
    #[error("Authentication required: {0}")]
    Unauthorized(String),
    /// Identity recognised but no application profile exists yet.
    #[error("Profile not found, onboarding required")]
    ProfileNotFound,
    #[error("Access denied: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    /// Rejected input (HTTP 400 or 422).
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },
    /// The request never produced an HTTP response.
    #[error("Network error: {0}")]
    Network(String),
    #[error("Unexpected response body: {0}")]
    Decode(String),
}

/// What the caller should do about a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Drop the session and go to the login entry point.
    RedirectLogin,
    /// Send the user through onboarding.
    Onboarding,
    /// Show the message next to the offending form field.
    Inline,
    /// Show a notification with a "Retry" action.
    Retry,
    /// Show a notification without a retry.
    Notify,
}

impl ApiError {
    /// Map a non-success HTTP status and its body to an error.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = detail_message(body).unwrap_or_else(|| default_message(status));
        match status {
            400 | 422 => Self::Validation(message),
            401 => Self::Unauthorized(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            _ => Self::Server { status, message },
        }
    }

    pub fn from_transport(error: &reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Decode(error.to_string())
        } else if error.is_timeout() {
            Self::Network("Request timed out".to_string())
        } else if error.is_connect() {
            Self::Network(format!("Cannot reach server: {error}"))
        } else {
            Self::Network(error.to_string())
        }
    }

    pub fn action(&self) -> ErrorAction {
        match self {
            Self::Unauthorized(_) => ErrorAction::RedirectLogin,
            Self::ProfileNotFound => ErrorAction::Onboarding,
            Self::Validation(_) => ErrorAction::Inline,
            Self::Network(_) | Self::Server { .. } => ErrorAction::Retry,
            Self::Forbidden(_) | Self::NotFound(_) | Self::Decode(_) => ErrorAction::Notify,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.action() == ErrorAction::Retry
    }

    /// HTTP status behind the error, when there was a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized(_) => Some(401),
            Self::ProfileNotFound | Self::NotFound(_) => Some(404),
            Self::Forbidden(_) => Some(403),
            Self::Server { status, .. } => Some(*status),
            Self::Validation(_) | Self::Network(_) | Self::Decode(_) => None,
        }
    }
}

/// FastAPI error body: `{"detail": "..."}` or `{"detail": [{"msg": ...}]}`.
#[derive(Deserialize)]
struct DetailBody {
    detail: Detail,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Detail {
    Text(String),
    Items(Vec<DetailItem>),
}

#[derive(Deserialize)]
struct DetailItem {
    msg: String,
}

fn detail_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<DetailBody>(trimmed) {
        Ok(DetailBody { detail: Detail::Text(text) }) => Some(text),
        Ok(DetailBody { detail: Detail::Items(items) }) => {
            let joined = items
                .into_iter()
                .map(|item| item.msg)
                .collect::<Vec<_>>()
                .join("; ");
            (!joined.is_empty()).then_some(joined)
        }
        Err(_) if trimmed.starts_with('<') => None,
        Err(_) => Some(trimmed.chars().take(200).collect()),
    }
}

fn default_message(status: u16) -> String {
    match status {
        400 => "Bad request".to_string(),
        401 => "Session expired, please sign in again".to_string(),
        403 => "You don't have permission to do this".to_string(),
        404 => "Resource not found".to_string(),
        422 => "Invalid input".to_string(),
        500..=599 => "Something went wrong on the server".to_string(),
        other => format!("Unexpected status {other}"),
    }
}
