//! Read models derived from a consultation's local state.

use crate::models::{ChatMessage, ChatRole, ChatSession, Diagnostic};

// ═══════════════════════════════════════════
// Side panel
// ═══════════════════════════════════════════

/// What the side panel of a consultation shows.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelView {
    /// A report exists for this chat.
    ReportReady {
        report_id: String,
        summary: String,
        keywords: Vec<String>,
    },
    /// Interview still running: running summary and, once available, the
    /// diagnostic preview.
    Preview {
        summary: Option<String>,
        keywords: Vec<String>,
        diagnostic: Option<Diagnostic>,
    },
}

/// The single definition of "a report is ready": the first message that
/// carries a non-blank report id.
pub fn report_ready_id(messages: &[ChatMessage]) -> Option<&str> {
    messages.iter().find_map(ChatMessage::report_id)
}

pub fn panel_view(
    messages: &[ChatMessage],
    summary: &str,
    keywords: &[String],
    diagnostic: Option<&Diagnostic>,
) -> PanelView {
    match report_ready_id(messages) {
        Some(report_id) => PanelView::ReportReady {
            report_id: report_id.to_string(),
            summary: summary.to_string(),
            keywords: keywords.to_vec(),
        },
        None => PanelView::Preview {
            summary: (!summary.trim().is_empty()).then(|| summary.to_string()),
            keywords: keywords.to_vec(),
            diagnostic: diagnostic.cloned(),
        },
    }
}

// ═══════════════════════════════════════════
// Titles and prompts
// ═══════════════════════════════════════════

const TITLE_MAX_CHARS: usize = 50;

/// Title for the chat history list. Falls back to the first patient
/// message, truncated at 50 characters on a char boundary.
pub fn chat_title(chat: &ChatSession) -> String {
    if let Some(title) = chat.title.as_deref().filter(|t| !t.trim().is_empty()) {
        return title.trim().to_string();
    }
    let first = chat
        .messages
        .iter()
        .find(|m| m.role == ChatRole::Patient)
        .map(|m| m.content.trim())
        .unwrap_or_default();
    if first.is_empty() {
        return "New consultation".to_string();
    }

    let boundary = first
        .char_indices()
        .nth(TITLE_MAX_CHARS)
        .map(|(i, _)| i)
        .unwrap_or(first.len());
    if boundary >= first.len() {
        first.to_string()
    } else {
        format!("{}...", &first[..boundary])
    }
}

/// Suggestions offered under the message box.
pub fn quick_prompts() -> &'static [&'static str] {
    &[
        "When did the symptoms start?",
        "Where exactly is the pain/discomfort?",
        "How severe is it on a scale of 1-10?",
        "What makes it better or worse?",
        "Any other symptoms?",
    ]
}
