//! Chat consultation flow.
//!
//! One `ChatFlow` drives one chat id through
//! `loading → active → (awaiting-diagnosis) → report-ready`.
//!
//! Sending is split in three steps so a UI can apply the optimistic echo
//! before awaiting anything:
//! - `begin_send` appends the patient message tagged `Pending` and turns
//!   the typing indicator on.
//! - `dispatch_send` uploads attachments concurrently, then posts the text
//!   with the collected upload ids in one message call.
//! - `finish_send` applies the reply. The optimistic message is never
//!   removed; it ends up `Sent` or `Failed`.
//!
//! `send` composes the three and starts the diagnosis when the agent's
//! reply contains the completion phrase.

pub mod sentinel;
pub mod view;

use futures_util::future::try_join_all;

use crate::api::{ApiError, ConsultationApi};
use crate::gate::Route;
use crate::models::{
    ChatMessage, ChatRole, Delivery, Diagnostic, DiagnosisOutcome, LocalAttachment, MessageReply,
    SendMessageRequest,
};
use crate::notify::{Notification, RetryAction};
use crate::scope::ViewScope;

pub use sentinel::{is_interview_complete, DIAGNOSIS_SENTINEL};
pub use view::{chat_title, panel_view, quick_prompts, report_ready_id, PanelView};

/// Content shown for a message made only of attachments.
pub const FILES_ONLY_CONTENT: &str = "Sent files";

const DIAGNOSIS_MESSAGE: &str =
    "**Diagnosis Complete.**\n\nI have generated a detailed report for you.";

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// A send or diagnosis is already in flight.
    #[error("Another request is still in progress")]
    Busy,
    #[error("Message {0} cannot be re-sent")]
    NotResendable(u64),
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPhase {
    Loading,
    Active,
    AwaitingDiagnosis,
    ReportReady,
    Failed,
}

/// How a send ended, as seen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    Replied,
    /// The reply contained the completion phrase.
    DiagnosisDue,
    Failed,
    /// The view was closed before the reply arrived.
    Discarded,
}

/// Work captured by `begin_send` for `dispatch_send`.
#[derive(Debug, Clone)]
pub struct PendingSend {
    pub chat_id: String,
    pub patient_id: Option<String>,
    /// Local id of the optimistic message, if one was appended.
    pub local_id: Option<u64>,
    pub message: String,
    pub files: Vec<LocalAttachment>,
}

/// Successful result of `dispatch_send`.
#[derive(Debug, Clone, PartialEq)]
pub struct SendOutcome {
    pub reply: MessageReply,
    pub attachment_ids: Vec<String>,
}

// ═══════════════════════════════════════════
// Start
// ═══════════════════════════════════════════

/// Create a chat and return the route of its consultation view.
pub async fn start_consultation<A: ConsultationApi>(api: &A) -> Result<Route, Notification> {
    match api.start_chat().await {
        Ok(started) => {
            tracing::info!(chat_id = %started.chat_id, "Consultation started");
            Ok(Route::Chat(started.chat_id))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to start consultation");
            Err(Notification::from_error(
                "Failed to start chat",
                &e,
                RetryAction::StartChat,
            ))
        }
    }
}

// ═══════════════════════════════════════════
// ChatFlow
// ═══════════════════════════════════════════

pub struct ChatFlow {
    chat_id: String,
    patient_id: Option<String>,
    messages: Vec<ChatMessage>,
    title: Option<String>,
    summary: String,
    keywords: Vec<String>,
    diagnostic: Option<Diagnostic>,
    report_id: Option<String>,
    loaded: bool,
    load_error: Option<ApiError>,
    sending: bool,
    diagnosing: bool,
    scope: ViewScope,
    notifications: Vec<Notification>,
    next_local_id: u64,
}

impl ChatFlow {
    /// `patient_id` comes from the signed-in profile and is needed for
    /// attachment uploads.
    pub fn new(chat_id: impl Into<String>, patient_id: Option<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            patient_id,
            messages: Vec::new(),
            title: None,
            summary: String::new(),
            keywords: Vec::new(),
            diagnostic: None,
            report_id: None,
            loaded: false,
            load_error: None,
            sending: false,
            diagnosing: false,
            scope: ViewScope::new(),
            notifications: Vec::new(),
            next_local_id: 0,
        }
    }

    // ── Accessors ────────────────────────────────────────

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        self.diagnostic.as_ref()
    }

    /// Report id returned by the last successful diagnosis.
    pub fn report_id(&self) -> Option<&str> {
        self.report_id.as_deref()
    }

    pub fn scope(&self) -> &ViewScope {
        &self.scope
    }

    pub fn phase(&self) -> ChatPhase {
        if self.load_error.is_some() {
            ChatPhase::Failed
        } else if !self.loaded {
            ChatPhase::Loading
        } else if report_ready_id(&self.messages).is_some() {
            ChatPhase::ReportReady
        } else if self.diagnosing {
            ChatPhase::AwaitingDiagnosis
        } else {
            ChatPhase::Active
        }
    }

    /// Typing indicator: on while a send or a diagnosis is in flight.
    pub fn is_typing(&self) -> bool {
        self.sending || self.diagnosing
    }

    /// The message box is disabled while the agent is working.
    pub fn can_send(&self) -> bool {
        !self.is_typing()
    }

    pub fn panel_view(&self) -> PanelView {
        panel_view(
            &self.messages,
            &self.summary,
            &self.keywords,
            self.diagnostic.as_ref(),
        )
    }

    /// Drain notifications raised since the last call.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Mark the view as gone. Later results are dropped.
    pub fn close(&self) {
        self.scope.close();
    }

    // ── Load ─────────────────────────────────────────────

    /// Fetch the chat and seed local state from it.
    ///
    /// Server messages replace local ones, except patient messages the
    /// server never confirmed; those stay at the end. Refused while a send
    /// is in flight.
    pub async fn load<A: ConsultationApi>(&mut self, api: &A) -> Result<(), ChatError> {
        if self.sending {
            return Err(ChatError::Busy);
        }
        let result = api.get_chat(&self.chat_id).await;
        if !self.scope.is_active() {
            tracing::debug!(chat_id = %self.chat_id, "Chat closed before load finished");
            return Ok(());
        }

        match result {
            Ok(chat) => {
                let unconfirmed: Vec<ChatMessage> = self
                    .messages
                    .drain(..)
                    .filter(|m| m.role == ChatRole::Patient && m.delivery != Delivery::Sent)
                    .collect();
                self.messages = chat.messages;
                self.messages.extend(unconfirmed);
                self.summary = chat.summary.unwrap_or_default();
                self.keywords = chat.keywords;
                self.title = chat.title;
                if self.patient_id.is_none() && !chat.patient_id.is_empty() {
                    self.patient_id = Some(chat.patient_id);
                }
                self.loaded = true;
                self.load_error = None;
                tracing::debug!(chat_id = %self.chat_id, messages = self.messages.len(), "Chat loaded");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(chat_id = %self.chat_id, error = %e, "Failed to load chat");
                self.notifications.push(Notification::from_error(
                    "Failed to load chat",
                    &e,
                    RetryAction::LoadChat {
                        chat_id: self.chat_id.clone(),
                    },
                ));
                self.load_error = Some(e.clone());
                Err(e.into())
            }
        }
    }

    // ── Send ─────────────────────────────────────────────

    /// Append the optimistic patient message and mark a send in flight.
    ///
    /// Nothing is appended when both `content` and `files` are empty, but
    /// the send still goes out. Attachments without a patient id are
    /// rejected before anything changes.
    pub fn begin_send(
        &mut self,
        content: &str,
        files: Vec<LocalAttachment>,
    ) -> Result<PendingSend, ChatError> {
        if self.is_typing() {
            return Err(ChatError::Busy);
        }
        if !files.is_empty() && self.patient_id.is_none() {
            return Err(ApiError::Validation(
                "Attachments need a patient profile".to_string(),
            )
            .into());
        }

        let local_id = if !content.trim().is_empty() || !files.is_empty() {
            let shown = if content.trim().is_empty() {
                FILES_ONLY_CONTENT
            } else {
                content
            };
            let local_id = self.next_local_id;
            self.next_local_id += 1;
            self.messages
                .push(ChatMessage::pending_patient(shown, files.clone()).with_local_id(local_id));
            Some(local_id)
        } else {
            None
        };

        self.sending = true;
        Ok(PendingSend {
            chat_id: self.chat_id.clone(),
            patient_id: self.patient_id.clone(),
            local_id,
            message: content.to_string(),
            files,
        })
    }

    /// Put a failed message back in flight.
    pub fn begin_resend(&mut self, local_id: u64) -> Result<PendingSend, ChatError> {
        if self.is_typing() {
            return Err(ChatError::Busy);
        }
        let message = self
            .local_message_mut(local_id)
            .filter(|m| m.delivery == Delivery::Failed)
            .ok_or(ChatError::NotResendable(local_id))?;

        message.delivery = Delivery::Pending;
        let files = message.local_attachments.clone();
        let text = if !files.is_empty() && message.content == FILES_ONLY_CONTENT {
            String::new()
        } else {
            message.content.clone()
        };

        self.sending = true;
        Ok(PendingSend {
            chat_id: self.chat_id.clone(),
            patient_id: self.patient_id.clone(),
            local_id: Some(local_id),
            message: text,
            files,
        })
    }

    /// Network half of a send. Every upload finishes before the message
    /// call is issued; any upload failure aborts the send.
    pub async fn dispatch_send<A: ConsultationApi>(
        api: &A,
        pending: &PendingSend,
    ) -> Result<SendOutcome, ApiError> {
        let attachment_ids = if pending.files.is_empty() {
            Vec::new()
        } else {
            let patient_id = pending.patient_id.as_deref().ok_or_else(|| {
                ApiError::Validation("Attachments need a patient profile".to_string())
            })?;
            let receipts = try_join_all(
                pending
                    .files
                    .iter()
                    .map(|file| api.upload_file(patient_id, file)),
            )
            .await?;
            tracing::debug!(count = receipts.len(), "Attachments uploaded");
            receipts.into_iter().map(|r| r.file_id).collect()
        };

        let request = SendMessageRequest {
            message: pending.message.clone(),
            attachments: attachment_ids.clone(),
        };
        let reply = api.send_message(&pending.chat_id, &request).await?;
        Ok(SendOutcome {
            reply,
            attachment_ids,
        })
    }

    /// Apply the result of `dispatch_send`.
    pub fn finish_send(
        &mut self,
        pending: PendingSend,
        result: Result<SendOutcome, ApiError>,
    ) -> SendStatus {
        self.sending = false;
        if !self.scope.is_active() {
            tracing::debug!(chat_id = %self.chat_id, "Chat closed before reply arrived");
            return SendStatus::Discarded;
        }

        match result {
            Ok(outcome) => {
                if let Some(message) = pending.local_id.and_then(|id| self.local_message_mut(id)) {
                    message.delivery = Delivery::Sent;
                    message.attachments = outcome.attachment_ids;
                }

                let reply = outcome.reply;
                let complete = is_interview_complete(&reply.reply);
                self.messages.push(ChatMessage::agent(reply.reply));
                if let Some(summary) = reply.summary {
                    self.summary = summary;
                }
                self.keywords = reply.keywords;

                if complete {
                    tracing::info!(chat_id = %self.chat_id, "Interview complete");
                    self.notifications.push(Notification::info(
                        "Interview Complete",
                        "Generating your medical report...",
                    ));
                    SendStatus::DiagnosisDue
                } else {
                    SendStatus::Replied
                }
            }
            Err(e) => {
                tracing::warn!(chat_id = %self.chat_id, error = %e, "Failed to send message");
                if let Some(message) = pending.local_id.and_then(|id| self.local_message_mut(id)) {
                    message.delivery = Delivery::Failed;
                }
                let retry = match pending.local_id {
                    Some(local_id) => RetryAction::SendMessage {
                        chat_id: self.chat_id.clone(),
                        local_id,
                    },
                    None => RetryAction::LoadChat {
                        chat_id: self.chat_id.clone(),
                    },
                };
                self.notifications
                    .push(Notification::from_error("Failed to send message", &e, retry));
                SendStatus::Failed
            }
        }
    }

    /// Send a message and, if the agent closes the interview, run the
    /// diagnosis once.
    pub async fn send<A: ConsultationApi>(
        &mut self,
        api: &A,
        content: &str,
        files: Vec<LocalAttachment>,
    ) -> Result<SendStatus, ChatError> {
        let pending = self.begin_send(content, files)?;
        self.complete_send(api, pending).await
    }

    /// Re-send the failed message with `local_id`.
    pub async fn resend<A: ConsultationApi>(
        &mut self,
        api: &A,
        local_id: u64,
    ) -> Result<SendStatus, ChatError> {
        let pending = self.begin_resend(local_id)?;
        self.complete_send(api, pending).await
    }

    async fn complete_send<A: ConsultationApi>(
        &mut self,
        api: &A,
        pending: PendingSend,
    ) -> Result<SendStatus, ChatError> {
        let result = Self::dispatch_send(api, &pending).await;
        let status = self.finish_send(pending, result);
        if status == SendStatus::DiagnosisDue {
            self.run_diagnosis(api).await?;
        }
        Ok(status)
    }

    fn local_message_mut(&mut self, local_id: u64) -> Option<&mut ChatMessage> {
        self.messages
            .iter_mut()
            .find(|m| m.role == ChatRole::Patient && m.local_id == Some(local_id))
    }

    // ── Diagnosis ────────────────────────────────────────

    pub fn begin_diagnosis(&mut self) -> Result<String, ChatError> {
        if self.diagnosing {
            return Err(ChatError::Busy);
        }
        self.diagnosing = true;
        Ok(self.chat_id.clone())
    }

    /// Apply a diagnosis result. Failure leaves the chat active so the
    /// patient can retry. Returns true when a report was produced.
    pub fn finish_diagnosis(&mut self, result: Result<DiagnosisOutcome, ApiError>) -> bool {
        self.diagnosing = false;
        if !self.scope.is_active() {
            tracing::debug!(chat_id = %self.chat_id, "Chat closed before diagnosis finished");
            return false;
        }

        match result {
            Ok(outcome) => {
                tracing::info!(
                    chat_id = %self.chat_id,
                    report_id = %outcome.report_id,
                    urgency = %outcome.diagnostic.urgency,
                    "Diagnosis complete"
                );
                self.messages
                    .push(ChatMessage::agent(DIAGNOSIS_MESSAGE).with_report(outcome.report_id.clone()));
                self.diagnostic = Some(outcome.diagnostic);
                self.report_id = Some(outcome.report_id);
                if let Some(summary) = outcome.patient_summary {
                    self.summary = summary;
                }
                self.keywords = outcome.keywords;
                if outcome.chat_title.is_some() {
                    self.title = outcome.chat_title;
                }
                self.notifications.push(Notification::info(
                    "Diagnosis Complete",
                    "Your report has been generated.",
                ));
                true
            }
            Err(e) => {
                tracing::warn!(chat_id = %self.chat_id, error = %e, "Diagnosis failed");
                self.notifications.push(Notification::from_error(
                    "Diagnosis Failed",
                    &e,
                    RetryAction::RunDiagnosis {
                        chat_id: self.chat_id.clone(),
                    },
                ));
                false
            }
        }
    }

    /// Request the diagnosis for this chat (automatic or manual trigger).
    pub async fn run_diagnosis<A: ConsultationApi>(&mut self, api: &A) -> Result<bool, ChatError> {
        let chat_id = self.begin_diagnosis()?;
        let result = api.run_diagnosis(&chat_id).await;
        Ok(self.finish_diagnosis(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChatSession, Hypothesis, StartChatResponse, UploadReceipt, UrgencyLevel};
    use crate::notify::Severity;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Upload(String),
        Start,
        Send(SendMessageRequest),
        GetChat(String),
        Diagnosis(String),
    }

    /// Recording fake of the consultation endpoints.
    #[derive(Default)]
    struct MockConsultation {
        calls: Mutex<Vec<Call>>,
        replies: Mutex<VecDeque<Result<MessageReply, ApiError>>>,
        diagnoses: Mutex<VecDeque<Result<DiagnosisOutcome, ApiError>>>,
        chat: Mutex<Option<Result<ChatSession, ApiError>>>,
        start: Mutex<Option<Result<StartChatResponse, ApiError>>>,
        failing_upload: Option<String>,
    }

    impl MockConsultation {
        fn new() -> Self {
            Self::default()
        }

        fn reply(self, text: &str) -> Self {
            self.replies.lock().unwrap().push_back(Ok(MessageReply {
                reply: text.to_string(),
                summary: None,
                keywords: vec!["headache".into()],
            }));
            self
        }

        fn reply_err(self, error: ApiError) -> Self {
            self.replies.lock().unwrap().push_back(Err(error));
            self
        }

        fn diagnosis(self, result: Result<DiagnosisOutcome, ApiError>) -> Self {
            self.diagnoses.lock().unwrap().push_back(result);
            self
        }

        fn chat(self, result: Result<ChatSession, ApiError>) -> Self {
            *self.chat.lock().unwrap() = Some(result);
            self
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
            self.calls().iter().filter(|&c| pred(c)).count()
        }
    }

    impl ConsultationApi for MockConsultation {
        async fn upload_file(&self, _patient_id: &str, file: &LocalAttachment) -> Result<UploadReceipt, ApiError> {
            self.calls.lock().unwrap().push(Call::Upload(file.file_name.clone()));
            if self.failing_upload.as_deref() == Some(file.file_name.as_str()) {
                return Err(ApiError::Server {
                    status: 500,
                    message: "GridFS unavailable".into(),
                });
            }
            Ok(UploadReceipt {
                file_id: format!("id-{}", file.file_name),
            })
        }

        async fn start_chat(&self) -> Result<StartChatResponse, ApiError> {
            self.calls.lock().unwrap().push(Call::Start);
            self.start.lock().unwrap().take().unwrap_or(Ok(StartChatResponse {
                chat_id: "chat-new".into(),
            }))
        }

        async fn send_message(&self, _chat_id: &str, request: &SendMessageRequest) -> Result<MessageReply, ApiError> {
            self.calls.lock().unwrap().push(Call::Send(request.clone()));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ApiError::Network("no scripted reply".into())))
        }

        async fn get_chat(&self, chat_id: &str) -> Result<ChatSession, ApiError> {
            self.calls.lock().unwrap().push(Call::GetChat(chat_id.to_string()));
            self.chat
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Err(ApiError::NotFound("Chat not found".into())))
        }

        async fn run_diagnosis(&self, chat_id: &str) -> Result<DiagnosisOutcome, ApiError> {
            self.calls.lock().unwrap().push(Call::Diagnosis(chat_id.to_string()));
            self.diagnoses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ApiError::Network("no scripted diagnosis".into())))
        }
    }

    fn outcome(report_id: &str) -> DiagnosisOutcome {
        DiagnosisOutcome {
            diagnostic: Diagnostic {
                primary_hypothesis: Hypothesis {
                    name: "Migraine".into(),
                    confidence: 0.7,
                },
                differentials: vec![],
                red_flags: vec![],
                urgency: UrgencyLevel::Routine,
                rationale: "Classic presentation".into(),
            },
            report_id: report_id.to_string(),
            chat_title: Some("Headache".into()),
            patient_summary: Some("Likely migraine".into()),
            keywords: vec!["migraine".into()],
        }
    }

    fn loaded_flow() -> ChatFlow {
        let mut flow = ChatFlow::new("c1", Some("p1".into()));
        flow.loaded = true;
        flow
    }

    fn file(name: &str) -> LocalAttachment {
        LocalAttachment::new(name, "image/png", vec![1, 2, 3])
    }

    // ── Start / load ─────────────────────────────────────

    #[tokio::test]
    async fn start_returns_chat_route() {
        let api = MockConsultation::new();
        assert_eq!(start_consultation(&api).await, Ok(Route::Chat("chat-new".into())));
    }

    #[tokio::test]
    async fn start_failure_offers_retry() {
        let api = MockConsultation::new();
        *api.start.lock().unwrap() = Some(Err(ApiError::Network("offline".into())));
        let notification = start_consultation(&api).await.unwrap_err();
        assert_eq!(notification.retry, Some(RetryAction::StartChat));
    }

    #[tokio::test]
    async fn load_maps_roles_and_seeds_state() {
        let wire: crate::models::WireChatSession = serde_json::from_value(serde_json::json!({
            "chat_id": "c1",
            "patient_id": "p1",
            "messages": [
                {"role": "system", "content": "Interview started"},
                {"role": "user", "content": "My head hurts"},
                {"role": "agent", "content": "Since when?"}
            ],
            "summary": "Headache for two days",
            "keywords": ["headache"]
        }))
        .unwrap();
        let api = MockConsultation::new().chat(Ok(wire.into()));
        let mut flow = ChatFlow::new("c1", None);
        assert_eq!(flow.phase(), ChatPhase::Loading);

        flow.load(&api).await.unwrap();
        assert_eq!(flow.phase(), ChatPhase::Active);
        assert_eq!(flow.messages()[1].role, ChatRole::Patient);
        assert_eq!(flow.summary(), "Headache for two days");
        assert_eq!(flow.keywords(), ["headache".to_string()]);
        assert_eq!(flow.patient_id.as_deref(), Some("p1"));
    }

    #[tokio::test]
    async fn load_failure_enters_failed_phase_with_retry() {
        let api = MockConsultation::new().chat(Err(ApiError::Network("offline".into())));
        let mut flow = ChatFlow::new("c1", None);
        assert!(flow.load(&api).await.is_err());
        assert_eq!(flow.phase(), ChatPhase::Failed);
        let notes = flow.take_notifications();
        assert_eq!(
            notes[0].retry,
            Some(RetryAction::LoadChat { chat_id: "c1".into() })
        );
    }

    #[tokio::test]
    async fn reload_keeps_unconfirmed_messages() {
        let api = MockConsultation::new().chat(Ok(ChatSession {
            chat_id: "c1".into(),
            patient_id: "p1".into(),
            messages: vec![ChatMessage::agent("Hello")],
            title: None,
            summary: None,
            keywords: vec![],
        }));
        let mut flow = loaded_flow();
        let pending = flow.begin_send("lost", vec![]).unwrap();
        assert!(matches!(flow.load(&api).await, Err(ChatError::Busy)));
        flow.finish_send(pending, Err(ApiError::Network("offline".into())));

        flow.load(&api).await.unwrap();
        assert_eq!(flow.messages().len(), 2);
        assert_eq!(flow.messages()[0].content, "Hello");
        assert_eq!(flow.messages()[1].delivery, Delivery::Failed);
    }

    // ── Send ─────────────────────────────────────────────

    #[test]
    fn begin_send_appends_optimistic_message_immediately() {
        let mut flow = loaded_flow();
        let pending = flow.begin_send("I have a fever", vec![]).unwrap();
        assert_eq!(pending.local_id, Some(0));
        assert_eq!(flow.messages()[0].local_id, Some(0));
        assert_eq!(flow.messages()[0].delivery, Delivery::Pending);
        assert_eq!(flow.messages()[0].role, ChatRole::Patient);
        assert!(flow.is_typing());
        assert!(!flow.can_send());
        assert!(matches!(flow.begin_send("again", vec![]), Err(ChatError::Busy)));
    }

    #[test]
    fn files_only_message_uses_placeholder_text() {
        let mut flow = loaded_flow();
        let pending = flow.begin_send("", vec![file("rash.png")]).unwrap();
        assert_eq!(flow.messages()[0].content, FILES_ONLY_CONTENT);
        assert_eq!(flow.messages()[0].local_attachments.len(), 1);
        assert_eq!(pending.message, "");
    }

    #[test]
    fn empty_send_appends_nothing() {
        let mut flow = loaded_flow();
        let pending = flow.begin_send("   ", vec![]).unwrap();
        assert!(pending.local_id.is_none());
        assert!(flow.messages().is_empty());
        assert!(flow.is_typing());
    }

    #[tokio::test]
    async fn zero_files_is_one_message_call() {
        let api = MockConsultation::new().reply("How long?");
        let mut flow = loaded_flow();
        let status = flow.send(&api, "Headache", vec![]).await.unwrap();

        assert_eq!(status, SendStatus::Replied);
        assert_eq!(
            api.calls(),
            vec![Call::Send(SendMessageRequest {
                message: "Headache".into(),
                attachments: vec![],
            })]
        );
        assert_eq!(flow.messages().len(), 2);
        assert_eq!(flow.messages()[0].delivery, Delivery::Sent);
        assert_eq!(flow.messages()[1].content, "How long?");
        assert_eq!(flow.keywords(), ["headache".to_string()]);
        assert!(!flow.is_typing());
    }

    #[tokio::test]
    async fn n_files_upload_before_single_message_call() {
        let api = MockConsultation::new().reply("Thanks for the images");
        let mut flow = loaded_flow();
        flow.send(&api, "See these", vec![file("a.png"), file("b.png"), file("c.png")])
            .await
            .unwrap();

        let calls = api.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(api.count(|c| matches!(c, Call::Upload(_))), 3);
        match calls.last() {
            Some(Call::Send(request)) => {
                let mut ids = request.attachments.clone();
                ids.sort();
                assert_eq!(ids, vec!["id-a.png", "id-b.png", "id-c.png"]);
            }
            other => panic!("expected message call last, got {other:?}"),
        }
        assert_eq!(flow.messages()[0].attachments.len(), 3);
    }

    #[tokio::test]
    async fn upload_failure_skips_message_call_and_flags_message() {
        let api = MockConsultation {
            failing_upload: Some("b.png".into()),
            ..MockConsultation::default()
        };
        let mut flow = loaded_flow();
        let status = flow
            .send(&api, "See these", vec![file("a.png"), file("b.png")])
            .await
            .unwrap();

        assert_eq!(status, SendStatus::Failed);
        assert_eq!(api.count(|c| matches!(c, Call::Send(_))), 0);
        assert_eq!(flow.messages().len(), 1);
        assert_eq!(flow.messages()[0].delivery, Delivery::Failed);
        assert!(!flow.is_typing());
    }

    #[tokio::test]
    async fn attachments_without_patient_id_are_rejected_before_network() {
        let api = MockConsultation::new();
        let mut flow = ChatFlow::new("c1", None);
        flow.loaded = true;
        let err = flow.send(&api, "scan", vec![file("x.png")]).await.unwrap_err();
        assert!(matches!(err, ChatError::Api(ApiError::Validation(_))));
        assert!(api.calls().is_empty());
        assert!(flow.messages().is_empty());
        assert!(!flow.is_typing());
    }

    #[tokio::test]
    async fn failed_send_keeps_optimistic_message_and_notifies() {
        let api = MockConsultation::new().reply_err(ApiError::Network("offline".into()));
        let mut flow = loaded_flow();
        let status = flow.send(&api, "Hello?", vec![]).await.unwrap();

        assert_eq!(status, SendStatus::Failed);
        assert_eq!(flow.messages().len(), 1);
        assert_eq!(flow.messages()[0].content, "Hello?");
        assert_eq!(flow.messages()[0].delivery, Delivery::Failed);
        assert!(!flow.is_typing());

        let notes = flow.take_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].severity, Severity::Error);
        assert_eq!(
            notes[0].retry,
            Some(RetryAction::SendMessage { chat_id: "c1".into(), local_id: 0 })
        );
    }

    #[tokio::test]
    async fn resend_reuses_failed_message() {
        let api = MockConsultation::new()
            .reply_err(ApiError::Network("offline".into()))
            .reply("Got it");
        let mut flow = loaded_flow();
        flow.send(&api, "Hello?", vec![]).await.unwrap();

        let status = flow.resend(&api, 0).await.unwrap();
        assert_eq!(status, SendStatus::Replied);
        assert_eq!(flow.messages().len(), 2);
        assert_eq!(flow.messages()[0].delivery, Delivery::Sent);
        assert!(matches!(flow.begin_resend(0), Err(ChatError::NotResendable(0))));
    }

    #[tokio::test]
    async fn retry_after_reload_targets_the_failed_message() {
        let api = MockConsultation::new()
            .reply_err(ApiError::Network("offline".into()))
            .reply("Got it")
            .chat(Ok(ChatSession {
                chat_id: "c1".into(),
                patient_id: "p1".into(),
                messages: vec![ChatMessage::agent("Hello"), ChatMessage::agent("How can I help?")],
                title: None,
                summary: None,
                keywords: vec![],
            }));
        let mut flow = ChatFlow::new("c1", Some("p1".into()));
        flow.loaded = true;
        flow.send(&api, "Chest pain", vec![]).await.unwrap();
        let retry = flow.take_notifications().remove(0).retry;
        let Some(RetryAction::SendMessage { local_id, .. }) = retry.clone() else {
            panic!("expected a send retry, got {retry:?}");
        };

        flow.load(&api).await.unwrap();
        assert_eq!(flow.messages()[2].content, "Chest pain");
        assert_eq!(flow.messages()[2].delivery, Delivery::Failed);

        let status = flow.resend(&api, local_id).await.unwrap();
        assert_eq!(status, SendStatus::Replied);
        assert_eq!(flow.messages()[2].delivery, Delivery::Sent);
        assert_eq!(flow.messages()[3].content, "Got it");
        assert_eq!(flow.messages().len(), 4);
    }

    #[tokio::test]
    async fn local_ids_are_unique_per_flow() {
        let api = MockConsultation::new().reply("one").reply("two");
        let mut flow = loaded_flow();
        flow.send(&api, "first", vec![]).await.unwrap();
        flow.send(&api, "second", vec![]).await.unwrap();
        let ids: Vec<Option<u64>> = flow
            .messages()
            .iter()
            .filter(|m| m.role == ChatRole::Patient)
            .map(|m| m.local_id)
            .collect();
        assert_eq!(ids, vec![Some(0), Some(1)]);
    }

    #[tokio::test]
    async fn closed_view_discards_reply() {
        let api = MockConsultation::new().reply("late");
        let mut flow = loaded_flow();
        let pending = flow.begin_send("hi", vec![]).unwrap();
        let result = ChatFlow::dispatch_send(&api, &pending).await;
        flow.close();

        assert_eq!(flow.finish_send(pending, result), SendStatus::Discarded);
        assert_eq!(flow.messages().len(), 1);
        assert!(!flow.is_typing());
    }

    // ── Sentinel and diagnosis ───────────────────────────

    #[tokio::test]
    async fn sentinel_triggers_exactly_one_diagnosis() {
        let api = MockConsultation::new()
            .reply("Thank you. Please wait while Healio diagnoses your problem.")
            .diagnosis(Ok(outcome("r1")));
        let mut flow = loaded_flow();
        let status = flow.send(&api, "That's all", vec![]).await.unwrap();

        assert_eq!(status, SendStatus::DiagnosisDue);
        assert_eq!(api.count(|c| matches!(c, Call::Diagnosis(_))), 1);
        assert_eq!(flow.phase(), ChatPhase::ReportReady);
        assert_eq!(flow.report_id(), Some("r1"));
        assert_eq!(flow.summary(), "Likely migraine");
        assert_eq!(flow.title(), Some("Headache"));

        let last = flow.messages().last().unwrap();
        assert_eq!(last.report_id(), Some("r1"));
        assert!(last.content.starts_with("**Diagnosis Complete.**"));
        assert!(matches!(flow.panel_view(), PanelView::ReportReady { report_id, .. } if report_id == "r1"));
    }

    #[tokio::test]
    async fn reply_without_sentinel_never_diagnoses() {
        let api = MockConsultation::new().reply("Where does it hurt?").reply("Anything else?");
        let mut flow = loaded_flow();
        flow.send(&api, "My head", vec![]).await.unwrap();
        flow.send(&api, "Left side", vec![]).await.unwrap();
        assert_eq!(api.count(|c| matches!(c, Call::Diagnosis(_))), 0);
        assert_eq!(flow.phase(), ChatPhase::Active);
    }

    #[tokio::test]
    async fn diagnosis_failure_stays_active_and_can_retry() {
        let api = MockConsultation::new()
            .reply("Please wait while Healio diagnoses your problem")
            .diagnosis(Err(ApiError::Server { status: 500, message: "crew failed".into() }))
            .diagnosis(Ok(outcome("r2")));
        let mut flow = loaded_flow();
        flow.send(&api, "done", vec![]).await.unwrap();

        assert_eq!(flow.phase(), ChatPhase::Active);
        assert!(!flow.is_typing());
        let notes = flow.take_notifications();
        assert!(notes.iter().any(|n| n.title == "Interview Complete"));
        let failure = notes.iter().find(|n| n.title == "Diagnosis Failed").unwrap();
        assert_eq!(failure.retry, Some(RetryAction::RunDiagnosis { chat_id: "c1".into() }));

        assert!(flow.run_diagnosis(&api).await.unwrap());
        assert_eq!(flow.phase(), ChatPhase::ReportReady);
    }

    #[test]
    fn typing_covers_diagnosis_in_flight() {
        let mut flow = loaded_flow();
        flow.begin_diagnosis().unwrap();
        assert!(flow.is_typing());
        assert_eq!(flow.phase(), ChatPhase::AwaitingDiagnosis);
        assert!(matches!(flow.begin_diagnosis(), Err(ChatError::Busy)));
        assert!(matches!(flow.begin_send("hi", vec![]), Err(ChatError::Busy)));

        flow.finish_diagnosis(Err(ApiError::Network("offline".into())));
        assert!(!flow.is_typing());
        assert_eq!(flow.phase(), ChatPhase::Active);
    }

    #[test]
    fn report_ready_follows_message_list() {
        let mut flow = loaded_flow();
        assert!(matches!(flow.panel_view(), PanelView::Preview { .. }));
        flow.messages.push(ChatMessage::agent("done").with_report("r9"));
        assert_eq!(flow.phase(), ChatPhase::ReportReady);
        flow.messages.pop();
        assert_eq!(flow.phase(), ChatPhase::Active);
        assert!(matches!(flow.panel_view(), PanelView::Preview { .. }));
    }
}
