//! Typed access to the Teledoc REST backend.
//!
//! `TeledocClient` implements every endpoint. The calls the chat, review
//! and login flows depend on are also exposed through the traits below so
//! those flows can run against in-memory fakes.

pub mod client;
pub mod error;

use std::future::Future;

pub use client::TeledocClient;
pub use error::{ApiError, ErrorAction};

use crate::models::{
    AuthResponse, ChatSession, DiagnosisOutcome, LocalAttachment, LoginRequest, MessageReply,
    Report, ReportQuery, ReviewDecision, SendMessageRequest, StartChatResponse, UploadReceipt,
};

/// Identity token exchange.
pub trait AuthApi: Send + Sync {
    fn verify_google(
        &self,
        request: &LoginRequest,
    ) -> impl Future<Output = Result<AuthResponse, ApiError>> + Send;
}

/// Calls driven by a chat consultation.
pub trait ConsultationApi: Send + Sync {
    fn upload_file(
        &self,
        patient_id: &str,
        file: &LocalAttachment,
    ) -> impl Future<Output = Result<UploadReceipt, ApiError>> + Send;

    fn start_chat(&self) -> impl Future<Output = Result<StartChatResponse, ApiError>> + Send;

    fn send_message(
        &self,
        chat_id: &str,
        request: &SendMessageRequest,
    ) -> impl Future<Output = Result<MessageReply, ApiError>> + Send;

    fn get_chat(&self, chat_id: &str) -> impl Future<Output = Result<ChatSession, ApiError>> + Send;

    fn run_diagnosis(
        &self,
        chat_id: &str,
    ) -> impl Future<Output = Result<DiagnosisOutcome, ApiError>> + Send;
}

/// Calls driven by the doctor review dashboard.
pub trait ReviewApi: Send + Sync {
    fn list_doctor_reports(
        &self,
        query: &ReportQuery,
    ) -> impl Future<Output = Result<Vec<Report>, ApiError>> + Send;

    fn get_doctor_report(
        &self,
        report_id: &str,
    ) -> impl Future<Output = Result<Report, ApiError>> + Send;

    fn submit_review(
        &self,
        report_id: &str,
        decision: &ReviewDecision,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}
