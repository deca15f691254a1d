//! HTTP implementation of the Teledoc API.
//!
//! Every call carries `Authorization: Bearer <jwt>` when the session store
//! holds a token. A 401 on such a call signs the session out, so the next
//! access check sends the user back to login.

use std::sync::Arc;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::error::ApiError;
use super::{AuthApi, ConsultationApi, ReviewApi};
use crate::config::{self, ClientConfig};
use crate::models::{
    Ack, AuthResponse, ChatSession, Diagnostic, DiagnosisOutcome, DiagnosisRequest,
    DoctorProfileUpdate, FileUpload, HealthStatus, LocalAttachment, LoginRequest, MarkReviewed,
    MedicalHistory, MessageReply, ProfileUpdate, Report, ReportPage, ReportQuery, ReportRunRequest,
    ReportRunResponse, ReviewDecision, SearchHit, SendMessageRequest, StartChatResponse,
    UploadReceipt, WireChatSession,
};
use crate::session::SessionStore;

pub struct TeledocClient {
    http: reqwest::Client,
    config: ClientConfig,
    session: Arc<SessionStore>,
}

impl TeledocClient {
    pub fn new(config: ClientConfig, session: Arc<SessionStore>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(format!("{}/{}", config::APP_NAME, config::APP_VERSION))
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            config,
            session,
        })
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // ═══════════════════════════════════════════════════════════
    // Plumbing
    // ═══════════════════════════════════════════════════════════

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        tracing::debug!(%method, path, "API request");
        let builder = self.http.request(method, self.config.url(path));
        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send and map non-2xx statuses to errors.
    async fn send_raw(builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::from_transport(&e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), "API call failed");
        Err(ApiError::from_status(status.as_u16(), &body))
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let result = Self::send_raw(builder).await;
        if let Err(ApiError::Unauthorized(_)) = &result {
            if self.session.is_authenticated() {
                tracing::warn!("Session token rejected by backend, signing out");
                self.session.logout();
            }
        }
        result
    }

    async fn fetch_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = self.execute(builder).await?;
        decode(response).await
    }

    async fn fetch_bytes(&self, builder: RequestBuilder) -> Result<Vec<u8>, ApiError> {
        let response = self.execute(builder).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::from_transport(&e))?;
        Ok(bytes.to_vec())
    }

    async fn fetch_unit(&self, builder: RequestBuilder) -> Result<(), ApiError> {
        self.execute(builder).await.map(|_| ())
    }

    // ═══════════════════════════════════════════════════════════
    // Health
    // ═══════════════════════════════════════════════════════════

    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.fetch_json(self.request(Method::GET, "/healthz")).await
    }

    // ═══════════════════════════════════════════════════════════
    // Patients: history, profile, uploads, reports
    // ═══════════════════════════════════════════════════════════

    /// Intake form of a patient; `None` when none was saved yet.
    pub async fn get_history(&self, patient_id: &str) -> Result<Option<MedicalHistory>, ApiError> {
        let path = format!("/patients/{}/history", segment(patient_id)?);
        match self.fetch_json::<Option<MedicalHistory>>(self.request(Method::GET, &path)).await {
            Err(ApiError::NotFound(_)) => Ok(None),
            other => other,
        }
    }

    pub async fn put_history(&self, patient_id: &str, history: &MedicalHistory) -> Result<(), ApiError> {
        let path = format!("/patients/{}/history", segment(patient_id)?);
        self.fetch_unit(self.request(Method::PUT, &path).json(history)).await
    }

    pub async fn update_patient_profile(
        &self,
        patient_id: &str,
        update: &ProfileUpdate,
    ) -> Result<(), ApiError> {
        let path = format!("/patients/{}/profile", segment(patient_id)?);
        self.fetch_unit(self.request(Method::PUT, &path).json(update)).await
    }

    pub async fn list_uploads(&self, patient_id: &str) -> Result<Vec<FileUpload>, ApiError> {
        let path = format!("/patients/{}/uploads", segment(patient_id)?);
        self.fetch_json(self.request(Method::GET, &path)).await
    }

    pub async fn download_upload(&self, patient_id: &str, file_id: &str) -> Result<Vec<u8>, ApiError> {
        let path = format!(
            "/patients/{}/uploads/{}",
            segment(patient_id)?,
            segment(file_id)?
        );
        self.fetch_bytes(self.request(Method::GET, &path)).await
    }

    pub async fn list_patient_reports(
        &self,
        patient_id: &str,
        query: &ReportQuery,
    ) -> Result<Vec<Report>, ApiError> {
        let path = format!("/patients/{}/reports", segment(patient_id)?);
        let page: ReportPage = self
            .fetch_json(self.request(Method::GET, &path).query(query))
            .await?;
        Ok(page.into_items())
    }

    pub async fn get_patient_report(&self, patient_id: &str, report_id: &str) -> Result<Report, ApiError> {
        let path = format!(
            "/patients/{}/reports/{}",
            segment(patient_id)?,
            segment(report_id)?
        );
        self.fetch_json(self.request(Method::GET, &path)).await
    }

    pub async fn download_report_pdf(&self, patient_id: &str, report_id: &str) -> Result<Vec<u8>, ApiError> {
        let path = format!(
            "/patients/{}/reports/{}/pdf",
            segment(patient_id)?,
            segment(report_id)?
        );
        self.fetch_bytes(self.request(Method::GET, &path)).await
    }

    // ═══════════════════════════════════════════════════════════
    // Chats and agents
    // ═══════════════════════════════════════════════════════════

    /// Chats visible to the caller, newest first.
    pub async fn list_chats(&self) -> Result<Vec<ChatSession>, ApiError> {
        let chats: Vec<WireChatSession> = self.fetch_json(self.request(Method::GET, "/chats/")).await?;
        Ok(chats.into_iter().map(ChatSession::from).collect())
    }

    pub async fn run_report(
        &self,
        chat_id: &str,
        diagnostic: Option<&Diagnostic>,
    ) -> Result<ReportRunResponse, ApiError> {
        let body = ReportRunRequest { chat_id, diagnostic };
        self.fetch_json(self.request(Method::POST, "/agents/report/run").json(&body))
            .await
    }

    pub async fn search_chats(
        &self,
        patient_id: Option<&str>,
        q: Option<&str>,
    ) -> Result<Vec<SearchHit>, ApiError> {
        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(patient_id) = patient_id {
            params.push(("patient_id", patient_id));
        }
        if let Some(q) = q.filter(|q| !q.trim().is_empty()) {
            params.push(("q", q));
        }
        self.fetch_json(self.request(Method::GET, "/search/chats").query(&params))
            .await
    }

    // ═══════════════════════════════════════════════════════════
    // Doctor
    // ═══════════════════════════════════════════════════════════

    /// Legacy review call: `PATCH {reviewed, comments}`.
    pub async fn mark_reviewed(&self, report_id: &str, body: &MarkReviewed) -> Result<(), ApiError> {
        let path = format!("/doctor/reports/{}/review", segment(report_id)?);
        self.fetch_unit(self.request(Method::PATCH, &path).json(body)).await
    }

    pub async fn update_doctor_profile(&self, update: &DoctorProfileUpdate) -> Result<(), ApiError> {
        self.fetch_unit(self.request(Method::PUT, "/doctor/profile").json(update))
            .await
    }

    pub async fn upload_license(&self, file: &LocalAttachment) -> Result<String, ApiError> {
        let form = file_form(file)?;
        let ack: Ack = self
            .fetch_json(self.request(Method::POST, "/doctor/license").multipart(form))
            .await?;
        Ok(ack.message)
    }
}

// ═══════════════════════════════════════════════════════════
// Trait implementations
// ═══════════════════════════════════════════════════════════

impl AuthApi for TeledocClient {
    async fn verify_google(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        // No bearer here, and a 401 must not touch the current session.
        let builder = self
            .http
            .post(self.config.url("/auth/google/verify"))
            .json(request);
        match Self::send_raw(builder).await {
            Ok(response) => decode(response).await,
            Err(ApiError::NotFound(_)) => Err(ApiError::ProfileNotFound),
            Err(e) => Err(e),
        }
    }
}

impl ConsultationApi for TeledocClient {
    async fn upload_file(&self, patient_id: &str, file: &LocalAttachment) -> Result<UploadReceipt, ApiError> {
        let path = format!("/patients/{}/uploads", segment(patient_id)?);
        let form = file_form(file)?;
        tracing::debug!(size = file.size(), "Uploading attachment");
        self.fetch_json(self.request(Method::POST, &path).multipart(form))
            .await
    }

    async fn start_chat(&self) -> Result<StartChatResponse, ApiError> {
        self.fetch_json(self.request(Method::POST, "/agents/interaction/start"))
            .await
    }

    async fn send_message(&self, chat_id: &str, request: &SendMessageRequest) -> Result<MessageReply, ApiError> {
        let path = format!("/agents/interaction/{}/message", segment(chat_id)?);
        self.fetch_json(self.request(Method::POST, &path).json(request))
            .await
    }

    async fn get_chat(&self, chat_id: &str) -> Result<ChatSession, ApiError> {
        let path = format!("/chats/{}", segment(chat_id)?);
        let wire: WireChatSession = self.fetch_json(self.request(Method::GET, &path)).await?;
        Ok(wire.into())
    }

    async fn run_diagnosis(&self, chat_id: &str) -> Result<DiagnosisOutcome, ApiError> {
        let body = DiagnosisRequest { chat_id };
        self.fetch_json(self.request(Method::POST, "/agents/diagnosis/run").json(&body))
            .await
    }
}

impl ReviewApi for TeledocClient {
    async fn list_doctor_reports(&self, query: &ReportQuery) -> Result<Vec<Report>, ApiError> {
        let page: ReportPage = self
            .fetch_json(self.request(Method::GET, "/doctor/reports").query(query))
            .await?;
        Ok(page.into_items())
    }

    async fn get_doctor_report(&self, report_id: &str) -> Result<Report, ApiError> {
        let path = format!("/doctor/reports/{}", segment(report_id)?);
        self.fetch_json(self.request(Method::GET, &path)).await
    }

    async fn submit_review(&self, report_id: &str, decision: &ReviewDecision) -> Result<(), ApiError> {
        let path = format!("/doctor/reports/{}/review", segment(report_id)?);
        self.fetch_unit(self.request(Method::POST, &path).json(decision))
            .await
    }
}

// ═══════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ApiError::from_transport(&e))?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Identifier used as one URL path segment.
fn segment(id: &str) -> Result<&str, ApiError> {
    if id.trim().is_empty() || id.contains(['/', '?', '#']) {
        return Err(ApiError::Validation(format!("Invalid identifier: {id:?}")));
    }
    Ok(id)
}

fn file_form(file: &LocalAttachment) -> Result<Form, ApiError> {
    let part = Part::bytes(file.bytes.clone())
        .file_name(file.file_name.clone())
        .mime_str(&file.content_type)
        .map_err(|e| {
            ApiError::Validation(format!("Invalid content type '{}': {e}", file.content_type))
        })?;
    Ok(Form::new().part("file", part))
}
