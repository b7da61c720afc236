//! HTTP implementation of the backend collaborator interface.
//!
//! Thin JSON client over the analysis backend's REST surface. Every
//! response is mapped into the orchestration error taxonomy at this
//! boundary: 404 is `NotFound`, other 4xx are `ValidationFailed`, 5xx and
//! transport failures (timeouts included) are `Transient`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use proofstage_config::Config;
use proofstage_utils::error::FlowError;
use proofstage_utils::types::{Issue, Session, SessionMode, StepId};

use crate::types::{
    AnalysisOutcome, FlowStartResponse, JobStatus, MergeMode, MergeOutcome, SessionProgress,
    StepResultPayload,
};
use crate::AnalysisBackend;

/// reqwest-based [`AnalysisBackend`] against a configured base URL.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpBackend {
    /// Build a backend from configuration.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::ValidationFailed` when the configured API key
    /// environment variable is set in config but absent from the
    /// environment, or when the HTTP client cannot be constructed.
    pub fn new_from_config(config: &Config) -> Result<Self, FlowError> {
        let api_key = match config.backend.api_key_env.as_deref() {
            Some(env_name) => Some(std::env::var(env_name).map_err(|_| {
                FlowError::validation(format!(
                    "API key not found in environment variable '{env_name}'"
                ))
            })?),
            None => None,
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.backend.request_timeout_secs))
            .build()
            .map_err(|e| FlowError::validation(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.backend.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn post_json<B, R>(
        &self,
        path: &str,
        body: &B,
        not_found: (&'static str, &str),
    ) -> Result<R, FlowError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        debug!(path, "backend POST");
        let response = self
            .request(self.client.post(self.url(path)).json(body))
            .send()
            .await
            .map_err(transport_error)?;
        decode(response, not_found).await
    }

    async fn get_json<R>(&self, path: &str, not_found: (&'static str, &str)) -> Result<R, FlowError>
    where
        R: DeserializeOwned,
    {
        debug!(path, "backend GET");
        let response = self
            .request(self.client.get(self.url(path)))
            .send()
            .await
            .map_err(transport_error)?;
        decode(response, not_found).await
    }
}

fn transport_error(e: reqwest::Error) -> FlowError {
    if e.is_timeout() {
        FlowError::transient("backend request timed out")
    } else {
        FlowError::transient(format!("backend request failed: {e}"))
    }
}

async fn decode<R: DeserializeOwned>(
    response: reqwest::Response,
    not_found: (&'static str, &str),
) -> Result<R, FlowError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(FlowError::NotFound {
            resource: not_found.0,
            id: not_found.1.to_string(),
        });
    }
    if status.is_client_error() {
        let body = response.text().await.unwrap_or_default();
        return Err(FlowError::validation(format!(
            "backend rejected request ({status}): {body}"
        )));
    }
    if status.is_server_error() {
        return Err(FlowError::transient(format!("backend returned {status}")));
    }
    response
        .json::<R>()
        .await
        .map_err(|e| FlowError::transient(format!("malformed backend response: {e}")))
}

#[derive(Serialize)]
struct AnalyzeStepRequest<'a> {
    document_id: &'a str,
    step_id: StepId,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
}

#[derive(Serialize)]
struct MergeModifyRequestBody<'a> {
    document_id: &'a str,
    issues: &'a [Issue],
    mode: MergeMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<&'a str>,
}

#[derive(Serialize)]
struct FlowStartRequest<'a> {
    document_id: &'a str,
    mode: SessionMode,
}

#[derive(Serialize)]
struct SkipRequest {
    step_id: StepId,
}

#[derive(Deserialize)]
struct JobStatusResponse {
    status: JobStatus,
}

#[async_trait]
impl AnalysisBackend for HttpBackend {
    async fn analyze_step(
        &self,
        document_id: &str,
        step: StepId,
        session_id: Option<&str>,
    ) -> Result<AnalysisOutcome, FlowError> {
        self.post_json(
            "/api/analysis/step",
            &AnalyzeStepRequest {
                document_id,
                step_id: step,
                session_id,
            },
            ("document", document_id),
        )
        .await
    }

    async fn merge_modify(
        &self,
        document_id: &str,
        issues: &[Issue],
        mode: MergeMode,
        notes: Option<&str>,
    ) -> Result<MergeOutcome, FlowError> {
        self.post_json(
            "/api/analysis/merge-modify",
            &MergeModifyRequestBody {
                document_id,
                issues,
                mode,
                notes,
            },
            ("document", document_id),
        )
        .await
    }

    async fn flow_start(
        &self,
        document_id: &str,
        mode: SessionMode,
    ) -> Result<FlowStartResponse, FlowError> {
        self.post_json(
            "/api/flow/start",
            &FlowStartRequest { document_id, mode },
            ("document", document_id),
        )
        .await
    }

    async fn flow_complete_level(
        &self,
        session_id: &str,
        result: &StepResultPayload,
    ) -> Result<Session, FlowError> {
        self.post_json(
            &format!("/api/flow/{session_id}/complete"),
            result,
            ("session", session_id),
        )
        .await
    }

    async fn flow_skip_level(
        &self,
        session_id: &str,
        step: StepId,
    ) -> Result<Session, FlowError> {
        self.post_json(
            &format!("/api/flow/{session_id}/skip"),
            &SkipRequest { step_id: step },
            ("session", session_id),
        )
        .await
    }

    async fn session_progress(&self, session_id: &str) -> Result<SessionProgress, FlowError> {
        self.get_json(
            &format!("/api/flow/{session_id}/progress"),
            ("session", session_id),
        )
        .await
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatus, FlowError> {
        let response: JobStatusResponse = self
            .get_json(&format!("/api/jobs/{job_id}"), ("job", job_id))
            .await?;
        Ok(response.status)
    }
}
