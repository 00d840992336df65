//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per endpoint. When API routes or request
//! formats change, update only this file.

use super::constants::*;
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    // ========================================================================
    // Health
    // ========================================================================

    /// GET /
    pub async fn health(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Health request failed")
    }

    // ========================================================================
    // Analysis
    // ========================================================================

    async fn post_analyze(&self, form: Form) -> Response {
        self.client
            .post(format!("{}/api/analyze", self.base_url))
            .multipart(form)
            .send()
            .await
            .expect("Analyze request failed")
    }

    fn file_part(file_name: &str, content: &[u8]) -> Part {
        Part::bytes(content.to_vec()).file_name(file_name.to_string())
    }

    /// POST /api/analyze with only the audio file
    pub async fn analyze(&self, file_name: &str, content: &[u8]) -> Response {
        let form = Form::new().part("file", Self::file_part(file_name, content));
        self.post_analyze(form).await
    }

    /// POST /api/analyze with the audio file and a client-side transcript
    pub async fn analyze_with_transcript(
        &self,
        file_name: &str,
        content: &[u8],
        transcript: &str,
    ) -> Response {
        let form = Form::new()
            .part("file", Self::file_part(file_name, content))
            .text("transcribed_text", transcript.to_string());
        self.post_analyze(form).await
    }

    /// POST /api/analyze with no file field at all
    pub async fn analyze_without_file(&self, transcript: &str) -> Response {
        let form = Form::new().text("transcribed_text", transcript.to_string());
        self.post_analyze(form).await
    }

    // ========================================================================
    // History
    // ========================================================================

    /// GET /api/history
    pub async fn history(&self, limit: Option<i64>) -> Response {
        let mut request = self.client.get(format!("{}/api/history", self.base_url));
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }
        request.send().await.expect("History request failed")
    }

    // ========================================================================
    // Fusion matrix
    // ========================================================================

    /// GET /api/matrix
    pub async fn matrix(&self) -> Response {
        self.client
            .get(format!("{}/api/matrix", self.base_url))
            .send()
            .await
            .expect("Matrix request failed")
    }

    /// GET /api/matrix/resolve
    pub async fn resolve(&self, audio: &str, text: &str) -> Response {
        self.client
            .get(format!("{}/api/matrix/resolve", self.base_url))
            .query(&[("audio", audio), ("text", text)])
            .send()
            .await
            .expect("Resolve request failed")
    }
}
