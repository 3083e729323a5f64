// Thin HTTP layer over the two OpenAI endpoints the enricher touches:
// chat completions and model lookup.

use anyhow::{bail, Context, Result};
use reqwest::{RequestBuilder, Response};
use tracing::debug;

use super::types::{ChatRequest, ChatResponse};

const OPENAI_API_URL: &str = "https://api.openai.com/v1";

pub(crate) struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: &str, base_url: Option<&str>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url
                .unwrap_or(OPENAI_API_URL)
                .trim_end_matches('/')
                .to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Authenticates the request and turns any non-2xx reply into an error
    /// carrying the status and body.
    async fn send(&self, what: &str, request: RequestBuilder) -> Result<Response> {
        let response = request
            .bearer_auth(&self.api_key)
            .send()
            .await
            .with_context(|| format!("OpenAI {what} request failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("OpenAI {what} error ({status}): {body}");
        }
        Ok(response)
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        debug!(model = %request.model, messages = request.messages.len(), "OpenAI chat request");
        let response = self
            .send("chat", self.http.post(self.endpoint("chat/completions")).json(request))
            .await?;
        response
            .json()
            .await
            .context("OpenAI chat response was not valid JSON")
    }

    /// Succeeds only if the key can use `model`.
    pub async fn get_model(&self, model: &str) -> Result<()> {
        let url = self.endpoint(&format!("models/{model}"));
        self.send("model lookup", self.http.get(url)).await?;
        Ok(())
    }
}
