mod client;
pub(crate) mod types;

use anyhow::{anyhow, Result};

use client::OpenAiClient;

// =============================================================================
// OpenAi Agent
// =============================================================================

#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    pub(crate) model: String,
    base_url: Option<String>,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Get the model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub(crate) fn client(&self) -> OpenAiClient {
        OpenAiClient::new(&self.api_key, self.base_url.as_deref())
    }

    /// Single-turn chat completion returning the first choice's text.
    pub async fn chat_completion(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String> {
        let request = types::ChatRequest::new(&self.model)
            .message(types::WireMessage::system(system))
            .message(types::WireMessage::user(user))
            .temperature(temperature)
            .token_limit(max_tokens);

        let response = self.client().chat(&request).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("No response from OpenAI"))
    }

    /// True if the configured key can reach the configured model.
    pub async fn is_reachable(&self) -> bool {
        match self.client().get_model(&self.model).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(model = %self.model, error = %e, "OpenAI connection check failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn test_openai_new() {
        let ai = OpenAi::new("sk-test", "gpt-4o-mini");
        assert_eq!(ai.model(), "gpt-4o-mini");
        assert_eq!(ai.api_key, "sk-test");
        assert_eq!(ai.base_url, None);
    }

    #[tokio::test]
    async fn chat_completion_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({"model": "gpt-4o-mini", "max_tokens": 500})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "{\"ok\":true}"}}]
            })))
            .mount(&server)
            .await;

        let ai = OpenAi::new("sk-test", "gpt-4o-mini").with_base_url(server.uri());
        let reply = ai.chat_completion("sys", "user", 0.3, 500).await.unwrap();
        assert_eq!(reply, "{\"ok\":true}");
    }

    #[tokio::test]
    async fn chat_completion_surfaces_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let ai = OpenAi::new("sk-test", "gpt-4o-mini").with_base_url(server.uri());
        let err = ai.chat_completion("sys", "user", 0.3, 500).await.unwrap_err();
        assert!(err.to_string().contains("rate limited"));
    }

    #[tokio::test]
    async fn reachability_follows_model_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models/gpt-4o-mini"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "gpt-4o-mini"})))
            .mount(&server)
            .await;

        let ai = OpenAi::new("sk-test", "gpt-4o-mini").with_base_url(server.uri());
        assert!(ai.is_reachable().await);

        let missing = OpenAi::new("sk-test", "gpt-unknown").with_base_url(server.uri());
        assert!(!missing.is_reachable().await);
    }
}
