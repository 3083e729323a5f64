pub mod error;
pub mod types;

pub use error::{ApifyError, Result};
pub use types::{
    ExtractionRules, GoogleSearchInput, PollPolicy, ProxyConfiguration, RunData, RunPhase,
    StartUrl, WebScraperInput,
};

use serde::Serialize;
use types::{ApiResponse, DatasetPayload};

const BASE_URL: &str = "https://api.apify.com/v2";

/// Actor ID for apify/google-search-scraper.
pub const GOOGLE_SEARCH_SCRAPER: &str = "apify/google-search-scraper";

/// Actor ID for apify/web-scraper.
pub const WEB_SCRAPER: &str = "apify/web-scraper";

pub struct ApifyClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl ApifyClient {
    pub fn new(token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Apify paths use `~` instead of `/` in actor IDs (`apify/web-scraper` → `apify~web-scraper`).
    pub fn encode_actor_id(actor_id: &str) -> String {
        actor_id.replace('/', "~")
    }

    /// Start an actor run. Returns immediately with run metadata.
    pub async fn start_run<I: Serialize + ?Sized>(&self, actor_id: &str, input: &I) -> Result<RunData> {
        let url = format!(
            "{}/acts/{}/runs",
            self.base_url,
            Self::encode_actor_id(actor_id)
        );
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(input)
            .send()
            .await?;

        let resp = error_for_status(resp).await?;
        let api_resp: ApiResponse<RunData> = resp.json().await?;
        Ok(api_resp.data)
    }

    /// Fetch the current state of a run.
    pub async fn get_run(&self, run_id: &str) -> Result<RunData> {
        let url = format!("{}/actor-runs/{}", self.base_url, run_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let resp = error_for_status(resp).await?;
        let api_resp: ApiResponse<RunData> = resp.json().await?;
        Ok(api_resp.data)
    }

    /// Poll until a run reaches a terminal state or the policy runs out.
    ///
    /// A poll that fails at the transport or HTTP level counts as "still running";
    /// only terminal run states and the poll ceiling end the loop early.
    pub async fn wait_for_run(&self, run_id: &str, policy: PollPolicy) -> Result<RunData> {
        for poll in 1..=policy.max_polls {
            tokio::time::sleep(policy.interval).await;

            let run = match self.get_run(run_id).await {
                Ok(run) => run,
                Err(e) => {
                    tracing::debug!(run_id, poll, error = %e, "Run status poll failed");
                    continue;
                }
            };

            match run.phase() {
                RunPhase::Succeeded => return Ok(run),
                RunPhase::Failed => {
                    return Err(ApifyError::RunFailed {
                        status: run.status,
                        message: run.status_message.unwrap_or_default(),
                    });
                }
                RunPhase::InProgress => {
                    if poll % 30 == 0 {
                        tracing::info!(run_id, poll, status = %run.status, "Run still in progress");
                    } else {
                        tracing::debug!(run_id, poll, status = %run.status, "Run still in progress");
                    }
                }
            }
        }

        Err(ApifyError::Timeout {
            run_id: run_id.to_string(),
            polls: policy.max_polls,
        })
    }

    /// Fetch raw dataset items. Items are left untyped; callers own the schema.
    pub async fn get_dataset_items(&self, dataset_id: &str) -> Result<Vec<serde_json::Value>> {
        let url = format!(
            "{}/datasets/{}/items?format=json&clean=false",
            self.base_url, dataset_id
        );
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let resp = error_for_status(resp).await?;
        let payload: DatasetPayload = resp.json().await?;
        Ok(payload.into_items())
    }

    /// Run an actor end-to-end: start run, poll, fetch results.
    ///
    /// Start and poll failures are returned as errors. A dataset that cannot be
    /// fetched after a successful run yields an empty list.
    pub async fn run_actor<I: Serialize + ?Sized>(
        &self,
        actor_id: &str,
        input: &I,
        policy: PollPolicy,
    ) -> Result<Vec<serde_json::Value>> {
        tracing::info!(actor_id, "Starting actor run");

        let run = self.start_run(actor_id, input).await?;
        tracing::info!(run_id = %run.id, "Apify run started, polling for completion");

        let completed = self.wait_for_run(&run.id, policy).await?;
        let Some(dataset_id) = completed.default_dataset_id.or(run.default_dataset_id) else {
            return Err(ApifyError::MissingDataset {
                run_id: completed.id,
            });
        };
        tracing::info!(run_id = %completed.id, dataset_id = %dataset_id, "Run completed, fetching results");

        match self.get_dataset_items(&dataset_id).await {
            Ok(items) => {
                tracing::info!(count = items.len(), "Fetched dataset items");
                Ok(items)
            }
            Err(e) => {
                tracing::warn!(dataset_id = %dataset_id, error = %e, "Dataset fetch failed");
                Ok(Vec::new())
            }
        }
    }

    /// Check that the token is accepted by the API.
    pub async fn validate_token(&self) -> bool {
        let url = format!("{}/users/me", self.base_url);
        match self.client.get(&url).bearer_auth(&self.token).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::warn!(error = %e, "Apify token validation failed");
                false
            }
        }
    }
}

async fn error_for_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ApifyError::Api {
        status: status.as_u16(),
        message: body,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn fast_policy(max_polls: u32) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(1),
            max_polls,
        }
    }

    fn run_body(status: &str) -> serde_json::Value {
        json!({
            "data": {
                "id": "run-1",
                "status": status,
                "defaultDatasetId": "ds-1"
            }
        })
    }

    async fn client_for(server: &MockServer) -> ApifyClient {
        ApifyClient::new("token".to_string()).with_base_url(server.uri())
    }

    #[test]
    fn actor_ids_use_tilde_in_paths() {
        assert_eq!(
            ApifyClient::encode_actor_id("apify/google-search-scraper"),
            "apify~google-search-scraper"
        );
    }

    #[tokio::test]
    async fn run_actor_starts_polls_and_fetches() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/acts/apify~web-scraper/runs"))
            .and(header("authorization", "Bearer token"))
            .respond_with(ResponseTemplate::new(201).set_body_json(run_body("READY")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/actor-runs/run-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(run_body("SUCCEEDED")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/datasets/ds-1/items"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{"name": "Ana"}, {"name": "Luis"}])),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let items = client
            .run_actor(WEB_SCRAPER, &json!({}), fast_policy(5))
            .await
            .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["name"], "Ana");
    }

    #[tokio::test]
    async fn failed_run_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/actor-runs/run-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(run_body("ABORTED")))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.wait_for_run("run-1", fast_policy(5)).await.unwrap_err();
        assert!(matches!(err, ApifyError::RunFailed { ref status, .. } if status == "ABORTED"));
        assert!(err.is_run_outcome());
    }

    #[tokio::test]
    async fn polling_gives_up_after_max_polls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/actor-runs/run-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(run_body("RUNNING")))
            .expect(3)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.wait_for_run("run-1", fast_policy(3)).await.unwrap_err();
        assert!(matches!(err, ApifyError::Timeout { polls: 3, .. }));
    }

    #[tokio::test]
    async fn rejected_start_surfaces_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/acts/apify~web-scraper/runs"))
            .respond_with(ResponseTemplate::new(402).set_body_string("out of credits"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client
            .run_actor(WEB_SCRAPER, &json!({}), fast_policy(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ApifyError::Api { status: 402, .. }));
        assert!(!err.is_run_outcome());
    }

    #[tokio::test]
    async fn unreadable_dataset_yields_empty_items() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/acts/apify~web-scraper/runs"))
            .respond_with(ResponseTemplate::new(201).set_body_json(run_body("READY")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/actor-runs/run-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(run_body("SUCCEEDED")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/datasets/ds-1/items"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let items = client
            .run_actor(WEB_SCRAPER, &json!({}), fast_policy(2))
            .await
            .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn validate_token_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert!(!client.validate_token().await);
    }
}
