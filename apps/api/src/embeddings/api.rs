use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{truncate_for_embedding, Embedder, EmbeddingError};

const MAX_RETRIES: u32 = 3;
/// Inputs per request; larger batches are split.
const BATCH_SIZE: usize = 64;

#[derive(Debug, Clone)]
pub struct EmbeddingApiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

/// OpenAI-compatible `/embeddings` client.
#[derive(Clone)]
pub struct EmbeddingApiClient {
    client: Client,
    config: EmbeddingApiConfig,
}

impl EmbeddingApiClient {
    pub fn new(config: EmbeddingApiConfig) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    fn headers(&self) -> Result<HeaderMap, EmbeddingError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(ref api_key) = self.config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|e| {
                EmbeddingError::Api {
                    status: 0,
                    message: format!("Invalid API key header: {e}"),
                }
            })?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let truncated: Vec<String> = texts.iter().map(|t| truncate_for_embedding(t)).collect();
        let request = EmbeddingRequest {
            model: &self.config.model,
            input: truncated.iter().map(String::as_str).collect(),
        };
        let headers = self.headers()?;
        let url = format!("{}/embeddings", self.config.base_url.trim_end_matches('/'));

        let mut last_error = None;
        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay = Duration::from_millis(250 * 2_u64.pow(attempt - 1));
                warn!(attempt, "Embedding request failed, retrying after {}ms", delay.as_millis());
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&url)
                .headers(headers.clone())
                .json(&request)
                .send()
                .await;

            let resp = match response {
                Ok(resp) => resp,
                Err(e) => {
                    last_error = Some(EmbeddingError::Http(e));
                    continue;
                }
            };

            let status = resp.status();
            if status.is_success() {
                let body: EmbeddingResponse = resp.json().await?;
                return order_embeddings(body.data, texts.len());
            }

            let body = resp.text().await.unwrap_or_default();
            let error = EmbeddingError::Api {
                status: status.as_u16(),
                message: body,
            };
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                last_error = Some(error);
                continue;
            }
            return Err(error);
        }

        Err(last_error.unwrap_or(EmbeddingError::Exhausted {
            retries: MAX_RETRIES,
        }))
    }
}

#[async_trait]
impl Embedder for EmbeddingApiClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            vectors.extend(self.embed_batch(batch).await?);
        }
        debug!(count = vectors.len(), model = %self.config.model, "Embedded texts");
        Ok(vectors)
    }
}

/// Restores input order using the `index` field when the service provides it.
fn order_embeddings(
    mut data: Vec<EmbeddingData>,
    expected: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if data.len() != expected {
        return Err(EmbeddingError::CountMismatch {
            expected,
            got: data.len(),
        });
    }
    if data.iter().all(|d| d.index.is_some()) {
        data.sort_by_key(|d| d.index.unwrap_or_default());
    }
    Ok(data.into_iter().map(|d| d.embedding).collect())
}
