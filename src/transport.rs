use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tokio::time::sleep;

#[cfg(test)]
use mockall::automock;

use crate::config::Config;
use crate::error::{ComplianceError, Result};
use crate::models::{GroqRequest, GroqResponse};
use crate::retry::RetryPolicy;

/// Text-completion service boundary
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn chat(&self, req: &GroqRequest) -> Result<GroqResponse>;
}

pub struct GroqTransport {
    client: Client,
    api_key: String,
    api_url: String,
    retry: RetryPolicy,
}

impl GroqTransport {
    pub fn new(
        api_key: String,
        api_url: String,
        request_timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ComplianceError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            api_url,
            retry,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(
            cfg.groq.api_key.clone(),
            cfg.groq.api_url.clone(),
            cfg.request_timeout(),
            RetryPolicy::from(&cfg.retry),
        )
    }
}

#[async_trait]
impl Transport for GroqTransport {
    async fn chat(&self, req: &GroqRequest) -> Result<GroqResponse> {
        let mut attempts = 0;

        loop {
            attempts += 1;

            let last_error = match self
                .client
                .post(&self.api_url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(req)
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response.json().await.map_err(|e| {
                            ComplianceError::Upstream(format!(
                                "Failed to parse Groq API response: {e}"
                            ))
                        });
                    }

                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());

                    // Auth and request errors will not improve on retry
                    if !RetryPolicy::is_retryable_status(status.as_u16()) {
                        return Err(ComplianceError::Upstream(format!(
                            "Groq API error ({status}): {body}"
                        )));
                    }
                    format!("Groq API error ({status}): {body}")
                }
                Err(e) => format!("Failed to send request to Groq API: {e}"),
            };

            if attempts >= self.retry.max_attempts {
                return Err(ComplianceError::Upstream(format!(
                    "{last_error} (after {attempts} attempts)"
                )));
            }

            let delay = self.retry.delay_for(attempts);
            tracing::warn!(
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                "Groq request failed, retrying: {}",
                last_error
            );
            sleep(delay).await;
        }
    }
}
