// Enhancer - slow path that rewrites a templated sentence
//
// The dispatcher only sees the `Enhancer` trait. `HttpEnhancer` talks to a
// JSON translation/rephrasing backend; `PassthroughEnhancer` returns the
// input unchanged and is used when no endpoint is configured.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::config::DispatchConfig;
use crate::error::EnhanceError;

/// Backend turning a sentence into a better one in `language`
pub trait Enhancer: Send + Sync {
    fn enhance<'a>(
        &'a self,
        text: &'a str,
        language: &'a str,
    ) -> BoxFuture<'a, Result<String, EnhanceError>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughEnhancer;

impl Enhancer for PassthroughEnhancer {
    fn enhance<'a>(
        &'a self,
        text: &'a str,
        _language: &'a str,
    ) -> BoxFuture<'a, Result<String, EnhanceError>> {
        Box::pin(async move { Ok(text.to_string()) })
    }
}

#[derive(Debug, Serialize)]
struct EnhanceRequest<'a> {
    text: &'a str,
    target_lang: &'a str,
}

#[derive(Debug, Deserialize)]
struct EnhanceResponse {
    text: String,
}

/// JSON-over-HTTP enhancement backend
///
/// POSTs `{"text", "target_lang"}` and expects `{"text"}` back. Requests for
/// the source language are answered locally without a network call.
pub struct HttpEnhancer {
    http_client: reqwest::Client,
    endpoint: String,
    source_language: String,
}

impl HttpEnhancer {
    pub fn new(
        endpoint: impl Into<String>,
        source_language: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, EnhanceError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
            source_language: source_language.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn request(&self, text: &str, language: &str) -> Result<String, EnhanceError> {
        let request = EnhanceRequest {
            text,
            target_lang: language,
        };
        let resp = self
            .http_client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EnhanceError::BadStatus {
                status: status.as_u16(),
                body,
            });
        }

        let payload: EnhanceResponse = resp.json().await?;
        clean_enhanced(&payload.text).ok_or_else(|| EnhanceError::InvalidResponse {
            reason: "empty text".to_string(),
        })
    }
}

impl Enhancer for HttpEnhancer {
    fn enhance<'a>(
        &'a self,
        text: &'a str,
        language: &'a str,
    ) -> BoxFuture<'a, Result<String, EnhanceError>> {
        Box::pin(async move {
            if language == self.source_language || text.trim().is_empty() {
                return Ok(text.to_string());
            }
            self.request(text, language).await
        })
    }
}

/// Backend selected by configuration: HTTP when an endpoint is set
pub fn enhancer_from_config(config: &DispatchConfig) -> Result<Arc<dyn Enhancer>, EnhanceError> {
    match &config.endpoint {
        Some(endpoint) => {
            log::info!("[Enhancer] using HTTP backend at {}", endpoint);
            let enhancer = HttpEnhancer::new(
                endpoint.clone(),
                config.default_language.clone(),
                Duration::from_millis(config.enhance_timeout_ms),
            )?;
            Ok(Arc::new(enhancer))
        }
        None => Ok(Arc::new(PassthroughEnhancer)),
    }
}

/// First non-empty line, trimmed, without surrounding quotes
pub(crate) fn clean_enhanced(raw: &str) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|line| !line.is_empty())?;
    let cleaned = line.trim_matches(|c| c == '"' || c == '\'').trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}
