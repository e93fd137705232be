use super::{ContentGenerator, GenerationRequest, Part};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::retry::{into_terminal, retry, RetryPolicy, Sleeper, TokioSleeper};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

#[derive(Debug, Serialize)]
struct GenerateBody {
    system_instruction: Content,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WirePart {
    Text { text: String },
    Inline { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct Tool {
    google_search: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default, rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl GenerateResponse {
    fn into_text(self) -> (String, Option<String>) {
        let Some(first) = self.candidates.into_iter().next() else {
            return (String::new(), None);
        };
        let text = first
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        (text.trim().to_string(), first.finish_reason)
    }
}

/// Gemini `generateContent` REST client
pub struct GeminiClient {
    client: Client,
    endpoint: Url,
    model: String,
    api_key: String,
    grounding: bool,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl GeminiClient {
    pub fn new(api_base: &str, model: &str, api_key: String, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(&format!(
            "{}/v1beta/models/{}:generateContent",
            api_base.trim_end_matches('/'),
            model
        ))
        .map_err(|e| Error::Config(format!("Invalid LLM API base: {}", e)))?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            model: model.to_string(),
            api_key,
            grounding: false,
            retry: RetryPolicy::none(),
            sleeper: Arc::new(TokioSleeper),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Self::new(
            &config.llm.api_base,
            &config.llm.model,
            config.llm_api_key()?,
            Duration::from_secs(config.llm.timeout_secs),
        )?;
        Ok(client
            .with_grounding(config.llm.grounding)
            .with_retry(config.llm.retry.policy(), Arc::new(TokioSleeper)))
    }

    pub fn with_retry(mut self, policy: RetryPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        self.retry = policy;
        self.sleeper = sleeper;
        self
    }

    pub fn with_grounding(mut self, grounding: bool) -> Self {
        self.grounding = grounding;
        self
    }

    fn body(&self, request: &GenerationRequest) -> GenerateBody {
        let parts = request
            .parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => WirePart::Text { text: text.clone() },
                Part::Image(image) => WirePart::Inline {
                    inline_data: InlineData {
                        mime_type: image.mime.clone(),
                        data: BASE64.encode(&image.bytes),
                    },
                },
            })
            .collect();

        GenerateBody {
            system_instruction: Content {
                role: None,
                parts: vec![WirePart::Text {
                    text: request.system_instruction.clone(),
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts,
            }],
            tools: if self.grounding {
                vec![Tool {
                    google_search: serde_json::json!({}),
                }]
            } else {
                Vec::new()
            },
        }
    }

    async fn generate_once(&self, body: &GenerateBody) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|e| match e.error.status {
                    Some(s) => format!("{} ({})", e.error.message, s),
                    None => e.error.message,
                })
                .unwrap_or(text);
            let message = format!("HTTP {}: {}", status.as_u16(), message);
            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                return Err(Error::transient("gemini", message));
            }
            return Err(Error::GenerationFailed(message));
        }

        let parsed: GenerateResponse = response.json().await?;
        let (text, finish_reason) = parsed.into_text();
        if text.is_empty() {
            return Err(Error::transient(
                "gemini",
                format!(
                    "empty response (finish reason: {})",
                    finish_reason.as_deref().unwrap_or("none")
                ),
            ));
        }
        Ok(text)
    }
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let body = self.body(request);
        debug!(
            "Generating with {} ({} parts, grounding: {})",
            self.model,
            request.parts.len(),
            self.grounding
        );

        let text = retry(&self.retry, self.sleeper.as_ref(), "Gemini generation", |_| {
            self.generate_once(&body)
        })
        .await
        .map_err(|e| into_terminal(e, Error::GenerationFailed))?;

        info!("Generated {} characters with {}", text.chars().count(), self.model);
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::ImageData;
    use crate::retry::testing::RecordingSleeper;
    use crate::retry::Backoff;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GENERATE_PATH: &str = "/v1beta/models/gemini-test:generateContent";

    fn ok_body(text: &str) -> serde_json::Value {
        json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": text}, {"text": " #tag"}]},
                "finishReason": "STOP"
            }]
        })
    }

    fn client(server: &MockServer, sleeper: Arc<RecordingSleeper>) -> GeminiClient {
        GeminiClient::new(
            &server.uri(),
            "gemini-test",
            "test-key".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_grounding(true)
        .with_retry(
            RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_secs(30),
                backoff: Backoff::Linear,
            },
            sleeper,
        )
    }

    #[tokio::test]
    async fn test_generate_sends_parts_and_joins_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(json!({
                "system_instruction": {"parts": [{"text": "be brief"}]},
                "contents": [{"role": "user", "parts": [
                    {"inline_data": {"mime_type": "image/png", "data": "AQID"}},
                    {"text": "Caption this image."}
                ]}],
                "tools": [{"google_search": {}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("Ciao")))
            .expect(1)
            .mount(&server)
            .await;

        let gemini = client(&server, Arc::new(RecordingSleeper::default()));
        let request = GenerationRequest::image(
            "be brief",
            ImageData::new(vec![1, 2, 3], "image/png", "x.png"),
            "Caption this image.",
        );
        let text = gemini.generate(&request).await.unwrap();
        assert_eq!(text, "Ciao #tag");
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("Dopo")))
            .mount(&server)
            .await;

        let sleeper = Arc::new(RecordingSleeper::default());
        let gemini = client(&server, sleeper.clone());
        let text = gemini
            .generate(&GenerationRequest::text("sys", "prompt"))
            .await
            .unwrap();
        assert_eq!(text, "Dopo #tag");
        assert_eq!(sleeper.recorded(), vec![Duration::from_secs(30)]);
    }

    #[tokio::test]
    async fn test_client_error_is_terminal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let sleeper = Arc::new(RecordingSleeper::default());
        let gemini = client(&server, sleeper.clone());
        let err = gemini
            .generate(&GenerationRequest::text("sys", "prompt"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::GenerationFailed(ref m) if m.contains("API key not valid")));
        assert!(sleeper.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_empty_output_exhausts_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
            .expect(3)
            .mount(&server)
            .await;

        let sleeper = Arc::new(RecordingSleeper::default());
        let gemini = client(&server, sleeper.clone());
        let err = gemini
            .generate(&GenerationRequest::text("sys", "prompt"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::GenerationFailed(_)));
        assert_eq!(
            sleeper.recorded(),
            vec![Duration::from_secs(30), Duration::from_secs(60)]
        );
    }
}
