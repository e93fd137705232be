use super::{OutgoingMessage, ParseMode, PublishAck, Publisher};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::media::ImageData;
use crate::retry::{into_terminal, retry, RetryPolicy, Sleeper, TokioSleeper};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Telegram rejects photo captions longer than this
pub const CAPTION_LIMIT: usize = 1024;

#[derive(Debug, Serialize)]
struct SendMessageBody<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    result: Option<SentMessage>,
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

/// Telegram Bot API client
pub struct TelegramClient {
    client: Client,
    api_base: String,
    token: String,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl TelegramClient {
    pub fn new(api_base: &str, token: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
            retry: RetryPolicy::none(),
            sleeper: Arc::new(TokioSleeper),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Self::new(
            &config.telegram.api_base,
            config.telegram_bot_token()?,
            Duration::from_secs(config.telegram.timeout_secs),
        )?;
        Ok(client.with_retry(config.telegram.retry.policy(), Arc::new(TokioSleeper)))
    }

    pub fn with_retry(mut self, policy: RetryPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        self.retry = policy;
        self.sleeper = sleeper;
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    async fn read_response(response: reqwest::Response) -> Result<i64> {
        let status = response.status();
        let text = response.text().await.map_err(|e| Error::Http(e.without_url()))?;
        let parsed: ApiResponse = match serde_json::from_str(&text) {
            Ok(parsed) => parsed,
            Err(_) => {
                let message = format!("HTTP {} with unreadable body", status.as_u16());
                if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    return Err(Error::transient("telegram", message));
                }
                return Err(Error::PublishFailed(message));
            }
        };

        if parsed.ok {
            if let Some(sent) = parsed.result {
                return Ok(sent.message_id);
            }
            return Err(Error::PublishFailed(
                "Telegram acknowledged without a message".to_string(),
            ));
        }

        let code = parsed.error_code.unwrap_or(status.as_u16());
        let message = format!(
            "Telegram error {}: {}",
            code,
            parsed.description.as_deref().unwrap_or("no description")
        );
        if code == 429 || code >= 500 {
            Err(Error::transient("telegram", message))
        } else {
            Err(Error::PublishFailed(message))
        }
    }

    async fn send_message_once(&self, chat_id: &str, text: &str, mode: ParseMode) -> Result<i64> {
        let body = SendMessageBody {
            chat_id,
            text,
            parse_mode: mode.as_telegram(),
        };
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Http(e.without_url()))?;
        Self::read_response(response).await
    }

    async fn send_photo_once(
        &self,
        chat_id: &str,
        image: &ImageData,
        caption: Option<&str>,
        mode: ParseMode,
    ) -> Result<i64> {
        let photo = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.mime)?;
        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("photo", photo);
        if let Some(caption) = caption {
            form = form.text("caption", caption.to_string());
            if let Some(mode) = mode.as_telegram() {
                form = form.text("parse_mode", mode);
            }
        }

        let response = self
            .client
            .post(self.method_url("sendPhoto"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Http(e.without_url()))?;
        Self::read_response(response).await
    }

    /// Send a text message, retrying transient failures
    pub async fn send_message(&self, chat_id: &str, text: &str, mode: ParseMode) -> Result<i64> {
        retry(&self.retry, self.sleeper.as_ref(), "Telegram sendMessage", |_| {
            self.send_message_once(chat_id, text, mode)
        })
        .await
        .map_err(|e| into_terminal(e, Error::PublishFailed))
    }

    /// Send a photo, retrying transient failures
    pub async fn send_photo(
        &self,
        chat_id: &str,
        image: &ImageData,
        caption: Option<&str>,
        mode: ParseMode,
    ) -> Result<i64> {
        retry(&self.retry, self.sleeper.as_ref(), "Telegram sendPhoto", |_| {
            self.send_photo_once(chat_id, image, caption, mode)
        })
        .await
        .map_err(|e| into_terminal(e, Error::PublishFailed))
    }
}

#[async_trait]
impl Publisher for TelegramClient {
    async fn publish(&self, message: &OutgoingMessage) -> Result<PublishAck> {
        let chat_id = message.chat_id.as_str();
        let mut message_ids = Vec::new();

        match &message.image {
            Some(image) if message.text.chars().count() <= CAPTION_LIMIT => {
                debug!("Sending photo with caption to {}", chat_id);
                let id = self
                    .send_photo(chat_id, image, Some(&message.text), message.parse_mode)
                    .await?;
                message_ids.push(id);
            }
            Some(image) => {
                // The text goes first: if the channel rejects it nothing is live yet.
                // A photo that fails afterwards leaves a complete text-only post.
                debug!("Caption too long, sending text then photo separately");
                let id = self
                    .send_message(chat_id, &message.text, message.parse_mode)
                    .await?;
                message_ids.push(id);
                match self.send_photo(chat_id, image, None, message.parse_mode).await {
                    Ok(photo_id) => message_ids.push(photo_id),
                    Err(e) => {
                        warn!("Message {} is live without its photo: {}", id, e);
                        return Ok(PublishAck {
                            ok: true,
                            message_ids,
                            description: Some(format!("photo not sent: {}", e)),
                        });
                    }
                }
            }
            None => {
                let id = self
                    .send_message(chat_id, &message.text, message.parse_mode)
                    .await?;
                message_ids.push(id);
            }
        }

        info!("Published to Telegram: message ids {:?}", message_ids);
        Ok(PublishAck {
            ok: true,
            message_ids,
            description: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::testing::RecordingSleeper;
    use crate::retry::Backoff;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sent(id: i64) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": {"message_id": id, "chat": {"id": -100}, "date": 0}
        }))
    }

    fn client(server: &MockServer, sleeper: Arc<RecordingSleeper>) -> TelegramClient {
        TelegramClient::new(&server.uri(), "123:abc".to_string(), Duration::from_secs(5))
            .unwrap()
            .with_retry(
                RetryPolicy {
                    max_attempts: 3,
                    base_delay: Duration::from_secs(30),
                    backoff: Backoff::Constant,
                },
                sleeper,
            )
    }

    fn message(text: &str, image: Option<ImageData>) -> OutgoingMessage {
        OutgoingMessage {
            chat_id: "@canale".to_string(),
            text: text.to_string(),
            image,
            parse_mode: ParseMode::Markdown,
        }
    }

    #[tokio::test]
    async fn test_send_text_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .and(body_partial_json(json!({
                "chat_id": "@canale",
                "text": "Ciao *mondo*",
                "parse_mode": "Markdown"
            })))
            .respond_with(sent(42))
            .expect(1)
            .mount(&server)
            .await;

        let telegram = client(&server, Arc::new(RecordingSleeper::default()));
        let ack = telegram.publish(&message("Ciao *mondo*", None)).await.unwrap();
        assert!(ack.ok);
        assert_eq!(ack.message_ids, vec![42]);
    }

    #[tokio::test]
    async fn test_not_ok_is_terminal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: chat not found"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let sleeper = Arc::new(RecordingSleeper::default());
        let telegram = client(&server, sleeper.clone());
        let err = telegram.publish(&message("hi", None)).await.unwrap_err();
        assert!(matches!(err, Error::PublishFailed(ref m) if m.contains("chat not found")));
        assert!(sleeper.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "ok": false,
                "error_code": 429,
                "description": "Too Many Requests: retry after 5"
            })))
            .up_to_n_times(2)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .respond_with(sent(7))
            .mount(&server)
            .await;

        let sleeper = Arc::new(RecordingSleeper::default());
        let telegram = client(&server, sleeper.clone());
        let ack = telegram.publish(&message("hi", None)).await.unwrap();
        assert_eq!(ack.message_ids, vec![7]);
        assert_eq!(sleeper.recorded().len(), 2);
    }

    #[tokio::test]
    async fn test_retries_exhausted_is_publish_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .respond_with(ResponseTemplate::new(502))
            .expect(3)
            .mount(&server)
            .await;

        let telegram = client(&server, Arc::new(RecordingSleeper::default()));
        let err = telegram.publish(&message("hi", None)).await.unwrap_err();
        assert!(matches!(err, Error::PublishFailed(_)));
    }

    #[tokio::test]
    async fn test_photo_with_caption() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendPhoto"))
            .and(body_string_contains("name=\"caption\""))
            .respond_with(sent(5))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .respond_with(sent(6))
            .expect(0)
            .mount(&server)
            .await;

        let telegram = client(&server, Arc::new(RecordingSleeper::default()));
        let image = ImageData::new(vec![0xff, 0xd8, 0xff], "image/jpeg", "cat.jpg");
        let ack = telegram
            .publish(&message("Un gatto", Some(image)))
            .await
            .unwrap();
        assert_eq!(ack.message_ids, vec![5]);
    }

    #[tokio::test]
    async fn test_long_caption_is_sent_separately() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendPhoto"))
            .respond_with(sent(5))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .respond_with(sent(6))
            .expect(1)
            .mount(&server)
            .await;

        let telegram = client(&server, Arc::new(RecordingSleeper::default()));
        let image = ImageData::new(vec![0xff, 0xd8, 0xff], "image/jpeg", "cat.jpg");
        let long_text = "a".repeat(CAPTION_LIMIT + 1);
        let ack = telegram
            .publish(&message(&long_text, Some(image)))
            .await
            .unwrap();
        assert_eq!(ack.message_ids, vec![6, 5]);
    }

    #[tokio::test]
    async fn test_rejected_long_text_publishes_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: can't parse entities"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendPhoto"))
            .respond_with(sent(5))
            .expect(0)
            .mount(&server)
            .await;

        let telegram = client(&server, Arc::new(RecordingSleeper::default()));
        let image = ImageData::new(vec![0xff, 0xd8, 0xff], "image/jpeg", "cat.jpg");
        let long_text = "*".repeat(CAPTION_LIMIT + 10);
        let err = telegram
            .publish(&message(&long_text, Some(image)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PublishFailed(ref m) if m.contains("can't parse entities")));
    }

    #[tokio::test]
    async fn test_failed_photo_after_long_text_is_still_published() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .respond_with(sent(6))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendPhoto"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: IMAGE_PROCESS_FAILED"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let telegram = client(&server, Arc::new(RecordingSleeper::default()));
        let image = ImageData::new(vec![0xff, 0xd8, 0xff], "image/jpeg", "cat.jpg");
        let long_text = "a".repeat(CAPTION_LIMIT + 1);
        let ack = telegram
            .publish(&message(&long_text, Some(image)))
            .await
            .unwrap();
        assert!(ack.ok);
        assert_eq!(ack.message_ids, vec![6]);
        assert!(ack.description.unwrap().contains("photo not sent"));
    }
}
