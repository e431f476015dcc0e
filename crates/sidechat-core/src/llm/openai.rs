use crate::error::SidechatError;
use crate::llm::traits::*;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Client for OpenAI-compatible `/chat/completions` endpoints.
pub struct OpenAIClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAIClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn post(&self, body: &ChatCompletionRequest<'_>) -> Result<reqwest::Response, SidechatError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SidechatError::Llm(format!(
                "chat completion API error ({}): {}",
                status, text
            )));
        }
        Ok(response)
    }
}

#[derive(Debug, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
    messages: &'a [Message],
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatCompletionChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    content: Option<String>,
}

#[async_trait::async_trait]
impl LlmClient for OpenAIClient {
    async fn chat(&self, messages: &[Message]) -> Result<LlmResponse, SidechatError> {
        let request_body = ChatCompletionRequest {
            model: &self.model,
            stream: None,
            stream_options: None,
            messages,
        };

        let response_text = self.post(&request_body).await?.text().await?;

        let api_response: ChatCompletionResponse = serde_json::from_str(&response_text)
            .map_err(|e| SidechatError::Llm(format!("Failed to parse response: {e}")))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| SidechatError::Llm("No response from API".into()))?;

        Ok(LlmResponse {
            message: Message::assistant(choice.message.content.unwrap_or_default()),
            usage: api_response.usage,
        })
    }

    async fn chat_stream(&self, messages: &[Message]) -> Result<ByteStream, SidechatError> {
        let request_body = ChatCompletionRequest {
            model: &self.model,
            stream: Some(true),
            stream_options: Some(StreamOptions {
                include_usage: true,
            }),
            messages,
        };

        tracing::debug!(model = %self.model, messages = messages.len(), "opening chat stream");
        let response = self.post(&request_body).await?;

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(SidechatError::from))
            .boxed())
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stream_request_body_shape() {
        let messages = vec![Message::system("be brief"), Message::user("hi")];
        let body = ChatCompletionRequest {
            model: "m",
            stream: Some(true),
            stream_options: Some(StreamOptions {
                include_usage: true,
            }),
            messages: &messages,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "model": "m",
                "stream": true,
                "stream_options": {"include_usage": true},
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "hi"}
                ]
            })
        );
    }

    #[test]
    fn test_batched_request_omits_stream_fields() {
        let messages = vec![Message::user("hi")];
        let body = ChatCompletionRequest {
            model: "m",
            stream: None,
            stream_options: None,
            messages: &messages,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("stream").is_none());
        assert!(value.get("stream_options").is_none());
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = OpenAIClient::new("k").with_base_url("http://localhost:8080/v1/");
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/chat/completions");
    }
}
