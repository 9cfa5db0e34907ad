use futures::channel::mpsc;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{GraftError, Result};
use crate::llm::traits::*;

/// Client for the Gemini `generateContent` API. System messages map onto
/// `system_instruction`; assistant turns use the `model` role.
pub struct GoogleClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GoogleClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn build_request_body(&self, request: &CompletionRequest) -> Value {
        let contents: Vec<Value> = request
            .conversation_messages()
            .map(|m| {
                let role = match m.role {
                    Role::Assistant => "model",
                    _ => "user",
                };
                let mut parts = Vec::new();
                if let Some(ref image) = m.image {
                    parts.push(serde_json::json!({
                        "inline_data": {
                            "mime_type": image.media_type,
                            "data": image.data,
                        }
                    }));
                }
                parts.push(serde_json::json!({ "text": m.content }));
                serde_json::json!({ "role": role, "parts": parts })
            })
            .collect();

        let mut generation_config = serde_json::json!({
            "maxOutputTokens": request.max_tokens,
        });
        if let Some(temperature) = request.temperature {
            generation_config["temperature"] = serde_json::json!(temperature);
        }

        let mut body = serde_json::json!({
            "contents": contents,
            "generationConfig": generation_config,
        });

        let system_prompt = request.system_prompt();
        if !system_prompt.is_empty() {
            body["system_instruction"] = serde_json::json!({
                "parts": [{ "text": system_prompt }],
            });
        }

        body
    }

    fn extract_text(value: &Value) -> Option<String> {
        let parts = value
            .get("candidates")?
            .get(0)?
            .get("content")?
            .get("parts")?
            .as_array()?;
        let text: String = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect();
        Some(text)
    }
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    error: GoogleErrorBody,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    message: String,
}

#[async_trait::async_trait]
impl LlmClient for GoogleClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, request.model, self.api_key
        );
        let body = self.build_request_body(request);

        let response = self.client.post(&url).json(&body).send().await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<GoogleError>(&response_text)
                .map(|e| e.error.message)
                .unwrap_or(response_text);
            return Err(GraftError::llm(format!(
                "Google API error ({status}): {message}"
            )));
        }

        let value: Value = serde_json::from_str(&response_text)
            .map_err(|e| GraftError::llm(format!("failed to parse response: {e}")))?;

        Ok(Self::extract_text(&value).unwrap_or_default())
    }

    async fn complete_stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<mpsc::UnboundedReceiver<StreamEvent>> {
        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse&key={}",
            self.base_url, request.model, self.api_key
        );
        let body = self.build_request_body(request);

        let response = self.client.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GraftError::llm(format!(
                "Google API error ({status}): {text}"
            )));
        }

        let (tx, rx) = mpsc::unbounded();

        let mut stream = response.bytes_stream();
        tokio::spawn(async move {
            use futures::StreamExt;
            let mut buffer = String::new();

            while let Some(chunk) = stream.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        let _ = tx.unbounded_send(StreamEvent::Error(e.to_string()));
                        break;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim().to_string();
                    buffer = buffer[line_end + 1..].to_string();

                    if line.is_empty() || !line.starts_with("data: ") {
                        continue;
                    }

                    if let Ok(event) = serde_json::from_str::<Value>(&line[6..]) {
                        if let Some(text) = GoogleClient::extract_text(&event) {
                            if !text.is_empty() {
                                let _ = tx.unbounded_send(StreamEvent::TextDelta(text));
                            }
                        }
                    }
                }
            }

            let _ = tx.unbounded_send(StreamEvent::Done);
        });

        Ok(rx)
    }
}
