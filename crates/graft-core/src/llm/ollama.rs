use futures::channel::mpsc;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{GraftError, Result};
use crate::llm::traits::*;

/// Client for a local Ollama server. The `/api/chat` endpoint answers with
/// newline-delimited JSON objects when streaming.
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "http://localhost:11434".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn build_request_body(&self, request: &CompletionRequest, stream: bool) -> Value {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|m| {
                let mut message = serde_json::json!({
                    "role": m.role,
                    "content": m.content,
                });
                if let Some(ref image) = m.image {
                    message["images"] = serde_json::json!([image.data]);
                }
                message
            })
            .collect();

        let mut options = serde_json::json!({
            "num_predict": request.max_tokens,
        });
        if let Some(temperature) = request.temperature {
            options["temperature"] = serde_json::json!(temperature);
        }

        serde_json::json!({
            "model": request.model,
            "messages": messages,
            "options": options,
            "stream": stream,
        })
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct OllamaChunk {
    #[serde(default)]
    message: Option<OllamaMessage>,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let body = self.build_request_body(request, false);

        let response = self.client.post(&url).json(&body).send().await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            return Err(GraftError::llm(format!(
                "Ollama error ({status}): {response_text}"
            )));
        }

        let chunk: OllamaChunk = serde_json::from_str(&response_text)
            .map_err(|e| GraftError::llm(format!("failed to parse response: {e}")))?;

        Ok(chunk.message.map(|m| m.content).unwrap_or_default())
    }

    async fn complete_stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<mpsc::UnboundedReceiver<StreamEvent>> {
        let url = format!("{}/api/chat", self.base_url);
        let body = self.build_request_body(request, true);

        let response = self.client.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GraftError::llm(format!("Ollama error ({status}): {text}")));
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

                    if line.is_empty() {
                        continue;
                    }

                    match serde_json::from_str::<OllamaChunk>(&line) {
                        Ok(parsed) => {
                            if let Some(message) = parsed.message {
                                if !message.content.is_empty() {
                                    let _ = tx
                                        .unbounded_send(StreamEvent::TextDelta(message.content));
                                }
                            }
                            if parsed.done {
                                let _ = tx.unbounded_send(StreamEvent::Done);
                                return;
                            }
                        }
                        Err(e) => {
                            tracing::debug!("skipping malformed ollama chunk: {e}");
                        }
                    }
                }
            }

            let _ = tx.unbounded_send(StreamEvent::Done);
        });

        Ok(rx)
    }
}
