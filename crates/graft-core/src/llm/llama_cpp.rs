use futures::channel::mpsc;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{GraftError, Result};
use crate::llm::traits::*;

/// Client for a llama.cpp server. The `/completion` endpoint takes a flat
/// prompt, so chat turns are rendered into an instruction template first.
pub struct LlamaCppClient {
    client: reqwest::Client,
    base_url: String,
}

impl LlamaCppClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "http://localhost:8080".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn render_prompt(request: &CompletionRequest) -> String {
        let mut prompt = String::new();
        let system = request.system_prompt();
        if !system.is_empty() {
            prompt.push_str(&system);
            prompt.push_str("\n\n");
        }
        for message in request.conversation_messages() {
            let role = match message.role {
                Role::Assistant => "Assistant",
                _ => "User",
            };
            prompt.push_str(&format!("### {role}:\n{}\n", message.content));
        }
        prompt.push_str("### Assistant:\n");
        prompt
    }

    fn build_request_body(&self, request: &CompletionRequest, stream: bool) -> Value {
        let mut body = serde_json::json!({
            "prompt": Self::render_prompt(request),
            "n_predict": request.max_tokens,
            "stream": stream,
        });
        if let Some(temperature) = request.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }
        body
    }
}

impl Default for LlamaCppClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct LlamaCppChunk {
    #[serde(default)]
    content: String,
    #[serde(default)]
    stop: bool,
}

#[async_trait::async_trait]
impl LlmClient for LlamaCppClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let url = format!("{}/completion", self.base_url);
        let body = self.build_request_body(request, false);

        let response = self.client.post(&url).json(&body).send().await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            return Err(GraftError::llm(format!(
                "llama.cpp error ({status}): {response_text}"
            )));
        }

        let chunk: LlamaCppChunk = serde_json::from_str(&response_text)
            .map_err(|e| GraftError::llm(format!("failed to parse response: {e}")))?;

        Ok(chunk.content)
    }

    async fn complete_stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<mpsc::UnboundedReceiver<StreamEvent>> {
        let url = format!("{}/completion", self.base_url);
        let body = self.build_request_body(request, true);

        let response = self.client.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GraftError::llm(format!(
                "llama.cpp error ({status}): {text}"
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

                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };

                    if let Ok(parsed) = serde_json::from_str::<LlamaCppChunk>(data) {
                        if !parsed.content.is_empty() {
                            let _ = tx.unbounded_send(StreamEvent::TextDelta(parsed.content));
                        }
                        if parsed.stop {
                            let _ = tx.unbounded_send(StreamEvent::Done);
                            return;
                        }
                    }
                }
            }

            let _ = tx.unbounded_send(StreamEvent::Done);
        });

        Ok(rx)
    }
}
