//! Google Gemini backend using the `streamGenerateContent` server sent events endpoint.
use crate::completion::{ChatBackend, Completion, CompletionMetrics, CompletionResponse};
use crate::config::ProfileConfig;
use crate::model::ModelConfig;
use crate::provider::resolve_api_key;
use crate::request::{BackendRequest, Dialect};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::stream::{BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

// Gemini has no "system" role in `contents`; a leading message with this role is lifted into
// `systemInstruction`.
const SYSTEM_ROLE: &str = "system";

#[derive(Debug, Clone, Deserialize)]
struct GeminiSettings {
    api_key: String,
    #[serde(default = "default_base_url")]
    base_url: String,
    /// Send the persona as a leading user turn instead of `systemInstruction`.
    #[serde(default)]
    persona_as_user_turn: bool,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

pub struct GeminiBackend {
    config: ModelConfig,
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    persona_as_user_turn: bool,
}

impl GeminiBackend {
    pub fn new(model_config: ModelConfig) -> Result<Self> {
        let settings: GeminiSettings = serde_yaml::from_value(
            serde_yaml::to_value(&model_config.settings)
                .map_err(|_e| anyhow!("Invalid settings structure"))?,
        )?;
        let api_key = resolve_api_key(&settings.api_key)?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {e}"))?;

        Ok(Self {
            config: model_config,
            client,
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            persona_as_user_turn: settings.persona_as_user_turn,
        })
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent",
            self.base_url, self.config.name
        )
    }

    fn to_gemini_request(request: &BackendRequest, profile: &ProfileConfig) -> GeminiRequest {
        let mut messages = request.messages.as_slice();
        let mut system_instruction = None;
        if let Some((first, rest)) = messages.split_first()
            && first.role == SYSTEM_ROLE
        {
            system_instruction = Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: first.text.clone(),
                }],
            });
            messages = rest;
        }

        let contents = messages
            .iter()
            .map(|m| GeminiContent {
                role: Some(m.role.to_string()),
                parts: vec![GeminiPart {
                    text: m.text.clone(),
                }],
            })
            .collect();

        GeminiRequest {
            contents,
            system_instruction,
            generation_config: GeminiGenerationConfig {
                max_output_tokens: profile.max_tokens,
                temperature: profile.temperature,
                top_p: profile.top_p,
            },
        }
    }
}

#[async_trait]
impl ChatBackend for GeminiBackend {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn dialect(&self) -> Dialect {
        Dialect {
            user_role: "user",
            agent_role: "model",
            system_role: if self.persona_as_user_turn {
                None
            } else {
                Some(SYSTEM_ROLE)
            },
        }
    }

    async fn submit(
        &self,
        request: BackendRequest,
        profile: &ProfileConfig,
    ) -> BoxStream<'static, Result<Completion>> {
        let body = Self::to_gemini_request(&request, profile);
        let url = self.stream_url();
        debug!(url = %url, contents = body.contents.len(), "Sending Gemini stream request");

        let send = self
            .client
            .post(url)
            .query(&[("alt", "sse")])
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send();
        let start_time = Instant::now();

        let outer_stream = async_stream::stream! {
            let response = match send.await {
                Ok(response) => response,
                Err(err) => {
                    warn!(error = %err, "Gemini request failed");
                    yield Err(anyhow!("Gemini request failed: {}", err));
                    return;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<GeminiErrorResponse>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                warn!(status = %status, "Gemini API error");
                yield Err(anyhow!("Gemini API error ({}): {}", status, message));
                return;
            }

            let mut prev_time = start_time;
            let mut first_chunk = true;
            let mut metrics = None;
            let mut events = response.bytes_stream().eventsource();

            while let Some(event) = events.next().await {
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        warn!(error = %err, "Gemini stream error");
                        yield Err(anyhow!("Gemini stream error: {}", err));
                        return;
                    }
                };
                if event.data.trim().is_empty() {
                    continue;
                }

                let chunk: GeminiStreamChunk = match serde_json::from_str(&event.data) {
                    Ok(chunk) => chunk,
                    Err(err) => {
                        yield Err(anyhow!("Invalid Gemini stream chunk: {}", err));
                        return;
                    }
                };
                if let Some(error) = chunk.error {
                    yield Err(anyhow!("Gemini stream error: {}", error.message));
                    return;
                }

                let now = Instant::now();
                let elapsed = now.duration_since(prev_time).as_millis() as f32;
                prev_time = now;
                let (prompt_eval_latency, completion_latency) = if first_chunk {
                    first_chunk = false;
                    (elapsed, 0.0)
                } else {
                    (0.0, elapsed)
                };

                if let Some(candidate) = chunk.candidates.into_iter().next() {
                    let text = candidate
                        .content
                        .map(|c| c.parts.into_iter().map(|p| p.text).collect::<String>())
                        .unwrap_or_default();
                    yield Ok(Completion::Response(CompletionResponse {
                        text,
                        finish_reason: candidate.finish_reason.map(|r| r.to_lowercase()),
                    }));
                }

                // Usage is cumulative, the last chunk carries the final numbers
                let m: &mut CompletionMetrics = metrics.get_or_insert_with(CompletionMetrics::default);
                m.prompt_eval_latency_ms += prompt_eval_latency;
                m.completion_latency_ms += completion_latency;
                if let Some(usage) = chunk.usage_metadata {
                    m.prompt_tokens = usage.prompt_token_count;
                    m.completion_tokens = usage.candidates_token_count;
                }
            }

            if let Some(metrics) = metrics {
                yield Ok(Completion::Metrics(metrics));
            }
        };

        Box::pin(outer_stream)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiStreamChunk {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsageMetadata>,
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{consume_stream, consume_stream_with};
    use crate::model::ModelProvider;
    use crate::request::build_backend_request;
    use crate::transcript::Transcript;
    use serde_json::json;
    use std::collections::HashMap;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, header, method, path, query_param},
    };

    fn model_config(server_url: &str, persona_as_user_turn: bool) -> ModelConfig {
        ModelConfig {
            name: "gemini-test".to_string(),
            provider: ModelProvider::Gemini,
            settings: HashMap::from([
                ("base_url".to_string(), server_url.into()),
                ("api_key".to_string(), "MOCK_GEMINI_KEY".into()),
                (
                    "persona_as_user_turn".to_string(),
                    persona_as_user_turn.into(),
                ),
            ]),
        }
    }

    fn text_event(text: &str, finish_reason: Option<&str>) -> serde_json::Value {
        let mut candidate = json!({
            "content": { "role": "model", "parts": [{ "text": text }] },
            "index": 0
        });
        if let Some(reason) = finish_reason {
            candidate["finishReason"] = json!(reason);
        }
        json!({
            "candidates": [candidate],
            "usageMetadata": { "promptTokenCount": 42, "candidatesTokenCount": 7 }
        })
    }

    fn sse_body(events: &[serde_json::Value]) -> String {
        events
            .iter()
            .map(|e| format!("data: {}\r\n\r\n", serde_json::to_string(e).unwrap()))
            .collect()
    }

    fn sample_request(backend: &GeminiBackend) -> BackendRequest {
        let mut transcript = Transcript::initialize("Olá!");
        transcript.record_user_turn("Arroz");
        transcript.record_system_turn("300 kcal");
        build_backend_request(transcript.turns(), "Feijão", "persona", &backend.dialect())
    }

    fn gemini_request_for(backend: &GeminiBackend) -> GeminiRequest {
        GeminiBackend::to_gemini_request(&sample_request(backend), &ProfileConfig::default())
    }

    #[test]
    fn test_gemini_request_lifts_persona_into_system_instruction() {
        let backend = GeminiBackend::new(model_config("http://localhost", false)).unwrap();
        let request = gemini_request_for(&backend);

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "persona");
        let roles: Vec<_> = body["contents"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["role"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(roles, ["model", "user", "model", "user"]);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1024);
    }

    #[test]
    fn test_gemini_request_persona_as_user_turn() {
        let backend = GeminiBackend::new(model_config("http://localhost", true)).unwrap();
        let request = gemini_request_for(&backend);

        let body = serde_json::to_value(&request).unwrap();
        assert!(body.get("systemInstruction").is_none());
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "persona");
        assert_eq!(body["contents"].as_array().unwrap().len(), 5);
    }

    #[test]
    fn test_gemini_new_requires_api_key() {
        let config = ModelConfig {
            name: "gemini-test".to_string(),
            provider: ModelProvider::Gemini,
            settings: HashMap::from([(
                "api_key".to_string(),
                "env:NUTRITRACK_TEST_NO_GEMINI_KEY".into(),
            )]),
        };
        assert!(GeminiBackend::new(config).is_err());
    }

    #[tokio::test]
    async fn test_gemini_submit_streams_reply() {
        let server = MockServer::start().await;
        let body = sse_body(&[
            text_event("Cal", None),
            text_event("orias: ", None),
            text_event("120kcal", Some("STOP")),
        ]);
        Mock::given(method("POST"))
            .and(path("/models/gemini-test:streamGenerateContent"))
            .and(query_param("alt", "sse"))
            .and(header("x-goog-api-key", "MOCK_GEMINI_KEY"))
            .and(body_partial_json(json!({
                "systemInstruction": { "parts": [{ "text": "persona" }] }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .expect(1)
            .mount(&server)
            .await;

        let backend = GeminiBackend::new(model_config(&server.uri(), false)).unwrap();
        let stream = backend
            .submit(sample_request(&backend), &ProfileConfig::default())
            .await;

        let reply = consume_stream_with(stream, |_| Ok(())).await.unwrap();
        assert_eq!(reply.text, "Calorias: 120kcal");
        assert_eq!(reply.finish_reason.as_deref(), Some("stop"));
        assert_eq!(reply.metrics.prompt_tokens, 42);
        assert_eq!(reply.metrics.completion_tokens, 7);
    }

    #[tokio::test]
    async fn test_gemini_submit_fails_on_mid_stream_error() {
        let server = MockServer::start().await;
        let body = sse_body(&[
            text_event("Cal", None),
            json!({ "error": { "code": 500, "message": "Internal error", "status": "INTERNAL" } }),
        ]);
        Mock::given(method("POST"))
            .and(path("/models/gemini-test:streamGenerateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let backend = GeminiBackend::new(model_config(&server.uri(), false)).unwrap();
        let stream = backend
            .submit(sample_request(&backend), &ProfileConfig::default())
            .await;

        let err = consume_stream(stream).await.unwrap_err();
        assert!(err.to_string().contains("Internal error"));
    }

    #[tokio::test]
    async fn test_gemini_submit_surfaces_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-test:streamGenerateContent"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": { "code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED" }
            })))
            .mount(&server)
            .await;

        let backend = GeminiBackend::new(model_config(&server.uri(), false)).unwrap();
        let stream = backend
            .submit(sample_request(&backend), &ProfileConfig::default())
            .await;

        let err = consume_stream(stream).await.unwrap_err();
        assert!(err.to_string().contains("API key not valid"));
        assert!(err.to_string().contains("403"));
    }
}
