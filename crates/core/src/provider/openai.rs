use super::openai_types::{
    ChatCompletionMessage, ChatCompletionRequest, ChatCompletionStreamResponse, StreamOptions,
};
use crate::completion::{ChatBackend, Completion, CompletionMetrics, CompletionResponse};
use crate::config::ProfileConfig;
use crate::model::ModelConfig;
use crate::provider::resolve_api_key;
use crate::request::{BackendRequest, Dialect};
use anyhow::{Result, anyhow};
use async_openai::Client as OpenAIClient;
use async_openai::config::OpenAIConfig;
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use std::time::Instant;
use tracing::{debug, warn};

const OPENAI_DIALECT: Dialect = Dialect {
    user_role: "user",
    agent_role: "assistant",
    system_role: Some("system"),
};

#[derive(Debug, Clone, serde::Deserialize)]
pub struct OpenAISettings {
    base_url: String,
    api_key: String,
}

/// Backend for OpenAI compatible chat completion endpoints.
pub struct OpenAIBackend {
    config: ModelConfig,
    client: OpenAIClient<OpenAIConfig>,
}

impl OpenAIBackend {
    pub fn new(model_config: ModelConfig) -> Result<Self> {
        let settings: OpenAISettings = serde_yaml::from_value(
            serde_yaml::to_value(&model_config.settings)
                .map_err(|_e| anyhow!("Invalid settings structure"))?,
        )?;
        let api_key = resolve_api_key(&settings.api_key)?;

        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(settings.base_url);

        Ok(Self {
            config: model_config,
            client: OpenAIClient::with_config(config),
        })
    }

    fn to_request_body(
        &self,
        request: &BackendRequest,
        profile: &ProfileConfig,
    ) -> Result<serde_json::Value> {
        let body = ChatCompletionRequest {
            model: &self.config.name,
            messages: request
                .messages
                .iter()
                .map(|m| ChatCompletionMessage {
                    role: m.role,
                    content: &m.text,
                })
                .collect(),
            max_tokens: profile.max_tokens,
            temperature: profile.temperature,
            top_p: profile.top_p,
            stream: true,
            stream_options: StreamOptions {
                include_usage: true,
            },
        };
        Ok(serde_json::to_value(body)?)
    }
}

#[async_trait]
impl ChatBackend for OpenAIBackend {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn dialect(&self) -> Dialect {
        OPENAI_DIALECT
    }

    async fn submit(
        &self,
        request: BackendRequest,
        profile: &ProfileConfig,
    ) -> BoxStream<'static, Result<Completion>> {
        let body = match self.to_request_body(&request, profile) {
            Ok(body) => body,
            Err(err) => {
                return Box::pin(futures::stream::once(async move {
                    Err(anyhow!("Invalid request: {:?}", err))
                }));
            }
        };
        debug!(
            model = %self.config.name,
            messages = request.messages.len(),
            "Sending chat completion request"
        );

        let client = self.client.clone();
        let start_time = Instant::now();

        let outer_stream = async_stream::stream! {
            let mut prev_time = start_time;
            let mut first_chunk = true;
            let mut prompt_eval_latency = 0.0;
            let mut completion_latency = 0.0;

            let response = client
                .chat()
                .create_stream_byot::<serde_json::Value, ChatCompletionStreamResponse>(body)
                .await;

            match response {
                Ok(mut stream) => {
                    while let Some(next) = stream.next().await {
                        let now = Instant::now();
                        let elapsed = now.duration_since(prev_time).as_millis() as f32;
                        prev_time = now;

                        match next {
                            Ok(chunk) => {
                                if let Some(choice) = chunk.choices.first() {
                                    if first_chunk {
                                        prompt_eval_latency = elapsed;
                                        first_chunk = false;
                                    } else {
                                        completion_latency += elapsed;
                                    }

                                    yield Ok(Completion::Response(CompletionResponse {
                                        text: choice.delta.content.clone().unwrap_or_default(),
                                        finish_reason: choice.finish_reason.map(|r| r.as_str().to_string()),
                                    }));
                                }

                                // Some servers club usage with the final choice, others send a
                                // separate chunk.
                                if let Some(usage) = chunk.usage {
                                    yield Ok(Completion::Metrics(CompletionMetrics {
                                        prompt_tokens: usage.prompt_tokens,
                                        prompt_eval_latency_ms: prompt_eval_latency,
                                        completion_tokens: usage.completion_tokens,
                                        completion_latency_ms: completion_latency,
                                    }));
                                }
                            }
                            Err(err) => {
                                warn!(error = %err, "OpenAI stream error");
                                yield Err(anyhow!("OpenAI stream error: {}", err));
                                break;
                            }
                        }
                    }
                }
                Err(err) => {
                    warn!(error = %err, "OpenAI request failed");
                    yield Err(anyhow!("OpenAI request failed: {}", err));
                }
            }
        };

        Box::pin(outer_stream)
    }
}
