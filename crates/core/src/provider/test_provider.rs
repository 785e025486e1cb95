//! A deterministic in-process backend for tests and offline runs.
use crate::completion::{ChatBackend, Completion, CompletionMetrics, CompletionResponse};
use crate::config::ProfileConfig;
use crate::model::ModelConfig;
use crate::request::{BackendRequest, Dialect};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use futures::stream::{self, BoxStream};

/// A mock `ChatBackend`.
///
/// The `response_mode` setting controls the reply:
/// - `""` (default): streams `"Cal"`, `"orias: "`, `"120kcal"`.
/// - `"error"`: fails before the first fragment.
/// - `"mid_stream_error"`: streams `"Cal"` and then fails.
/// - `"echo"`: replies with one `role: text` line per request message.
#[derive(Debug)]
pub struct TestProviderModel {
    config: ModelConfig,
}

impl TestProviderModel {
    pub fn new(config: ModelConfig) -> Result<Self> {
        Ok(Self { config })
    }
}

fn fragment(text: &str) -> Result<Completion> {
    Ok(Completion::Response(CompletionResponse::fragment(text)))
}

fn finish() -> Result<Completion> {
    Ok(Completion::Response(CompletionResponse {
        text: String::new(),
        finish_reason: Some("stop".to_string()),
    }))
}

#[async_trait]
impl ChatBackend for TestProviderModel {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn dialect(&self) -> Dialect {
        Dialect {
            user_role: "user",
            agent_role: "assistant",
            system_role: Some("system"),
        }
    }

    async fn submit(
        &self,
        request: BackendRequest,
        _profile: &ProfileConfig,
    ) -> BoxStream<'static, Result<Completion>> {
        let response_mode: String = self.config.get_setting("response_mode").unwrap_or_default();

        let items = match response_mode.as_str() {
            "error" => vec![Err(anyhow!("TestProviderModel error"))],
            "mid_stream_error" => vec![
                fragment("Cal"),
                Err(anyhow!("TestProviderModel stream interrupted")),
            ],
            "echo" => {
                let text = request
                    .messages
                    .iter()
                    .map(|m| format!("{}: {}", m.role, m.text))
                    .collect::<Vec<_>>()
                    .join("\n");
                vec![fragment(&text), finish()]
            }
            _ => vec![
                fragment("Cal"),
                fragment("orias: "),
                fragment("120kcal"),
                finish(),
                Ok(Completion::Metrics(CompletionMetrics {
                    prompt_tokens: request.messages.len() as u32,
                    completion_tokens: 3,
                    ..Default::default()
                })),
            ],
        };

        Box::pin(stream::iter(items))
    }
}
