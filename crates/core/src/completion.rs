use crate::config::ProfileConfig;
use crate::request::{BackendRequest, Dialect};
use anyhow::Result;
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};

/// An item of a backend reply stream.
#[derive(Debug)]
pub enum Completion {
    Response(CompletionResponse),
    Metrics(CompletionMetrics),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionMetrics {
    pub prompt_tokens: u32,
    pub prompt_eval_latency_ms: f32,
    pub completion_tokens: u32,
    pub completion_latency_ms: f32,
}

#[derive(Debug)]
pub struct CompletionResponse {
    pub text: String,
    pub finish_reason: Option<String>,
}

impl CompletionResponse {
    pub fn fragment(text: &str) -> Self {
        Self {
            text: text.to_string(),
            finish_reason: None,
        }
    }
}

/// A fully drained reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamedReply {
    pub text: String,
    pub finish_reason: Option<String>,
    pub metrics: CompletionMetrics,
}

/// A chat capable LLM backend.
///
/// `submit` returns a lazy, finite stream of reply fragments. It may fail before the first
/// fragment or mid-stream; either way the failure is an `Err` item.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Name of the model behind this backend.
    fn name(&self) -> &str;

    /// Role vocabulary used to build requests for this backend.
    fn dialect(&self) -> Dialect;

    async fn submit(
        &self,
        request: BackendRequest,
        profile: &ProfileConfig,
    ) -> BoxStream<'static, Result<Completion>>;
}

/// Drains a reply stream and returns the concatenated text.
///
/// Any error item aborts the drain; partial text is dropped.
pub async fn consume_stream(stream: BoxStream<'_, Result<Completion>>) -> Result<String> {
    let reply = consume_stream_with(stream, |_| Ok(())).await?;
    Ok(reply.text)
}

/// Drains a reply stream, handing each item to `on_event` before folding it into the reply.
pub async fn consume_stream_with<F>(
    mut stream: BoxStream<'_, Result<Completion>>,
    mut on_event: F,
) -> Result<StreamedReply>
where
    F: FnMut(&Completion) -> Result<()>,
{
    let mut reply = StreamedReply::default();
    while let Some(item) = stream.next().await {
        let completion = item?;
        on_event(&completion)?;
        match completion {
            Completion::Response(response) => {
                reply.text.push_str(&response.text);
                if response.finish_reason.is_some() {
                    reply.finish_reason = response.finish_reason;
                }
            }
            Completion::Metrics(metrics) => reply.metrics = metrics,
        }
    }
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use futures::stream;

    fn fragments(parts: &[&str]) -> Vec<Result<Completion>> {
        parts
            .iter()
            .map(|p| Ok(Completion::Response(CompletionResponse::fragment(p))))
            .collect()
    }

    #[tokio::test]
    async fn test_consume_stream_concatenates_in_order() {
        let items = fragments(&["Cal", "orias: ", "120kcal"]);
        let text = consume_stream(Box::pin(stream::iter(items))).await.unwrap();
        assert_eq!(text, "Calorias: 120kcal");
    }

    #[tokio::test]
    async fn test_consume_stream_fails_on_mid_stream_error() {
        let mut items = fragments(&["Cal"]);
        items.push(Err(anyhow!("connection reset")));
        items.extend(fragments(&["orias"]));

        let err = consume_stream(Box::pin(stream::iter(items)))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_consume_stream_with_collects_metrics_and_finish_reason() {
        let mut items = fragments(&["Olá", "!"]);
        items.push(Ok(Completion::Response(CompletionResponse {
            text: String::new(),
            finish_reason: Some("stop".to_string()),
        })));
        items.push(Ok(Completion::Metrics(CompletionMetrics {
            prompt_tokens: 12,
            completion_tokens: 3,
            ..Default::default()
        })));

        let mut seen = Vec::new();
        let reply = consume_stream_with(Box::pin(stream::iter(items)), |c| {
            if let Completion::Response(r) = c {
                seen.push(r.text.clone());
            }
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(seen, ["Olá", "!", ""]);
        assert_eq!(reply.text, "Olá!");
        assert_eq!(reply.finish_reason.as_deref(), Some("stop"));
        assert_eq!(reply.metrics.prompt_tokens, 12);
        assert_eq!(reply.metrics.completion_tokens, 3);
    }

    #[tokio::test]
    async fn test_consume_stream_with_propagates_callback_error() {
        let items = fragments(&["a", "b"]);
        let err = consume_stream_with(Box::pin(stream::iter(items)), |_| {
            Err(anyhow!("terminal closed"))
        })
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "terminal closed");
    }

    #[tokio::test]
    async fn test_consume_empty_stream() {
        let text = consume_stream(Box::pin(stream::empty())).await.unwrap();
        assert_eq!(text, "");
    }
}
