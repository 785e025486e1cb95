//! A session is the context of one interactive run: the transcript, the meal log and the backend
//! they are exchanged with. Nothing in it outlives the process.
use crate::{
    completion::{ChatBackend, Completion, StreamedReply, consume_stream_with},
    config::{PersonaConfig, ProfileConfig},
    meal::{MealLog, MealSlot, MealSummary},
    model::ModelConfig,
    request::build_backend_request,
    transcript::{Transcript, Turn},
};
use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use tracing::{debug, instrument, warn};

/// Progress of an exchange, in the order it happens.
#[derive(Debug)]
pub enum ExchangeEvent<'a> {
    /// The user turn was committed; shown before any reply fragment arrives.
    UserTurn(&'a Turn),
    /// An item of the backend reply stream.
    Stream(&'a Completion),
}

/// Result of [`Session::exchange`].
#[derive(Debug)]
pub enum ExchangeOutcome {
    /// The prompt was blank. Nothing was recorded or sent.
    Ignored,
    /// The reply was drained and recorded.
    Replied(StreamedReply),
    /// The backend failed. `shown` was recorded in place of the reply.
    Failed { error: anyhow::Error, shown: String },
}

/// A session with shared context between the user and the assistant.
pub struct Session {
    backend: Box<dyn ChatBackend>,
    transcript: Transcript,
    meals: MealLog,
    persona: PersonaConfig,
    profile: ProfileConfig,
}

impl Session {
    /// Creates a session for `model_config`. A backend that cannot be configured is fatal.
    pub fn new(
        model_config: ModelConfig,
        persona: PersonaConfig,
        profile: ProfileConfig,
    ) -> Result<Self> {
        let backend = crate::get_chat_backend(model_config)
            .context("Failed to initialize session backend")?;
        Ok(Self::with_backend(backend, persona, profile))
    }

    pub fn with_backend(
        backend: Box<dyn ChatBackend>,
        persona: PersonaConfig,
        profile: ProfileConfig,
    ) -> Self {
        Self {
            backend,
            transcript: Transcript::initialize(&persona.greeting),
            meals: MealLog::new(),
            persona,
            profile,
        }
    }

    /// Sends `prompt` with the conversation so far and records the reply.
    ///
    /// `on_event` sees the committed user turn first, then every stream item in arrival order.
    /// Backend failures, empty replies and `on_event` errors are recovered: the persona's error
    /// reply is recorded as the agent turn and returned in [`ExchangeOutcome::Failed`].
    #[instrument(skip(self, on_event), fields(model = %self.backend.name()))]
    pub async fn exchange<F>(&mut self, prompt: &str, mut on_event: F) -> Result<ExchangeOutcome>
    where
        F: FnMut(ExchangeEvent<'_>) -> Result<()>,
    {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Ok(ExchangeOutcome::Ignored);
        }

        // The pending prompt goes into the request here and into the transcript right after,
        // so it reaches the backend exactly once.
        let request = build_backend_request(
            self.transcript.turns(),
            prompt,
            &self.persona.instruction,
            &self.backend.dialect(),
        );
        self.transcript.record_user_turn(prompt);
        let shown = match self.transcript.last() {
            Some(turn) => on_event(ExchangeEvent::UserTurn(turn)),
            None => Ok(()),
        };
        if let Err(error) = shown {
            return Ok(self.fail(error.context("Failed to show the user turn")));
        }

        debug!(messages = request.messages.len(), "Submitting exchange");
        let stream = self.backend.submit(request, &self.profile).await;
        let result =
            consume_stream_with(stream, |completion| on_event(ExchangeEvent::Stream(completion)))
                .await;

        match result {
            Ok(reply) if reply.text.trim().is_empty() => {
                let reason = reply.finish_reason.as_deref().unwrap_or("none");
                Ok(self.fail(anyhow!("Backend returned an empty reply (finish reason: {reason})")))
            }
            Ok(reply) => {
                self.transcript.record_system_turn(&reply.text);
                Ok(ExchangeOutcome::Replied(reply))
            }
            Err(error) => Ok(self.fail(error)),
        }
    }

    /// Records the error reply as the agent turn so every user turn gets an answer.
    fn fail(&mut self, error: anyhow::Error) -> ExchangeOutcome {
        warn!(error = %error, "Exchange failed");
        let shown = self.persona.error_reply.clone();
        self.transcript.record_system_turn(&shown);
        ExchangeOutcome::Failed { error, shown }
    }

    /// Replaces the backend. The transcript is kept; it is translated for the new backend on the
    /// next exchange.
    pub fn set_backend(&mut self, backend: Box<dyn ChatBackend>) {
        self.backend = backend;
    }

    pub fn set_model(&mut self, model_config: ModelConfig) -> Result<()> {
        let backend = crate::get_chat_backend(model_config)?;
        self.set_backend(backend);
        Ok(())
    }

    pub fn model_name(&self) -> &str {
        self.backend.name()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn persona(&self) -> &PersonaConfig {
        &self.persona
    }

    pub fn meals(&self) -> &MealLog {
        &self.meals
    }

    pub fn add_meal(
        &mut self,
        date: NaiveDate,
        slot: MealSlot,
        description: &str,
        calories: u32,
    ) -> bool {
        self.meals.add_entry(date, slot, description, calories)
    }

    pub fn meal_summary(&self, date: NaiveDate) -> MealSummary {
        self.meals.summarize(date)
    }
}
