use anyhow::{Context, Result};
use chrono::NaiveDate;
use nutritrack_core::config::Config;
use nutritrack_core::meal::{MealEntry, MealSlot, MealSummary};
use nutritrack_core::session::{ExchangeEvent, ExchangeOutcome, Session};
use nutritrack_core::transcript::Transcript;
use tracing::info;

/// Chat conversation between the user and the nutrition assistant.
pub struct Chat<'a> {
    config: &'a Config,
    session: Session,
    model_key: Option<String>,
}

impl<'a> Chat<'a> {
    /// Starts a chat with the model registered as `model` in the config, or the default chat model.
    pub fn new(config: &'a Config, model: Option<String>) -> Result<Self> {
        let model_config = config
            .model_or_default(model.as_deref())
            .context("Failed to resolve chat model")?;

        let session = Session::new(
            model_config,
            config.persona.clone(),
            config.chat.profile.clone(),
        )
        .context("Failed to create chat session")?;
        info!(model = %session.model_name(), "Chat session started");

        Ok(Self {
            config,
            session,
            model_key: model,
        })
    }

    pub async fn exchange<F>(&mut self, prompt: &str, on_event: F) -> Result<ExchangeOutcome>
    where
        F: FnMut(ExchangeEvent<'_>) -> Result<()>,
    {
        self.session.exchange(prompt, on_event).await
    }

    pub fn transcript(&self) -> &Transcript {
        self.session.transcript()
    }

    /// Name of the model answering the chat.
    pub fn model_name(&self) -> &str {
        self.session.model_name()
    }

    /// Config key of the active model, if one was chosen explicitly.
    pub fn model_key(&self) -> Option<&str> {
        self.model_key.as_deref()
    }

    pub fn available_model_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.config.models.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Switches to another configured model, keeping the conversation.
    pub fn set_model(&mut self, key: &str) -> Result<()> {
        let model_config = self.config.model_or_default(Some(key))?;
        self.session
            .set_model(model_config)
            .with_context(|| format!("Failed to switch to model '{key}'"))?;
        self.model_key = Some(key.to_string());
        Ok(())
    }

    pub fn add_meal(
        &mut self,
        date: NaiveDate,
        slot: MealSlot,
        description: &str,
        calories: u32,
    ) -> bool {
        self.session.add_meal(date, slot, description, calories)
    }

    pub fn meals_on(&self, date: NaiveDate) -> Vec<&MealEntry> {
        self.session.meals().entries_on(date).collect()
    }

    pub fn meal_summary(&self, date: NaiveDate) -> MealSummary {
        self.session.meal_summary(date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::test_utils::get_test_config_from_str;

    const CONFIG: &str = r#"
models:
  alpha:
    provider: test
  beta:
    provider: test
    response_mode: echo
  broken:
    provider: gemini
    api_key: env:NUTRITRACK_TEST_CHAT_NO_KEY
chat:
  model: alpha
"#;

    #[test]
    fn test_new_uses_default_chat_model() {
        let config = get_test_config_from_str(CONFIG).unwrap();
        let chat = Chat::new(&config, None).unwrap();

        assert_eq!(chat.model_name(), "alpha");
        assert_eq!(chat.model_key(), None);
        assert_eq!(chat.transcript().len(), 1);
        assert_eq!(chat.available_model_names(), ["alpha", "beta", "broken"]);
    }

    #[test]
    fn test_new_fails_for_unknown_or_unconfigured_model() {
        let config = get_test_config_from_str(CONFIG).unwrap();

        assert!(Chat::new(&config, Some("missing".to_string())).is_err());
        assert!(Chat::new(&config, Some("broken".to_string())).is_err());
    }

    #[test]
    fn test_set_model() {
        let config = get_test_config_from_str(CONFIG).unwrap();
        let mut chat = Chat::new(&config, None).unwrap();

        chat.set_model("beta").unwrap();
        assert_eq!(chat.model_name(), "beta");
        assert_eq!(chat.model_key(), Some("beta"));

        assert!(chat.set_model("broken").is_err());
        assert_eq!(chat.model_name(), "beta");
    }

    #[tokio::test]
    async fn test_exchange_updates_transcript() {
        let config = get_test_config_from_str(CONFIG).unwrap();
        let mut chat = Chat::new(&config, None).unwrap();

        let outcome = chat.exchange("Tofu", |_| Ok(())).await.unwrap();

        assert!(matches!(outcome, ExchangeOutcome::Replied(_)));
        assert_eq!(chat.transcript().len(), 3);
    }
}
