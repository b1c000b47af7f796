use async_openai::Client as OpenAiClient;
use async_openai::config::OpenAIConfig;
use async_openai::types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs};
use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};

const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";

/// A single-turn chat completion request
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Chat-completion capability shared by the judge and generative search
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send the prompt and return the text of the first choice
    async fn complete(&self, request: ChatRequest) -> Result<String>;
}

/// OpenAI chat completions via `async-openai`
pub struct OpenAiChat {
    client: Option<OpenAiClient<OpenAIConfig>>,
}

impl OpenAiChat {
    /// Build a client from an explicit key or `OPENAI_API_KEY`.
    ///
    /// A missing key is not an error here; it surfaces on the first request.
    pub fn new(api_key: Option<&str>, base_url: Option<&str>) -> Self {
        let api_key = api_key
            .map(str::to_owned)
            .or_else(|| std::env::var(OPENAI_KEY_VAR).ok())
            .filter(|key| !key.trim().is_empty());

        let client = api_key.map(|key| {
            let mut config = OpenAIConfig::new().with_api_key(key.trim());
            if let Some(base) = base_url {
                config = config.with_api_base(base);
            }
            OpenAiClient::with_config(config)
        });

        Self { client }
    }
}

#[async_trait]
impl LanguageModel for OpenAiChat {
    async fn complete(&self, request: ChatRequest) -> Result<String> {
        let client = self
            .client
            .as_ref()
            .ok_or(Error::MissingCredentials(OPENAI_KEY_VAR))?;

        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(request.prompt)
            .build()?;

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder.model(&request.model).messages(vec![message.into()]);
        if let Some(temperature) = request.temperature {
            builder.temperature(temperature);
        }
        if let Some(max_tokens) = request.max_tokens {
            builder.max_tokens(max_tokens);
        }
        let chat_request = builder.build()?;

        let response = client.chat().create(chat_request).await?;
        debug!(model = %request.model, choices = response.choices.len(), "chat completion done");

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_surfaces_on_first_use() {
        let chat = OpenAiChat { client: None };
        let err = chat
            .complete(ChatRequest::new("gpt-4o", "hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingCredentials("OPENAI_API_KEY")));
    }

    #[test]
    fn request_builder_sets_options() {
        let request = ChatRequest::new("gpt-4o", "rate these")
            .with_temperature(0.3)
            .with_max_tokens(1000);
        assert_eq!(request.temperature, Some(0.3));
        assert_eq!(request.max_tokens, Some(1000));
    }
}
