use crate::error::BatchError;
use crate::generation::response::{ChatCompletion, ChatCompletionRequest};
use anyhow::{Context, Result};
use parking_lot::Mutex;
use reqwest::blocking::Client as HttpClient;
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

pub trait CompletionBackend: Send + Sync {
    fn create_chat_completion(&self, request: &ChatCompletionRequest) -> Result<ChatCompletion>;
}

pub struct OpenAiChatBackend {
    endpoint: String,
    api_key: String,
    organization: Option<String>,
    http: HttpClient,
}

impl OpenAiChatBackend {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("cannot build the HTTP client for the completion API")?;
        let api_base = api_base.into();

        Ok(Self {
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
            api_key: api_key.into(),
            organization: None,
            http,
        })
    }

    pub fn from_env() -> Result<Self> {
        let api_key =
            std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY is not set")?;
        let api_base =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        let backend = Self::new(api_base, api_key)?;
        Ok(match std::env::var("OPENAI_ORG") {
            Ok(org) if !org.is_empty() => backend.with_organization(org),
            _ => backend,
        })
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }
}

impl CompletionBackend for OpenAiChatBackend {
    fn create_chat_completion(&self, request: &ChatCompletionRequest) -> Result<ChatCompletion> {
        let mut call = self.http.post(&self.endpoint).bearer_auth(&self.api_key);
        if let Some(org) = &self.organization {
            call = call.header("OpenAI-Organization", org);
        }

        let response = call
            .json(request)
            .send()
            .context("HTTP call to the completion API failed")?
            .error_for_status()
            .context("completion API returned an error status")?;

        let completion: ChatCompletion = response
            .json()
            .context("unreadable completion API response")?;

        if completion.choices.is_empty() {
            anyhow::bail!("completion API response carried no choices");
        }
        Ok(completion)
    }
}

pub struct CompletionClient<B: CompletionBackend> {
    backend: Arc<B>,
}

impl<B: CompletionBackend> CompletionClient<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Sleeps `delay` once, then tries the request up to `max_trials` times.
    pub fn complete(
        &self,
        delay: Duration,
        max_trials: u32,
        request: &ChatCompletionRequest,
    ) -> std::result::Result<ChatCompletion, BatchError> {
        if !delay.is_zero() {
            sleep(delay);
        }

        let mut last_error = None;
        for attempt in 1..=max_trials {
            match self.backend.create_chat_completion(request) {
                Ok(completion) => return Ok(completion),
                Err(err) => {
                    let message = format!("{err:#}");
                    warn!(attempt, max_trials, error = %message, "completion attempt failed");
                    last_error = Some(BatchError::TransientRequest(message));
                }
            }
        }

        let last = last_error.unwrap_or_else(|| {
            BatchError::TransientRequest("no attempt was made".to_string())
        });
        Err(BatchError::RetryBudgetExhausted {
            attempts: max_trials,
            last: Box::new(last),
        })
    }
}

#[derive(Clone, Default)]
pub struct MockCompletionBackend {
    responses: Arc<Mutex<VecDeque<std::result::Result<String, String>>>>,
    requests: Arc<Mutex<Vec<ChatCompletionRequest>>>,
}

impl MockCompletionBackend {
    pub fn push_reply(&self, content: impl Into<String>) {
        self.responses.lock().push_back(Ok(content.into()));
    }

    pub fn push_failure(&self, message: impl Into<String>) {
        self.responses.lock().push_back(Err(message.into()));
    }

    pub fn requests(&self) -> Vec<ChatCompletionRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl CompletionBackend for MockCompletionBackend {
    fn create_chat_completion(&self, request: &ChatCompletionRequest) -> Result<ChatCompletion> {
        self.requests.lock().push(request.clone());
        match self.responses.lock().pop_front() {
            Some(Ok(content)) => Ok(ChatCompletion::from_reply(content)),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Err(anyhow::anyhow!("no mock response available")),
        }
    }
}
