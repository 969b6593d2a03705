mod llm_client;
mod postprocess;
mod prompt;
mod response;
mod runner;

pub use llm_client::{
    CompletionBackend, CompletionClient, MockCompletionBackend, OpenAiChatBackend, DEFAULT_API_BASE,
};
pub use postprocess::{
    extract_json_from_text, strip_json_fence, JsonPostProcessor, LenientJsonPostProcessor,
    PassthroughPostProcessor, PostProcessor,
};
pub use prompt::{PromptStore, PromptTemplate};
pub use response::{ChatCompletion, ChatCompletionRequest, CompletionChoice, CompletionMessage};
pub use runner::{BatchRunner, GenerationMode, RunOutcome, RunStats};
