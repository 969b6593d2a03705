pub mod config;
pub mod domain;
pub mod error;
pub mod generation;
pub mod memory;
pub mod utils;

pub use config::{GenerateConfig, JobConfig};
pub use domain::{ChatMessage, Record, Role, Transcript};
pub use error::{BatchError, Result};
pub use generation::{
    BatchRunner, CompletionBackend, CompletionClient, GenerationMode, JsonPostProcessor,
    OpenAiChatBackend, PostProcessor, PromptStore, PromptTemplate, RunOutcome,
};
pub use memory::{JsonResultStore, RecordSet, ResultStore};
