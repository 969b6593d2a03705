mod message;
mod record;

pub use message::{ChatMessage, Role, Transcript};
pub use record::{Record, CONTENT_FIELD, PREDICTION_FIELD, PREPARED_FIELD, TEXT_FIELD};
