use serde_json::Value;
use tracing::debug;

use super::response::ChatCompletion;
use crate::error::BatchError;

const JSON_FENCE_OPEN: &str = "```json\n";
const FENCE_CLOSE: &str = "\n```";

pub trait PostProcessor: Send + Sync {
    fn process(&self, completion: &ChatCompletion, template_name: Option<&str>) -> (String, Value);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughPostProcessor;

impl PostProcessor for PassthroughPostProcessor {
    fn process(&self, completion: &ChatCompletion, _template_name: Option<&str>) -> (String, Value) {
        let content = completion.first_content().unwrap_or_default().trim().to_string();
        let prediction = Value::String(content.clone());
        (content, prediction)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPostProcessor;

impl PostProcessor for JsonPostProcessor {
    fn process(&self, completion: &ChatCompletion, template_name: Option<&str>) -> (String, Value) {
        let (content, _) = PassthroughPostProcessor.process(completion, template_name);
        let content = strip_json_fence(&content).to_string();
        let prediction = match parse_json(&content) {
            Ok(value) => value,
            Err(err) => {
                debug!(template = ?template_name, error = %err, "prediction kept as raw text");
                Value::String(content.clone())
            }
        };
        (content, prediction)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LenientJsonPostProcessor;

impl PostProcessor for LenientJsonPostProcessor {
    fn process(&self, completion: &ChatCompletion, template_name: Option<&str>) -> (String, Value) {
        let (content, raw) = PassthroughPostProcessor.process(completion, template_name);
        let prediction = match extract_json_from_text(&content) {
            Ok(value) => value,
            Err(err) => {
                debug!(template = ?template_name, error = %err, "prediction kept as raw text");
                raw
            }
        };
        (content, prediction)
    }
}

pub fn strip_json_fence(content: &str) -> &str {
    let Some(rest) = content.strip_prefix(JSON_FENCE_OPEN) else {
        return content;
    };
    let block = rest.split(JSON_FENCE_OPEN).next().unwrap_or(rest);
    block.split(FENCE_CLOSE).next().unwrap_or(block)
}

fn parse_json(text: &str) -> Result<Value, BatchError> {
    serde_json::from_str(text).map_err(|err| BatchError::PostProcess(err.to_string()))
}

pub fn extract_json_from_text(text: &str) -> Result<Value, BatchError> {
    let text = text.trim_start_matches('\u{feff}').trim();
    let candidates = [
        Some(strip_json_fence(text)),
        fenced_block(text),
        delimited(text, '{', '}'),
        delimited(text, '[', ']'),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(|candidate| parse_json(candidate.trim()).ok())
        .ok_or_else(|| BatchError::PostProcess("no JSON value found in completion".to_string()))
}

// Body of the first ``` block anywhere in the text, language tag line dropped.
fn fenced_block(text: &str) -> Option<&str> {
    let (_, after_open) = text.split_once("```")?;
    let (body, _) = after_open.split_once("```")?;
    match body.split_once('\n') {
        Some((tag, rest)) if !tag.trim().contains(char::is_whitespace) => Some(rest),
        _ => Some(body),
    }
}

fn delimited(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (start < end).then(|| &text[start..=end])
}
