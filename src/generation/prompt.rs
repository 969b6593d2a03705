use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::Record;
use crate::error::{BatchError, Result};
use crate::utils::placeholder_marker;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub name: String,
    pub content: String,
}

impl PromptTemplate {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|err| {
            BatchError::Configuration(format!("cannot read prompt template {path:?}: {err}"))
        })?;
        let name = template_name(path).ok_or_else(|| {
            BatchError::Configuration(format!("cannot derive a template name from {path:?}"))
        })?;
        Ok(Self::new(name, content))
    }

    pub fn render(&self, record: &Record) -> String {
        let mut prepared = self.content.clone();
        for (key, value) in record.fields() {
            let Some(text) = value.as_str() else {
                continue;
            };
            let marker = placeholder_marker(key);
            if prepared.contains(&marker) {
                prepared = prepared.replace(&marker, text);
            }
        }
        prepared
    }
}

fn template_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    let stem = file_name.split('.').next().unwrap_or(file_name);
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct PromptStore {
    templates: Vec<PromptTemplate>,
    index: HashMap<String, usize>,
}

impl PromptStore {
    pub fn new(templates: Vec<PromptTemplate>) -> Result<Self> {
        if templates.is_empty() {
            return Err(BatchError::Configuration(
                "at least one prompt template is required".to_string(),
            ));
        }
        let mut index = HashMap::new();
        for (idx, template) in templates.iter().enumerate() {
            if let Some(previous) = index.insert(template.name.clone(), idx) {
                warn!(
                    template = %template.name,
                    previous,
                    current = idx,
                    "duplicate template name, the later one wins"
                );
            }
        }
        Ok(Self { templates, index })
    }

    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let templates = paths
            .iter()
            .map(PromptTemplate::load_from_path)
            .collect::<Result<Vec<_>>>()?;
        info!(templates = templates.len(), "prompt templates loaded");
        Self::new(templates)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn templates(&self) -> &[PromptTemplate] {
        &self.templates
    }

    pub fn get(&self, name: &str) -> Option<&PromptTemplate> {
        self.index.get(name).map(|&idx| &self.templates[idx])
    }

    pub fn render(&self, record: &Record, template_name: Option<&str>) -> Result<String> {
        let template = match template_name {
            Some(name) => self
                .get(name)
                .ok_or_else(|| BatchError::UnknownTemplate(name.to_string()))?,
            None => &self.templates[0],
        };
        Ok(template.render(record))
    }

    pub fn render_all(&self, record: &Record) -> Vec<String> {
        self.templates
            .iter()
            .map(|template| template.render(record))
            .collect()
    }
}
