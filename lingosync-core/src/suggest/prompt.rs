//! Prompt-based suggestion provider.
//!
//! Wraps any text-completion transport: builds a translation prompt for a
//! chunk, asks for a JSON object keyed by row key, and parses the reply.

use super::provider::{SuggestionMap, SuggestionProvider, SuggestionRequest};
use crate::error::{Error, Result};
use serde_json::{json, Value};
use std::future::Future;

const SYSTEM_PROMPT: &str = "You are a professional software localization engine. Translate user interface strings faithfully, keep placeholders such as {name}, {{count}}, %s and HTML tags untouched, and preserve leading or trailing whitespace.";

/// One raw completion call
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub api_key: String,
    pub system: String,
    pub prompt: String,
    /// JSON schema the reply must follow, when the model supports it
    pub response_schema: Option<Value>,
}

/// Text-completion transport (an HTTP client in production)
pub trait CompletionClient: Send + Sync {
    fn complete(&self, request: &CompletionRequest) -> impl Future<Output = Result<String>> + Send;
}

/// [`SuggestionProvider`] over a [`CompletionClient`]
#[derive(Debug, Clone)]
pub struct LlmSuggestionProvider<C> {
    client: C,
}

impl<C: CompletionClient> LlmSuggestionProvider<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

impl<C: CompletionClient> SuggestionProvider for LlmSuggestionProvider<C> {
    async fn suggest(&self, request: &SuggestionRequest) -> Result<SuggestionMap> {
        if request.api_key.trim().is_empty() {
            return Err(Error::Provider("no API key configured".to_string()));
        }
        if request.items.is_empty() {
            return Ok(SuggestionMap::new());
        }

        let completion = CompletionRequest {
            model: request.model.id().to_string(),
            api_key: request.api_key.clone(),
            system: SYSTEM_PROMPT.to_string(),
            prompt: build_prompt(request)?,
            response_schema: response_schema(request),
        };

        let raw = self.client.complete(&completion).await?;
        let suggestions = parse_suggestions(&raw, request)?;

        tracing::debug!(
            model = %request.model,
            requested = request.items.len(),
            returned = suggestions.len(),
            "Parsed suggestion response"
        );

        Ok(suggestions)
    }
}

/// Render the user prompt for one chunk
pub fn build_prompt(request: &SuggestionRequest) -> Result<String> {
    let mut source = serde_json::Map::new();
    for item in &request.items {
        source.insert(item.key.clone(), Value::String(item.value.clone()));
    }
    let payload = serde_json::to_string_pretty(&Value::Object(source))?;

    let mut prompt = format!(
        "Translate the values of the following JSON object from {} to {}.\n\
         Return a JSON object with exactly the same keys, each mapped to its translation.\n\n\
         {}\n",
        request.source_lang, request.target_lang, payload
    );

    let extra = request.extra_instructions.trim();
    if !extra.is_empty() {
        prompt.push_str("\nAdditional instructions:\n");
        prompt.push_str(extra);
        prompt.push('\n');
    }

    prompt.push_str("\nReturn only JSON.");
    Ok(prompt)
}

/// Object schema with one required string property per requested key
pub fn response_schema(request: &SuggestionRequest) -> Option<Value> {
    if !request.model.supports_structured_output() {
        return None;
    }

    let properties: serde_json::Map<String, Value> = request
        .items
        .iter()
        .map(|item| (item.key.clone(), json!({ "type": "string" })))
        .collect();
    let required: Vec<&str> = request.items.iter().map(|i| i.key.as_str()).collect();

    Some(json!({
        "type": "object",
        "properties": properties,
        "required": required,
    }))
}

/// Keep string values for requested keys; anything else is "no suggestion".
pub fn parse_suggestions(raw: &str, request: &SuggestionRequest) -> Result<SuggestionMap> {
    let parsed = match serde_json::from_str::<Value>(raw) {
        Ok(value) => value,
        Err(_) => {
            let extracted = extract_json_object(raw)?;
            serde_json::from_str::<Value>(&extracted)
                .map_err(|e| Error::Provider(format!("invalid JSON in response: {e}")))?
        }
    };

    let Value::Object(object) = parsed else {
        return Err(Error::Provider(
            "suggestion response must be a JSON object".to_string(),
        ));
    };

    let mut suggestions = SuggestionMap::new();
    for item in &request.items {
        if let Some(Value::String(text)) = object.get(&item.key) {
            suggestions.insert(item.key.clone(), text.clone());
        }
    }
    Ok(suggestions)
}

fn extract_json_object(raw: &str) -> Result<String> {
    let start = raw
        .find('{')
        .ok_or_else(|| Error::Provider("response did not contain a JSON object".to_string()))?;
    let end = raw
        .rfind('}')
        .ok_or_else(|| Error::Provider("response did not contain a JSON object".to_string()))?;
    if end <= start {
        return Err(Error::Provider(
            "response JSON bounds are invalid".to_string(),
        ));
    }
    Ok(raw[start..=end].to_string())
}
