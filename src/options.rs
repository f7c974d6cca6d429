//! Typed per-call option records.
//!
//! Each record holds only the caller-overridable fields of an operation;
//! anything left unset receives the documented default during operation
//! validation. Builders follow the `with_*` convention.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Error;

/// Options for chat completion calls.
///
/// # Example
/// ```
/// use petalflow::options::ChatOptions;
///
/// let options = ChatOptions::default()
///     .with_temperature(0.7)
///     .with_max_tokens(256)
///     .with_user("user-1234");
/// ```
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_events: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<String>,
}

impl ChatOptions {
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_n(mut self, n: u64) -> Self {
        self.n = Some(n);
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = Some(stream);
        self
    }

    pub fn with_stop(mut self, stop: impl Into<Value>) -> Self {
        self.stop = Some(stop.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_presence_penalty(mut self, penalty: f64) -> Self {
        self.presence_penalty = Some(penalty);
        self
    }

    pub fn with_frequency_penalty(mut self, penalty: f64) -> Self {
        self.frequency_penalty = Some(penalty);
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_functions(mut self, functions: Vec<Value>) -> Self {
        self.functions = Some(functions);
        self
    }

    pub fn with_function_call(mut self, function_call: impl Into<Value>) -> Self {
        self.function_call = Some(function_call.into());
        self
    }

    /// Republish decoded stream frames on the injected event bus.
    pub fn with_stream_events(mut self, stream_events: bool) -> Self {
        self.stream_events = Some(stream_events);
        self
    }

    /// Correlation id attached to republished stream events.
    pub fn with_stream_id(mut self, stream_id: impl Into<String>) -> Self {
        self.stream_id = Some(stream_id.into());
        self
    }

    pub(crate) fn into_fields(self) -> Result<Map<String, Value>, Error> {
        fields_of(&self)
    }
}

/// Options for text completion calls.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompletionOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub echo: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_of: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl CompletionOptions {
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_n(mut self, n: u64) -> Self {
        self.n = Some(n);
        self
    }

    pub fn with_logprobs(mut self, logprobs: u64) -> Self {
        self.logprobs = Some(logprobs);
        self
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = Some(echo);
        self
    }

    pub fn with_stop(mut self, stop: impl Into<Value>) -> Self {
        self.stop = Some(stop.into());
        self
    }

    pub fn with_best_of(mut self, best_of: u64) -> Self {
        self.best_of = Some(best_of);
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub(crate) fn into_fields(self) -> Result<Map<String, Value>, Error> {
        fields_of(&self)
    }
}

/// Options shared by the image generation, edit and variation calls.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImageOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl ImageOptions {
    pub fn with_n(mut self, n: u64) -> Self {
        self.n = Some(n);
        self
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn with_response_format(mut self, response_format: impl Into<String>) -> Self {
        self.response_format = Some(response_format.into());
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub(crate) fn into_fields(self) -> Result<Map<String, Value>, Error> {
        fields_of(&self)
    }
}

fn fields_of<T: Serialize>(options: &T) -> Result<Map<String, Value>, Error> {
    match serde_json::to_value(options)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_options_serialize_to_no_fields() {
        let fields = ChatOptions::default().into_fields().unwrap();
        assert!(fields.is_empty());
    }

    #[test]
    fn set_options_appear_as_fields() {
        let fields = CompletionOptions::default()
            .with_max_tokens(32)
            .with_echo(true)
            .into_fields()
            .unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["max_tokens"], Value::from(32));
        assert_eq!(fields["echo"], Value::from(true));
    }

    #[test]
    fn stop_accepts_string_or_sequence() {
        let single = ChatOptions::default().with_stop("END");
        assert!(single.stop.unwrap().is_string());

        let many = ChatOptions::default().with_stop(vec!["END", "STOP"]);
        assert!(many.stop.unwrap().is_array());
    }
}
