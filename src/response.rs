//! Typed API responses.
//!
//! Every response wraps the raw HTTP status and body; the body is parsed
//! into its shape-specific form on first access and cached. Success and
//! failure are judged purely from the HTTP status class, so a failed
//! call is still a value the caller can inspect rather than an error,
//! with one deliberate exception: [`EmbeddingResponse::embedding`]
//! raises the upstream message as [`Error::EmbeddingCreation`].

use bytes::Bytes;
use once_cell::sync::OnceCell;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::borrow::Cow;

use crate::error::Error;

/// The raw result of one HTTP call: status code plus unparsed body.
#[derive(Debug, Clone)]
pub struct RawResponse {
    status: u16,
    body: Bytes,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Whether the HTTP status is in the success range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// A response whose body parses lazily into `B` on first access.
#[derive(Debug)]
pub struct ApiResponse<B> {
    raw: RawResponse,
    parsed: OnceCell<B>,
}

impl<B: DeserializeOwned> ApiResponse<B> {
    pub fn new(raw: RawResponse) -> Self {
        Self {
            raw,
            parsed: OnceCell::new(),
        }
    }

    pub fn status(&self) -> u16 {
        self.raw.status()
    }

    pub fn is_success(&self) -> bool {
        self.raw.is_success()
    }

    pub fn raw(&self) -> &RawResponse {
        &self.raw
    }

    /// The parsed body; parsed once and cached thereafter.
    pub fn body(&self) -> Result<&B, Error> {
        self.parsed
            .get_or_try_init(|| serde_json::from_slice(self.raw.body()).map_err(Error::from))
    }
}

impl<B: DeserializeOwned> From<RawResponse> for ApiResponse<B> {
    fn from(raw: RawResponse) -> Self {
        Self::new(raw)
    }
}

/// Response to a chat completion call.
pub type ChatResponse = ApiResponse<TextBody>;
/// Response to a text completion call.
pub type CompletionResponse = ApiResponse<TextBody>;
/// Response to an edit call; shares the completion wire shape.
pub type EditResponse = ApiResponse<TextBody>;
/// Response to an image generation, edit or variation call.
pub type ImageResponse = ApiResponse<ImageBody>;
/// A non-2xx response carrying a structured error body.
pub type ErrorResponse = ApiResponse<ErrorBody>;

/// Shared body shape of chat, completion and edit responses.
#[derive(Debug, Clone, Deserialize)]
pub struct TextBody {
    #[serde(default)]
    pub id: Option<String>,
    pub object: String,
    pub created: i64,
    #[serde(default)]
    pub model: Option<String>,
    pub usage: Usage,
    pub choices: Vec<Choice>,
}

/// One candidate output within a response.
#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
    #[serde(default)]
    pub finish_reason: Option<String>,
    pub index: u32,
}

impl Choice {
    /// The textual content of the choice, preferring the structured
    /// message over the plain text field when both are present.
    pub fn to_text(&self) -> Option<&str> {
        if let Some(message) = &self.message {
            return Some(&message.content);
        }
        self.text.as_deref()
    }
}

/// The message carried by a chat choice.
#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    pub role: String,
    pub content: String,
}

/// Token accounting reported by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: Option<u32>,
    pub total_tokens: u32,
}

impl ApiResponse<TextBody> {
    pub fn choices(&self) -> Result<&[Choice], Error> {
        Ok(&self.body()?.choices)
    }

    pub fn usage(&self) -> Result<&Usage, Error> {
        Ok(&self.body()?.usage)
    }

    /// The text of the first choice, if any.
    pub fn text(&self) -> Result<Option<&str>, Error> {
        Ok(self.body()?.choices.first().and_then(Choice::to_text))
    }
}

/// Body of an image response: a `data` array of generated images.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageBody {
    pub created: i64,
    pub data: Vec<GeneratedImage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedImage {
    pub url: String,
}

impl ApiResponse<ImageBody> {
    /// URLs of all generated images.
    pub fn urls(&self) -> Result<Vec<&str>, Error> {
        Ok(self
            .body()?
            .data
            .iter()
            .map(|image| image.url.as_str())
            .collect())
    }
}

/// The standard error envelope returned on non-2xx statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl ApiResponse<ErrorBody> {
    /// The upstream error message, verbatim.
    pub fn message(&self) -> Result<&str, Error> {
        Ok(&self.body()?.error.message)
    }
}

/// An embedding vector returned by the embeddings endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub vector: Vec<f64>,
}

impl Embedding {
    pub fn len(&self) -> usize {
        self.vector.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vector.is_empty()
    }
}

/// Successful embeddings body.
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingSuccessBody {
    pub object: String,
    pub data: Vec<EmbeddingData>,
    pub model: String,
    pub usage: Usage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingData {
    #[serde(default)]
    pub object: Option<String>,
    pub embedding: Vec<f64>,
    pub index: u32,
}

/// Parsed embeddings body, branching on the HTTP status.
#[derive(Debug, Clone)]
pub enum EmbeddingBody {
    Success(EmbeddingSuccessBody),
    Error(ErrorBody),
}

/// Response to an embeddings call.
///
/// Unlike the other response kinds, [`embedding`](Self::embedding)
/// raises on failure, carrying the upstream message.
#[derive(Debug)]
pub struct EmbeddingResponse {
    raw: RawResponse,
    parsed: OnceCell<EmbeddingBody>,
}

impl EmbeddingResponse {
    pub fn new(raw: RawResponse) -> Self {
        Self {
            raw,
            parsed: OnceCell::new(),
        }
    }

    pub fn status(&self) -> u16 {
        self.raw.status()
    }

    pub fn is_success(&self) -> bool {
        self.raw.is_success()
    }

    /// The parsed body: the embedding shape on 200, the error envelope
    /// otherwise. Parsed once and cached thereafter.
    pub fn body(&self) -> Result<&EmbeddingBody, Error> {
        self.parsed.get_or_try_init(|| {
            if self.raw.status() == 200 {
                let body: EmbeddingSuccessBody = serde_json::from_slice(self.raw.body())?;
                Ok(EmbeddingBody::Success(body))
            } else {
                let body: ErrorBody = serde_json::from_slice(self.raw.body())?;
                Ok(EmbeddingBody::Error(body))
            }
        })
    }

    /// The first embedding vector on success; fails with
    /// [`Error::EmbeddingCreation`] carrying the upstream message
    /// otherwise.
    pub fn embedding(&self) -> Result<Embedding, Error> {
        match self.body()? {
            EmbeddingBody::Success(body) => body
                .data
                .first()
                .map(|data| Embedding {
                    vector: data.embedding.clone(),
                })
                .ok_or_else(|| {
                    Error::EmbeddingCreation("response contained no embeddings".to_string())
                }),
            EmbeddingBody::Error(body) => {
                Err(Error::EmbeddingCreation(body.error.message.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(status: u16, body: serde_json::Value) -> RawResponse {
        RawResponse::new(status, body.to_string())
    }

    fn chat_body() -> serde_json::Value {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1694268190,
            "model": "gpt-4",
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15},
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Hello there"},
                "finish_reason": "stop"
            }]
        })
    }

    #[test]
    fn success_follows_http_status() {
        let response = ChatResponse::new(raw(200, chat_body()));
        assert!(response.is_success());

        let response = ChatResponse::new(raw(400, json!({"error": {"message": "bad"}})));
        assert!(!response.is_success());
        assert_eq!(response.status(), 400);
    }

    #[test]
    fn body_parses_lazily_and_only_once() {
        let response = ChatResponse::new(raw(200, chat_body()));
        let first = response.body().unwrap() as *const TextBody;
        let second = response.body().unwrap() as *const TextBody;
        assert_eq!(first, second);
    }

    #[test]
    fn chat_text_comes_from_first_choice() {
        let response = ChatResponse::new(raw(200, chat_body()));
        assert_eq!(response.text().unwrap(), Some("Hello there"));
        assert_eq!(response.usage().unwrap().total_tokens, 15);
    }

    #[test]
    fn choice_prefers_message_over_text() {
        let choice = Choice {
            text: Some("raw text".to_string()),
            message: Some(ChoiceMessage {
                role: "assistant".to_string(),
                content: "message content".to_string(),
            }),
            finish_reason: None,
            index: 0,
        };
        assert_eq!(choice.to_text(), Some("message content"));

        let completion_choice = Choice {
            text: Some("completed text".to_string()),
            message: None,
            finish_reason: Some("stop".to_string()),
            index: 0,
        };
        assert_eq!(completion_choice.to_text(), Some("completed text"));

        let empty_choice = Choice {
            text: None,
            message: None,
            finish_reason: None,
            index: 1,
        };
        assert_eq!(empty_choice.to_text(), None);
    }

    #[test]
    fn invalid_json_body_is_a_parse_error() {
        let response = ChatResponse::new(RawResponse::new(200, "not json"));
        assert!(matches!(response.body(), Err(Error::Parse(_))));
    }

    #[test]
    fn image_urls_are_collected() {
        let response = ImageResponse::new(raw(
            200,
            json!({
                "created": 1694268190,
                "data": [
                    {"url": "https://images.example/one.png"},
                    {"url": "https://images.example/two.png"}
                ]
            }),
        ));
        assert_eq!(
            response.urls().unwrap(),
            vec![
                "https://images.example/one.png",
                "https://images.example/two.png"
            ]
        );
    }

    #[test]
    fn embedding_length_matches_vector() {
        let response = EmbeddingResponse::new(raw(
            200,
            json!({
                "object": "list",
                "model": "text-embedding-ada-002",
                "usage": {"prompt_tokens": 8, "total_tokens": 8},
                "data": [{"object": "embedding", "index": 0, "embedding": [0.1, -0.2, 0.3]}]
            }),
        ));
        let embedding = response.embedding().unwrap();
        assert_eq!(embedding.len(), 3);
        assert_eq!(embedding.vector, vec![0.1, -0.2, 0.3]);
    }

    #[test]
    fn embedding_failure_carries_upstream_message() {
        let response = EmbeddingResponse::new(raw(
            429,
            json!({"error": {"message": "Rate limit reached for requests"}}),
        ));
        let err = response.embedding().unwrap_err();
        assert!(matches!(
            err,
            Error::EmbeddingCreation(message) if message == "Rate limit reached for requests"
        ));
    }

    #[test]
    fn error_response_exposes_message() {
        let response = ErrorResponse::new(raw(
            400,
            json!({"error": {"message": "Invalid model", "type": "invalid_request_error"}}),
        ));
        assert_eq!(response.message().unwrap(), "Invalid model");
    }
}
