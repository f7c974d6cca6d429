//! Validated, wire-ready API operations.
//!
//! An [`Operation`] is a typed description of one API call: a fixed
//! endpoint path plus a validated, defaulted JSON payload. Each variant
//! declares its fields in a declarative table ([`FieldSpec`]) that is
//! applied uniformly at construction time: required fields must be
//! present with the declared shape, optional fields receive their
//! documented default when absent, and undeclared fields are rejected.

use nonempty::NonEmpty;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::Error;
use crate::message::{ChatMessage, MessageBuilder};
use crate::options::{ChatOptions, CompletionOptions, ImageOptions};

/// The supported operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Chat,
    Completion,
    Embedding,
    Image,
    ImageEdit,
    ImageVariation,
    Upload,
}

impl OperationKind {
    /// Resolve a kind from its string tag.
    pub fn parse(tag: &str) -> Result<Self, Error> {
        match tag {
            "chat" => Ok(Self::Chat),
            "completion" => Ok(Self::Completion),
            "embedding" => Ok(Self::Embedding),
            "image" => Ok(Self::Image),
            "image_edit" => Ok(Self::ImageEdit),
            "image_variation" => Ok(Self::ImageVariation),
            "upload" => Ok(Self::Upload),
            other => Err(Error::UnknownOperation(other.to_string())),
        }
    }

    /// The fixed endpoint path for this kind.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Chat => "/v1/chat/completions",
            Self::Completion => "/v1/completions",
            Self::Embedding => "/v1/embeddings",
            Self::Image => "/v1/images/generations",
            Self::ImageEdit => "/v1/images/edits",
            Self::ImageVariation => "/v1/images/variations",
            Self::Upload => "/v1/files",
        }
    }

    fn fields(&self) -> &'static [FieldSpec] {
        match self {
            Self::Chat => CHAT_FIELDS,
            Self::Completion => COMPLETION_FIELDS,
            Self::Embedding => EMBEDDING_FIELDS,
            Self::Image => IMAGE_FIELDS,
            Self::ImageEdit => IMAGE_EDIT_FIELDS,
            Self::ImageVariation => IMAGE_VARIATION_FIELDS,
            Self::Upload => UPLOAD_FIELDS,
        }
    }
}

/// Accepted shape of a declared field.
#[derive(Debug, Clone, Copy)]
enum Shape {
    Str,
    Bool,
    Int,
    Number,
    Array,
    StrOrArray,
    StrOrObject,
    Messages,
}

impl Shape {
    fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Str => value.is_string(),
            Self::Bool => value.is_boolean(),
            Self::Int => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Array => value.is_array(),
            Self::StrOrArray => value.is_string() || value.is_array(),
            Self::StrOrObject => value.is_string() || value.is_object(),
            Self::Messages => value.is_array(),
        }
    }

    fn expected(&self) -> &'static str {
        match self {
            Self::Str => "a string",
            Self::Bool => "a boolean",
            Self::Int => "an integer",
            Self::Number => "a number",
            Self::Array => "an array",
            Self::StrOrArray => "a string or an array",
            Self::StrOrObject => "a string or an object",
            Self::Messages => "an array of messages",
        }
    }
}

/// Default value applied when an optional field is absent.
#[derive(Debug, Clone, Copy)]
enum DefaultValue {
    Float(f64),
    Int(u64),
    Bool(bool),
    Str(&'static str),
    /// A freshly generated stream correlation id.
    StreamId,
}

impl DefaultValue {
    fn materialize(&self) -> Value {
        match self {
            Self::Float(v) => Value::from(*v),
            Self::Int(v) => Value::from(*v),
            Self::Bool(v) => Value::from(*v),
            Self::Str(v) => Value::from(*v),
            Self::StreamId => Value::from(Uuid::new_v4().to_string()),
        }
    }
}

/// One declared field of an operation variant.
#[derive(Debug, Clone, Copy)]
struct FieldSpec {
    name: &'static str,
    shape: Shape,
    required: bool,
    default: Option<DefaultValue>,
}

impl FieldSpec {
    const fn required(name: &'static str, shape: Shape) -> Self {
        Self {
            name,
            shape,
            required: true,
            default: None,
        }
    }

    const fn optional(name: &'static str, shape: Shape) -> Self {
        Self {
            name,
            shape,
            required: false,
            default: None,
        }
    }

    const fn defaulted(name: &'static str, shape: Shape, default: DefaultValue) -> Self {
        Self {
            name,
            shape,
            required: false,
            default: Some(default),
        }
    }
}

const CHAT_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("model", Shape::Str),
    FieldSpec::required("messages", Shape::Messages),
    FieldSpec::optional("functions", Shape::Array),
    FieldSpec::optional("function_call", Shape::StrOrObject),
    FieldSpec::defaulted("temperature", Shape::Number, DefaultValue::Float(1.0)),
    FieldSpec::defaulted("top_p", Shape::Number, DefaultValue::Float(1.0)),
    FieldSpec::defaulted("n", Shape::Int, DefaultValue::Int(1)),
    FieldSpec::defaulted("stream", Shape::Bool, DefaultValue::Bool(false)),
    FieldSpec::optional("stop", Shape::StrOrArray),
    FieldSpec::optional("max_tokens", Shape::Int),
    FieldSpec::defaulted("presence_penalty", Shape::Number, DefaultValue::Float(0.0)),
    FieldSpec::defaulted("frequency_penalty", Shape::Number, DefaultValue::Float(0.0)),
    FieldSpec::optional("user", Shape::Str),
    // Transport-only fields, never serialized into the wire body.
    FieldSpec::defaulted("instrumentation", Shape::Bool, DefaultValue::Bool(false)),
    FieldSpec::defaulted("stream_events", Shape::Bool, DefaultValue::Bool(false)),
    FieldSpec::defaulted("stream_id", Shape::Str, DefaultValue::StreamId),
];

const COMPLETION_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("model", Shape::Str),
    FieldSpec::required("prompt", Shape::StrOrArray),
    FieldSpec::optional("suffix", Shape::Str),
    FieldSpec::defaulted("max_tokens", Shape::Int, DefaultValue::Int(16)),
    FieldSpec::defaulted("temperature", Shape::Number, DefaultValue::Float(1.0)),
    FieldSpec::defaulted("top_p", Shape::Number, DefaultValue::Float(1.0)),
    FieldSpec::defaulted("n", Shape::Int, DefaultValue::Int(1)),
    FieldSpec::defaulted("stream", Shape::Bool, DefaultValue::Bool(false)),
    FieldSpec::optional("logprobs", Shape::Int),
    FieldSpec::defaulted("echo", Shape::Bool, DefaultValue::Bool(false)),
    FieldSpec::optional("stop", Shape::StrOrArray),
    FieldSpec::defaulted("presence_penalty", Shape::Number, DefaultValue::Float(0.0)),
    FieldSpec::defaulted("frequency_penalty", Shape::Number, DefaultValue::Float(0.0)),
    FieldSpec::defaulted("best_of", Shape::Int, DefaultValue::Int(1)),
    FieldSpec::optional("user", Shape::Str),
];

const EMBEDDING_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("model", Shape::Str),
    FieldSpec::required("input", Shape::StrOrArray),
    FieldSpec::optional("user", Shape::Str),
];

const IMAGE_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("prompt", Shape::Str),
    FieldSpec::defaulted("n", Shape::Int, DefaultValue::Int(1)),
    FieldSpec::defaulted("size", Shape::Str, DefaultValue::Str("1024x1024")),
    FieldSpec::defaulted("response_format", Shape::Str, DefaultValue::Str("url")),
    FieldSpec::optional("user", Shape::Str),
];

const IMAGE_EDIT_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("image", Shape::Str),
    FieldSpec::optional("mask", Shape::Str),
    FieldSpec::required("prompt", Shape::Str),
    FieldSpec::defaulted("n", Shape::Int, DefaultValue::Int(1)),
    FieldSpec::defaulted("size", Shape::Str, DefaultValue::Str("1024x1024")),
    FieldSpec::defaulted("response_format", Shape::Str, DefaultValue::Str("url")),
    FieldSpec::optional("user", Shape::Str),
];

const IMAGE_VARIATION_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("image", Shape::Str),
    FieldSpec::defaulted("n", Shape::Int, DefaultValue::Int(1)),
    FieldSpec::defaulted("size", Shape::Str, DefaultValue::Str("1024x1024")),
    FieldSpec::defaulted("response_format", Shape::Str, DefaultValue::Str("url")),
    FieldSpec::optional("user", Shape::Str),
];

const UPLOAD_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("filename", Shape::Str),
    FieldSpec::defaulted("purpose", Shape::Str, DefaultValue::Str("fine-tune")),
];

/// Validate `input` against a field table, applying defaults in place.
fn validate(fields: &[FieldSpec], mut input: Map<String, Value>) -> Result<Map<String, Value>, Error> {
    for key in input.keys() {
        if !fields.iter().any(|spec| spec.name == key) {
            return Err(Error::UnknownField(key.clone()));
        }
    }

    for spec in fields {
        match input.get(spec.name) {
            Some(value) => {
                if !spec.shape.matches(value) {
                    return Err(Error::TypeMismatch {
                        field: spec.name.to_string(),
                        expected: spec.shape.expected(),
                    });
                }
            }
            None => {
                if spec.required {
                    return Err(Error::MissingField(spec.name.to_string()));
                }
                if let Some(default) = spec.default {
                    input.insert(spec.name.to_string(), default.materialize());
                }
            }
        }
    }

    Ok(input)
}

/// A chat operation: the wire payload plus transport-only flags.
#[derive(Debug, Clone)]
pub struct ChatOperation {
    payload: Map<String, Value>,
    /// Republish decoded stream frames on the event bus.
    pub stream_events: bool,
    /// Correlation id attached to republished stream events.
    pub stream_id: String,
    /// Reserved instrumentation flag, not sent over the wire.
    pub instrumentation: bool,
}

/// A JSON operation whose payload is sent as-is.
#[derive(Debug, Clone)]
pub struct JsonOperation {
    payload: Map<String, Value>,
}

/// A multipart file upload.
#[derive(Debug, Clone)]
pub struct UploadOperation {
    pub filename: String,
    pub purpose: String,
}

/// A validated, wire-ready description of one API call.
#[derive(Debug, Clone)]
pub enum Operation {
    Chat(ChatOperation),
    Completion(JsonOperation),
    Embedding(JsonOperation),
    Image(JsonOperation),
    ImageEdit(JsonOperation),
    ImageVariation(JsonOperation),
    Upload(UploadOperation),
}

impl Operation {
    /// Build an operation from loosely typed input fields.
    ///
    /// For chat, raw `messages` entries go through [`MessageBuilder`],
    /// which requires at least two entries and infers roles when none
    /// are given.
    pub fn build(kind: OperationKind, input: Map<String, Value>) -> Result<Self, Error> {
        let mut fields = validate(kind.fields(), input)?;

        match kind {
            OperationKind::Chat => {
                let raw = match fields.remove("messages") {
                    Some(Value::Array(entries)) => entries,
                    _ => return Err(Error::MissingField("messages".to_string())),
                };
                let messages = MessageBuilder::new(raw).build()?;
                fields.insert("messages".to_string(), serde_json::to_value(&messages)?);
                Ok(Self::Chat(ChatOperation::from_fields(fields)))
            }
            OperationKind::Completion => Ok(Self::Completion(JsonOperation { payload: fields })),
            OperationKind::Embedding => Ok(Self::Embedding(JsonOperation { payload: fields })),
            OperationKind::Image => Ok(Self::Image(JsonOperation { payload: fields })),
            OperationKind::ImageEdit => Ok(Self::ImageEdit(JsonOperation { payload: fields })),
            OperationKind::ImageVariation => {
                Ok(Self::ImageVariation(JsonOperation { payload: fields }))
            }
            OperationKind::Upload => {
                let filename = take_string(&mut fields, "filename")?;
                let purpose = take_string(&mut fields, "purpose")?;
                Ok(Self::Upload(UploadOperation { filename, purpose }))
            }
        }
    }

    /// Build a chat operation from already-typed messages.
    ///
    /// Unlike the loose path, typed messages skip the message builder;
    /// non-emptiness is enforced by the `NonEmpty` type.
    pub fn chat(
        model: &str,
        messages: NonEmpty<ChatMessage>,
        options: ChatOptions,
    ) -> Result<Self, Error> {
        let mut input = options.into_fields()?;
        input.insert("model".to_string(), Value::from(model));
        input.insert("messages".to_string(), serde_json::to_value(&messages)?);
        let fields = validate(CHAT_FIELDS, input)?;
        Ok(Self::Chat(ChatOperation::from_fields(fields)))
    }

    /// Build a text completion operation.
    pub fn completion(
        model: &str,
        prompt: impl Into<Value>,
        options: CompletionOptions,
    ) -> Result<Self, Error> {
        let mut input = options.into_fields()?;
        input.insert("model".to_string(), Value::from(model));
        input.insert("prompt".to_string(), prompt.into());
        Self::build(OperationKind::Completion, input)
    }

    /// Build an embedding operation.
    pub fn embedding(model: &str, input: impl Into<Value>) -> Result<Self, Error> {
        let mut fields = Map::new();
        fields.insert("model".to_string(), Value::from(model));
        fields.insert("input".to_string(), input.into());
        Self::build(OperationKind::Embedding, fields)
    }

    /// Build an image generation operation.
    pub fn image(prompt: &str, options: ImageOptions) -> Result<Self, Error> {
        let mut input = options.into_fields()?;
        input.insert("prompt".to_string(), Value::from(prompt));
        Self::build(OperationKind::Image, input)
    }

    /// Build an image edit operation.
    pub fn image_edit(
        image: &str,
        prompt: &str,
        mask: Option<&str>,
        options: ImageOptions,
    ) -> Result<Self, Error> {
        let mut input = options.into_fields()?;
        input.insert("image".to_string(), Value::from(image));
        input.insert("prompt".to_string(), Value::from(prompt));
        if let Some(mask) = mask {
            input.insert("mask".to_string(), Value::from(mask));
        }
        Self::build(OperationKind::ImageEdit, input)
    }

    /// Build an image variation operation.
    pub fn image_variation(image: &str, options: ImageOptions) -> Result<Self, Error> {
        let mut input = options.into_fields()?;
        input.insert("image".to_string(), Value::from(image));
        Self::build(OperationKind::ImageVariation, input)
    }

    /// Build a file upload operation.
    pub fn upload(filename: &str, purpose: Option<&str>) -> Result<Self, Error> {
        let mut input = Map::new();
        input.insert("filename".to_string(), Value::from(filename));
        if let Some(purpose) = purpose {
            input.insert("purpose".to_string(), Value::from(purpose));
        }
        Self::build(OperationKind::Upload, input)
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Chat(_) => OperationKind::Chat,
            Self::Completion(_) => OperationKind::Completion,
            Self::Embedding(_) => OperationKind::Embedding,
            Self::Image(_) => OperationKind::Image,
            Self::ImageEdit(_) => OperationKind::ImageEdit,
            Self::ImageVariation(_) => OperationKind::ImageVariation,
            Self::Upload(_) => OperationKind::Upload,
        }
    }

    /// The fixed endpoint path for this operation.
    pub fn path(&self) -> &'static str {
        self.kind().path()
    }

    /// The wire-ready payload, with transport-only fields excluded.
    pub fn body(&self) -> Map<String, Value> {
        match self {
            Self::Chat(op) => op.payload.clone(),
            Self::Completion(op)
            | Self::Embedding(op)
            | Self::Image(op)
            | Self::ImageEdit(op)
            | Self::ImageVariation(op) => op.payload.clone(),
            Self::Upload(op) => {
                let mut body = Map::new();
                body.insert("filename".to_string(), Value::from(op.filename.as_str()));
                body.insert("purpose".to_string(), Value::from(op.purpose.as_str()));
                body
            }
        }
    }

    /// Whether the payload requests a streamed response.
    pub fn is_stream(&self) -> bool {
        let payload = match self {
            Self::Chat(op) => &op.payload,
            Self::Completion(op) => &op.payload,
            _ => return false,
        };
        payload.get("stream").and_then(Value::as_bool).unwrap_or(false)
    }

    /// Whether decoded stream frames should be republished as events.
    pub fn stream_events(&self) -> bool {
        match self {
            Self::Chat(op) => op.stream_events,
            _ => false,
        }
    }

    /// The stream correlation id, if this operation carries one.
    pub fn stream_id(&self) -> Option<&str> {
        match self {
            Self::Chat(op) => Some(&op.stream_id),
            _ => None,
        }
    }
}

impl ChatOperation {
    /// Split validated fields into the wire payload and transport flags.
    fn from_fields(mut fields: Map<String, Value>) -> Self {
        let instrumentation = take_flag(&mut fields, "instrumentation");
        let stream_events = take_flag(&mut fields, "stream_events");
        let stream_id = fields
            .remove("stream_id")
            .and_then(|value| value.as_str().map(str::to_string))
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Self {
            payload: fields,
            stream_events,
            stream_id,
            instrumentation,
        }
    }
}

fn take_flag(fields: &mut Map<String, Value>, name: &str) -> bool {
    fields
        .remove(name)
        .and_then(|value| value.as_bool())
        .unwrap_or(false)
}

fn take_string(fields: &mut Map<String, Value>, name: &str) -> Result<String, Error> {
    match fields.remove(name) {
        Some(Value::String(value)) => Ok(value),
        _ => Err(Error::MissingField(name.to_string())),
    }
}
