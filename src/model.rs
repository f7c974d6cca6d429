//! Model catalog metadata and the tokenizer collaborator.

use serde::Deserialize;

/// Token budget assumed for models missing from the static table.
pub const MAX_TOKENS_DEFAULT: usize = 2049;

const CHAT_MODELS: &[&str] = &[
    "gpt-4",
    "gpt-4-0314",
    "gpt-4-32k",
    "gpt-4-32k-0314",
    "gpt-3.5-turbo",
    "gpt-3.5-turbo-0301",
];

const COMPLETION_MODELS: &[&str] = &[
    "text-davinci-003",
    "text-davinci-002",
    "text-curie-001",
    "text-babbage-001",
    "text-ada-001",
    "davinci",
    "curie",
    "babbage",
    "ada",
];

const EMBEDDING_MODELS: &[&str] = &["text-embedding-ada-002", "text-search-ada-doc-001"];

/// The maximum token budget for a model by name.
pub fn max_tokens_for(name: &str) -> usize {
    match name {
        "gpt-4" | "gpt-4-0314" => 8192,
        "gpt-4-32k" | "gpt-4-32k-0314" => 32_768,
        "gpt-3.5-turbo" | "gpt-3.5-turbo-0301" => 4096,
        "text-davinci-003" | "text-davinci-002" => 4097,
        "code-davinci-002" => 8001,
        _ => MAX_TOKENS_DEFAULT,
    }
}

/// One entry of the `GET /v1/models` listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub owned_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModelList {
    pub data: Vec<ModelInfo>,
}

/// A model known to the API, with its capability flags and token budget.
#[derive(Debug, Clone)]
pub struct Model {
    info: ModelInfo,
}

impl Model {
    pub fn new(info: ModelInfo) -> Self {
        Self { info }
    }

    /// A model handle by name, for callers that skip the catalog lookup.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            info: ModelInfo {
                id: name.into(),
                created: None,
                owned_by: None,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.info.id
    }

    pub fn created(&self) -> Option<i64> {
        self.info.created
    }

    pub fn owned_by(&self) -> Option<&str> {
        self.info.owned_by.as_deref()
    }

    /// The maximum token budget for this model.
    pub fn max_tokens(&self) -> usize {
        max_tokens_for(self.name())
    }

    /// Whether the model accepts chat completions.
    pub fn chattable(&self) -> bool {
        CHAT_MODELS.contains(&self.name())
    }

    /// Whether the model accepts text completions.
    pub fn completionable(&self) -> bool {
        COMPLETION_MODELS.contains(&self.name())
    }

    /// Whether the model produces embeddings.
    pub fn embeddable(&self) -> bool {
        EMBEDDING_MODELS.contains(&self.name())
    }
}

/// External token-counting capability, treated as a black box.
///
/// Injected into the client; when present, chat calls are checked
/// against the model's token budget before anything is sent.
pub trait Tokenizer: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;
}
