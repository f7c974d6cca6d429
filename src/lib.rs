//! # petalflow - OpenAI API client
//!
//! An async client for the OpenAI HTTP API: chat and text completions,
//! embeddings, image generation and editing, file uploads, and SSE
//! streaming.
//!
//! ## Features
//! - Async-first, tokio compatible
//! - Validated operations with declarative field tables and defaults
//! - Lazily parsed responses that keep the raw status and body around
//! - Streaming via Server-Sent Events, with optional event republishing
//! - Rate-limit retries with exponential backoff and jitter
//! - Pre-flight token budget checks through an injected tokenizer
//!
//! ## Example
//! ```no_run
//! use nonempty::NonEmpty;
//! use petalflow::{ChatMessage, ChatOptions, Client, Config, Model};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new(Config::new("your-api-key", "your-org"))?;
//!
//!     let messages = NonEmpty::from((
//!         ChatMessage::system("You are a helpful assistant."),
//!         vec![ChatMessage::user("Hello!")],
//!     ));
//!
//!     let response = client
//!         .create_chat_completion(
//!             &Model::named("gpt-4"),
//!             messages,
//!             ChatOptions::default().with_temperature(0.7),
//!         )
//!         .await?;
//!
//!     println!("{:?}", response.text()?);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod files;
mod http;
pub mod message;
pub mod model;
pub mod operation;
pub mod options;
pub mod response;
pub mod sse;

// Re-exports for convenience
pub use client::Client;
pub use config::{Config, SecretString};
pub use error::Error;
pub use events::{EventBus, NoopEventBus, StreamEvent};
pub use files::File;
pub use message::{ChatMessage, Content, MessageBuilder, Role};
pub use model::{Model, ModelInfo, Tokenizer};
pub use operation::{Operation, OperationKind};
pub use options::{ChatOptions, CompletionOptions, ImageOptions};
pub use response::{
    ChatResponse, CompletionResponse, EmbeddingResponse, ErrorResponse, ImageResponse, RawResponse,
};
pub use sse::StreamDecoder;
