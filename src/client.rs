//! The API client: request dispatch, retries, streaming and uploads.
//!
//! The client owns two HTTP connections (JSON and multipart) plus two
//! optional injected collaborators: an [`EventBus`] for republishing
//! decoded stream frames and a [`Tokenizer`] for pre-flight token
//! budget checks. Rate-limited requests (HTTP 429) are retried with
//! exponential backoff and jitter; every other status is returned to
//! the caller as a value.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use itertools::Itertools;
use nonempty::NonEmpty;
use rand::Rng;
use serde_json::Value;

use crate::config::Config;
use crate::error::Error;
use crate::events::{EventBus, StreamEvent};
use crate::files::{File, FileList};
use crate::http::{build_json_connection, build_multipart_connection};
use crate::message::ChatMessage;
use crate::model::{Model, ModelList, Tokenizer};
use crate::operation::{Operation, OperationKind};
use crate::options::{ChatOptions, CompletionOptions, ImageOptions};
use crate::response::{
    ChatResponse, CompletionResponse, EmbeddingResponse, ErrorResponse, ImageResponse, RawResponse,
};
use crate::sse::{delta_content, StreamDecoder};

/// Retries attempted after the initial request.
const RETRY_MAX: u32 = 3;
/// Base backoff delay, doubled on every retry.
const RETRY_BASE_DELAY_MS: u64 = 50;

const RATE_LIMIT_STATUS: u16 = 429;

/// Client for the API.
///
/// # Example
/// ```no_run
/// use nonempty::NonEmpty;
/// use petalflow::client::Client;
/// use petalflow::config::Config;
/// use petalflow::message::ChatMessage;
/// use petalflow::model::Model;
/// use petalflow::options::ChatOptions;
///
/// # async fn run() -> Result<(), petalflow::error::Error> {
/// let client = Client::new(Config::new("sk-...", "org-..."))?;
/// let messages = NonEmpty::new(ChatMessage::user("Say hello"));
/// let response = client
///     .create_chat_completion(&Model::named("gpt-4"), messages, ChatOptions::default())
///     .await?;
/// println!("{:?}", response.text()?);
/// # Ok(())
/// # }
/// ```
pub struct Client {
    config: Config,
    json: reqwest::Client,
    multipart: reqwest::Client,
    events: Option<Arc<dyn EventBus>>,
    tokenizer: Option<Arc<dyn Tokenizer>>,
}

impl Client {
    /// Create a client from a configuration, building both connections.
    pub fn new(config: Config) -> Result<Self, Error> {
        let json = build_json_connection(&config)?;
        let multipart = build_multipart_connection(&config)?;
        Ok(Self {
            config,
            json,
            multipart,
            events: None,
            tokenizer: None,
        })
    }

    /// Inject an event bus; decoded stream frames are republished on it
    /// for operations built with `stream_events`.
    pub fn with_event_bus(mut self, events: Arc<dyn EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Inject a tokenizer; chat calls are then checked against the
    /// model's token budget before anything is sent.
    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Send an operation and return the raw response, whatever its
    /// status. Only HTTP 429 is retried.
    pub async fn send(&self, operation: &Operation) -> Result<RawResponse, Error> {
        if matches!(operation, Operation::Upload(_)) {
            return Err(Error::Config(
                "file uploads go through Client::upload".to_string(),
            ));
        }

        tracing::debug!(path = operation.path(), "sending operation");
        let request = self
            .json
            .post(self.url(operation.path()))
            .json(&operation.body());
        let response = self.execute_with_retry(request).await?;
        raw_from(response).await
    }

    /// Send an operation as a streaming request and decode the SSE
    /// response into text fragments.
    ///
    /// The stream is lazy: nothing is pulled from the network until the
    /// caller polls it. A non-success status fails eagerly with
    /// [`Error::Api`] before any stream is returned.
    pub async fn send_streaming(
        &self,
        operation: &Operation,
    ) -> Result<impl Stream<Item = Result<String, Error>> + Send, Error> {
        let mut body = operation.body();
        body.insert("stream".to_string(), Value::from(true));

        tracing::debug!(path = operation.path(), "sending streaming operation");
        let request = self.json.post(self.url(operation.path())).json(&body);
        let response = self.execute_with_retry(request).await?;

        if !response.status().is_success() {
            let raw = raw_from(response).await?;
            return Err(api_error(&raw));
        }

        let bus = if operation.stream_events() {
            self.events.clone()
        } else {
            None
        };
        let stream_id = operation.stream_id().unwrap_or_default().to_string();

        Ok(decode_stream(response, bus, stream_id))
    }

    /// Create a chat completion.
    pub async fn create_chat_completion(
        &self,
        model: &Model,
        messages: NonEmpty<ChatMessage>,
        options: ChatOptions,
    ) -> Result<ChatResponse, Error> {
        self.enforce_token_budget(model, &messages)?;
        let operation = Operation::chat(model.name(), messages, options)?;
        let raw = self.send(&operation).await?;
        Ok(ChatResponse::new(raw))
    }

    /// Create a streaming chat completion, yielding text fragments as
    /// they arrive.
    pub async fn streaming_chat_completion(
        &self,
        model: &Model,
        messages: NonEmpty<ChatMessage>,
        options: ChatOptions,
    ) -> Result<impl Stream<Item = Result<String, Error>> + Send, Error> {
        self.enforce_token_budget(model, &messages)?;
        let operation = Operation::chat(model.name(), messages, options)?;
        self.send_streaming(&operation).await
    }

    /// Create a text completion.
    pub async fn create_completion(
        &self,
        model: &Model,
        prompt: impl Into<Value>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, Error> {
        let operation = Operation::completion(model.name(), prompt, options)?;
        let raw = self.send(&operation).await?;
        Ok(CompletionResponse::new(raw))
    }

    /// Create a streaming text completion.
    pub async fn streaming_completion(
        &self,
        model: &Model,
        prompt: impl Into<Value>,
        options: CompletionOptions,
    ) -> Result<impl Stream<Item = Result<String, Error>> + Send, Error> {
        let operation = Operation::completion(model.name(), prompt, options)?;
        self.send_streaming(&operation).await
    }

    /// Create an embedding for the given input.
    pub async fn create_embedding(
        &self,
        model: &Model,
        input: impl Into<Value>,
    ) -> Result<EmbeddingResponse, Error> {
        let operation = Operation::embedding(model.name(), input)?;
        let raw = self.send(&operation).await?;
        Ok(EmbeddingResponse::new(raw))
    }

    /// Generate images from a text prompt.
    pub async fn create_image(
        &self,
        prompt: &str,
        options: ImageOptions,
    ) -> Result<ImageResponse, Error> {
        let operation = Operation::image(prompt, options)?;
        let raw = self.send(&operation).await?;
        Ok(ImageResponse::new(raw))
    }

    /// Edit an image according to a text prompt.
    pub async fn create_image_edit(
        &self,
        image: &str,
        prompt: &str,
        mask: Option<&str>,
        options: ImageOptions,
    ) -> Result<ImageResponse, Error> {
        let operation = Operation::image_edit(image, prompt, mask, options)?;
        let raw = self.send(&operation).await?;
        Ok(ImageResponse::new(raw))
    }

    /// Generate variations of an existing image.
    pub async fn create_image_variation(
        &self,
        image: &str,
        options: ImageOptions,
    ) -> Result<ImageResponse, Error> {
        let operation = Operation::image_variation(image, options)?;
        let raw = self.send(&operation).await?;
        Ok(ImageResponse::new(raw))
    }

    /// Upload a file over the multipart connection.
    ///
    /// `purpose` defaults to `fine-tune` when not given. Unlike the
    /// JSON operations, a non-success status here is an [`Error::Api`]
    /// rather than a returned value.
    pub async fn upload(
        &self,
        content: Vec<u8>,
        filename: &str,
        purpose: Option<&str>,
    ) -> Result<File, Error> {
        let operation = Operation::upload(filename, purpose)?;
        let Operation::Upload(upload) = operation else {
            return Err(Error::Config("expected an upload operation".to_string()));
        };

        let part = reqwest::multipart::Part::bytes(content).file_name(upload.filename.clone());
        let form = reqwest::multipart::Form::new()
            .text("purpose", upload.purpose)
            .part("file", part);

        let response = self
            .multipart
            .post(self.url(OperationKind::Upload.path()))
            .multipart(form)
            .send()
            .await?;
        let raw = raw_from(response).await?;

        if !raw.is_success() {
            return Err(api_error(&raw));
        }
        Ok(serde_json::from_slice(raw.body())?)
    }

    /// List the models available to the configured organization.
    pub async fn models(&self) -> Result<Vec<Model>, Error> {
        let raw = self.get("/v1/models").await?;
        if !raw.is_success() {
            return Err(api_error(&raw));
        }
        let list: ModelList = serde_json::from_slice(raw.body())?;
        Ok(list.data.into_iter().map(Model::new).collect())
    }

    /// List uploaded files.
    pub async fn files(&self) -> Result<Vec<File>, Error> {
        let raw = self.get("/v1/files").await?;
        if !raw.is_success() {
            return Err(api_error(&raw));
        }
        let list: FileList = serde_json::from_slice(raw.body())?;
        Ok(list.data)
    }

    /// Retrieve the metadata of one uploaded file.
    pub async fn file(&self, id: &str) -> Result<File, Error> {
        let raw = self.get(&format!("/v1/files/{id}")).await?;
        if !raw.is_success() {
            return Err(api_error(&raw));
        }
        Ok(serde_json::from_slice(raw.body())?)
    }

    /// Retrieve the raw content of one uploaded file.
    pub async fn file_content(&self, id: &str) -> Result<Bytes, Error> {
        let raw = self.get(&format!("/v1/files/{id}/content")).await?;
        if !raw.is_success() {
            return Err(api_error(&raw));
        }
        Ok(raw.body().clone())
    }

    async fn get(&self, path: &str) -> Result<RawResponse, Error> {
        let request = self.json.get(self.url(path));
        let response = self.execute_with_retry(request).await?;
        raw_from(response).await
    }

    /// Fail fast when the conversation exceeds the model's token
    /// budget. A no-op without an injected tokenizer.
    fn enforce_token_budget(
        &self,
        model: &Model,
        messages: &NonEmpty<ChatMessage>,
    ) -> Result<(), Error> {
        let Some(tokenizer) = &self.tokenizer else {
            return Ok(());
        };

        let text = messages.iter().filter_map(ChatMessage::text).join("\n");
        let count = tokenizer.count_tokens(&text);
        let max = model.max_tokens();
        if count > max {
            return Err(Error::TokenLimitExceeded {
                model: model.name().to_string(),
                count,
                max,
            });
        }
        Ok(())
    }

    async fn execute_with_retry(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, Error> {
        let mut attempt = 0;
        loop {
            let prepared = request
                .try_clone()
                .ok_or_else(|| Error::Config("request body cannot be retried".to_string()))?;
            let response = prepared.send().await?;

            if response.status().as_u16() == RATE_LIMIT_STATUS && attempt < RETRY_MAX {
                let delay = backoff_delay(attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            return Ok(response);
        }
    }
}

/// Backoff delay for the given retry attempt: the base delay doubled
/// per attempt, scaled by a jitter factor in `[0.5, 1.5)`.
fn backoff_delay(attempt: u32) -> Duration {
    let base = RETRY_BASE_DELAY_MS << attempt;
    let jitter = rand::thread_rng().gen_range(0.5..1.5);
    Duration::from_millis((base as f64 * jitter) as u64)
}

async fn raw_from(response: reqwest::Response) -> Result<RawResponse, Error> {
    let status = response.status().as_u16();
    let body = response.bytes().await?;
    Ok(RawResponse::new(status, body))
}

/// Turn a failed raw response into [`Error::Api`], carrying the
/// upstream message when the body parses as the error envelope and the
/// raw body text otherwise.
fn api_error(raw: &RawResponse) -> Error {
    let response = ErrorResponse::new(raw.clone());
    let message = match response.message() {
        Ok(message) => message.to_string(),
        Err(_) => raw.text().into_owned(),
    };
    Error::Api {
        status: raw.status(),
        message,
    }
}

/// Decode an SSE byte stream into text fragments, republishing every
/// complete frame on the bus when one is given.
fn decode_stream(
    response: reqwest::Response,
    bus: Option<Arc<dyn EventBus>>,
    stream_id: String,
) -> impl Stream<Item = Result<String, Error>> + Send {
    let chunks = Box::pin(response.bytes_stream());
    let state = (chunks, StreamDecoder::new(), bus, stream_id);

    stream::unfold(state, |(mut chunks, mut decoder, bus, stream_id)| async move {
        loop {
            if decoder.is_done() {
                return None;
            }

            let chunk = match chunks.next().await {
                Some(Ok(chunk)) => chunk,
                Some(Err(err)) => {
                    return Some((Err(Error::from(err)), (chunks, decoder, bus, stream_id)));
                }
                None => return None,
            };

            let frames = decoder.feed(&chunk);
            if let Some(bus) = &bus {
                for frame in &frames {
                    bus.publish(StreamEvent::new(frame.clone(), stream_id.clone()))
                        .await;
                }
            }

            let fragment: String = frames.iter().filter_map(|frame| delta_content(frame)).collect();
            if !fragment.is_empty() {
                return Some((Ok(fragment), (chunks, decoder, bus, stream_id)));
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockito::Server;
    use serde_json::json;
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn test_config(base_url: &str) -> Config {
        Config::new("sk-test", "org-test").with_base_url(base_url)
    }

    fn client_for(server: &Server) -> Client {
        Client::new(test_config(&server.url())).unwrap()
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

    fn user_says(content: &str) -> NonEmpty<ChatMessage> {
        NonEmpty::new(ChatMessage::user(content))
    }

    struct FixedTokenizer(usize);

    impl Tokenizer for FixedTokenizer {
        fn count_tokens(&self, _text: &str) -> usize {
            self.0
        }
    }

    #[derive(Default)]
    struct RecordingBus {
        events: Mutex<Vec<StreamEvent>>,
    }

    #[async_trait]
    impl EventBus for RecordingBus {
        async fn publish(&self, event: StreamEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    /// Serve one canned HTTP response per accepted connection, closing
    /// the connection after each.
    async fn serve_responses(responses: Vec<String>) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                read_http_request(&mut socket).await;
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
        });
        format!("http://{addr}")
    }

    async fn read_http_request(socket: &mut tokio::net::TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|window| window == b"\r\n\r\n") {
                let headers = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                let content_length = headers
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|value| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + content_length {
                    return;
                }
            }
        }
    }

    fn http_response(status_line: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    #[test]
    fn backoff_delays_stay_within_jitter_bounds() {
        for attempt in 0..RETRY_MAX {
            let base = RETRY_BASE_DELAY_MS << attempt;
            for _ in 0..20 {
                let delay = backoff_delay(attempt).as_millis() as u64;
                assert!(delay >= base / 2, "{delay}ms below jitter floor");
                assert!(delay <= base * 3 / 2, "{delay}ms above jitter ceiling");
            }
        }
    }

    #[tokio::test]
    async fn chat_completion_sends_auth_headers() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_header("openai-organization", "org-test")
            .match_header("content-type", "application/json")
            .with_status(200)
            .with_body(chat_body().to_string())
            .create_async()
            .await;

        let client = client_for(&server);
        let response = client
            .create_chat_completion(&Model::named("gpt-4"), user_says("Hello"), ChatOptions::default())
            .await
            .unwrap();

        assert_eq!(response.text().unwrap(), Some("Hello there"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rate_limited_request_is_retried_until_success() {
        let limited = json!({"error": {"message": "Rate limit reached"}}).to_string();
        let url = serve_responses(vec![
            http_response("429 Too Many Requests", &limited),
            http_response("200 OK", &chat_body().to_string()),
        ])
        .await;

        let client = Client::new(test_config(&url)).unwrap();
        let response = client
            .create_chat_completion(&Model::named("gpt-4"), user_says("Hello"), ChatOptions::default())
            .await
            .unwrap();

        assert!(response.is_success());
        assert_eq!(response.text().unwrap(), Some("Hello there"));
    }

    #[tokio::test]
    async fn rate_limiting_gives_up_after_three_retries() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/embeddings")
            .with_status(429)
            .with_body(json!({"error": {"message": "Rate limit reached"}}).to_string())
            .expect(4)
            .create_async()
            .await;

        let client = client_for(&server);
        let response = client
            .create_embedding(&Model::named("text-embedding-ada-002"), "hello")
            .await
            .unwrap();

        assert_eq!(response.status(), 429);
        assert!(matches!(
            response.embedding(),
            Err(Error::EmbeddingCreation(message)) if message == "Rate limit reached"
        ));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_errors_are_returned_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(400)
            .with_body(json!({"error": {"message": "Invalid model"}}).to_string())
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server);
        let response = client
            .create_chat_completion(&Model::named("gpt-4"), user_says("Hello"), ChatOptions::default())
            .await
            .unwrap();

        assert_eq!(response.status(), 400);
        assert!(!response.is_success());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn token_budget_is_enforced_before_sending() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .expect(0)
            .create_async()
            .await;

        let client = client_for(&server).with_tokenizer(Arc::new(FixedTokenizer(10_000)));
        let err = client
            .create_chat_completion(
                &Model::named("gpt-4"),
                user_says("far too long"),
                ChatOptions::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::TokenLimitExceeded { count: 10_000, max: 8192, .. }
        ));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn streaming_chat_yields_text_fragments() {
        let mut server = Server::new_async().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\" world\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await;

        let client = client_for(&server);
        let stream = client
            .streaming_chat_completion(
                &Model::named("gpt-4"),
                user_says("Say hello"),
                ChatOptions::default(),
            )
            .await
            .unwrap();

        let fragments: Vec<String> = stream.map(|fragment| fragment.unwrap()).collect().await;
        assert_eq!(fragments.concat(), "Hello world");
    }

    #[tokio::test]
    async fn streaming_call_with_error_status_fails_eagerly() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(401)
            .with_body(json!({"error": {"message": "Incorrect API key"}}).to_string())
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client
            .streaming_chat_completion(
                &Model::named("gpt-4"),
                user_says("Hello"),
                ChatOptions::default(),
            )
            .await;
        let err = match err {
            Ok(_) => panic!("expected an error, got a stream"),
            Err(err) => err,
        };

        assert!(matches!(
            err,
            Error::Api { status: 401, message } if message == "Incorrect API key"
        ));
    }

    #[tokio::test]
    async fn stream_frames_are_republished_on_the_bus() {
        let mut server = Server::new_async().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\" world\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await;

        let bus = Arc::new(RecordingBus::default());
        let client = client_for(&server).with_event_bus(bus.clone());
        let options = ChatOptions::default()
            .with_stream_events(true)
            .with_stream_id("stream-7");
        let stream = client
            .streaming_chat_completion(&Model::named("gpt-4"), user_says("Say hello"), options)
            .await
            .unwrap();

        let _fragments: Vec<_> = stream.collect().await;

        let events = bus.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|event| event.stream_id == "stream-7"));
        assert!(events[0].body.contains("Hello"));
    }

    #[tokio::test]
    async fn events_are_not_published_without_opt_in() {
        let mut server = Server::new_async().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let bus = Arc::new(RecordingBus::default());
        let client = client_for(&server).with_event_bus(bus.clone());
        let stream = client
            .streaming_chat_completion(
                &Model::named("gpt-4"),
                user_says("Say hi"),
                ChatOptions::default(),
            )
            .await
            .unwrap();

        let _fragments: Vec<_> = stream.collect().await;
        assert!(bus.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn upload_parses_file_metadata() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/files")
            .match_header("authorization", "Bearer sk-test")
            .with_status(200)
            .with_body(
                json!({
                    "id": "file-abc123",
                    "object": "file",
                    "bytes": 9,
                    "created_at": 1613779121,
                    "filename": "training.jsonl",
                    "purpose": "fine-tune"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let file = client
            .upload(b"{\"a\":1}\n".to_vec(), "training.jsonl", None)
            .await
            .unwrap();

        assert_eq!(file.id, "file-abc123");
        assert_eq!(file.purpose, "fine-tune");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn upload_failure_is_a_structured_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/files")
            .with_status(400)
            .with_body(json!({"error": {"message": "Invalid file format"}}).to_string())
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client
            .upload(b"not jsonl".to_vec(), "bad.txt", Some("fine-tune"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Api { status: 400, message } if message == "Invalid file format"
        ));
    }

    #[tokio::test]
    async fn models_listing_is_parsed() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/models")
            .with_status(200)
            .with_body(
                json!({
                    "object": "list",
                    "data": [
                        {"id": "gpt-4", "object": "model", "owned_by": "openai"},
                        {"id": "text-embedding-ada-002", "object": "model", "owned_by": "openai-internal"}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let models = client.models().await.unwrap();

        assert_eq!(models.len(), 2);
        assert_eq!(models[0].name(), "gpt-4");
        assert!(models[0].chattable());
        assert!(models[1].embeddable());
    }

    #[tokio::test]
    async fn file_listing_and_content_round_trip() {
        let mut server = Server::new_async().await;
        let _list = server
            .mock("GET", "/v1/files")
            .with_status(200)
            .with_body(
                json!({
                    "object": "list",
                    "data": [{
                        "id": "file-1",
                        "object": "file",
                        "bytes": 9,
                        "created_at": 1613779121,
                        "filename": "training.jsonl",
                        "purpose": "fine-tune"
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;
        let _content = server
            .mock("GET", "/v1/files/file-1/content")
            .with_status(200)
            .with_body("line one\n")
            .create_async()
            .await;

        let client = client_for(&server);
        let files = client.files().await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].filename, "training.jsonl");

        let content = client.file_content("file-1").await.unwrap();
        assert_eq!(&content[..], b"line one\n");
    }

    #[tokio::test]
    async fn listing_failure_surfaces_upstream_message() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/models")
            .with_status(401)
            .with_body(json!({"error": {"message": "Incorrect API key"}}).to_string())
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.models().await.unwrap_err();
        assert!(matches!(err, Error::Api { status: 401, .. }));
    }
}
