//! Stream events republished on an injected bus.
//!
//! The bus is a collaborator owned by the hosting application; the
//! client only pushes events into it, fire-and-forget. Publication
//! failures must never fail the streaming call, so the trait has no
//! error channel.

use async_trait::async_trait;

/// One decoded SSE frame, tagged with its stream correlation id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    /// The raw frame payload.
    pub body: String,
    /// Correlation id of the originating streaming call.
    pub stream_id: String,
}

impl StreamEvent {
    pub fn new(body: impl Into<String>, stream_id: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            stream_id: stream_id.into(),
        }
    }
}

/// Fire-and-forget event publication.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, event: StreamEvent);
}

/// A bus that drops every event; useful as a test stand-in.
#[derive(Debug, Default)]
pub struct NoopEventBus;

#[async_trait]
impl EventBus for NoopEventBus {
    async fn publish(&self, _event: StreamEvent) {}
}
