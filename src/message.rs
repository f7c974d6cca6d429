//! Chat conversation messages and the raw-entry message builder.

use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

/// Role of the message sender.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Message content: plain text, or structured parts for vision inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Parts(Vec<Value>),
}

/// A function call carried by an assistant turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Content,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Content::Text(content.into()),
            function_call: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// The textual content of the message, if it has any.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Content::Text(text) => Some(text),
            Content::Parts(_) => None,
        }
    }
}

/// Builds typed messages out of raw JSON entries.
///
/// When every entry carries a `role`, entries are parsed directly. When
/// no roles are supplied, a legacy recovery rule assigns the first entry
/// the `system` role and alternates `user`/`assistant` for the rest.
/// That rule is a best-effort guess about caller intent and is kept for
/// compatibility with existing callers only; prefer constructing
/// [`ChatMessage`] values directly.
pub struct MessageBuilder {
    entries: Vec<Value>,
}

impl MessageBuilder {
    pub fn new(entries: Vec<Value>) -> Self {
        Self { entries }
    }

    /// Validate the raw entries and build the typed message sequence.
    pub fn build(self) -> Result<NonEmpty<ChatMessage>, Error> {
        if self.entries.len() < 2 {
            return Err(Error::InsufficientMessages);
        }

        let entries: Vec<&Map<String, Value>> = self
            .entries
            .iter()
            .map(|entry| entry.as_object().ok_or(Error::MalformedMessages))
            .collect::<Result<_, _>>()?;

        let roles_specified = entries.iter().all(|entry| entry.contains_key("role"));

        let messages = if roles_specified {
            entries
                .into_iter()
                .map(parse_entry)
                .collect::<Result<Vec<_>, _>>()?
        } else {
            build_without_roles(&entries)?
        };

        NonEmpty::from_vec(messages).ok_or(Error::InsufficientMessages)
    }
}

fn parse_entry(entry: &Map<String, Value>) -> Result<ChatMessage, Error> {
    serde_json::from_value(Value::Object(entry.clone())).map_err(|_| Error::MalformedMessages)
}

fn build_without_roles(entries: &[&Map<String, Value>]) -> Result<Vec<ChatMessage>, Error> {
    let mut messages = Vec::with_capacity(entries.len());
    messages.push(entry_with_role(entries[0], Role::System)?);

    for (index, entry) in entries[1..].iter().enumerate() {
        let role = if index % 2 == 0 {
            Role::User
        } else {
            Role::Assistant
        };
        messages.push(entry_with_role(entry, role)?);
    }

    Ok(messages)
}

fn entry_with_role(entry: &Map<String, Value>, role: Role) -> Result<ChatMessage, Error> {
    let content = entry.get("content").ok_or(Error::MalformedMessages)?;
    let content: Content =
        serde_json::from_value(content.clone()).map_err(|_| Error::MalformedMessages)?;
    Ok(ChatMessage {
        role,
        content,
        function_call: None,
    })
}
