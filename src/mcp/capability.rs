//! Capability descriptors and result payloads.
//!
//! Descriptors are what `*/list` returns; the result types are what
//! `tools/call`, `resources/read` and `prompts/get` put in the `result`
//! member of the response.

use serde::Serialize;
use serde_json::Value;

/// A tool definition for tools/list response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

/// A resource definition for resources/list response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    /// Unique resource URI.
    pub uri: String,
    /// Display name.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// MIME type of the content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// A prompt definition for prompts/list response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptDescriptor {
    /// Unique prompt name.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Arguments the template accepts, in declaration order.
    pub arguments: Vec<PromptArgument>,
}

/// One argument of a prompt template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptArgument {
    /// Argument name.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the client is expected to supply it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    /// Value substituted when the client omits the argument. Not advertised.
    #[serde(skip)]
    pub default: Option<String>,
}

impl PromptArgument {
    /// Creates a required argument with a fallback value.
    #[must_use]
    pub fn required_with_default(
        name: impl Into<String>,
        description: impl Into<String>,
        default: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            required: Some(true),
            default: Some(default.into()),
        }
    }
}

/// A content block. The wire form is `{"type": "text", "text": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

impl Content {
    /// Creates a text block.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// Result of a tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<Content>,
}

impl ToolCallResult {
    /// Creates a single-block text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(text)],
        }
    }
}

/// One entry of a resources/read response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    /// URI that was read.
    pub uri: String,
    /// MIME type of `text`.
    pub mime_type: String,
    /// The resource body.
    pub text: String,
}

/// Result of resources/read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadResourceResult {
    /// Always exactly one entry.
    pub contents: Vec<ResourceContents>,
}

/// Speaker of a prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End user.
    User,
    /// Model.
    Assistant,
    /// System instructions.
    System,
}

/// A role-tagged message in a rendered prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptMessage {
    /// Who speaks.
    pub role: Role,
    /// What is said.
    pub content: Content,
}

impl PromptMessage {
    /// Creates a text message.
    #[must_use]
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: Content::text(text),
        }
    }
}

/// Result of prompts/get.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GetPromptResult {
    /// Description of the rendered prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Rendered messages, in order.
    pub messages: Vec<PromptMessage>,
}
