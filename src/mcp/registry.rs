//! Capability registry: the tools, resources and prompts a server exposes.
//!
//! The registry is assembled once with [`RegistryBuilder`] and is read-only
//! afterwards. Each family is an insertion-ordered map, so `*/list` responses
//! come back in registration order and lookups are exact, case-sensitive
//! key matches.
//!
//! Execution logic is registered alongside each descriptor under the same key,
//! which lets new tools be added without touching the dispatcher.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::map::Entry;
use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{McpError, RegistryError};
use crate::mcp::capability::{
    GetPromptResult, PromptDescriptor, ResourceDescriptor, ToolCallResult, ToolDescriptor,
};

/// MIME type reported by `resources/read` when the descriptor declares none.
pub const DEFAULT_MIME_TYPE: &str = "text/plain";

/// Prompt arguments after defaults have been applied.
pub type PromptArguments = BTreeMap<String, String>;

/// Executes a tool against its decoded `arguments` object.
pub type ToolHandler = Box<dyn Fn(Value) -> Result<ToolCallResult, McpError> + Send + Sync>;

/// Renders a prompt template from resolved arguments.
pub type PromptRenderer =
    Box<dyn Fn(&PromptArguments) -> Result<GetPromptResult, McpError> + Send + Sync>;

/// A tool descriptor together with its handler.
pub struct RegisteredTool {
    /// What `tools/list` advertises.
    pub descriptor: ToolDescriptor,
    handler: ToolHandler,
}

impl RegisteredTool {
    /// Runs the tool.
    ///
    /// # Errors
    ///
    /// Returns whatever failure the tool reports.
    pub fn call(&self, arguments: Value) -> Result<ToolCallResult, McpError> {
        (self.handler)(arguments)
    }
}

impl fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredTool")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// A resource descriptor together with its content.
#[derive(Debug, Clone)]
pub struct RegisteredResource {
    /// What `resources/list` advertises.
    pub descriptor: ResourceDescriptor,
    /// Body returned by `resources/read`.
    pub text: String,
}

impl RegisteredResource {
    /// MIME type to report when reading this resource.
    #[must_use]
    pub fn mime_type(&self) -> &str {
        self.descriptor
            .mime_type
            .as_deref()
            .unwrap_or(DEFAULT_MIME_TYPE)
    }
}

/// A prompt descriptor together with its renderer.
pub struct RegisteredPrompt {
    /// What `prompts/list` advertises.
    pub descriptor: PromptDescriptor,
    renderer: PromptRenderer,
}

impl RegisteredPrompt {
    /// Resolves client arguments against the declared ones and renders.
    ///
    /// Declared arguments the client omitted take their registered default.
    /// A required argument with neither a value nor a default is rejected.
    /// Undeclared arguments are passed through untouched.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParams` for a missing required argument, or whatever
    /// the renderer reports.
    pub fn render(&self, mut provided: PromptArguments) -> Result<GetPromptResult, McpError> {
        let mut resolved = PromptArguments::new();

        for arg in &self.descriptor.arguments {
            match provided.remove(&arg.name).or_else(|| arg.default.clone()) {
                Some(value) => {
                    resolved.insert(arg.name.clone(), value);
                }
                None if arg.required == Some(true) => {
                    return Err(McpError::InvalidParams(format!(
                        "Missing required argument '{}' for prompt '{}'",
                        arg.name, self.descriptor.name
                    )));
                }
                None => {}
            }
        }
        resolved.extend(provided);

        (self.renderer)(&resolved)
    }
}

impl fmt::Debug for RegisteredPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredPrompt")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// The set of capabilities a server exposes. Immutable once built.
#[derive(Debug, Default)]
pub struct Registry {
    tools: IndexMap<String, RegisteredTool>,
    resources: IndexMap<String, RegisteredResource>,
    prompts: IndexMap<String, RegisteredPrompt>,
}

impl Registry {
    /// Starts building a registry.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Looks up a tool by name.
    #[must_use]
    pub fn tool(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.get(name)
    }

    /// Looks up a resource by uri.
    #[must_use]
    pub fn resource(&self, uri: &str) -> Option<&RegisteredResource> {
        self.resources.get(uri)
    }

    /// Looks up a prompt by name.
    #[must_use]
    pub fn prompt(&self, name: &str) -> Option<&RegisteredPrompt> {
        self.prompts.get(name)
    }

    /// Tool descriptors in registration order.
    pub fn tools(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.values().map(|t| &t.descriptor)
    }

    /// Resource descriptors in registration order.
    pub fn resources(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.resources.values().map(|r| &r.descriptor)
    }

    /// Prompt descriptors in registration order.
    pub fn prompts(&self) -> impl Iterator<Item = &PromptDescriptor> {
        self.prompts.values().map(|p| &p.descriptor)
    }
}

/// Collects registrations and rejects duplicate keys.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    registry: Registry,
}

impl RegistryBuilder {
    /// Registers a tool and its handler.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Duplicate` if the name is already taken.
    pub fn tool<F>(mut self, descriptor: ToolDescriptor, handler: F) -> Result<Self, RegistryError>
    where
        F: Fn(Value) -> Result<ToolCallResult, McpError> + Send + Sync + 'static,
    {
        let tool = RegisteredTool {
            descriptor,
            handler: Box::new(handler),
        };
        insert_unique(
            &mut self.registry.tools,
            "tool",
            tool.descriptor.name.clone(),
            tool,
        )?;
        Ok(self)
    }

    /// Registers a resource with fixed text content.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Duplicate` if the uri is already taken.
    pub fn resource(
        mut self,
        descriptor: ResourceDescriptor,
        text: impl Into<String>,
    ) -> Result<Self, RegistryError> {
        let resource = RegisteredResource {
            descriptor,
            text: text.into(),
        };
        insert_unique(
            &mut self.registry.resources,
            "resource",
            resource.descriptor.uri.clone(),
            resource,
        )?;
        Ok(self)
    }

    /// Registers a prompt and its renderer.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Duplicate` if the name is already taken.
    pub fn prompt<F>(
        mut self,
        descriptor: PromptDescriptor,
        renderer: F,
    ) -> Result<Self, RegistryError>
    where
        F: Fn(&PromptArguments) -> Result<GetPromptResult, McpError> + Send + Sync + 'static,
    {
        let prompt = RegisteredPrompt {
            descriptor,
            renderer: Box::new(renderer),
        };
        insert_unique(
            &mut self.registry.prompts,
            "prompt",
            prompt.descriptor.name.clone(),
            prompt,
        )?;
        Ok(self)
    }

    /// Finishes the registry.
    #[must_use]
    pub fn build(self) -> Registry {
        self.registry
    }
}

fn insert_unique<T>(
    map: &mut IndexMap<String, T>,
    family: &'static str,
    key: String,
    value: T,
) -> Result<(), RegistryError> {
    match map.entry(key) {
        Entry::Occupied(entry) => Err(RegistryError::Duplicate {
            family,
            key: entry.key().clone(),
        }),
        Entry::Vacant(entry) => {
            entry.insert(value);
            Ok(())
        }
    }
}
