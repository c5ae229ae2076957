//! Sample prompt: `greeting`.

use crate::error::McpError;
use crate::mcp::capability::{
    GetPromptResult, PromptArgument, PromptDescriptor, PromptMessage, Role,
};
use crate::mcp::registry::PromptArguments;

/// Name substituted when the client does not supply one.
pub const DEFAULT_GREETING_NAME: &str = "World";

/// Descriptor for `greeting`.
#[must_use]
pub fn greeting_descriptor() -> PromptDescriptor {
    PromptDescriptor {
        name: "greeting".to_string(),
        description: Some("Generate a friendly greeting".to_string()),
        arguments: vec![PromptArgument::required_with_default(
            "name",
            "Name of the person to greet",
            DEFAULT_GREETING_NAME,
        )],
    }
}

/// Renders `greeting`.
///
/// # Errors
///
/// Never fails; the signature matches the renderer contract.
#[allow(clippy::unnecessary_wraps)]
pub fn greeting(args: &PromptArguments) -> Result<GetPromptResult, McpError> {
    let name = args
        .get("name")
        .map_or(DEFAULT_GREETING_NAME, String::as_str);

    Ok(GetPromptResult {
        description: Some("A friendly greeting".to_string()),
        messages: vec![PromptMessage::text(
            Role::User,
            format!("Please provide a warm and friendly greeting for {name}."),
        )],
    })
}
