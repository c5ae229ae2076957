//! Sample resource: the server README.

use crate::mcp::capability::ResourceDescriptor;

/// URI of the README resource.
pub const README_URI: &str = "example://readme";

/// Body served for [`README_URI`].
pub const README_TEXT: &str = "This is a sample MCP server.\n\n\
It demonstrates:\n\
- Tool execution (calculate, echo)\n\
- Resource reading\n\
- Prompt retrieval";

/// Descriptor for the README resource.
#[must_use]
pub fn readme_descriptor() -> ResourceDescriptor {
    ResourceDescriptor {
        uri: README_URI.to_string(),
        name: "Server README".to_string(),
        description: Some("Information about this MCP server".to_string()),
        mime_type: Some("text/plain".to_string()),
    }
}
