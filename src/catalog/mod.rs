//! Built-in capability providers.
//!
//! These are sample registrations against the core's extension points: two
//! tools, one resource and one prompt. Swapping them out never touches the
//! dispatcher.

pub mod prompts;
pub mod resources;
pub mod tools;

use crate::error::RegistryError;
use crate::mcp::registry::Registry;

/// Builds the registry served by the binary.
///
/// # Errors
///
/// Returns an error if two providers claim the same key.
pub fn default_registry() -> Result<Registry, RegistryError> {
    Ok(Registry::builder()
        .tool(tools::calculate_descriptor(), tools::calculate)?
        .tool(tools::echo_descriptor(), tools::echo)?
        .resource(resources::readme_descriptor(), resources::README_TEXT)?
        .prompt(prompts::greeting_descriptor(), prompts::greeting)?
        .build())
}
