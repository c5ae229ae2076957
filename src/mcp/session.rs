//! Protocol session state.
//!
//! A session starts uninitialised and flips to initialised exactly once, on
//! the first successful `initialize`. It is never reset within a run.

use serde::Deserialize;

use crate::error::McpError;

/// Client information received during initialisation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Parameters for the initialize request.
///
/// Every field is optional and unknown members such as `capabilities` are
/// ignored: `initialize` tolerates any shape.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by client.
    #[serde(default)]
    pub protocol_version: Option<String>,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// Initialisation state of the single client connection.
#[derive(Debug, Default)]
pub struct Session {
    initialized: bool,
    client_info: Option<ClientInfo>,
    requested_version: Option<String>,
}

impl Session {
    /// Creates an uninitialised session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether `initialize` has completed.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Client identity from the most recent `initialize`, if it sent one.
    #[must_use]
    pub const fn client_info(&self) -> Option<&ClientInfo> {
        self.client_info.as_ref()
    }

    /// Protocol version the client asked for, if it sent one.
    #[must_use]
    pub fn requested_version(&self) -> Option<&str> {
        self.requested_version.as_deref()
    }

    /// Marks the session initialised. Calling it again keeps it initialised.
    ///
    /// Returns `true` if this call performed the transition.
    pub fn initialize(&mut self, params: InitializeParams) -> bool {
        if params.client_info.is_some() {
            self.client_info = params.client_info;
        }
        if params.protocol_version.is_some() {
            self.requested_version = params.protocol_version;
        }

        let transitioned = !self.initialized;
        self.initialized = true;
        transitioned
    }

    /// Ensures `initialize` has completed.
    ///
    /// # Errors
    ///
    /// Returns `McpError::NotInitialized` otherwise.
    pub const fn require_initialized(&self) -> Result<(), McpError> {
        if self.initialized {
            Ok(())
        } else {
            Err(McpError::NotInitialized)
        }
    }
}
