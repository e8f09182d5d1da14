use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::element::{
    dom::DomElement,
    element_model::{BoundingRect, Locator},
};

// ============================================================================
// Driver boundary
// ============================================================================

/// Opaque reference to a live element, as handed out by a driver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle(pub String);

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// The locator matched nothing on the current page
    #[error("no element matches locator {locator}")]
    NotFound { locator: String },

    /// The locator syntax is not understood by this driver
    #[error("unsupported locator {locator}: {reason}")]
    UnsupportedLocator { locator: String, reason: String },

    /// A handle no longer refers to an element
    #[error("stale element handle '{0}'")]
    StaleHandle(String),

    /// No document is loaded
    #[error("no document available: {0}")]
    NoDocument(String),

    /// Browser server process failed to spawn
    #[error("failed to spawn {script} (is Node.js installed?): {source}")]
    SubprocessSpawn {
        script: String,
        #[source]
        source: std::io::Error,
    },

    /// Pipe I/O with the browser server failed
    #[error("browser session I/O: {0}")]
    SessionIO(String),

    /// Browser server answered a command with an error
    #[error("browser command '{command}' failed: {error}")]
    SessionProtocol { command: String, error: String },

    #[error("JSON parse error ({context}): {source}")]
    JsonParse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON serialize error ({context}): {source}")]
    JsonSerialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl DriverError {
    pub fn not_found(locator: &Locator) -> Self {
        DriverError::NotFound {
            locator: locator.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DriverError::NotFound { .. })
    }
}

/// What the healing engine needs from a browser-automation driver.
///
/// Every call is blocking and runs on the caller's thread.
pub trait PageDriver {
    /// URL of the page currently loaded.
    fn current_url(&mut self) -> Result<String, DriverError>;

    /// Parsed document tree of the current page.
    fn current_page_document(&mut self) -> Result<DomElement, DriverError>;

    /// Locate one element. `DriverError::NotFound` is the failure that
    /// triggers healing.
    fn resolve_element(&mut self, locator: &Locator) -> Result<ElementHandle, DriverError>;

    fn element_tag(&mut self, handle: &ElementHandle) -> Result<String, DriverError>;

    /// All attributes present on the element. A `None` value means the
    /// driver reported the attribute without a value.
    fn element_attributes(
        &mut self,
        handle: &ElementHandle,
    ) -> Result<BTreeMap<String, Option<String>>, DriverError>;

    fn element_text(&mut self, handle: &ElementHandle) -> Result<String, DriverError>;

    fn element_bounding_rect(&mut self, handle: &ElementHandle) -> Result<BoundingRect, DriverError>;
}
