use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, Command, Stdio};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::driver::driver_model::{DriverError, ElementHandle, PageDriver};
use crate::element::{
    dom::DomElement,
    element_model::{BoundingRect, Locator},
};

/// Request sent to the browser server over stdin (one JSON line).
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BrowserRequest {
    Navigate {
        cmd: &'static str,
        url: String,
    },
    Document {
        cmd: &'static str,
    },
    CurrentUrl {
        cmd: &'static str,
    },
    Resolve {
        cmd: &'static str,
        strategy: String,
        value: String,
    },
    Describe {
        cmd: &'static str,
        handle: String,
    },
    Rect {
        cmd: &'static str,
        handle: String,
    },
    Quit {
        cmd: &'static str,
    },
}

impl BrowserRequest {
    pub fn navigate(url: &str) -> Self {
        BrowserRequest::Navigate {
            cmd: "navigate",
            url: url.to_string(),
        }
    }

    pub fn document() -> Self {
        BrowserRequest::Document { cmd: "document" }
    }

    pub fn current_url() -> Self {
        BrowserRequest::CurrentUrl { cmd: "current_url" }
    }

    pub fn resolve(locator: &Locator) -> Self {
        BrowserRequest::Resolve {
            cmd: "resolve",
            strategy: locator.strategy.as_str().to_string(),
            value: locator.value.clone(),
        }
    }

    pub fn describe(handle: &ElementHandle) -> Self {
        BrowserRequest::Describe {
            cmd: "describe",
            handle: handle.0.clone(),
        }
    }

    pub fn rect(handle: &ElementHandle) -> Self {
        BrowserRequest::Rect {
            cmd: "rect",
            handle: handle.0.clone(),
        }
    }

    pub fn quit() -> Self {
        BrowserRequest::Quit { cmd: "quit" }
    }
}

/// Response received from the browser server over stdout (one JSON line).
#[derive(Debug, Default, Deserialize)]
pub struct BrowserResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub ready: Option<bool>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub document: Option<Value>,
    #[serde(default)]
    pub found: Option<bool>,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub attributes: Option<BTreeMap<String, Option<String>>>,
    #[serde(default)]
    pub rect: Option<BoundingRect>,
}

/// Tag, text and attributes of one element, fetched in a single round trip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementDescription {
    pub tag: String,
    pub text: String,
    pub attributes: BTreeMap<String, Option<String>>,
}

/// A persistent browser session backed by a Node.js browser server.
///
/// The server keeps one page open; commands go out as NDJSON over stdin and
/// responses come back one line each over stdout.
pub struct BrowserSession {
    child: Child,
    stdin: std::process::ChildStdin,
    reader: BufReader<std::process::ChildStdout>,
    // The engine asks for tag, attributes and text back to back; one
    // `describe` answers all three.
    described: Option<(ElementHandle, ElementDescription)>,
}

impl BrowserSession {
    /// Launch a new session by spawning `node <server_script>`.
    pub fn launch(server_script: &str) -> Result<Self, DriverError> {
        let mut child = Command::new("node")
            .arg(server_script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| DriverError::SubprocessSpawn {
                script: server_script.to_string(),
                source: e,
            })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            DriverError::SessionIO("failed to capture stdin of browser server".into())
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            DriverError::SessionIO("failed to capture stdout of browser server".into())
        })?;

        let mut reader = BufReader::new(stdout);

        let mut line = String::new();
        reader
            .read_line(&mut line)
            .map_err(|e| DriverError::SessionIO(format!("failed to read ready signal: {}", e)))?;
        let response = parse_response(&line, "ready signal")?;
        if !response.ok || response.ready != Some(true) {
            return Err(DriverError::SessionProtocol {
                command: "launch".into(),
                error: "did not receive ready signal from browser server".into(),
            });
        }

        Ok(BrowserSession {
            child,
            stdin,
            reader,
            described: None,
        })
    }

    fn send(&mut self, request: &BrowserRequest) -> Result<BrowserResponse, DriverError> {
        let json = serde_json::to_string(request).map_err(|e| DriverError::JsonSerialize {
            context: "BrowserRequest".into(),
            source: e,
        })?;

        writeln!(self.stdin, "{}", json)
            .and_then(|_| self.stdin.flush())
            .map_err(|e| DriverError::SessionIO(format!("failed to write request: {}", e)))?;

        let mut line = String::new();
        self.reader
            .read_line(&mut line)
            .map_err(|e| DriverError::SessionIO(format!("failed to read response: {}", e)))?;

        if line.trim().is_empty() {
            return Err(DriverError::SessionIO(
                "empty response from browser server (process may have died)".into(),
            ));
        }
        parse_response(&line, "browser server response")
    }

    fn send_ok(
        &mut self,
        request: &BrowserRequest,
        command_name: &str,
    ) -> Result<BrowserResponse, DriverError> {
        let response = self.send(request)?;
        if !response.ok {
            return Err(DriverError::SessionProtocol {
                command: command_name.into(),
                error: response.error.unwrap_or_else(|| "unknown error".into()),
            });
        }
        Ok(response)
    }

    pub fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.described = None;
        self.send_ok(&BrowserRequest::navigate(url), "navigate")?;
        Ok(())
    }

    /// Fetch tag, text and attributes of an element, reusing the last answer
    /// for the same handle.
    pub fn describe(&mut self, handle: &ElementHandle) -> Result<ElementDescription, DriverError> {
        if let Some((cached, description)) = &self.described {
            if cached == handle {
                return Ok(description.clone());
            }
        }
        let response = self.send_ok(&BrowserRequest::describe(handle), "describe")?;
        let description = ElementDescription {
            tag: response.tag.ok_or_else(|| DriverError::StaleHandle(handle.0.clone()))?,
            text: response.text.unwrap_or_default(),
            attributes: response.attributes.unwrap_or_default(),
        };
        self.described = Some((handle.clone(), description.clone()));
        Ok(description)
    }

    /// Quit the browser session.
    pub fn quit(&mut self) -> Result<(), DriverError> {
        // Best-effort: the process may already be gone
        let _ = self.send(&BrowserRequest::quit());
        let _ = self.child.wait();
        Ok(())
    }
}

/// Parse one NDJSON line from the browser server.
pub fn parse_response(line: &str, context: &str) -> Result<BrowserResponse, DriverError> {
    serde_json::from_str(line.trim()).map_err(|e| DriverError::JsonParse {
        context: context.into(),
        source: e,
    })
}

impl PageDriver for BrowserSession {
    fn current_url(&mut self) -> Result<String, DriverError> {
        let response = self.send_ok(&BrowserRequest::current_url(), "current_url")?;
        response.url.ok_or_else(|| DriverError::SessionProtocol {
            command: "current_url".into(),
            error: "no url in response".into(),
        })
    }

    fn current_page_document(&mut self) -> Result<DomElement, DriverError> {
        let response = self.send_ok(&BrowserRequest::document(), "document")?;
        let document = response
            .document
            .ok_or_else(|| DriverError::NoDocument("no document in response".into()))?;
        serde_json::from_value(document).map_err(|e| DriverError::JsonParse {
            context: "document tree".into(),
            source: e,
        })
    }

    fn resolve_element(&mut self, locator: &Locator) -> Result<ElementHandle, DriverError> {
        self.described = None;
        let response = self.send_ok(&BrowserRequest::resolve(locator), "resolve")?;
        match (response.found, response.handle) {
            (Some(true), Some(handle)) => {
                debug!(%locator, handle = %handle, "element resolved");
                Ok(ElementHandle(handle))
            }
            _ => Err(DriverError::not_found(locator)),
        }
    }

    fn element_tag(&mut self, handle: &ElementHandle) -> Result<String, DriverError> {
        Ok(self.describe(handle)?.tag)
    }

    fn element_attributes(
        &mut self,
        handle: &ElementHandle,
    ) -> Result<BTreeMap<String, Option<String>>, DriverError> {
        Ok(self.describe(handle)?.attributes)
    }

    fn element_text(&mut self, handle: &ElementHandle) -> Result<String, DriverError> {
        Ok(self.describe(handle)?.text)
    }

    fn element_bounding_rect(&mut self, handle: &ElementHandle) -> Result<BoundingRect, DriverError> {
        let response = self.send_ok(&BrowserRequest::rect(handle), "rect")?;
        response
            .rect
            .ok_or_else(|| DriverError::StaleHandle(handle.0.clone()))
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        let _ = self.quit();
    }
}
