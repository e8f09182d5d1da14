use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::matcher::neighbors::SearchAlgorithm;

// ============================================================================
// Settings file model (optional YAML)
// ============================================================================

pub const DEFAULT_SETTINGS_FILE: &str = "locator-healing.yaml";

/// Optional YAML settings file: `locator-healing.yaml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub healing: HealingSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub driver: DriverSettings,
}

/// Thresholds and switches for the healing engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealingSettings {
    /// Master switch, checked by the caller before it asks for a heal
    #[serde(default)]
    pub enabled: bool,

    /// Number of nearest neighbors to look up (clamped to the page size)
    #[serde(default = "default_n_neighbors")]
    pub n_neighbors: usize,

    #[serde(default)]
    pub algorithm: SearchAlgorithm,

    /// Maximum accepted distance to the nearest neighbor, inclusive
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Print healed substitutions to stdout
    #[serde(default)]
    pub show_result_console: bool,

    /// Ask the driver for each element's bounding rectangle
    #[serde(default)]
    pub capture_bounding_rect: bool,

    /// Tags scanned when snapshotting the current page
    #[serde(default = "default_scanned_tags")]
    pub scanned_tags: Vec<String>,
}

impl Default for HealingSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            n_neighbors: default_n_neighbors(),
            algorithm: SearchAlgorithm::default(),
            tolerance: default_tolerance(),
            show_result_console: false,
            capture_bounding_rect: false,
            scanned_tags: default_scanned_tags(),
        }
    }
}

impl HealingSettings {
    /// Neighbors to request; never zero.
    pub fn effective_neighbors(&self) -> usize {
        self.n_neighbors.max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Long-lived success corpus, shared by every worker
    #[serde(default = "default_corpus_path")]
    pub corpus_path: PathBuf,

    /// Directory for the per-worker page snapshot
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,

    /// JSONL file receiving one line per heal attempt
    #[serde(default)]
    pub trace_path: Option<PathBuf>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            corpus_path: default_corpus_path(),
            snapshot_dir: default_snapshot_dir(),
            trace_path: None,
        }
    }
}

impl StorageSettings {
    /// Snapshot file for this process: `current_elements-<pid>.csv`.
    pub fn snapshot_path(&self) -> PathBuf {
        self.snapshot_dir
            .join(format!("current_elements-{}.csv", std::process::id()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverSettings {
    /// Node.js script serving the NDJSON browser protocol
    #[serde(default = "default_server_script")]
    pub server_script: String,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            server_script: default_server_script(),
        }
    }
}

// Serde default helpers
fn default_n_neighbors() -> usize { 3 }
fn default_tolerance() -> f64 { 2.5 }
fn default_corpus_path() -> PathBuf { PathBuf::from("resources/elements.csv") }
fn default_snapshot_dir() -> PathBuf { PathBuf::from("resources") }
fn default_server_script() -> String { "node/browser_server.js".to_string() }

fn default_scanned_tags() -> Vec<String> {
    [
        "a", "div", "span", "button", "input", "select", "option", "pre", "textarea", "svg",
        "img", "p", "h1", "h2", "h3", "h4", "h5", "h6", "label", "li", "td",
    ]
    .iter()
    .map(|t| t.to_string())
    .collect()
}

// ============================================================================
// Settings loading
// ============================================================================

/// Load settings from a YAML file. Returns defaults if the file is missing
/// or malformed.
pub fn load_settings(path: Option<&Path>) -> Settings {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_SETTINGS_FILE));
    match std::fs::read_to_string(path) {
        Ok(content) => parse_settings(&content).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "malformed settings file, using defaults");
            Settings::default()
        }),
        Err(_) => Settings::default(),
    }
}

pub fn parse_settings(content: &str) -> Result<Settings, serde_yaml::Error> {
    if content.trim().is_empty() {
        return Ok(Settings::default());
    }
    serde_yaml::from_str(content)
}
