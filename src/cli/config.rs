use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::settings::HealingSettings;
use crate::element::element_model::Locator;
use crate::matcher::neighbors::SearchAlgorithm;

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "locator-healing",
    version,
    about = "Self-healing element locators for UI automation"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to settings file (default: locator-healing.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Heal a broken locator against a saved page document
    Heal {
        /// Page dump JSON ({"url": ..., "document": ...})
        #[arg(long)]
        page: PathBuf,

        /// Broken locator, as strategy=value
        #[arg(long)]
        locator: Locator,

        #[command(flatten)]
        tuning: TuningArgs,
    },

    /// Record a successful locator resolution from a saved page document
    Record {
        /// Page dump JSON ({"url": ..., "document": ...})
        #[arg(long)]
        page: PathBuf,

        /// Locator that resolves on the page, as strategy=value
        #[arg(long)]
        locator: Locator,
    },

    /// Find an element on a live page, healing the locator if needed
    Find {
        /// URL to open in the browser session
        #[arg(long)]
        url: String,

        /// Locator to resolve, as strategy=value
        #[arg(long)]
        locator: Locator,

        /// Heal even when disabled in the settings file
        #[arg(long)]
        heal: bool,

        #[command(flatten)]
        tuning: TuningArgs,
    },

    /// Print success corpus statistics
    Corpus,
}

/// Per-invocation overrides of the healing thresholds.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct TuningArgs {
    /// Maximum accepted distance (overrides settings)
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Number of neighbors to look up (overrides settings)
    #[arg(long)]
    pub neighbors: Option<usize>,

    /// Search algorithm: auto, ball_tree or brute (overrides settings)
    #[arg(long)]
    pub algorithm: Option<SearchAlgorithm>,
}

impl TuningArgs {
    /// Settings with every given override applied: CLI > config > defaults.
    pub fn apply(&self, settings: &HealingSettings) -> HealingSettings {
        let mut settings = settings.clone();
        if let Some(tolerance) = self.tolerance {
            settings.tolerance = tolerance;
        }
        if let Some(neighbors) = self.neighbors {
            settings.n_neighbors = neighbors;
        }
        if let Some(algorithm) = self.algorithm {
            settings.algorithm = algorithm;
        }
        settings
    }
}
