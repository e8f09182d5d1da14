use std::path::Path;

use tracing::info;

use crate::cli::config::TuningArgs;
use crate::config::settings::Settings;
use crate::driver::driver_model::PageDriver;
use crate::driver::session::BrowserSession;
use crate::driver::static_page::StaticPage;
use crate::element::element_model::Locator;
use crate::extract::extractor::FeatureExtractor;
use crate::heal::engine::HealingEngine;
use crate::heal::heal_model::{CandidateMatch, HealOutcome};
use crate::heal::page_element::PageElement;
use crate::store::corpus::CorpusStore;
use crate::trace::logger::HealTraceLogger;

// ============================================================================
// heal subcommand
// ============================================================================

/// Heal `locator` against a saved page and return whether a substitute was found.
pub fn cmd_heal(
    settings: &Settings,
    page_path: &Path,
    locator: &Locator,
    tuning: &TuningArgs,
) -> Result<bool, Box<dyn std::error::Error>> {
    let mut page = StaticPage::from_json_file(page_path)?;
    let healing = tuning.apply(&settings.healing);
    let store = CorpusStore::from_settings(&settings.storage);
    let tracer = build_tracer(settings);
    let engine = HealingEngine::new(&store, &healing).with_tracer(&tracer);

    let outcome = engine.attempt(&mut page, locator);
    match &outcome {
        HealOutcome::Healed(healed) => {
            println!("{}", healed.locator);
            print_neighbors(&healed.neighbors);
        }
        HealOutcome::Unmatched(reason) => {
            println!("not healed: {}", reason);
            print_neighbors(outcome.neighbors());
        }
    }

    Ok(outcome.is_healed())
}

fn print_neighbors(neighbors: &[CandidateMatch]) {
    for (rank, candidate) in neighbors.iter().enumerate() {
        println!(
            "  #{} [{}] {:.4} {}",
            rank, candidate.index, candidate.distance, candidate.locator
        );
    }
}

// ============================================================================
// record subcommand
// ============================================================================

pub fn cmd_record(
    settings: &Settings,
    page_path: &Path,
    locator: &Locator,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut page = StaticPage::from_json_file(page_path)?;
    let store = CorpusStore::from_settings(&settings.storage);
    let extractor = FeatureExtractor::new(&settings.healing);

    let handle = page.resolve_element(locator)?;
    let record = extractor.extract_element(&mut page, &handle, locator)?;
    if store.record_success(&record)? {
        println!("recorded {} ({})", locator, record.fingerprint);
    } else {
        println!("already recorded {} ({})", locator, record.fingerprint);
    }
    Ok(())
}

// ============================================================================
// find subcommand
// ============================================================================

/// Resolve `locator` on a live page, healing it if allowed. Returns whether
/// the element was found.
pub fn cmd_find(
    settings: &Settings,
    url: &str,
    locator: &Locator,
    force_heal: bool,
    tuning: &TuningArgs,
) -> Result<bool, Box<dyn std::error::Error>> {
    let mut healing = tuning.apply(&settings.healing);
    healing.enabled |= force_heal;
    let store = CorpusStore::from_settings(&settings.storage);
    let tracer = build_tracer(settings);
    let engine = HealingEngine::new(&store, &healing).with_tracer(&tracer);

    let mut session = BrowserSession::launch(&settings.driver.server_script)?;
    session.navigate(url)?;
    info!(url, "page loaded");

    let mut element = PageElement::new(locator.clone());
    let found = match element.find(&mut session, &engine) {
        Ok(handle) => {
            if element.was_healed() {
                println!("found with healed locator {}", element.locator());
            } else {
                println!("found {}", element.locator());
            }
            info!(handle = %handle.0, "element resolved");
            true
        }
        Err(e) if e.is_not_found() => {
            println!("not found: {}", e);
            false
        }
        Err(e) => return Err(e.into()),
    };

    session.quit()?;
    Ok(found)
}

// ============================================================================
// corpus subcommand
// ============================================================================

pub fn cmd_corpus(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let store = CorpusStore::from_settings(&settings.storage);
    let stats = store.stats();

    println!("Corpus: {}", store.corpus_path().display());
    println!("  rows:     {}", stats.rows);
    println!("  locators: {}", stats.locators);
    println!("  pages:    {}", stats.pages);
    Ok(())
}

fn build_tracer(settings: &Settings) -> HealTraceLogger {
    match &settings.storage.trace_path {
        Some(path) => HealTraceLogger::new(path),
        None => HealTraceLogger::disabled(),
    }
}
