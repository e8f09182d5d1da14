use tracing::{info, warn};

use crate::config::settings::HealingSettings;
use crate::driver::driver_model::{ElementHandle, PageDriver};
use crate::element::element_model::{ElementFeatures, ElementRecord, Locator, LocatorStrategy};
use crate::encode::encoder::encode;
use crate::extract::extractor::FeatureExtractor;
use crate::heal::heal_model::{CandidateMatch, HealOutcome, HealedMatch, UnmatchedReason};
use crate::matcher::neighbors::{accepts, find_nearest};
use crate::report::console::format_heal_result;
use crate::store::corpus::CorpusStore;
use crate::trace::logger::HealTraceLogger;
use crate::trace::trace::HealTraceEvent;

// ============================================================================
// Healing engine
// ============================================================================

/// Recovers broken locators by matching the last recorded look of an element
/// against the elements currently on the page.
///
/// The engine owns no state between calls: the corpus lives in the injected
/// `CorpusStore` and the encoder is fitted fresh on every attempt.
pub struct HealingEngine<'a> {
    store: &'a CorpusStore,
    settings: &'a HealingSettings,
    extractor: FeatureExtractor,
    tracer: Option<&'a HealTraceLogger>,
}

impl<'a> HealingEngine<'a> {
    pub fn new(store: &'a CorpusStore, settings: &'a HealingSettings) -> Self {
        Self {
            store,
            settings,
            extractor: FeatureExtractor::new(settings),
            tracer: None,
        }
    }

    pub fn with_tracer(mut self, tracer: &'a HealTraceLogger) -> Self {
        self.tracer = Some(tracer);
        self
    }

    pub fn settings(&self) -> &HealingSettings {
        self.settings
    }

    pub fn store(&self) -> &CorpusStore {
        self.store
    }

    /// Substitute locator for `old_locator`, or `None` when healing cannot
    /// find an acceptable match.
    pub fn heal<D: PageDriver + ?Sized>(&self, driver: &mut D, old_locator: &Locator) -> Option<Locator> {
        self.attempt(driver, old_locator).into_locator()
    }

    /// Run one heal attempt and report how it ended.
    pub fn attempt<D: PageDriver + ?Sized>(&self, driver: &mut D, old_locator: &Locator) -> HealOutcome {
        info!(locator = %old_locator, "element not found, attempting to heal");

        let mut snapshot_size = 0;
        let outcome = self.run_stages(driver, old_locator, &mut snapshot_size);

        match &outcome {
            HealOutcome::Healed(healed) => {
                info!(
                    old = %healed.old_locator,
                    new = %healed.locator,
                    distance = healed.distance,
                    "similar element found"
                );
                if self.settings.show_result_console {
                    print!("{}", format_heal_result(healed));
                }
            }
            HealOutcome::Unmatched(reason) => {
                warn!(locator = %old_locator, %reason, "element could not be healed");
            }
        }

        if let Some(tracer) = self.tracer {
            tracer.log(
                &HealTraceEvent::now(old_locator, self.settings.tolerance)
                    .with_outcome(&outcome)
                    .with_snapshot_size(snapshot_size)
                    .with_neighbors(outcome.neighbors()),
            );
        }

        outcome
    }

    fn run_stages<D: PageDriver + ?Sized>(
        &self,
        driver: &mut D,
        old_locator: &Locator,
        snapshot_size: &mut usize,
    ) -> HealOutcome {
        let Some(query) = self.store.load_success_by_locator(&old_locator.value) else {
            return HealOutcome::Unmatched(UnmatchedReason::NotRecorded);
        };

        let records = self.extractor.extract_page(driver);
        *snapshot_size = records.len();
        if records.is_empty() {
            return HealOutcome::Unmatched(UnmatchedReason::EmptyPage);
        }
        if let Err(e) = self.store.write_snapshot(&records) {
            warn!(error = %e, "could not persist the page snapshot");
        }

        self.match_snapshot(old_locator, &query, &records)
    }

    /// Encode, search and decide over an already extracted snapshot.
    pub fn match_snapshot(
        &self,
        old_locator: &Locator,
        query: &ElementFeatures,
        records: &[ElementRecord],
    ) -> HealOutcome {
        if records.is_empty() {
            return HealOutcome::Unmatched(UnmatchedReason::EmptyPage);
        }

        let features: Vec<ElementFeatures> = records.iter().map(|r| r.features.clone()).collect();
        let encoded = match encode(&features, query) {
            Ok(encoded) => encoded,
            Err(e) => return HealOutcome::Unmatched(UnmatchedReason::EncodingFailed(e.to_string())),
        };

        let search = match find_nearest(
            encoded.matrix.view(),
            encoded.query.view(),
            self.settings.effective_neighbors(),
            self.settings.algorithm,
        ) {
            Ok(search) => search,
            Err(e) => return HealOutcome::Unmatched(UnmatchedReason::SearchFailed(e.to_string())),
        };

        let Some(nearest) = search.nearest() else {
            return HealOutcome::Unmatched(UnmatchedReason::SearchFailed(
                "no neighbors returned".to_string(),
            ));
        };

        let neighbors: Vec<CandidateMatch> = search
            .neighbors
            .iter()
            .map(|n| CandidateMatch {
                index: n.index,
                distance: n.distance,
                locator: records[n.index].locator.clone(),
            })
            .collect();

        let tolerance = self.settings.tolerance;
        if !accepts(nearest.distance, tolerance) {
            return HealOutcome::Unmatched(UnmatchedReason::AboveTolerance {
                distance: nearest.distance,
                tolerance,
                neighbors,
            });
        }

        let locator = healed_locator(old_locator, &records[nearest.index]);
        HealOutcome::Healed(HealedMatch {
            old_locator: old_locator.clone(),
            locator,
            distance: nearest.distance,
            neighbors,
        })
    }

    /// Record a successful resolution of `locator`. Returns whether a new
    /// corpus row was appended; failures are logged and reported as `false`.
    pub fn record_success<D: PageDriver + ?Sized>(
        &self,
        driver: &mut D,
        locator: &Locator,
        handle: &ElementHandle,
    ) -> bool {
        let record = match self.extractor.extract_element(driver, handle, locator) {
            Ok(record) => record,
            Err(e) => {
                warn!(%locator, error = %e, "unable to read element info");
                return false;
            }
        };

        match self.store.record_success(&record) {
            Ok(appended) => appended,
            Err(e) => {
                warn!(%locator, error = %e, "unable to record element");
                false
            }
        }
    }
}

/// The candidate's locator expressed in the broken locator's strategy.
///
/// Falls back to the candidate's own XPath when it has no value for that
/// strategy.
pub fn healed_locator(old_locator: &Locator, candidate: &ElementRecord) -> Locator {
    let attributes = &candidate.features.attributes;
    let value = match old_locator.strategy {
        LocatorStrategy::Id => attributes.get("id"),
        LocatorStrategy::Name => attributes.get("name"),
        LocatorStrategy::XPath => Some(candidate.locator.value.as_str()),
        _ => None,
    };

    match value {
        Some(value) => Locator::new(old_locator.strategy, value),
        None => candidate.locator.clone(),
    }
}
