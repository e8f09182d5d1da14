use std::fs;

use locator_healing::{
    config::settings::HealingSettings,
    driver::driver_model::PageDriver,
    element::element_model::{ElementRecord, Locator, LocatorStrategy},
    heal::{
        engine::{HealingEngine, healed_locator},
        heal_model::{HealOutcome, UnmatchedReason},
    },
    matcher::neighbors::SearchAlgorithm,
    store::corpus::CorpusStore,
    trace::logger::HealTraceLogger,
};

use crate::common::utils::{
    BlankDriver, CountingDriver, features, healing_settings, login_page, record, static_page,
    submit_page, temp_store,
};

mod common;

// =========================================================================
// Helpers
// =========================================================================

/// Record `id=submit-old` as a button with text "Send".
fn record_submit_old(store: &CorpusStore, settings: &HealingSettings) {
    let engine = HealingEngine::new(store, settings);
    let mut page = static_page(submit_page("submit-old"));
    let locator = Locator::id("submit-old");
    let handle = page.resolve_element(&locator).unwrap();
    assert!(engine.record_success(&mut page, &locator, &handle));
}

// =========================================================================
// End-to-end healing
// =========================================================================

#[test]
fn renamed_id_is_healed_within_tolerance() {
    let (_dir, store) = temp_store();
    let settings = healing_settings(1.0);
    record_submit_old(&store, &settings);

    let engine = HealingEngine::new(&store, &settings);
    let mut page = static_page(submit_page("submit-new"));
    let outcome = engine.attempt(&mut page, &Locator::id("submit-old"));

    let HealOutcome::Healed(healed) = outcome else {
        panic!("expected a healed locator, got {:?}", outcome);
    };
    assert_eq!(healed.locator, Locator::id("submit-new"));
    assert_eq!(healed.old_locator, Locator::id("submit-old"));
    assert_eq!(healed.distance, 1.0);
    assert_eq!(healed.neighbors.len(), 2);
    assert_eq!(healed.neighbors[1].locator, Locator::xpath("//*[@id=\"footer\"]"));
}

#[test]
fn renamed_id_is_rejected_at_zero_tolerance() {
    let (_dir, store) = temp_store();
    let settings = healing_settings(0.0);
    record_submit_old(&store, &settings);

    let engine = HealingEngine::new(&store, &settings);
    let mut page = static_page(submit_page("submit-new"));

    assert_eq!(engine.heal(&mut page, &Locator::id("submit-old")), None);
    let outcome = engine.attempt(&mut page, &Locator::id("submit-old"));
    assert!(matches!(
        outcome,
        HealOutcome::Unmatched(UnmatchedReason::AboveTolerance { distance, .. }) if distance == 1.0
    ));
}

#[test]
fn unchanged_element_heals_to_itself_at_distance_zero() {
    let (_dir, store) = temp_store();
    let settings = healing_settings(0.0);
    record_submit_old(&store, &settings);

    let engine = HealingEngine::new(&store, &settings);
    for _ in 0..3 {
        let mut page = static_page(submit_page("submit-old"));
        let outcome = engine.attempt(&mut page, &Locator::id("submit-old"));
        let HealOutcome::Healed(healed) = outcome else {
            panic!("expected a healed locator");
        };
        assert_eq!(healed.locator, Locator::id("submit-old"));
        assert_eq!(healed.distance, 0.0);
    }
}

#[test]
fn unrecorded_locator_returns_none_without_extraction() {
    let (_dir, store) = temp_store();
    let settings = healing_settings(10.0);
    let engine = HealingEngine::new(&store, &settings);
    let mut driver = CountingDriver::new(static_page(submit_page("submit-new")));

    let outcome = engine.attempt(&mut driver, &Locator::id("never-seen"));

    assert_eq!(outcome, HealOutcome::Unmatched(UnmatchedReason::NotRecorded));
    assert_eq!(driver.document_reads, 0);
    assert!(!store.snapshot_path().exists());
}

#[test]
fn empty_page_returns_none() {
    let (_dir, store) = temp_store();
    let settings = healing_settings(10.0);
    record_submit_old(&store, &settings);
    let engine = HealingEngine::new(&store, &settings);

    assert_eq!(
        engine.attempt(&mut BlankDriver, &Locator::id("submit-old")),
        HealOutcome::Unmatched(UnmatchedReason::EmptyPage)
    );
}

#[test]
fn page_without_scanned_elements_returns_none() {
    let (_dir, store) = temp_store();
    let settings = healing_settings(10.0);
    record_submit_old(&store, &settings);

    let narrow = HealingSettings {
        scanned_tags: vec!["table".into()],
        ..healing_settings(10.0)
    };
    let engine = HealingEngine::new(&store, &narrow);
    let mut page = static_page(submit_page("submit-new"));

    assert_eq!(engine.heal(&mut page, &Locator::id("submit-old")), None);
}

#[test]
fn heal_attempt_overwrites_snapshot() {
    let (_dir, store) = temp_store();
    let settings = healing_settings(10.0);
    record_submit_old(&store, &settings);
    let engine = HealingEngine::new(&store, &settings);

    engine.heal(&mut static_page(login_page()), &Locator::id("submit-old"));
    assert_eq!(store.load_snapshot().0.len(), 4);

    engine.heal(&mut static_page(submit_page("submit-new")), &Locator::id("submit-old"));
    let (features, locators) = store.load_snapshot();
    assert_eq!(features.len(), 2);
    assert_eq!(locators[0], Locator::xpath("//*[@id=\"submit-new\"]"));
}

#[test]
fn ball_tree_and_brute_heal_identically() {
    let (_dir, store) = temp_store();
    let brute = HealingSettings {
        algorithm: SearchAlgorithm::Brute,
        ..healing_settings(3.0)
    };
    let tree = HealingSettings {
        algorithm: SearchAlgorithm::BallTree,
        ..healing_settings(3.0)
    };
    record_submit_old(&store, &brute);

    let a = HealingEngine::new(&store, &brute).heal(&mut static_page(login_page()), &Locator::id("submit-old"));
    let b = HealingEngine::new(&store, &tree).heal(&mut static_page(login_page()), &Locator::id("submit-old"));
    assert_eq!(a, b);
}

#[test]
fn zero_neighbors_setting_still_searches() {
    let (_dir, store) = temp_store();
    let settings = HealingSettings {
        n_neighbors: 0,
        ..healing_settings(1.0)
    };
    record_submit_old(&store, &settings);

    let engine = HealingEngine::new(&store, &settings);
    let healed = engine.heal(&mut static_page(submit_page("submit-new")), &Locator::id("submit-old"));
    assert_eq!(healed, Some(Locator::id("submit-new")));
}

// =========================================================================
// Snapshot matching without a driver
// =========================================================================

#[test]
fn match_snapshot_on_empty_records_is_empty_page() {
    let (_dir, store) = temp_store();
    let settings = healing_settings(1.0);
    let engine = HealingEngine::new(&store, &settings);

    let outcome = engine.match_snapshot(
        &Locator::id("x"),
        &features("button", "x", "Send"),
        &[],
    );
    assert_eq!(outcome, HealOutcome::Unmatched(UnmatchedReason::EmptyPage));
}

#[test]
fn nearest_of_equidistant_candidates_is_first_in_document_order() {
    let (_dir, store) = temp_store();
    let settings = healing_settings(5.0);
    let engine = HealingEngine::new(&store, &settings);
    let records = vec![
        record(Locator::xpath("/html/body/p"), features("p", "a", "Send"), ""),
        record(Locator::xpath("/html/body/button[1]"), features("button", "b", "Send"), ""),
        record(Locator::xpath("/html/body/button[2]"), features("button", "c", "Send"), ""),
    ];

    let outcome = engine.match_snapshot(
        &Locator::xpath("/html/body/button"),
        &features("button", "gone", "Send"),
        &records,
    );
    assert_eq!(outcome.into_locator(), Some(Locator::xpath("/html/body/button[1]")));
}

// =========================================================================
// Healed locator strategy
// =========================================================================

fn candidate() -> ElementRecord {
    record(
        Locator::xpath("//*[@id=\"login\"]/input[1]"),
        features("input", "user-field", "").with_attribute("name", "user"),
        "",
    )
}

#[test]
fn healed_locator_keeps_id_and_name_strategies() {
    assert_eq!(
        healed_locator(&Locator::id("old"), &candidate()),
        Locator::id("user-field")
    );
    assert_eq!(
        healed_locator(&Locator::new(LocatorStrategy::Name, "old"), &candidate()),
        Locator::new(LocatorStrategy::Name, "user")
    );
    assert_eq!(
        healed_locator(&Locator::xpath("//old"), &candidate()),
        Locator::xpath("//*[@id=\"login\"]/input[1]")
    );
}

#[test]
fn healed_locator_falls_back_to_xpath() {
    let no_id = record(Locator::xpath("/html/body/a"), features("a", "", "Docs"), "");
    assert_eq!(healed_locator(&Locator::id("old"), &no_id), Locator::xpath("/html/body/a"));
    assert_eq!(
        healed_locator(&Locator::css("#old"), &candidate()),
        Locator::xpath("//*[@id=\"login\"]/input[1]")
    );
}

// =========================================================================
// record_success
// =========================================================================

#[test]
fn record_success_is_deduplicated() {
    let (_dir, store) = temp_store();
    let settings = healing_settings(1.0);
    let engine = HealingEngine::new(&store, &settings);
    let mut page = static_page(submit_page("submit-old"));
    let locator = Locator::id("submit-old");
    let handle = page.resolve_element(&locator).unwrap();

    assert!(engine.record_success(&mut page, &locator, &handle));
    assert!(!engine.record_success(&mut page, &locator, &handle));
    assert_eq!(store.load_corpus().len(), 1);
}

#[test]
fn record_success_with_stale_handle_is_false() {
    let (_dir, store) = temp_store();
    let settings = healing_settings(1.0);
    let engine = HealingEngine::new(&store, &settings);
    let mut page = static_page(submit_page("submit-old"));
    let handle = locator_healing::driver::driver_model::ElementHandle("9.9".into());

    assert!(!engine.record_success(&mut page, &Locator::id("submit-old"), &handle));
    assert!(store.load_corpus().is_empty());
}

// =========================================================================
// Trace
// =========================================================================

#[test]
fn heal_attempts_are_traced_as_json_lines() {
    let (dir, store) = temp_store();
    let settings = healing_settings(1.0);
    record_submit_old(&store, &settings);
    let trace_path = dir.path().join("trace").join("heal.jsonl");
    let tracer = HealTraceLogger::new(&trace_path);
    let engine = HealingEngine::new(&store, &settings).with_tracer(&tracer);

    engine.heal(&mut static_page(submit_page("submit-new")), &Locator::id("submit-old"));
    engine.heal(&mut static_page(submit_page("submit-new")), &Locator::id("unknown"));

    let content = fs::read_to_string(&trace_path).unwrap();
    let events: Vec<serde_json::Value> = content
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["outcome"], "healed");
    assert_eq!(events[0]["healed_locator"], "id=submit-new");
    assert_eq!(events[0]["distance"], 1.0);
    assert_eq!(events[0]["snapshot_size"], 2);
    assert_eq!(events[0]["neighbors"].as_array().unwrap().len(), 2);
    assert_eq!(events[1]["outcome"], "unmatched");
    assert_eq!(events[1]["reason"], "locator was never recorded");
    assert_eq!(events[1]["snapshot_size"], 0);
}

#[test]
fn disabled_tracer_writes_nothing() {
    let (dir, store) = temp_store();
    let settings = healing_settings(1.0);
    let tracer = HealTraceLogger::disabled();
    let engine = HealingEngine::new(&store, &settings).with_tracer(&tracer);

    engine.heal(&mut static_page(submit_page("submit-new")), &Locator::id("submit-old"));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}
