use locator_healing::{
    config::settings::HealingSettings,
    driver::driver_model::PageDriver,
    element::{
        dom::DomElement,
        element_model::{BoundingRect, Locator, LocatorStrategy},
    },
    extract::extractor::FeatureExtractor,
};

use crate::common::utils::{BlankDriver, html, login_page, static_page, submit_page};

mod common;

fn extractor() -> FeatureExtractor {
    FeatureExtractor::new(&HealingSettings::default())
}

// =========================================================================
// Page extraction
// =========================================================================

#[test]
fn extracts_only_scanned_tags_in_document_order() {
    let mut page = static_page(login_page());
    let records = extractor().extract_page(&mut page);

    let tags: Vec<&str> = records.iter().map(|r| r.features.tag.as_str()).collect();
    assert_eq!(tags, vec!["label", "input", "input", "button"]);
}

#[test]
fn page_records_carry_xpath_locators_and_url() {
    let mut page = static_page(login_page());
    let records = extractor().extract_page(&mut page);

    assert!(records.iter().all(|r| r.locator.strategy == LocatorStrategy::XPath));
    assert!(records.iter().all(|r| r.source_url == "https://example.com/"));
    assert_eq!(records[2].locator, Locator::xpath("//*[@id=\"login\"]/input[2]"));
}

#[test]
fn page_records_use_fixed_attribute_schema() {
    let mut page = static_page(login_page());
    let records = extractor().extract_page(&mut page);

    let password = &records[2].features;
    assert_eq!(password.attributes.get("name"), Some("pass"));
    assert_eq!(password.attributes.get("type"), Some("password"));
    assert_eq!(password.attributes.get("required"), Some("required"));
    assert_eq!(password.attributes.get("placeholder"), None);

    // `for` is not part of the schema
    let label = &records[0].features;
    assert!(label.attributes.values().iter().all(|v| v.is_none()));
    assert_eq!(label.text, "Username");
}

#[test]
fn page_text_and_class_are_normalized() {
    let mut page = static_page(login_page());
    let records = extractor().extract_page(&mut page);

    let button = &records[3].features;
    assert_eq!(button.text, "Sign in");
    assert_eq!(button.attributes.get("class"), Some("btn primary"));
}

#[test]
fn page_without_document_yields_nothing() {
    let records = extractor().extract_page(&mut BlankDriver);
    assert!(records.is_empty());
}

#[test]
fn custom_tag_list_restricts_scan() {
    let settings = HealingSettings {
        scanned_tags: vec!["FORM".into(), " button ".into()],
        ..HealingSettings::default()
    };
    let extractor = FeatureExtractor::new(&settings);
    let mut page = static_page(login_page());
    let records = extractor.extract_page(&mut page);

    let tags: Vec<&str> = records.iter().map(|r| r.features.tag.as_str()).collect();
    assert_eq!(tags, vec!["form", "button"]);
    assert_eq!(records[0].features.text, "Username Sign in");
}

#[test]
fn extract_document_matches_extract_page() {
    let document = login_page();
    let mut page = static_page(document.clone());

    let from_page = extractor().extract_page(&mut page);
    let from_document = extractor().extract_document(&document, "https://example.com/");
    assert_eq!(from_page, from_document);
}

// =========================================================================
// Bounding rects
// =========================================================================

#[test]
fn rects_are_captured_when_enabled() {
    let settings = HealingSettings {
        capture_bounding_rect: true,
        ..HealingSettings::default()
    };
    let rect = BoundingRect {
        x: 10.0,
        y: 20.0,
        width: 80.0,
        height: 24.0,
    };
    let mut page = static_page(submit_page("submit-new"));
    page.set_rect(&Locator::id("submit-new"), rect).unwrap();

    let records = FeatureExtractor::new(&settings).extract_page(&mut page);

    assert_eq!(records[0].bounding_rect, Some(rect));
    // No rect for the footer: the element is still extracted
    assert_eq!(records[1].bounding_rect, None);
    assert_eq!(records.len(), 2);
}

#[test]
fn rect_does_not_change_fingerprint() {
    let plain = extractor().extract_page(&mut static_page(submit_page("submit-new")));

    let settings = HealingSettings {
        capture_bounding_rect: true,
        ..HealingSettings::default()
    };
    let mut page = static_page(submit_page("submit-new"));
    page.set_rect(
        &Locator::id("submit-new"),
        BoundingRect {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        },
    )
    .unwrap();
    let with_rect = FeatureExtractor::new(&settings).extract_page(&mut page);

    assert_eq!(plain[0].fingerprint, with_rect[0].fingerprint);
}

// =========================================================================
// Single element extraction
// =========================================================================

#[test]
fn extract_element_keeps_caller_locator() {
    let mut page = static_page(submit_page("submit-old"));
    let locator = Locator::id("submit-old");
    let handle = page.resolve_element(&locator).unwrap();

    let record = extractor().extract_element(&mut page, &handle, &locator).unwrap();

    assert_eq!(record.locator, locator);
    assert_eq!(record.features.tag, "button");
    assert_eq!(record.features.text, "Send");
    assert_eq!(record.features.attributes.get("id"), Some("submit-old"));
    assert_eq!(record.features.attributes.get("type"), Some("submit"));
}

#[test]
fn element_and_page_extraction_agree_on_features() {
    let document = html(
        DomElement::new("body").with_child(
            DomElement::new("a")
                .with_attr("href", "/docs")
                .with_attr("target", "_blank")
                .with_text("Docs"),
        ),
    );
    let mut page = static_page(document);
    let page_records = extractor().extract_page(&mut page);

    let locator = Locator::new(LocatorStrategy::LinkText, "Docs");
    let handle = page.resolve_element(&locator).unwrap();
    let record = extractor().extract_element(&mut page, &handle, &locator).unwrap();

    assert_eq!(record.features, page_records[0].features);
}
