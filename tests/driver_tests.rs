use std::io::Write;

use locator_healing::{
    driver::{
        driver_model::{DriverError, ElementHandle, PageDriver},
        session::{BrowserRequest, parse_response},
        static_page::StaticPage,
    },
    element::{
        dom::DomElement,
        element_model::{Locator, LocatorStrategy},
    },
};

use crate::common::utils::{html, login_page, static_page, submit_page};

mod common;

// =========================================================================
// Static page driver
// =========================================================================

#[test]
fn resolves_every_supported_strategy() {
    let mut page = static_page(login_page());
    let cases = [
        (Locator::id("login"), "0.0"),
        (Locator::new(LocatorStrategy::Name, "pass"), "0.0.2"),
        (Locator::new(LocatorStrategy::TagName, "BUTTON"), "0.0.3"),
        (Locator::new(LocatorStrategy::ClassName, "primary"), "0.0.3"),
        (Locator::css("#login"), "0.0"),
        (Locator::css(".btn"), "0.0.3"),
        (Locator::css("input"), "0.0.1"),
        (Locator::xpath("//*[@id=\"login\"]/input[2]"), "0.0.2"),
        (Locator::xpath("/html/body"), "0"),
        (Locator::xpath("/html"), ""),
    ];
    for (locator, expected) in cases {
        let handle = page.resolve_element(&locator).unwrap();
        assert_eq!(handle.0, expected, "{}", locator);
    }
}

#[test]
fn resolves_links_by_text() {
    let document = html(
        DomElement::new("body")
            .with_child(DomElement::new("a").with_attr("href", "/a").with_text("Read the Docs"))
            .with_child(DomElement::new("a").with_attr("href", "/b").with_text("Docs")),
    );
    let mut page = static_page(document);

    let exact = page
        .resolve_element(&Locator::new(LocatorStrategy::LinkText, "Docs"))
        .unwrap();
    let partial = page
        .resolve_element(&Locator::new(LocatorStrategy::PartialLinkText, "Docs"))
        .unwrap();
    assert_eq!(exact.0, "0.1");
    assert_eq!(partial.0, "0.0");
}

#[test]
fn missing_element_is_not_found() {
    let mut page = static_page(submit_page("submit-new"));
    let err = page.resolve_element(&Locator::id("submit-old")).unwrap_err();
    assert!(err.is_not_found());

    let err = page
        .resolve_element(&Locator::xpath("//*[@id=\"footer\"]/span"))
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn complex_selectors_are_unsupported() {
    let mut page = static_page(login_page());
    let err = page.resolve_element(&Locator::css("form > input")).unwrap_err();
    assert!(matches!(err, DriverError::UnsupportedLocator { .. }));

    let err = page
        .resolve_element(&Locator::xpath("//input[@name='user']"))
        .unwrap_err();
    assert!(matches!(err, DriverError::UnsupportedLocator { .. }));
    assert!(!err.is_not_found());
}

#[test]
fn element_details_come_from_the_document() {
    let mut page = static_page(login_page());
    let handle = page.resolve_element(&Locator::css(".btn")).unwrap();

    assert_eq!(page.element_tag(&handle).unwrap(), "button");
    assert_eq!(page.element_text(&handle).unwrap(), "Sign in");
    let attributes = page.element_attributes(&handle).unwrap();
    assert_eq!(attributes.get("class"), Some(&Some("btn  primary".to_string())));
}

#[test]
fn stale_handle_after_document_change() {
    let mut page = static_page(login_page());
    let handle = page.resolve_element(&Locator::css(".btn")).unwrap();
    page.replace_document("https://example.com/other", submit_page("x"));

    assert!(matches!(
        page.element_tag(&handle),
        Err(DriverError::StaleHandle(_))
    ));
    assert_eq!(page.current_url().unwrap(), "https://example.com/other");
}

#[test]
fn page_dump_loads_from_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("page.json");
    let mut file = std::fs::File::create(&path).unwrap();
    write!(
        file,
        r#"{{"url":"https://example.com/","document":{{"tag":"html","children":[
            {{"tag":"body","children":[{{"tag":"button","attributes":{{"id":"go"}},"children":["Go"]}}]}}
        ]}}}}"#
    )
    .unwrap();

    let mut page = StaticPage::from_json_file(&path).unwrap();
    let handle = page.resolve_element(&Locator::id("go")).unwrap();
    assert_eq!(page.element_text(&handle).unwrap(), "Go");
    assert_eq!(page.current_url().unwrap(), "https://example.com/");
}

#[test]
fn unreadable_page_dump_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("page.json");
    std::fs::write(&path, "{not json").unwrap();

    assert!(matches!(
        StaticPage::from_json_file(&path),
        Err(DriverError::JsonParse { .. })
    ));
    assert!(matches!(
        StaticPage::from_json_file(&dir.path().join("missing.json")),
        Err(DriverError::NoDocument(_))
    ));
}

// =========================================================================
// Browser session protocol
// =========================================================================

#[test]
fn requests_serialize_as_flat_commands() {
    let resolve = serde_json::to_value(BrowserRequest::resolve(&Locator::css("#a"))).unwrap();
    assert_eq!(
        resolve,
        serde_json::json!({"cmd": "resolve", "strategy": "css selector", "value": "#a"})
    );

    let describe =
        serde_json::to_value(BrowserRequest::describe(&ElementHandle("7".into()))).unwrap();
    assert_eq!(describe, serde_json::json!({"cmd": "describe", "handle": "7"}));

    let quit = serde_json::to_value(BrowserRequest::quit()).unwrap();
    assert_eq!(quit, serde_json::json!({"cmd": "quit"}));
}

#[test]
fn responses_parse_with_optional_fields() {
    let ready = parse_response("{\"ok\":true,\"ready\":true}\n", "ready").unwrap();
    assert!(ready.ok);
    assert_eq!(ready.ready, Some(true));

    let described = parse_response(
        r#"{"ok":true,"tag":"input","text":"","attributes":{"required":null,"name":"q"}}"#,
        "describe",
    )
    .unwrap();
    let attributes = described.attributes.unwrap();
    assert_eq!(attributes.get("required"), Some(&None));
    assert_eq!(attributes.get("name"), Some(&Some("q".to_string())));

    let rect = parse_response(
        r#"{"ok":true,"rect":{"x":1,"y":2,"width":3,"height":4}}"#,
        "rect",
    )
    .unwrap();
    assert_eq!(rect.rect.unwrap().width, 3.0);
}

#[test]
fn malformed_response_is_a_parse_error() {
    let err = parse_response("not json", "resolve").unwrap_err();
    assert!(matches!(err, DriverError::JsonParse { ref context, .. } if context == "resolve"));
}
