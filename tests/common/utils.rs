use std::collections::BTreeMap;

use locator_healing::{
    config::settings::HealingSettings,
    driver::{
        driver_model::{DriverError, ElementHandle, PageDriver},
        static_page::StaticPage,
    },
    element::{
        dom::DomElement,
        element_model::{BoundingRect, ElementFeatures, ElementRecord, Locator},
    },
    store::corpus::CorpusStore,
};
use tempfile::TempDir;

// =========================================================================
// Stores
// =========================================================================

/// A corpus store rooted in a fresh temp directory. Keep the `TempDir`
/// alive for as long as the store is used.
pub fn temp_store() -> (TempDir, CorpusStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = CorpusStore::new(
        dir.path().join("elements.csv"),
        dir.path().join("current_elements.csv"),
    );
    (dir, store)
}

pub fn healing_settings(tolerance: f64) -> HealingSettings {
    HealingSettings {
        enabled: true,
        tolerance,
        ..HealingSettings::default()
    }
}

// =========================================================================
// Documents
// =========================================================================

pub fn html(body: DomElement) -> DomElement {
    DomElement::new("html").with_child(body)
}

/// `<button id=..>Send</button>` followed by a footer.
pub fn submit_page(button_id: &str) -> DomElement {
    html(
        DomElement::new("body")
            .with_child(
                DomElement::new("button")
                    .with_attr("id", button_id)
                    .with_attr("type", "submit")
                    .with_text("Send"),
            )
            .with_child(
                DomElement::new("div")
                    .with_attr("id", "footer")
                    .with_text("Copyright"),
            ),
    )
}

pub fn login_page() -> DomElement {
    html(
        DomElement::new("body").with_child(
            DomElement::new("form")
                .with_attr("id", "login")
                .with_child(
                    DomElement::new("label")
                        .with_attr("for", "user")
                        .with_text("Username"),
                )
                .with_child(
                    DomElement::new("input")
                        .with_attr("name", "user")
                        .with_attr("type", "text")
                        .with_attr("placeholder", "Your name"),
                )
                .with_child(
                    DomElement::new("input")
                        .with_attr("name", "pass")
                        .with_attr("type", "password")
                        .with_attr("required", ""),
                )
                .with_child(
                    DomElement::new("button")
                        .with_attr("class", "btn  primary")
                        .with_text("  Sign\n in "),
                ),
        ),
    )
}

pub fn static_page(document: DomElement) -> StaticPage {
    StaticPage::new("https://example.com/", document)
}

// =========================================================================
// Records
// =========================================================================

pub fn features(tag: &str, id: &str, text: &str) -> ElementFeatures {
    ElementFeatures::new(tag, text).with_attribute("id", id)
}

pub fn record(locator: Locator, features: ElementFeatures, url: &str) -> ElementRecord {
    ElementRecord::new(locator, features, url)
}

// =========================================================================
// Drivers
// =========================================================================

/// Wraps a `StaticPage` and counts how often the page document is read.
pub struct CountingDriver {
    pub inner: StaticPage,
    pub document_reads: usize,
    pub resolves: usize,
}

impl CountingDriver {
    pub fn new(inner: StaticPage) -> Self {
        Self {
            inner,
            document_reads: 0,
            resolves: 0,
        }
    }
}

impl PageDriver for CountingDriver {
    fn current_url(&mut self) -> Result<String, DriverError> {
        self.inner.current_url()
    }

    fn current_page_document(&mut self) -> Result<DomElement, DriverError> {
        self.document_reads += 1;
        self.inner.current_page_document()
    }

    fn resolve_element(&mut self, locator: &Locator) -> Result<ElementHandle, DriverError> {
        self.resolves += 1;
        self.inner.resolve_element(locator)
    }

    fn element_tag(&mut self, handle: &ElementHandle) -> Result<String, DriverError> {
        self.inner.element_tag(handle)
    }

    fn element_attributes(
        &mut self,
        handle: &ElementHandle,
    ) -> Result<BTreeMap<String, Option<String>>, DriverError> {
        self.inner.element_attributes(handle)
    }

    fn element_text(&mut self, handle: &ElementHandle) -> Result<String, DriverError> {
        self.inner.element_text(handle)
    }

    fn element_bounding_rect(&mut self, handle: &ElementHandle) -> Result<BoundingRect, DriverError> {
        self.inner.element_bounding_rect(handle)
    }
}

/// A driver whose page has no document at all.
pub struct BlankDriver;

impl PageDriver for BlankDriver {
    fn current_url(&mut self) -> Result<String, DriverError> {
        Ok("about:blank".into())
    }

    fn current_page_document(&mut self) -> Result<DomElement, DriverError> {
        Err(DriverError::NoDocument("blank page".into()))
    }

    fn resolve_element(&mut self, locator: &Locator) -> Result<ElementHandle, DriverError> {
        Err(DriverError::not_found(locator))
    }

    fn element_tag(&mut self, handle: &ElementHandle) -> Result<String, DriverError> {
        Err(DriverError::StaleHandle(handle.0.clone()))
    }

    fn element_attributes(
        &mut self,
        handle: &ElementHandle,
    ) -> Result<BTreeMap<String, Option<String>>, DriverError> {
        Err(DriverError::StaleHandle(handle.0.clone()))
    }

    fn element_text(&mut self, handle: &ElementHandle) -> Result<String, DriverError> {
        Err(DriverError::StaleHandle(handle.0.clone()))
    }

    fn element_bounding_rect(&mut self, handle: &ElementHandle) -> Result<BoundingRect, DriverError> {
        Err(DriverError::StaleHandle(handle.0.clone()))
    }
}
