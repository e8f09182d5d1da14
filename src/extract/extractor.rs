use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::config::settings::HealingSettings;
use crate::driver::driver_model::{DriverError, ElementHandle, PageDriver};
use crate::element::{
    dom::DomElement,
    element_model::{AttributeSet, ElementFeatures, ElementRecord, Locator},
    xpath::walk_with_xpath,
};

// ============================================================================
// Feature extraction
// ============================================================================

/// Turns pages and live elements into fixed-schema `ElementRecord`s.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    scanned_tags: BTreeSet<String>,
    capture_bounding_rect: bool,
}

impl FeatureExtractor {
    pub fn new(settings: &HealingSettings) -> Self {
        Self {
            scanned_tags: settings
                .scanned_tags
                .iter()
                .map(|t| t.trim().to_ascii_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
            capture_bounding_rect: settings.capture_bounding_rect,
        }
    }

    pub fn scans(&self, tag: &str) -> bool {
        self.scanned_tags.contains(tag)
    }

    /// Snapshot every scanned element of the driver's current page.
    ///
    /// Never fails: a page without a document yields no records.
    pub fn extract_page<D: PageDriver + ?Sized>(&self, driver: &mut D) -> Vec<ElementRecord> {
        let document = match driver.current_page_document() {
            Ok(document) => document,
            Err(e) => {
                warn!(error = %e, "unable to read the current page document");
                return Vec::new();
            }
        };
        let source_url = driver.current_url().unwrap_or_else(|e| {
            warn!(error = %e, "unable to read the current url");
            String::new()
        });

        let mut records = self.extract_document(&document, &source_url);

        if self.capture_bounding_rect {
            for record in &mut records {
                let rect = driver
                    .resolve_element(&record.locator)
                    .and_then(|handle| driver.element_bounding_rect(&handle));
                match rect {
                    Ok(rect) => record.bounding_rect = Some(rect),
                    Err(e) => {
                        debug!(locator = %record.locator, error = %e, "no bounding rect")
                    }
                }
            }
        }

        info!(count = records.len(), url = %source_url, "current page elements scraped");
        records
    }

    /// Records for every scanned element of a parsed document, in document
    /// order. Each locator is the element's generated XPath.
    pub fn extract_document(&self, document: &DomElement, source_url: &str) -> Vec<ElementRecord> {
        let mut records = Vec::new();
        walk_with_xpath(document, &mut |element, xpath| {
            let tag = element.tag_name();
            if tag.is_empty() {
                debug!(xpath, "skipping element without a tag name");
                return;
            }
            if !self.scans(&tag) {
                return;
            }
            let features = ElementFeatures {
                tag,
                text: element.text_content(),
                attributes: AttributeSet::from_pairs(
                    element
                        .attributes
                        .iter()
                        .map(|(name, value)| (name.as_str(), Some(value.as_str()))),
                ),
            };
            records.push(ElementRecord::new(Locator::xpath(xpath), features, source_url));
        });
        records
    }

    /// Record for one live element found through `locator`.
    pub fn extract_element<D: PageDriver + ?Sized>(
        &self,
        driver: &mut D,
        handle: &ElementHandle,
        locator: &Locator,
    ) -> Result<ElementRecord, DriverError> {
        let tag = driver.element_tag(handle)?;
        let text = driver.element_text(handle)?;
        let raw_attributes = driver.element_attributes(handle)?;
        let attributes = AttributeSet::from_pairs(
            raw_attributes
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_deref())),
        );

        let mut features = ElementFeatures::new(tag, text);
        features.attributes = attributes;

        let source_url = driver.current_url().unwrap_or_default();
        let mut record = ElementRecord::new(locator.clone(), features, source_url);

        if self.capture_bounding_rect {
            match driver.element_bounding_rect(handle) {
                Ok(rect) => record.bounding_rect = Some(rect),
                Err(e) => debug!(%locator, error = %e, "no bounding rect"),
            }
        }

        debug!(%locator, fingerprint = %record.fingerprint, "web element scraped");
        Ok(record)
    }
}
