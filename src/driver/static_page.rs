use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::driver::driver_model::{DriverError, ElementHandle, PageDriver};
use crate::element::{
    dom::DomElement,
    element_model::{BoundingRect, Locator, LocatorStrategy},
    xpath::{ElementPath, PathAnchor, parse_xpath},
};

// ============================================================================
// In-memory page driver
// ============================================================================

/// A saved page: the URL it came from plus its document tree.
///
/// This is the JSON format the CLI reads with `--page`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageDump {
    pub url: String,
    pub document: DomElement,
}

/// A `PageDriver` over a document held in memory.
///
/// Handles are child-index paths from the root (`"0.2.1"`), so they stay
/// valid only while the document is unchanged. Supports id, name, tag, class,
/// link-text, simple CSS (`#id`, `.class`, `tag`) and the XPath subset this
/// crate generates.
#[derive(Debug, Clone)]
pub struct StaticPage {
    url: String,
    document: DomElement,
    rects: BTreeMap<String, BoundingRect>,
}

impl StaticPage {
    pub fn new(url: impl Into<String>, document: DomElement) -> Self {
        Self {
            url: url.into(),
            document,
            rects: BTreeMap::new(),
        }
    }

    pub fn from_dump(dump: PageDump) -> Self {
        Self::new(dump.url, dump.document)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, DriverError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DriverError::NoDocument(format!("{}: {}", path.display(), e)))?;
        let dump: PageDump = serde_json::from_str(&content).map_err(|e| DriverError::JsonParse {
            context: path.display().to_string(),
            source: e,
        })?;
        Ok(Self::from_dump(dump))
    }

    /// Swap in a new document, as after a navigation or re-render.
    pub fn replace_document(&mut self, url: impl Into<String>, document: DomElement) {
        self.url = url.into();
        self.document = document;
        self.rects.clear();
    }

    /// Attach a bounding rectangle to the element a locator resolves to.
    pub fn set_rect(&mut self, locator: &Locator, rect: BoundingRect) -> Result<(), DriverError> {
        let handle = self.resolve_element(locator)?;
        self.rects.insert(handle.0, rect);
        Ok(())
    }

    pub fn document(&self) -> &DomElement {
        &self.document
    }

    fn element(&self, handle: &ElementHandle) -> Result<&DomElement, DriverError> {
        let mut current = &self.document;
        if handle.0.is_empty() {
            return Ok(current);
        }
        for part in handle.0.split('.') {
            let index: usize = part
                .parse()
                .map_err(|_| DriverError::StaleHandle(handle.0.clone()))?;
            current = current
                .element_children()
                .nth(index)
                .ok_or_else(|| DriverError::StaleHandle(handle.0.clone()))?;
        }
        Ok(current)
    }

    /// First element in document order matching `predicate`.
    fn find_first<F>(&self, predicate: F) -> Option<ElementHandle>
    where
        F: Fn(&DomElement) -> bool,
    {
        fn visit<F: Fn(&DomElement) -> bool>(
            el: &DomElement,
            path: &mut Vec<usize>,
            predicate: &F,
        ) -> Option<ElementHandle> {
            if predicate(el) {
                return Some(handle_for(path));
            }
            for (i, child) in el.element_children().enumerate() {
                path.push(i);
                if let Some(found) = visit(child, path, predicate) {
                    return Some(found);
                }
                path.pop();
            }
            None
        }
        visit(&self.document, &mut Vec::new(), &predicate)
    }

    fn follow_path(&self, path: &ElementPath) -> Option<ElementHandle> {
        let mut steps = path.steps.iter();
        let mut indices = match &path.anchor {
            PathAnchor::Id(id) => {
                let handle = self.find_first(|el| el.id() == Some(id.as_str()))?;
                parse_handle(&handle)
            }
            PathAnchor::Root => {
                let (tag, position) = steps.next()?;
                if self.document.tag_name() != *tag || position.unwrap_or(1) != 1 {
                    return None;
                }
                Vec::new()
            }
        };

        let mut current = self.element(&handle_for(&indices)).ok()?;
        for (tag, position) in steps {
            let wanted = position.unwrap_or(1);
            let (index, child) = current
                .element_children()
                .enumerate()
                .filter(|(_, c)| c.tag_name() == *tag)
                .nth(wanted - 1)?;
            indices.push(index);
            current = child;
        }
        Some(handle_for(&indices))
    }

    fn lookup(&self, locator: &Locator) -> Result<Option<ElementHandle>, DriverError> {
        let value = locator.value.as_str();
        let found = match locator.strategy {
            LocatorStrategy::Id => self.find_first(|el| el.id() == Some(value)),
            LocatorStrategy::Name => self.find_first(|el| el.attr("name") == Some(value)),
            LocatorStrategy::TagName => {
                let tag = value.to_ascii_lowercase();
                self.find_first(|el| el.tag_name() == tag)
            }
            LocatorStrategy::ClassName => self.find_first(|el| has_class(el, value)),
            LocatorStrategy::LinkText => {
                self.find_first(|el| el.tag_name() == "a" && el.text_content() == value)
            }
            LocatorStrategy::PartialLinkText => {
                self.find_first(|el| el.tag_name() == "a" && el.text_content().contains(value))
            }
            LocatorStrategy::Css => {
                if let Some(id) = value.strip_prefix('#') {
                    self.find_first(|el| el.id() == Some(id))
                } else if let Some(class) = value.strip_prefix('.') {
                    self.find_first(|el| has_class(el, class))
                } else if !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric()) {
                    let tag = value.to_ascii_lowercase();
                    self.find_first(|el| el.tag_name() == tag)
                } else {
                    return Err(unsupported(locator, "only #id, .class and tag selectors"));
                }
            }
            LocatorStrategy::XPath => {
                let path = parse_xpath(value)
                    .ok_or_else(|| unsupported(locator, "only generated location paths"))?;
                self.follow_path(&path)
            }
        };
        Ok(found)
    }
}

fn handle_for(path: &[usize]) -> ElementHandle {
    ElementHandle(
        path.iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join("."),
    )
}

fn parse_handle(handle: &ElementHandle) -> Vec<usize> {
    if handle.0.is_empty() {
        return Vec::new();
    }
    handle.0.split('.').filter_map(|p| p.parse().ok()).collect()
}

fn has_class(el: &DomElement, class: &str) -> bool {
    el.attr("class")
        .map(|c| c.split_whitespace().any(|name| name == class))
        .unwrap_or(false)
}

fn unsupported(locator: &Locator, reason: &str) -> DriverError {
    DriverError::UnsupportedLocator {
        locator: locator.to_string(),
        reason: reason.to_string(),
    }
}

impl PageDriver for StaticPage {
    fn current_url(&mut self) -> Result<String, DriverError> {
        Ok(self.url.clone())
    }

    fn current_page_document(&mut self) -> Result<DomElement, DriverError> {
        Ok(self.document.clone())
    }

    fn resolve_element(&mut self, locator: &Locator) -> Result<ElementHandle, DriverError> {
        self.lookup(locator)?
            .ok_or_else(|| DriverError::not_found(locator))
    }

    fn element_tag(&mut self, handle: &ElementHandle) -> Result<String, DriverError> {
        Ok(self.element(handle)?.tag_name())
    }

    fn element_attributes(
        &mut self,
        handle: &ElementHandle,
    ) -> Result<BTreeMap<String, Option<String>>, DriverError> {
        Ok(self
            .element(handle)?
            .attributes
            .iter()
            .map(|(name, value)| (name.clone(), Some(value.clone())))
            .collect())
    }

    fn element_text(&mut self, handle: &ElementHandle) -> Result<String, DriverError> {
        Ok(self.element(handle)?.text_content())
    }

    fn element_bounding_rect(&mut self, handle: &ElementHandle) -> Result<BoundingRect, DriverError> {
        self.element(handle)?;
        self.rects
            .get(&handle.0)
            .copied()
            .ok_or_else(|| DriverError::StaleHandle(handle.0.clone()))
    }
}
