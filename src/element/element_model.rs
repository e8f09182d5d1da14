use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::element::fingerprint::fingerprint;

// ============================================================================
// Locators
// ============================================================================

/// How a locator value is interpreted by the driver.
///
/// Serialized names follow the WebDriver `By` strings so corpus files stay
/// readable by other tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocatorStrategy {
    #[serde(rename = "id")]
    Id,
    #[serde(rename = "xpath")]
    XPath,
    #[serde(rename = "css selector", alias = "css")]
    Css,
    #[serde(rename = "name")]
    Name,
    #[serde(rename = "tag name")]
    TagName,
    #[serde(rename = "class name")]
    ClassName,
    #[serde(rename = "link text")]
    LinkText,
    #[serde(rename = "partial link text")]
    PartialLinkText,
}

impl LocatorStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocatorStrategy::Id => "id",
            LocatorStrategy::XPath => "xpath",
            LocatorStrategy::Css => "css selector",
            LocatorStrategy::Name => "name",
            LocatorStrategy::TagName => "tag name",
            LocatorStrategy::ClassName => "class name",
            LocatorStrategy::LinkText => "link text",
            LocatorStrategy::PartialLinkText => "partial link text",
        }
    }
}

impl fmt::Display for LocatorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown locator strategy '{0}'")]
pub struct UnknownStrategy(pub String);

impl FromStr for LocatorStrategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "id" => Ok(LocatorStrategy::Id),
            "xpath" => Ok(LocatorStrategy::XPath),
            "css" | "css selector" => Ok(LocatorStrategy::Css),
            "name" => Ok(LocatorStrategy::Name),
            "tag" | "tag name" => Ok(LocatorStrategy::TagName),
            "class" | "class name" => Ok(LocatorStrategy::ClassName),
            "link text" => Ok(LocatorStrategy::LinkText),
            "partial link text" => Ok(LocatorStrategy::PartialLinkText),
            other => Err(UnknownStrategy(other.to_string())),
        }
    }
}

/// A (strategy, value) pair identifying how to find an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    pub strategy: LocatorStrategy,
    pub value: String,
}

impl Locator {
    pub fn new(strategy: LocatorStrategy, value: impl Into<String>) -> Self {
        Self {
            strategy,
            value: value.into(),
        }
    }

    pub fn id(value: impl Into<String>) -> Self {
        Self::new(LocatorStrategy::Id, value)
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Self::new(LocatorStrategy::XPath, value)
    }

    pub fn css(value: impl Into<String>) -> Self {
        Self::new(LocatorStrategy::Css, value)
    }
}

/// Renders as `strategy=value`, the same form accepted by `FromStr`.
impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.strategy, self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocatorParseError {
    #[error("locator '{0}' must look like 'strategy=value'")]
    MissingSeparator(String),
    #[error(transparent)]
    Strategy(#[from] UnknownStrategy),
}

impl FromStr for Locator {
    type Err = LocatorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (strategy, value) = s
            .split_once('=')
            .ok_or_else(|| LocatorParseError::MissingSeparator(s.to_string()))?;
        Ok(Locator::new(strategy.parse()?, value))
    }
}

// ============================================================================
// Fixed attribute schema
// ============================================================================

/// Attribute columns captured for every element, in schema order.
pub const ATTRIBUTE_NAMES: [&str; 17] = [
    "class",
    "id",
    "placeholder",
    "type",
    "name",
    "value",
    "alt",
    "form",
    "hidden",
    "href",
    "label",
    "role",
    "required",
    "selected",
    "src",
    "style",
    "target",
];

/// Encoded feature columns: tag, text, then every attribute.
pub const FEATURE_COLUMN_COUNT: usize = ATTRIBUTE_NAMES.len() + 2;

/// The fixed attribute set of an element. Absent attributes are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeSet {
    pub class: Option<String>,
    pub id: Option<String>,
    pub placeholder: Option<String>,
    pub r#type: Option<String>,
    pub name: Option<String>,
    pub value: Option<String>,
    pub alt: Option<String>,
    pub form: Option<String>,
    pub hidden: Option<String>,
    pub href: Option<String>,
    pub label: Option<String>,
    pub role: Option<String>,
    pub required: Option<String>,
    pub selected: Option<String>,
    pub src: Option<String>,
    pub style: Option<String>,
    pub target: Option<String>,
}

impl AttributeSet {
    fn slot_mut(&mut self, name: &str) -> Option<&mut Option<String>> {
        let slot = match name {
            "class" => &mut self.class,
            "id" => &mut self.id,
            "placeholder" => &mut self.placeholder,
            "type" => &mut self.r#type,
            "name" => &mut self.name,
            "value" => &mut self.value,
            "alt" => &mut self.alt,
            "form" => &mut self.form,
            "hidden" => &mut self.hidden,
            "href" => &mut self.href,
            "label" => &mut self.label,
            "role" => &mut self.role,
            "required" => &mut self.required,
            "selected" => &mut self.selected,
            "src" => &mut self.src,
            "style" => &mut self.style,
            "target" => &mut self.target,
            _ => return None,
        };
        Some(slot)
    }

    /// Set an attribute by its HTML name. Values are normalized (see
    /// [`normalize_attribute`](crate::element::normalize::normalize_attribute)).
    ///
    /// Returns `false` when the attribute is not part of the schema.
    pub fn set(&mut self, name: &str, value: Option<&str>) -> bool {
        let name = name.to_ascii_lowercase();
        let normalized = crate::element::normalize::normalize_attribute(&name, value);
        match self.slot_mut(&name) {
            Some(slot) => {
                *slot = normalized;
                true
            }
            None => false,
        }
    }

    /// Build from arbitrary `(name, value)` pairs, ignoring names outside the schema.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
    {
        let mut attributes = AttributeSet::default();
        for (name, value) in pairs {
            attributes.set(name, value);
        }
        attributes
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        ATTRIBUTE_NAMES
            .iter()
            .position(|n| *n == name)
            .and_then(|i| self.values()[i])
    }

    /// Attribute values in `ATTRIBUTE_NAMES` order.
    pub fn values(&self) -> [Option<&str>; ATTRIBUTE_NAMES.len()] {
        [
            self.class.as_deref(),
            self.id.as_deref(),
            self.placeholder.as_deref(),
            self.r#type.as_deref(),
            self.name.as_deref(),
            self.value.as_deref(),
            self.alt.as_deref(),
            self.form.as_deref(),
            self.hidden.as_deref(),
            self.href.as_deref(),
            self.label.as_deref(),
            self.role.as_deref(),
            self.required.as_deref(),
            self.selected.as_deref(),
            self.src.as_deref(),
            self.style.as_deref(),
            self.target.as_deref(),
        ]
    }
}

// ============================================================================
// Element features and records
// ============================================================================

/// The categorical part of a record: everything the encoder sees.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementFeatures {
    pub tag: String,
    pub text: String,
    pub attributes: AttributeSet,
}

impl ElementFeatures {
    pub fn new(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            text: crate::element::normalize::normalize_text(&text.into()),
            attributes: AttributeSet::default(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.set(name, Some(value));
        self
    }

    /// Column values in encoder order: tag, text, then the attribute schema.
    pub fn column_values(&self) -> [Option<&str>; FEATURE_COLUMN_COUNT] {
        let attributes = self.attributes.values();
        let mut columns = [None; FEATURE_COLUMN_COUNT];
        columns[0] = Some(self.tag.as_str());
        columns[1] = Some(self.text.as_str());
        columns[2..].copy_from_slice(&attributes);
        columns
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One element as stored in the success corpus or a page snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    pub locator: Locator,
    pub features: ElementFeatures,
    /// Content hash over locator and features; never covers url or rect.
    pub fingerprint: String,
    pub source_url: String,
    pub bounding_rect: Option<BoundingRect>,
}

impl ElementRecord {
    pub fn new(locator: Locator, features: ElementFeatures, source_url: impl Into<String>) -> Self {
        let fingerprint = fingerprint(&locator, &features);
        Self {
            locator,
            features,
            fingerprint,
            source_url: source_url.into(),
            bounding_rect: None,
        }
    }

    pub fn with_rect(mut self, rect: BoundingRect) -> Self {
        self.bounding_rect = Some(rect);
        self
    }
}
