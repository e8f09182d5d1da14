use serde::{Deserialize, Serialize};

use crate::element::element_model::{
    AttributeSet, BoundingRect, ElementFeatures, ElementRecord, Locator,
};

// ============================================================================
// Tabular row layout shared by the corpus and the snapshot
// ============================================================================

/// Column order of both tables. Null cells are written empty.
pub const COLUMNS: [&str; 24] = [
    "loc_by",
    "loc",
    "tag",
    "text",
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
    "fingerprint",
    "url",
    "rect",
];

/// One CSV row. Field order must match `COLUMNS`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRow {
    pub loc_by: String,
    pub loc: String,
    pub tag: String,
    #[serde(default)]
    pub text: String,
    pub class: Option<String>,
    pub id: Option<String>,
    pub placeholder: Option<String>,
    #[serde(rename = "type")]
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
    pub fingerprint: String,
    #[serde(default)]
    pub url: String,
    /// Bounding rect as a JSON object
    pub rect: Option<String>,
}

impl ElementRow {
    pub fn from_record(record: &ElementRecord) -> Self {
        let a = &record.features.attributes;
        Self {
            loc_by: record.locator.strategy.as_str().to_string(),
            loc: record.locator.value.clone(),
            tag: record.features.tag.clone(),
            text: record.features.text.clone(),
            class: a.class.clone(),
            id: a.id.clone(),
            placeholder: a.placeholder.clone(),
            r#type: a.r#type.clone(),
            name: a.name.clone(),
            value: a.value.clone(),
            alt: a.alt.clone(),
            form: a.form.clone(),
            hidden: a.hidden.clone(),
            href: a.href.clone(),
            label: a.label.clone(),
            role: a.role.clone(),
            required: a.required.clone(),
            selected: a.selected.clone(),
            src: a.src.clone(),
            style: a.style.clone(),
            target: a.target.clone(),
            fingerprint: record.fingerprint.clone(),
            url: record.source_url.clone(),
            rect: record
                .bounding_rect
                .and_then(|rect| serde_json::to_string(&rect).ok()),
        }
    }

    /// The feature columns only: what the encoder consumes.
    pub fn features(&self) -> ElementFeatures {
        ElementFeatures {
            tag: self.tag.clone(),
            text: self.text.clone(),
            attributes: AttributeSet {
                class: self.class.clone(),
                id: self.id.clone(),
                placeholder: self.placeholder.clone(),
                r#type: self.r#type.clone(),
                name: self.name.clone(),
                value: self.value.clone(),
                alt: self.alt.clone(),
                form: self.form.clone(),
                hidden: self.hidden.clone(),
                href: self.href.clone(),
                label: self.label.clone(),
                role: self.role.clone(),
                required: self.required.clone(),
                selected: self.selected.clone(),
                src: self.src.clone(),
                style: self.style.clone(),
                target: self.target.clone(),
            },
        }
    }

    pub fn locator(&self) -> Result<Locator, String> {
        let strategy = self.loc_by.parse().map_err(|e| format!("{}", e))?;
        Ok(Locator::new(strategy, self.loc.clone()))
    }

    /// Rebuild the full record. The stored fingerprint is kept as written.
    pub fn into_record(self) -> Result<ElementRecord, String> {
        let locator = self.locator()?;
        let bounding_rect = match self.rect.as_deref() {
            Some(raw) => Some(
                serde_json::from_str::<BoundingRect>(raw)
                    .map_err(|e| format!("bad rect '{}': {}", raw, e))?,
            ),
            None => None,
        };
        let features = self.features();
        Ok(ElementRecord {
            locator,
            features,
            fingerprint: self.fingerprint,
            source_url: self.url,
            bounding_rect,
        })
    }
}
