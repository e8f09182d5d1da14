use std::collections::BTreeMap;

use sha1::{Digest, Sha1};

use crate::element::element_model::{ATTRIBUTE_NAMES, ElementFeatures, Locator};

/// Content fingerprint of a record.
///
/// SHA-1 over the JSON object of every non-volatile column with sorted keys.
/// Source url and bounding rect are not inputs, so the same element captured
/// on two pages hashes identically.
pub fn fingerprint(locator: &Locator, features: &ElementFeatures) -> String {
    let mut fields: BTreeMap<&str, Option<&str>> = BTreeMap::new();
    fields.insert("loc_by", Some(locator.strategy.as_str()));
    fields.insert("loc", Some(locator.value.as_str()));
    fields.insert("tag", Some(features.tag.as_str()));
    fields.insert("text", Some(features.text.as_str()));
    for (name, value) in ATTRIBUTE_NAMES.iter().zip(features.attributes.values()) {
        fields.insert(name, value);
    }

    // A map of strings cannot fail to serialize.
    let canonical = serde_json::to_string(&fields).unwrap_or_default();

    let mut hasher = Sha1::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}
