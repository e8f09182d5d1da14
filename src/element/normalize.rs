/// HTML boolean attributes whose mere presence carries the meaning.
const BOOLEAN_ATTRIBUTES: [&str; 3] = ["hidden", "required", "selected"];

/// Collapse whitespace runs to single spaces and trim the ends.
pub fn normalize_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize a raw attribute value for storage.
///
/// Empty boolean attributes (`<input required>`) become the attribute name,
/// any other empty value becomes `None`. `class` is whitespace-collapsed.
pub fn normalize_attribute(name: &str, value: Option<&str>) -> Option<String> {
    let value = value?;
    if name == "class" {
        let collapsed = normalize_text(value);
        return (!collapsed.is_empty()).then_some(collapsed);
    }
    if value.is_empty() {
        return BOOLEAN_ATTRIBUTES
            .contains(&name)
            .then(|| name.to_string());
    }
    Some(value.to_string())
}
