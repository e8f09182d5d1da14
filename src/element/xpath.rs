use crate::element::dom::DomElement;

// ============================================================================
// XPath generation
// ============================================================================
//
// An element with an id is addressed as `//*[@id="..."]`. Anything else gets
// a path of `tag` / `tag[n]` steps up to the nearest ancestor with an id, or
// to the document root. `n` is the 1-based position among same-tag siblings
// and is omitted when the tag is unique under its parent.

/// Quote a string as an XPath literal.
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('"') {
        format!("\"{}\"", value)
    } else if !value.contains('\'') {
        format!("'{}'", value)
    } else {
        let parts: Vec<String> = value
            .split('"')
            .map(|part| format!("\"{}\"", part))
            .collect();
        format!("concat({})", parts.join(", '\"', "))
    }
}

pub fn id_xpath(id: &str) -> String {
    format!("//*[@id={}]", xpath_literal(id))
}

fn step(tag: &str, position: usize, same_tag_count: usize) -> String {
    if same_tag_count > 1 {
        format!("{}[{}]", tag, position)
    } else {
        tag.to_string()
    }
}

/// Visit every element in document order together with its generated XPath.
pub fn walk_with_xpath<'a, F>(root: &'a DomElement, visit: &mut F)
where
    F: FnMut(&'a DomElement, &str),
{
    let xpath = match root.id() {
        Some(id) => id_xpath(id),
        None => format!("/{}", root.tag_name()),
    };
    visit(root, &xpath);
    walk_children(root, &xpath, visit);
}

fn walk_children<'a, F>(parent: &'a DomElement, parent_xpath: &str, visit: &mut F)
where
    F: FnMut(&'a DomElement, &str),
{
    let children: Vec<&DomElement> = parent.element_children().collect();
    for (i, &child) in children.iter().enumerate() {
        let tag = child.tag_name();
        let xpath = match child.id() {
            Some(id) => id_xpath(id),
            None => {
                let count = children.iter().filter(|c| c.tag_name() == tag).count();
                let position = children[..i]
                    .iter()
                    .filter(|c| c.tag_name() == tag)
                    .count()
                    + 1;
                format!("{}/{}", parent_xpath, step(&tag, position, count))
            }
        };
        visit(child, &xpath);
        walk_children(child, &xpath, visit);
    }
}

// ============================================================================
// XPath evaluation (generated subset)
// ============================================================================

/// Where a parsed path starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathAnchor {
    Root,
    Id(String),
}

/// A location path in the subset this crate generates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementPath {
    pub anchor: PathAnchor,
    /// `(tag, position)` steps; position is 1-based.
    pub steps: Vec<(String, Option<usize>)>,
}

/// Parse `//*[@id="x"]/a/b[2]` or `/html/body/div[3]`.
///
/// Returns `None` for anything outside that subset.
pub fn parse_xpath(expr: &str) -> Option<ElementPath> {
    let expr = expr.trim();
    let (anchor, rest) = if let Some(after) = expr.strip_prefix("//*[@id=") {
        let quote = after.chars().next().filter(|c| *c == '"' || *c == '\'')?;
        let body = &after[1..];
        let end = body.find(quote)?;
        let id = &body[..end];
        let rest = body[end + 1..].strip_prefix(']')?;
        (PathAnchor::Id(id.to_string()), rest)
    } else if expr.starts_with('/') && !expr.starts_with("//") {
        (PathAnchor::Root, expr)
    } else {
        return None;
    };

    let mut steps = Vec::new();
    if !rest.is_empty() {
        let rest = rest.strip_prefix('/')?;
        for raw in rest.split('/') {
            steps.push(parse_step(raw)?);
        }
    }
    if anchor == PathAnchor::Root && steps.is_empty() {
        return None;
    }
    Some(ElementPath { anchor, steps })
}

fn parse_step(raw: &str) -> Option<(String, Option<usize>)> {
    match raw.split_once('[') {
        Some((tag, index)) => {
            let position: usize = index.strip_suffix(']')?.parse().ok()?;
            if tag.is_empty() || position == 0 {
                return None;
            }
            Some((tag.to_ascii_lowercase(), Some(position)))
        }
        None if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') => {
            Some((raw.to_ascii_lowercase(), None))
        }
        None => None,
    }
}
