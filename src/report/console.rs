use crate::heal::heal_model::HealedMatch;

// ============================================================================
// Console reporter for healed substitutions
// ============================================================================

/// Format a healed substitution for terminal output.
///
/// Produces output like:
/// ```text
///
///     Element with locator "id=submit-old" not found
///     Similar element found with locator: id=submit-new
///     Elements similarity: 1.00
///
/// ```
pub fn format_heal_result(healed: &HealedMatch) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "\n\tElement with locator \"{}\" not found\n",
        healed.old_locator
    ));
    out.push_str(&format!(
        "\tSimilar element found with locator: {}\n",
        healed.locator
    ));
    out.push_str(&format!("\tElements similarity: {:.2}\n", healed.distance));
    out
}
