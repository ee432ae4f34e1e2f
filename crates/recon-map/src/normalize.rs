//! Field-name and free-text canonicalization.

use recon_rules::NamingRules;

const SEPARATORS: [char; 5] = ['_', '-', '.', '/', '\\'];

/// Canonical form of a field API name.
///
/// Lowercases, strips at most one configured custom-field suffix, turns
/// separators into spaces and collapses whitespace. Never fails.
///
/// Suffixes always begin with `_`, and the output contains no `_`, so a
/// second pass is a no-op.
pub fn normalize_field_name(raw: &str, naming: &NamingRules) -> String {
    let lowered = raw.trim().to_lowercase();
    let stripped = naming
        .custom_suffixes
        .iter()
        .find_map(|suffix| lowered.strip_suffix(suffix.to_lowercase().as_str()))
        .unwrap_or(&lowered);
    collapse(stripped)
}

/// Normalizes text for comparison by lowercasing and replacing separators with spaces.
pub fn normalize_text(raw: &str) -> String {
    collapse(&raw.trim().to_lowercase())
}

fn collapse(text: &str) -> String {
    text.replace(SEPARATORS, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_custom_suffix_once() {
        let naming = NamingRules::default();
        assert_eq!(normalize_field_name("Product_Code__c", &naming), "product code");
        assert_eq!(normalize_field_name("Account__c__c", &naming), "account c");
        assert_eq!(normalize_field_name("  SBQQ__Quote__r ", &naming), "sbqq quote");
    }

    #[test]
    fn leaves_plain_names_alone() {
        let naming = NamingRules::default();
        assert_eq!(normalize_field_name("ProductCode", &naming), "productcode");
        assert_eq!(normalize_field_name("", &naming), "");
    }

    #[test]
    fn text_collapses_separators() {
        assert_eq!(normalize_text(" Unit-Price / Net "), "unit price net");
    }
}
