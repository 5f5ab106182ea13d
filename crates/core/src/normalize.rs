//! Text folding for accent-insensitive matching.
//!
//! Portuguese descriptions carry accents, cedillas and the occasional
//! trema (`AQÜICULTURA`), while users type whatever their keyboard offers.
//! Both sides go through [`fold_text`] before comparison:
//! - lowercase
//! - Unicode NFKD decomposition
//! - combining marks dropped
//! - whitespace runs collapsed to one space, ends trimmed

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Fold text for matching.
///
/// ```
/// use mcpbr_core::normalize::fold_text;
///
/// assert_eq!(fold_text("  São   Paulo "), "sao paulo");
/// assert_eq!(fold_text("AQÜICULTURA"), "aquicultura");
/// assert_eq!(fold_text("Construção"), "construcao");
/// ```
pub fn fold_text(s: &str) -> String {
    let stripped: String = s
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True when the folded `needle` occurs inside the folded `haystack`.
/// `needle` must already be folded.
pub fn contains_folded(haystack: &str, folded_needle: &str) -> bool {
    fold_text(haystack).contains(folded_needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_portuguese_accents() {
        assert_eq!(fold_text("ÁGUA, ESGOTO"), "agua, esgoto");
        assert_eq!(fold_text("Comércio"), "comercio");
        assert_eq!(fold_text("produção"), "producao");
        assert_eq!(fold_text("ALIMENTAÇÃO"), "alimentacao");
        assert_eq!(fold_text("Pôr"), "por");
    }

    #[test]
    fn test_fold_collapses_whitespace() {
        assert_eq!(fold_text("\tsao \n  paulo  "), "sao paulo");
        assert_eq!(fold_text("   "), "");
    }

    #[test]
    fn test_fold_is_idempotent() {
        let once = fold_text("Saúde Humana e Serviços Sociais");
        assert_eq!(fold_text(&once), once);
    }

    #[test]
    fn test_contains_folded() {
        assert!(contains_folded("São Paulo", "sao paulo"));
        assert!(contains_folded("PESCA E AQÜICULTURA", "aquicultura"));
        assert!(!contains_folded("CONSTRUÇÃO", "padaria"));
    }
}
