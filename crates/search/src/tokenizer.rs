//! Text tokenizer for indexing and querying
//!
//! Pipeline: UAX#29 word boundaries → strip possessives → remove non-alphanumeric
//!           → lowercase
//!
//! No stopword removal and no stemming: proposals are mostly Spanish and the
//! analyzer must treat every word of a title as searchable.

use unicode_segmentation::UnicodeSegmentation;

/// Strip English possessive suffix (`'s` / `\u{2019}s`).
#[inline]
fn strip_possessive(word: &str) -> &str {
    word.strip_suffix("'s")
        .or_else(|| word.strip_suffix("\u{2019}s"))
        .unwrap_or(word)
}

/// Tokenize text into searchable terms.
///
/// # Example
///
/// ```
/// use argir_search::tokenizer::tokenize;
///
/// let tokens = tokenize("Carril-bici en Madrid!");
/// assert_eq!(tokens, vec!["carril", "bici", "en", "madrid"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words()
        .map(strip_possessive)
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
        })
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_basic() {
        let tokens = tokenize("Hello, World!");
        assert_eq!(tokens, vec!["hello", "world"]);
    }

    #[test]
    fn test_tokenize_keeps_short_tokens() {
        let tokens = tokenize("Plan A y B");
        assert_eq!(tokens, vec!["plan", "a", "y", "b"]);
    }

    #[test]
    fn test_tokenize_accents() {
        let tokens = tokenize("Peatonalización de la Calle Mayor");
        assert_eq!(tokens, vec!["peatonalización", "de", "la", "calle", "mayor"]);
    }

    #[test]
    fn test_tokenize_numbers() {
        let tokens = tokenize("línea 27 y M30");
        assert_eq!(tokens, vec!["línea", "27", "y", "m30"]);
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_tokenize_only_punctuation() {
        assert!(tokenize("...---...").is_empty());
    }

    #[test]
    fn test_possessives() {
        let tokens = tokenize("Madrid's parks");
        assert_eq!(tokens, vec!["madrid", "parks"]);
    }

    #[test]
    fn test_hyphens() {
        let tokens = tokenize("carril-bici");
        assert_eq!(tokens, vec!["carril", "bici"]);
    }
}
