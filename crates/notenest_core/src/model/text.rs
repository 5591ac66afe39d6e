//! Plain-text projections of rich-text note content.

use once_cell::sync::Lazy;
use regex::Regex;

static MARKUP_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));
static ENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(?:#\d+|#x[0-9a-fA-F]+|[a-zA-Z]+);").expect("valid entity regex"));

/// Strips markup tags and character entities, leaving visible text.
///
/// Tags are replaced by a space so adjacent blocks (`<p>a</p><p>b</p>`) do
/// not merge into one word.
pub fn visible_text(content: &str) -> String {
    let without_tags = MARKUP_TAG_RE.replace_all(content, " ");
    ENTITY_RE.replace_all(&without_tags, " ").into_owned()
}

/// Counts whitespace-separated words in the visible text of `content`.
pub fn word_count(content: &str) -> usize {
    visible_text(content).split_whitespace().count()
}

/// Formats the status-bar label, e.g. `1 word` / `3 words`.
pub fn word_count_label(words: usize) -> String {
    if words == 1 {
        "1 word".to_string()
    } else {
        format!("{words} words")
    }
}

#[cfg(test)]
mod tests {
    use super::{visible_text, word_count, word_count_label};

    #[test]
    fn word_count_ignores_markup() {
        assert_eq!(word_count("<h1>Hello</h1><p>rich <strong>text</strong></p>"), 3);
        assert_eq!(word_count("<p>Start typing...</p>"), 2);
    }

    #[test]
    fn word_count_treats_entities_as_separators() {
        assert_eq!(word_count("one&nbsp;two"), 2);
        assert_eq!(word_count("<p>&nbsp;</p>"), 0);
    }

    #[test]
    fn block_boundaries_split_words() {
        assert_eq!(visible_text("<p>a</p><p>b</p>").split_whitespace().count(), 2);
    }

    #[test]
    fn label_pluralizes() {
        assert_eq!(word_count_label(0), "0 words");
        assert_eq!(word_count_label(1), "1 word");
        assert_eq!(word_count_label(7), "7 words");
    }
}
