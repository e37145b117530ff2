//! Display label formatting.
//!
//! Lengths are counted in grapheme clusters, so an emoji with a skin-tone
//! modifier or a letter with a combining accent counts as one character and
//! is never cut in half.

use unicode_segmentation::UnicodeSegmentation;

use crate::source::FeedItem;

/// Default width of the ticker label.
pub const DEFAULT_LABEL_CHARS: usize = 20;
/// The ticker is never narrower than this.
pub const MIN_LABEL_CHARS: usize = 5;
/// Width used for entries in the recently-shown list.
pub const HISTORY_LABEL_CHARS: usize = 60;

/// Appended when a label was cut short.
pub const ELLIPSIS: &str = "...";

/// Cut `text` to `max_chars` user-perceived characters, adding [`ELLIPSIS`]
/// when anything was removed.
pub fn crop(text: &str, max_chars: usize) -> String {
    let mut graphemes = text.grapheme_indices(true);
    match graphemes.nth(max_chars) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &text[..cut]),
        None => text.to_string(),
    }
}

/// Render the ticker label for `item`, clamping `max_chars` to
/// [`MIN_LABEL_CHARS`].
pub fn display_label(item: &FeedItem, max_chars: usize) -> String {
    crop(&item.author_and_title(), max_chars.max(MIN_LABEL_CHARS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Source;

    #[test]
    fn long_hacker_news_label_is_cut_with_ellipsis() {
        let item = FeedItem::new(Source::HackerNews, "1", "hn", "Hello World", "");
        assert_eq!(display_label(&item, 10), "hn: Hello ...");
    }

    #[test]
    fn short_label_is_untouched() {
        let item = FeedItem::new(Source::Reddit, "1", "rust", "Hi", "");
        assert_eq!(display_label(&item, 20), "r/rust: Hi");
    }

    #[test]
    fn exact_length_is_untouched() {
        assert_eq!(crop("abcde", 5), "abcde");
        assert_eq!(crop("abcdef", 5), "abcde...");
    }

    #[test]
    fn max_is_clamped_to_floor() {
        let item = FeedItem::new(Source::SocialFeed, "1", "bob", "status update", "");
        assert_eq!(display_label(&item, 0), "@bob:...");
        assert_eq!(display_label(&item, 3), display_label(&item, MIN_LABEL_CHARS));
    }

    #[test]
    fn crop_counts_graphemes_not_bytes() {
        // "é" as e + combining acute, and a family emoji joined with ZWJs.
        let text = "e\u{301}e\u{301}👨‍👩‍👧x";
        assert_eq!(crop(text, 3), "e\u{301}e\u{301}👨‍👩‍👧...");
        assert_eq!(crop(text, 2), "e\u{301}e\u{301}...");
        assert_eq!(crop(text, 4), text);
    }
}
