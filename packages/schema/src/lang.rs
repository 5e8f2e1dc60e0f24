/// Pick the segment for `lang` out of a multilingual caption.
///
/// Captions look like `"en: Delete | de: Löschen"`. When no segment is
/// tagged with `lang`, the whole string is returned, trimmed.
pub fn text_by_lang(text: &str, lang: &str) -> String {
    if !lang.is_empty() {
        let prefix = format!("{}:", lang);
        for segment in text.split('|') {
            let segment = segment.trim();
            if let Some(rest) = segment.strip_prefix(&prefix) {
                return rest.trim().to_string();
            }
        }
    }
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_by_lang() {
        let caption = "en: Delete | de: Löschen";
        assert_eq!(text_by_lang(caption, "de"), "Löschen");
        assert_eq!(text_by_lang(caption, "en"), "Delete");
        assert_eq!(text_by_lang(caption, "fr"), caption);
        assert_eq!(text_by_lang("  plain  ", ""), "plain");
    }
}
