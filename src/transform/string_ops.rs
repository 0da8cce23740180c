use std::borrow::Cow;

/// Trims leading/trailing whitespace while borrowing the original when unchanged.
pub fn trim(input: &str) -> Cow<'_, str> {
    let trimmed = input.trim();
    if trimmed.len() == input.len() {
        Cow::Borrowed(input)
    } else {
        Cow::Borrowed(trimmed)
    }
}

/// Title-cases each whitespace- or punctuation-delimited word, preserving the
/// separators themselves so values like `sci-fi` become `Sci-Fi` rather than
/// being re-tokenized. Idempotent.
pub fn title_case(input: &str) -> Cow<'_, str> {
    if is_title_cased(input) {
        return Cow::Borrowed(input);
    }
    let mut result = String::with_capacity(input.len());
    let mut at_word_start = true;
    for ch in input.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                result.extend(ch.to_uppercase());
            } else {
                result.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            at_word_start = !ch.is_numeric();
            result.push(ch);
        }
    }
    Cow::Owned(result)
}

fn is_title_cased(input: &str) -> bool {
    let mut at_word_start = true;
    for ch in input.chars() {
        if ch.is_alphabetic() {
            if at_word_start && ch.is_lowercase() {
                return false;
            }
            if !at_word_start && ch.is_uppercase() {
                return false;
            }
            at_word_start = false;
        } else {
            at_word_start = !ch.is_numeric();
        }
    }
    true
}
