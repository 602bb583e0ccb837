/// Ordered denylist of prompt-injection markers. Matching is ASCII
/// case-insensitive. Phrases are removed sequentially in list order, so an
/// earlier removal can splice a later phrase into existence (or destroy
/// one); that ordering is part of the observable behavior and is pinned by
/// tests.
const INJECTION_PHRASES: &[&str] = &[
    "ignore previous",
    "ignore all",
    "forget everything",
    "new instructions",
    "system message",
    "you are now",
    "<|im_start|>",
    "<|im_end|>",
    "<|endoftext|>",
];

const MAX_CLEAN_CHARS: usize = 10_000;

/// Denylist scrubbing of free-text fields. This is a fixed-list defense
/// only; injection variants outside the list pass through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputSanitizer;

impl InputSanitizer {
    pub fn clean(&self, text: &str) -> String {
        let mut cleaned = text.to_string();
        for phrase in INJECTION_PHRASES {
            cleaned = remove_phrase(&cleaned, phrase);
        }
        truncate_chars(cleaned, MAX_CLEAN_CHARS)
    }
}

/// Single left-to-right pass removing non-overlapping case-insensitive
/// matches of `phrase`. Text spliced together by a removal is not rescanned
/// within the same pass.
fn remove_phrase(text: &str, phrase: &str) -> String {
    // ASCII lowercasing keeps byte offsets aligned with the original.
    let haystack = text.to_ascii_lowercase();
    let needle = phrase.to_ascii_lowercase();

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0usize;
    while let Some(found) = haystack[cursor..].find(&needle) {
        let start = cursor + found;
        out.push_str(&text[cursor..start]);
        cursor = start + needle.len();
    }
    out.push_str(&text[cursor..]);
    out
}

fn truncate_chars(text: String, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text,
    }
}
