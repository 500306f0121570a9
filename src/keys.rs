//! Header-to-key normalization.
//!
//! Column headers become record keys by lower-casing and collapsing every run
//! of characters outside `[a-z0-9_]` into a single underscore. Keys are not
//! deduplicated: two headers may share a key, in which case the later column
//! wins when a record is assembled.

use std::sync::OnceLock;

use regex::Regex;

static NON_KEY_CHARS: OnceLock<Regex> = OnceLock::new();

fn non_key_chars() -> &'static Regex {
    NON_KEY_CHARS.get_or_init(|| Regex::new(r"[^a-z0-9_]+").expect("valid key pattern"))
}

pub fn header_to_key(header: &str) -> String {
    let lowered = header.to_lowercase();
    non_key_chars().replace_all(&lowered, "_").into_owned()
}

pub fn headers_to_keys(headers: &[String]) -> Vec<String> {
    headers.iter().map(|header| header_to_key(header)).collect()
}
