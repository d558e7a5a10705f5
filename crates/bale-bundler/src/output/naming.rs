//! Output file name patterns.
//!
//! Patterns support `[name]` (chunk name), `[contenthash]` and
//! `[contenthash:N]` (the first N hex digits of the content's BLAKE3 hash).
//! `[chunkhash]` is accepted as a synonym for `[contenthash]`.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Hash length used by `[contenthash]` without an explicit length.
pub const DEFAULT_HASH_LENGTH: usize = 20;

static HASH_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(?:content|chunk)hash(?::(\d+))?\]").expect("hash placeholder pattern is valid")
});

/// Hex BLAKE3 digest of `content`.
pub fn content_hash(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}

/// Whether `template` contains a hash placeholder.
pub fn has_hash(template: &str) -> bool {
    HASH_PLACEHOLDER.is_match(template)
}

/// Expand `template` for chunk `name` with contents `content`.
pub fn render_filename(template: &str, name: &str, content: &str) -> String {
    let named = template.replace("[name]", name);
    if !has_hash(&named) {
        return named;
    }

    let hash = content_hash(content);
    HASH_PLACEHOLDER
        .replace_all(&named, |caps: &Captures<'_>| {
            let len = caps
                .get(1)
                .and_then(|m| m.as_str().parse::<usize>().ok())
                .unwrap_or(DEFAULT_HASH_LENGTH)
                .clamp(1, hash.len());
            hash[..len].to_string()
        })
        .into_owned()
}
