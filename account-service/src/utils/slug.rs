//! Organization slugs: lowercase `a-z0-9` runs joined by single dashes.

/// Suffixes tried, in order, when the base slug is taken.
pub const SUGGESTION_SUFFIXES: [&str; 5] = ["care", "health", "services", "group", "uk"];

/// Normalizes a display name into a URL-safe slug. Letters outside ASCII are
/// transliterated first (`Zürich` becomes `zurich`), then anything outside
/// `a-z0-9` becomes a separator; runs of separators collapse to one dash and
/// leading/trailing dashes are dropped. Returns an empty string when nothing
/// usable remains.
pub fn generate_slug(name: &str) -> String {
    let ascii = deunicode::deunicode(name.trim());
    let mut slug = String::with_capacity(ascii.len());
    let mut prev_dash = false;
    for ch in ascii.to_ascii_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            prev_dash = false;
        } else if !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }
    slug.trim_matches('-').to_string()
}

/// Deterministic fallback candidates: the base slug of `name` with each of
/// [`SUGGESTION_SUFFIXES`] appended.
pub fn build_suggestions(name: &str) -> Vec<String> {
    let base = generate_slug(name);
    SUGGESTION_SUFFIXES
        .iter()
        .map(|suffix| format!("{base}-{suffix}"))
        .collect()
}
