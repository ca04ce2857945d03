//! Folder names derived from display names.

/// Upper bound on slug length, in characters.
pub const MAX_SLUG_LEN: usize = 80;

/// Folder name used when the input has no usable characters.
pub const FALLBACK_SLUG: &str = "unioncrax-game";

/// Turn a display name into a folder name.
///
/// Lowercases, collapses every run of non-alphanumeric characters into a
/// single `_`, trims leading and trailing underscores and truncates to
/// [`MAX_SLUG_LEN`]. Empty results become [`FALLBACK_SLUG`].
pub fn slugify(input: &str) -> String {
    let lowered = input.to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut in_gap = false;

    for ch in lowered.chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            slug.push(ch);
            in_gap = false;
        } else if !in_gap {
            slug.push('_');
            in_gap = true;
        }
    }

    // Only ASCII remains, so byte truncation is char-safe.
    let mut slug = slug.trim_matches('_').to_string();
    slug.truncate(MAX_SLUG_LEN);

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_and_trims() {
        assert_eq!(slugify("  Hades: Battle Out of Hell! "), "hades_battle_out_of_hell");
        assert_eq!(slugify("Baldur's Gate 3"), "baldur_s_gate_3");
        assert_eq!(slugify("__x__"), "x");
    }

    #[test]
    fn non_ascii_becomes_separator() {
        assert_eq!(slugify("Pokémon Légendes"), "pok_mon_l_gendes");
    }

    #[test]
    fn empty_input_uses_fallback() {
        assert_eq!(slugify(""), FALLBACK_SLUG);
        assert_eq!(slugify("!!!"), FALLBACK_SLUG);
        assert_eq!(slugify("ゲーム"), FALLBACK_SLUG);
    }

    #[test]
    fn truncates_to_bound() {
        let long = "a".repeat(200);
        assert_eq!(slugify(&long).len(), MAX_SLUG_LEN);
    }
}
