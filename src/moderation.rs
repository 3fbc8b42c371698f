//! Static word-list content moderation
//!
//! Checks submitted text against a blacklist of slurs, dehumanizing language,
//! and calls to violence. Patterns match whole words (with common
//! obfuscations like repeated letters and digit substitutions) so partial
//! matches inside normal words are not flagged.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[_\-.]+").expect("separator pattern"));

static BLACKLIST: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Racial / ethnic slurs
        r"(?i)\bn+[i1!]+[gq]+(?:[e3]+r|[a@]+h?)\b",
        r"(?i)\bk+[i1!]+k+[e3]+[s$]?\b",
        r"(?i)\bch+[i1!]+n+k+[s$]?\b",
        r"(?i)\bsp+[i1!]+c+[s$]?\b",
        r"(?i)\bw+[e3]+tb+[a@]+ck+[s$]?\b",
        r"(?i)\bg+[o0]+[o0]+k+[s$]?\b",
        r"(?i)\bcoon+[s$]?\b",
        r"(?i)\bdarki+e+[s$]?\b",
        r"(?i)\btowel\s*heads?\b",
        r"(?i)\brag\s*heads?\b",
        r"(?i)\bbeaners?\b",
        r"(?i)\bgringos?\b",
        // Anti-LGBTQ slurs
        r"(?i)\bf+[a@]+g+[s$]?\b",
        r"(?i)\bf+[a@]+g+[o0]+t+[s$]?\b",
        r"(?i)\bd+y+k+[e3]+[s$]?\b",
        r"(?i)\btr+[a@]+nn+[yie]+[s$]?\b",
        // Misogynistic slurs
        r"(?i)\bc+u+n+t+[s$]?\b",
        // Antisemitic
        r"(?i)\bheil\s+hitler\b",
        r"(?i)\bsieg\s+heil\b",
        r"(?i)\bgas\s+the\b",
        // Dehumanizing phrases
        r"(?i)\bsub\s*humans?\b",
        r"(?i)\bvermin\b",
        r"(?i)\bcockroach(?:es)?\b",
        // Calls to violence against groups
        r"(?i)\bkill\s+all\b",
        r"(?i)\bdeath\s+to\b",
        r"(?i)\bgenocide\b",
        r"(?i)\bethnic\s+cleansing\b",
        // White supremacy phrases
        r"(?i)\bwhite\s+power\b",
        r"(?i)\bwhite\s+suprema",
        r"\b14\s*88\b",
        r"(?i)\brace\s+war\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("blacklist pattern"))
    .collect()
});

/// NFKD decomposition with combining marks stripped, then separators
/// collapsed to spaces: `genocíde` reads `genocide`, and `kill_all`,
/// `kill-all` and `kill.all` all read `kill all`.
fn normalize(text: &str) -> String {
    let stripped: String = text
        .nfkd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .collect();
    SEPARATORS.replace_all(&stripped, " ").into_owned()
}

/// True if `text` matches any blacklisted pattern after normalization.
pub fn contains_hate_speech(text: &str) -> bool {
    let normalized = normalize(text);
    BLACKLIST.iter().any(|pattern| pattern.is_match(&normalized))
}
