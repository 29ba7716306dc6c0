//! Text normalisation for extracted prose.
//!
//! PDF text extraction hands back text the way it was laid out, not the way
//! it was written: words hyphenated across line breaks, soft hyphens left in
//! by the typesetter, and whitespace runs that only made sense on the page.
//! [`normalize_text`] undoes those artefacts with a fixed sequence of cheap
//! passes. It is pure and never fails.
//!
//! ## Rule Order
//!
//! Hyphenation repair must see the original line breaks, so it runs before
//! any whitespace is touched. The final collapse runs last because it erases
//! the structure the earlier passes rely on.

use once_cell::sync::Lazy;
use regex::Regex;

/// Normalise extracted text.
///
/// Rules (applied in order):
/// 1. Empty input yields an empty string
/// 2. Rejoin words hyphenated across a line break (`exam-\nple` → `example`)
/// 3. Remove soft hyphens (U+00AD)
/// 4. Replace a lone whitespace character between a lowercase letter and a
///    run of two or more lowercase letters with a plain space
/// 5. Collapse every whitespace run to one space and trim both ends
pub fn normalize_text(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }
    let s = repair_hyphenation(input);
    let s = remove_soft_hyphens(&s);
    let s = normalise_word_gaps(&s);
    collapse_whitespace(&s)
}

// ── Rule 2: Hyphenation across line breaks ───────────────────────────────────

static RE_HYPHEN_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+)-\s*\n\s*(\w+)").unwrap());

fn repair_hyphenation(input: &str) -> String {
    RE_HYPHEN_BREAK.replace_all(input, "${1}${2}").into_owned()
}

// ── Rule 3: Soft hyphens ─────────────────────────────────────────────────────

fn remove_soft_hyphens(input: &str) -> String {
    input.replace('\u{00AD}', "")
}

// ── Rule 4: Gaps inside lowercase runs ───────────────────────────────────────

/// Justified text sometimes comes back with a tab or line break where the
/// typesetter stretched a gap. Only a single whitespace character preceded by
/// a lowercase letter and followed by at least two lowercase letters is
/// rewritten.
fn normalise_word_gaps(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let lower = |i: usize| chars.get(i).is_some_and(|c| c.is_ascii_lowercase());

    chars
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            if c.is_whitespace() && i > 0 && lower(i - 1) && lower(i + 1) && lower(i + 2) {
                ' '
            } else {
                c
            }
        })
        .collect()
}

// ── Rule 5: Whitespace collapse ──────────────────────────────────────────────

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
