//! Text canonicalization for evidence comparison.
//!
//! Model output copied from a transcript drifts in ways that carry no meaning:
//! fullwidth vs halfwidth forms, doubled spaces, `、` vs `,`, curly vs corner
//! quotes, invisible zero-width characters. [`normalize`] erases exactly that
//! class of noise and nothing else, so that substring containment on the
//! normalized forms tolerates formatting drift but still rejects paraphrase.
//!
//! Steps, in order:
//! 1. strip zero-width characters
//! 2. Unicode NFKC (width and compatibility forms)
//! 3. unify comma, period and quote variants
//! 4. collapse whitespace runs to a single ASCII space
//! 5. trim
//!
//! Zero-width characters go first: removing one after NFKC could join a base
//! character with a combining mark that NFKC would then compose on a second
//! pass, which would break idempotence.

use unicode_normalization::UnicodeNormalization;

/// Canonical comma produced by [`normalize`].
pub const CANONICAL_COMMA: char = ',';

/// Canonical period produced by [`normalize`].
pub const CANONICAL_PERIOD: char = '.';

/// Canonical opening quote produced by [`normalize`].
pub const CANONICAL_OPEN_QUOTE: char = '「';

/// Canonical closing quote produced by [`normalize`].
pub const CANONICAL_CLOSE_QUOTE: char = '」';

fn is_zero_width(c: char) -> bool {
    matches!(
        c,
        '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}'
    )
}

fn unify_punctuation(c: char) -> char {
    match c {
        // comma family (fullwidth/halfwidth forms are already folded by NFKC)
        '、' | '，' | '﹐' | '﹑' | '､' => CANONICAL_COMMA,
        // period family
        '。' | '．' | '﹒' | '｡' => CANONICAL_PERIOD,
        // opening double/corner quotes
        '“' | '„' | '‟' | '「' | '『' | '«' | '〝' | '﹁' | '﹃' => CANONICAL_OPEN_QUOTE,
        // closing double/corner quotes
        '”' | '」' | '』' | '»' | '〞' | '〟' | '﹂' | '﹄' => CANONICAL_CLOSE_QUOTE,
        // typographic single quotes and apostrophes
        '‘' | '’' | '‚' | '‛' => '\'',
        other => other,
    }
}

/// Canonicalize `text` for comparison.
///
/// Pure, total and idempotent: `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .chars()
        .filter(|c| !is_zero_width(*c))
        .nfkc()
        .map(unify_punctuation)
        .collect();

    let mut out = String::with_capacity(folded.len());
    for word in folded.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// Length of `text` after normalization, in Unicode scalar values.
pub fn normalized_len(text: &str) -> usize {
    normalize(text).chars().count()
}
