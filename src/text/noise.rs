//! OCR noise correction.
//!
//! Two layers run in a single left-to-right scan:
//!
//! 1. **Glyph substitution** replaces Unicode math and typographic glyphs,
//!    and backslash command spellings, with ASCII operators or word tokens.
//! 2. **Letter-digit disambiguation** rewrites characters that OCR engines
//!    confuse with digits (`S` → `5`, `O` → `0`, `l` → `1`, ...). It only
//!    touches tokens that already look like math: a digit, an operator, a
//!    bracket or a non-ASCII glyph somewhere in the token. Plain words such
//!    as `Solve` or `find` pass through, so the splitter can still see them.
//!
//! Text produced by layer 1 is emitted as a protected segment and never
//! passes through layer 2, so `∫` becomes `integrate` rather than
//! `1nte9rate`, and `\times` becomes `*` rather than `\t1mes`.

use crate::core::constants::MATH_OPERATORS;
use once_cell::sync::Lazy;
use tracing::trace;

/// Unicode glyphs and their ASCII spellings.
static GLYPHS: &[(&str, &str)] = &[
    // dashes and quotes
    ("\u{2212}", "-"),
    ("\u{2013}", "-"),
    ("\u{2014}", "-"),
    ("\u{2010}", "-"),
    ("\u{2011}", "-"),
    ("\u{2018}", "'"),
    ("\u{2019}", "'"),
    ("\u{201C}", "\""),
    ("\u{201D}", "\""),
    ("\u{2032}", "'"),
    ("\u{2033}", "''"),
    ("\u{2026}", "..."),
    // operators
    ("\u{00D7}", "*"),
    ("\u{22C5}", "*"),
    ("\u{00B7}", "*"),
    ("\u{2217}", "*"),
    ("\u{00F7}", "/"),
    ("\u{2215}", "/"),
    ("\u{00B1}", "+-"),
    ("\u{2213}", "-+"),
    ("\u{2218}", "o"),
    // calculus, sums and roots
    ("\u{222B}", "integrate"),
    ("\u{222C}", "integrate integrate"),
    ("\u{222E}", "integrate"),
    ("\u{2202}", "d"),
    ("\u{2207}", "nabla"),
    ("\u{2211}", "sum"),
    ("\u{03A3}", "sum"),
    ("\u{220F}", "prod"),
    ("\u{221A}", "sqrt"),
    ("\u{221B}", "cbrt"),
    // constants
    ("\u{03C0}", "pi"),
    ("\u{221E}", "oo"),
    ("\u{03B5}", "epsilon"),
    ("\u{03B8}", "theta"),
    ("\u{03B1}", "alpha"),
    ("\u{03B2}", "beta"),
    ("\u{03B3}", "gamma"),
    ("\u{03B4}", "delta"),
    ("\u{0394}", "Delta"),
    ("\u{2206}", "Delta"),
    ("\u{03BB}", "lambda"),
    ("\u{03BC}", "mu"),
    ("\u{03C3}", "sigma"),
    ("\u{03C6}", "phi"),
    ("\u{03C9}", "omega"),
    ("\u{00B0}", "deg"),
    // relations and logic
    ("\u{2248}", "~"),
    ("\u{2245}", "~="),
    ("\u{2260}", "!="),
    ("\u{2264}", "<="),
    ("\u{2265}", ">="),
    ("\u{2A7D}", "<="),
    ("\u{2A7E}", ">="),
    ("\u{2192}", "->"),
    ("\u{21D2}", "=>"),
    ("\u{21D4}", "<=>"),
    ("\u{221D}", "proportional_to"),
    // sets
    ("\u{2208}", "in"),
    ("\u{2209}", "notin"),
    ("\u{2205}", "emptyset"),
    ("\u{2229}", "intersect"),
    ("\u{222A}", "union"),
    ("\u{211D}", "R"),
    ("\u{2124}", "Z"),
    ("\u{2115}", "N"),
    ("\u{211A}", "Q"),
    // brackets
    ("\u{27E8}", "("),
    ("\u{27E9}", ")"),
    ("\u{2308}", "("),
    ("\u{2309}", ")"),
    ("\u{230A}", "("),
    ("\u{230B}", ")"),
    ("\u{FF08}", "("),
    ("\u{FF09}", ")"),
    // super- and subscripts
    ("\u{2070}", "^0"),
    ("\u{00B9}", "^1"),
    ("\u{00B2}", "^2"),
    ("\u{00B3}", "^3"),
    ("\u{2074}", "^4"),
    ("\u{2075}", "^5"),
    ("\u{2076}", "^6"),
    ("\u{2077}", "^7"),
    ("\u{2078}", "^8"),
    ("\u{2079}", "^9"),
    ("\u{207F}", "^n"),
    ("\u{2080}", "_0"),
    ("\u{2081}", "_1"),
    ("\u{2082}", "_2"),
    ("\u{2083}", "_3"),
    ("\u{2084}", "_4"),
    ("\u{00BD}", "1/2"),
    ("\u{00BC}", "1/4"),
    ("\u{00BE}", "3/4"),
];

/// ASCII spellings that OCR picks up from typeset math, plus bracket
/// variants. Only applied by [`NoiseCorrector::correct`].
static COMMANDS: &[(&str, &str)] = &[
    ("\\times", "*"),
    ("\\cdot", "*"),
    ("\\ast", "*"),
    ("\\div", "/"),
    ("\\pm", "+-"),
    ("\\mp", "-+"),
    ("\\int", "integrate"),
    ("\\iint", "integrate integrate"),
    ("\\oint", "integrate"),
    ("\\partial", "d"),
    ("\\nabla", "nabla"),
    ("\\sum", "sum"),
    ("\\prod", "prod"),
    ("\\sqrt", "sqrt"),
    ("\\pi", "pi"),
    ("\\infty", "oo"),
    ("\\leq", "<="),
    ("\\le", "<="),
    ("\\geq", ">="),
    ("\\ge", ">="),
    ("\\neq", "!="),
    ("\\ne", "!="),
    ("\\approx", "~"),
    ("\\cong", "~="),
    ("\\to", "->"),
    ("\\rightarrow", "->"),
    ("\\Rightarrow", "=>"),
    ("\\iff", "<=>"),
    ("\\propto", "proportional_to"),
    ("\\in", "in"),
    ("\\notin", "notin"),
    ("\\emptyset", "emptyset"),
    ("\\varnothing", "emptyset"),
    ("\\cap", "intersect"),
    ("\\cup", "union"),
    ("\\left", ""),
    ("\\right", ""),
    ("[", "("),
    ("]", ")"),
    ("{", "("),
    ("}", ")"),
];

/// Letters and marks that OCR confuses with digits or operators.
fn disambiguate(c: char) -> char {
    match c {
        'S' => '5',
        'O' | 'o' | 'D' | 'Q' => '0',
        'l' | 'I' | 'i' | '|' => '1',
        'Z' | 'z' => '2',
        'B' => '8',
        'G' => '6',
        'g' => '9',
        'A' => '4',
        '~' | '_' => '-',
        other => other,
    }
}

/// Entries of a table ordered longest pattern first, so that the first hit
/// at a position is the longest one.
fn longest_first(tables: &[&'static [(&'static str, &'static str)]]) -> Vec<(&'static str, &'static str)> {
    let mut entries: Vec<_> = tables.iter().flat_map(|t| t.iter().copied()).collect();
    entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    entries
}

static GLYPHS_ONLY: Lazy<Vec<(&'static str, &'static str)>> = Lazy::new(|| longest_first(&[GLYPHS]));
static GLYPHS_AND_COMMANDS: Lazy<Vec<(&'static str, &'static str)>> =
    Lazy::new(|| longest_first(&[GLYPHS, COMMANDS]));

/// Whitespace variants folded to a plain space.
fn is_space_variant(c: char) -> bool {
    matches!(c, '\u{00A0}' | '\u{2000}'..='\u{200A}' | '\u{202F}' | '\u{205F}' | '\u{3000}')
}

/// ASCII equivalent of fullwidth forms and mathematical alphanumerics.
fn ascii_fold(c: char) -> Option<char> {
    let cp = c as u32;
    match cp {
        0xFF01..=0xFF5E => char::from_u32(cp - 0xFEE0),
        0x1D400..=0x1D6A3 => {
            let offset = ((cp - 0x1D400) % 52) as u8;
            Some(if offset < 26 { (b'A' + offset) as char } else { (b'a' + offset - 26) as char })
        }
        0x1D7CE..=0x1D7FF => Some((b'0' + ((cp - 0x1D7CE) % 10) as u8) as char),
        0x210E => Some('h'),
        _ => None,
    }
}

/// Characters that end a token for the purpose of digit disambiguation.
fn is_token_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, ',' | ';' | '?')
}

/// Characters that mark a token as math rather than prose.
fn is_math_char(c: char) -> bool {
    c.is_ascii_digit()
        || MATH_OPERATORS.contains(&c)
        || matches!(c, '(' | ')' | '[' | ']' | '{' | '}' | '<' | '>' | '|' | '~' | '_' | '\\')
        || (!c.is_ascii() && !c.is_whitespace())
}

/// Per-byte flag: true where the byte belongs to a math-like token.
fn math_token_mask(text: &str) -> Vec<bool> {
    let mut mask = vec![false; text.len()];
    let mut start = 0;
    let ends = text.char_indices().chain(std::iter::once((text.len(), ' ')));
    for (idx, c) in ends {
        if !is_token_separator(c) {
            continue;
        }
        if text[start..idx].chars().any(is_math_char) {
            mask[start..idx].fill(true);
        }
        start = idx + c.len_utf8();
    }
    mask
}

/// A backslash command only matches when it is not followed by another
/// letter, so `\int` does not fire inside `\intop`.
fn command_boundary(pattern: &str, rest: &str) -> bool {
    if !pattern.starts_with('\\') {
        return true;
    }
    !rest[pattern.len()..]
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
}

/// Rewrites OCR-typical confusions into plain ASCII math text.
///
/// The corrector is stateless; one instance can be shared across threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoiseCorrector;

impl NoiseCorrector {
    pub fn new() -> Self {
        Self
    }

    /// Applies both layers: glyphs and backslash commands first, then
    /// letter-digit disambiguation on the untouched remainder of math-like
    /// tokens.
    ///
    /// Used for raster OCR output.
    pub fn correct(&self, text: &str) -> String {
        let out = scan(text, &GLYPHS_AND_COMMANDS, true);
        trace!(input = text, output = %out, "noise correction");
        out
    }

    /// Applies only the Unicode glyph layer, leaving ASCII untouched.
    ///
    /// Used for LaTeX recognizer output, whose letters and commands are
    /// meaningful.
    pub fn strip_glyphs(&self, text: &str) -> String {
        scan(text, &GLYPHS_ONLY, false)
    }
}

fn scan(text: &str, table: &[(&'static str, &'static str)], digits: bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mask = if digits { math_token_mask(text) } else { Vec::new() };
    let mut i = 0;
    while i < text.len() {
        let rest = &text[i..];
        if let Some((pattern, replacement)) = table
            .iter()
            .find(|(p, _)| rest.starts_with(p) && command_boundary(p, rest))
        {
            out.push_str(replacement);
            i += pattern.len();
            continue;
        }

        let Some(c) = rest.chars().next() else {
            break;
        };
        let remap = digits && mask[i];
        i += c.len_utf8();

        if c.is_ascii() {
            out.push(if remap { disambiguate(c) } else { c });
        } else if is_space_variant(c) {
            out.push(' ');
        } else if let Some(folded) = ascii_fold(c) {
            out.push(if remap { disambiguate(folded) } else { folded });
        }
        // zero-width marks and unknown glyphs are dropped
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glyph_substitution() {
        let n = NoiseCorrector::new();
        assert_eq!(n.strip_glyphs("3\u{00D7}4\u{2212}1"), "3*4-1");
        assert_eq!(n.strip_glyphs("x \u{2264} y \u{2260} z"), "x <= y != z");
        assert_eq!(n.strip_glyphs("\u{222B}x dx"), "integratex dx");
        assert_eq!(n.strip_glyphs("\u{221A}2 \u{2248} 1.41"), "sqrt2 ~ 1.41");
        assert_eq!(n.strip_glyphs("a \u{2208} A \u{2229} B"), "a in A intersect B");
        assert_eq!(n.strip_glyphs("x\u{00B2}+1"), "x^2+1");
    }

    #[test]
    fn test_strip_glyphs_keeps_ascii_and_latex() {
        let n = NoiseCorrector::new();
        assert_eq!(n.strip_glyphs("\\frac{Sx}{2}"), "\\frac{Sx}{2}");
        assert_eq!(n.strip_glyphs("  lOl  "), "lOl");
    }

    #[test]
    fn test_digit_disambiguation() {
        let n = NoiseCorrector::new();
        assert_eq!(n.correct("S+O=Z"), "5+0=2");
        assert_eq!(n.correct("lI|i"), "1111");
        assert_eq!(n.correct("B+G-g*A"), "8+6-9*4");
        assert_eq!(n.correct("x~y_z"), "x-y-2");
        assert_eq!(n.correct("[x]{y}"), "(x)(y)");
    }

    #[test]
    fn test_words_are_not_remapped() {
        let n = NoiseCorrector::new();
        assert_eq!(n.correct("Solve 2x+3=0"), "Solve 2x+3=0");
        assert_eq!(n.correct("2x+3=0 find x"), "2x+3=0 find x");
        assert_eq!(n.correct("x^2-4=0 calculate roots"), "x^2-4=0 calculate roots");
        assert_eq!(n.correct("S0lve Z+l=O, what is x"), "501ve 2+1=0, what is x");
        assert_eq!(n.correct("BGgA"), "BGgA");
    }

    #[test]
    fn test_math_token_mask() {
        let mask = math_token_mask("ab x+1,is");
        assert_eq!(
            mask,
            vec![false, false, false, true, true, true, false, false, false]
        );
    }

    #[test]
    fn test_noisy_sample_keeps_unmapped_letters() {
        let n = NoiseCorrector::new();
        let out = n.correct("4(2ns3)n=2");
        assert_eq!(out, "4(2ns3)n=2");
        assert!(out.is_ascii());
    }

    #[test]
    fn test_glyph_output_is_not_remapped() {
        let n = NoiseCorrector::new();
        // Protected output survives even though it contains mapped letters.
        assert_eq!(n.correct("\u{222B}x"), "integratex");
        assert_eq!(n.correct("a\u{2248}b"), "a~b");
        assert_eq!(n.correct("f\u{2218}g"), "fo9");
        assert_eq!(n.correct("2\\times3"), "2*3");

        // Running the digit table first corrupts the command spelling.
        let digits_first: String = "2\\times3".chars().map(disambiguate).collect();
        assert_eq!(digits_first, "2\\t1mes3");
        assert_eq!(n.correct(&digits_first), "2\\t1mes3");
    }

    #[test]
    fn test_longest_command_wins() {
        let n = NoiseCorrector::new();
        assert_eq!(n.correct("x\\leq5"), "x<=5");
        assert_eq!(n.correct("\\infty"), "oo");
        assert_eq!(n.correct("\\int_0^1"), "integrate-0^1");
        assert_eq!(n.correct("\\left(x\\right)"), "(x)");
        // No boundary: left to the digit layer.
        assert_eq!(n.correct("\\intop"), "\\1nt0p");
    }

    #[test]
    fn test_idempotent_on_glyph_free_text() {
        let n = NoiseCorrector::new();
        for sample in ["S0lve 2x+3=0, what is x", "4(2ns3)n=2", "lim x->0", "B+G=Q"] {
            let once = n.correct(sample);
            assert_eq!(n.correct(&once), once);
            assert_eq!(n.strip_glyphs(sample), n.strip_glyphs(&n.strip_glyphs(sample)));
        }
    }

    #[test]
    fn test_invisible_and_unknown_characters() {
        let n = NoiseCorrector::new();
        assert_eq!(n.strip_glyphs("x\u{200B}+\u{00A0}1\u{FEFF}"), "x+ 1");
        assert_eq!(n.strip_glyphs("a\u{2A00}b\u{2603}c"), "abc");
        assert!(n.correct("\u{22A2}\u{27C2}x").is_ascii());
    }

    #[test]
    fn test_ascii_folding() {
        let n = NoiseCorrector::new();
        assert_eq!(n.strip_glyphs("\u{FF13}\u{FF58}"), "3x");
        assert_eq!(n.strip_glyphs("\u{1D465}+\u{1D466}"), "x+y");
        assert_eq!(n.strip_glyphs("\u{1D7D0}"), "2");
        assert_eq!(n.correct("\u{FF33}"), "5");
    }
}
