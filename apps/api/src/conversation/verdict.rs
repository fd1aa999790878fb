//! Verdict extraction: detects the closing "Tú perteneces a la Facultad F y a la
//! carrera C." sentence in free assistant text.
//!
//! Behind the `VerdictExtractor` trait so a structured-output extractor can replace
//! the phrase matcher without touching the orchestrator.

use regex::Regex;

/// Outcome of inspecting one assistant utterance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verdict {
    pub complete: bool,
    pub faculty: String,
    pub career: String,
}

impl Verdict {
    pub fn incomplete() -> Self {
        Self::default()
    }
}

/// Pure function of its input: same text, same verdict.
pub trait VerdictExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Verdict;
}

/// Case-insensitive phrase matcher.
///
/// Faculty: shortest run followed by " y a la carrera".
/// Career: everything up to the first period, so an abbreviation with a period
/// truncates it.
pub struct PhraseVerdictExtractor {
    pattern: Regex,
}

const VERDICT_PATTERN: &str =
    r"(?i)tú\s+perteneces\s+a\s+la\s+facultad\s+(.+?)\s+y\s+a\s+la\s+carrera\s+(.+?)\.";

/// Quotes and brackets a model sometimes wraps entity names in.
const WRAPPING_CHARS: &[char] = &['"', '\'', '“', '”', '«', '»', '[', ']', '(', ')'];

impl PhraseVerdictExtractor {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(VERDICT_PATTERN).expect("verdict pattern is valid"),
        }
    }
}

impl Default for PhraseVerdictExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl VerdictExtractor for PhraseVerdictExtractor {
    fn extract(&self, text: &str) -> Verdict {
        let text = strip_emphasis(text);

        let Some(captures) = self.pattern.captures(&text) else {
            return Verdict::incomplete();
        };

        let faculty = clean_entity(&captures[1]);
        let career = clean_entity(&captures[2]);
        if faculty.is_empty() || career.is_empty() {
            return Verdict::incomplete();
        }

        Verdict {
            complete: true,
            faculty,
            career,
        }
    }
}

/// Removes markdown emphasis markers (`*`).
pub fn strip_emphasis(text: &str) -> String {
    text.replace('*', "")
}

fn clean_entity(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c: char| WRAPPING_CHARS.contains(&c) || c.is_whitespace())
        .to_string()
}
