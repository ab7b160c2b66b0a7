//! Splitting recognized text into an equation and an attached question.

use crate::core::config::{ConfigError, ConfigValidator};
use crate::core::{OCRError, OcrResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default question-trigger vocabulary, matched as case-insensitive substrings.
pub const DEFAULT_TRIGGERS: &[&str] = &[
    "what",
    "solve",
    "find",
    "calculate",
    "determine",
    "evaluate",
    "roots",
    "value",
    "when",
    "if",
    "how",
    "show",
    "give",
    "derive",
    "compute",
    "simplify",
    "prove",
    "integrate",
    "differentiate",
    "result",
];

/// Imperatives that start a question only at a word boundary after
/// whitespace or punctuation. Covers `is`, which is too short to match as
/// a bare substring.
static DELIMITED_TRIGGER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[\s,.;:!?])(solve|what|find|evaluate|compute|determine|is|calculate)\b")
        .unwrap_or_else(|e| panic!("Failed to compile regex pattern: {e}"))
});

/// An equation together with the natural-language question attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EquationQuestionPair {
    /// The math expression, without leading or trailing commas.
    pub equation: String,
    /// The question in lower case, or empty.
    pub question: String,
}

impl EquationQuestionPair {
    pub fn new(equation: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            equation: equation.into(),
            question: question.into(),
        }
    }

    /// True when no equation text was recognized.
    pub fn is_empty(&self) -> bool {
        self.equation.is_empty() && self.question.is_empty()
    }

    /// Formats the pair as a single query: `"{question}: {equation}"`, or
    /// just the equation when there is no question.
    pub fn query(&self) -> String {
        if self.question.is_empty() {
            self.equation.clone()
        } else {
            format!("{}: {}", self.question, self.equation)
        }
    }
}

/// Configuration of the splitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    /// Substrings that mark the start of a question.
    pub triggers: Vec<String>,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            triggers: DEFAULT_TRIGGERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ConfigValidator for SplitterConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.triggers.iter().any(|t| t.trim().is_empty()) {
            return Err(ConfigError::InvalidConfig {
                message: "question triggers must not be empty strings".to_string(),
            });
        }
        Ok(())
    }
}

/// Locates the boundary between an equation and a trailing question.
#[derive(Debug, Clone)]
pub struct EquationQuestionSplitter {
    triggers: Option<Regex>,
}

impl Default for EquationQuestionSplitter {
    fn default() -> Self {
        // The default vocabulary is plain words, so this cannot fail.
        Self::new(&SplitterConfig::default()).unwrap_or(Self { triggers: None })
    }
}

impl EquationQuestionSplitter {
    /// Builds a splitter for the given trigger vocabulary.
    pub fn new(config: &SplitterConfig) -> OcrResult<Self> {
        config.validate()?;
        if config.triggers.is_empty() {
            return Ok(Self { triggers: None });
        }
        let alternation = config
            .triggers
            .iter()
            .map(|t| regex::escape(t.trim()))
            .collect::<Vec<_>>()
            .join("|");
        let triggers = Regex::new(&format!("(?i){}", alternation))
            .map_err(|e| OCRError::config_error(format!("invalid trigger vocabulary: {}", e)))?;
        Ok(Self {
            triggers: Some(triggers),
        })
    }

    /// Byte offset of the earliest question trigger in `text`.
    fn boundary(&self, text: &str) -> Option<usize> {
        let vocabulary = self
            .triggers
            .as_ref()
            .and_then(|re| re.find(text))
            .map(|m| m.start());
        let delimited = DELIMITED_TRIGGER
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.start());
        match (vocabulary, delimited) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Splits `text` at the first question trigger.
    ///
    /// Whitespace runs are collapsed first. Without a trigger the whole text
    /// is the equation and the question is empty. The equation is accepted
    /// as-is, however short or odd.
    pub fn split(&self, text: &str) -> EquationQuestionPair {
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

        let pair = match self.boundary(&collapsed) {
            Some(at) => EquationQuestionPair {
                equation: trim_equation(&collapsed[..at]),
                question: collapsed[at..].trim().to_lowercase(),
            },
            None => EquationQuestionPair {
                equation: trim_equation(&collapsed),
                question: String::new(),
            },
        };
        debug!(equation = %pair.equation, question = %pair.question, "split recognized text");
        pair
    }
}

fn trim_equation(s: &str) -> String {
    s.trim_matches(|c: char| c == ',' || c.is_whitespace()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(text: &str) -> (String, String) {
        let p = EquationQuestionSplitter::default().split(text);
        (p.equation, p.question)
    }

    #[test]
    fn test_compact_question() {
        assert_eq!(split("2x+3=0,whatisx"), ("2x+3=0".into(), "whatisx".into()));
    }

    #[test]
    fn test_no_trigger() {
        assert_eq!(split("  3x-5=10 "), ("3x-5=10".into(), String::new()));
        assert_eq!(split("4(2ns3)n=2"), ("4(2ns3)n=2".into(), String::new()));
        assert_eq!(split(""), (String::new(), String::new()));
    }

    #[test]
    fn test_case_and_whitespace() {
        assert_eq!(
            split("x^2 - 4 = 0 ,   Find   the ROOTS"),
            ("x^2 - 4 = 0".into(), "find the roots".into())
        );
    }

    #[test]
    fn test_earliest_trigger_wins() {
        assert_eq!(
            split("y=2x+1 evaluate when x is 3"),
            ("y=2x+1".into(), "evaluate when x is 3".into())
        );
        assert_eq!(
            split("Solve x+1=2"),
            (String::new(), "solve x+1=2".into())
        );
    }

    #[test]
    fn test_delimited_is() {
        assert_eq!(
            split("n^2+n=6, is n positive"),
            ("n^2+n=6".into(), "is n positive".into())
        );
        // "is" inside a token is not a trigger
        assert_eq!(split("x+axis=3"), ("x+axis=3".into(), String::new()));
    }

    #[test]
    fn test_stray_letters_are_accepted() {
        assert_eq!(split("a b, what"), ("a b".into(), "what".into()));
    }

    #[test]
    fn test_leading_commas_removed() {
        assert_eq!(split(",, 7x=14"), ("7x=14".into(), String::new()));
    }

    #[test]
    fn test_custom_vocabulary() {
        let config = SplitterConfig {
            triggers: vec!["berechne".into()],
        };
        let splitter = EquationQuestionSplitter::new(&config).unwrap();
        let p = splitter.split("x+1=3 Berechne x");
        assert_eq!(p, EquationQuestionPair::new("x+1=3", "berechne x"));

        let bad = SplitterConfig {
            triggers: vec!["  ".into()],
        };
        assert!(EquationQuestionSplitter::new(&bad).is_err());
    }

    #[test]
    fn test_query_formatting() {
        assert_eq!(EquationQuestionPair::new("x=1", "").query(), "x=1");
        assert_eq!(
            EquationQuestionPair::new("x^2=4", "what is x").query(),
            "what is x: x^2=4"
        );
    }
}
