//! Language-model assisted correction and solving.
//!
//! The completion service is an injected [`MathCompletion`]; prompts are
//! caller-owned [`PromptTemplate`]s. Retries and timeouts belong to the
//! [`MathCompletion`] implementation.

use crate::core::OcrResult;
use crate::text::{EquationQuestionPair, EquationQuestionSplitter};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{(equation|question_line|question|raw)\}")
        .unwrap_or_else(|e| panic!("Failed to compile regex pattern: {e}"))
});

/// A text-completion service.
pub trait MathCompletion: Send + Sync + std::fmt::Debug {
    /// Returns the model's reply to `prompt`.
    fn complete(&self, prompt: &str) -> OcrResult<String>;
}

/// Prompt text with `{equation}`, `{question}`, `{raw}` and `{question_line}`
/// placeholders.
///
/// `{question_line}` expands to the question prefix followed by the question,
/// or to nothing when there is no question. Placeholders are substituted in a
/// single pass, so braces inside substituted values are left alone.
///
/// ```rust
/// use mathsnap::completion::PromptTemplate;
/// use mathsnap::text::EquationQuestionPair;
///
/// let template = PromptTemplate::new("Solve {equation}. {question_line}");
/// let pair = EquationQuestionPair::new("x+1=2", "what is x");
/// assert_eq!(template.render(&pair, ""), "Solve x+1=2. Additional question: what is x");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub text: String,
    #[serde(default = "default_question_prefix")]
    pub question_prefix: String,
}

fn default_question_prefix() -> String {
    "Additional question: ".to_string()
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            question_prefix: default_question_prefix(),
        }
    }

    pub fn with_question_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.question_prefix = prefix.into();
        self
    }

    pub fn render(&self, pair: &EquationQuestionPair, raw: &str) -> String {
        PLACEHOLDER
            .replace_all(&self.text, |caps: &Captures| match &caps[1] {
                "equation" => pair.equation.clone(),
                "question" => pair.question.clone(),
                "raw" => raw.to_string(),
                "question_line" if pair.question.is_empty() => String::new(),
                "question_line" => format!("{}{}", self.question_prefix, pair.question),
                other => format!("{{{other}}}"),
            })
            .into_owned()
    }
}

/// True for text that already reads as well-formed LaTeX: longer than four
/// characters, containing a backslash and one of `sum`, `int`, `frac`, `lim`.
pub fn looks_like_clean_latex(text: &str) -> bool {
    if text.chars().count() <= 4 || !text.contains('\\') {
        return false;
    }
    let lower = text.to_lowercase();
    ["sum", "int", "frac", "lim"]
        .iter()
        .any(|op| lower.contains(op))
}

/// Templates used by [`EquationSolver::correct`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionTemplates {
    /// For input that [`looks_like_clean_latex`].
    pub clean: PromptTemplate,
    /// For everything else.
    pub noisy: PromptTemplate,
}

impl Default for CorrectionTemplates {
    fn default() -> Self {
        Self {
            clean: PromptTemplate::new(
                "Interpret or evaluate the LaTeX expression below. Reply with the result, \
                 then a comma, then the question it implies.\n\n{raw}",
            ),
            noisy: PromptTemplate::new(
                "The text below is a math expression read by OCR and may contain misread \
                 characters, broken syntax or stray words. Reply with only the corrected \
                 equation, then a comma, then the implied question if there is one.\n\n{raw}",
            ),
        }
    }
}

/// Corrects and answers extracted equations through a completion service.
#[derive(Debug, Clone)]
pub struct EquationSolver {
    completion: Arc<dyn MathCompletion>,
    templates: CorrectionTemplates,
    splitter: EquationQuestionSplitter,
}

impl EquationSolver {
    pub fn new(completion: Arc<dyn MathCompletion>) -> Self {
        Self {
            completion,
            templates: CorrectionTemplates::default(),
            splitter: EquationQuestionSplitter::default(),
        }
    }

    pub fn with_templates(mut self, templates: CorrectionTemplates) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_splitter(mut self, splitter: EquationQuestionSplitter) -> Self {
        self.splitter = splitter;
        self
    }

    /// Asks the model to repair raw recognizer output.
    ///
    /// The reply is split at its first comma. The part before it goes through
    /// the splitter again, so a question the model left inside the equation
    /// is still separated; the part after it is appended to the question.
    pub fn correct(&self, raw: &str) -> OcrResult<EquationQuestionPair> {
        let template = if looks_like_clean_latex(raw) {
            &self.templates.clean
        } else {
            &self.templates.noisy
        };
        let prompt = template.render(&EquationQuestionPair::default(), raw);
        let reply = self.completion.complete(&prompt)?;
        debug!(reply = %reply, "correction reply");

        let (head, tail) = match reply.split_once(',') {
            Some((head, tail)) => (head, tail.trim().to_lowercase()),
            None => (reply.as_str(), String::new()),
        };
        let mut pair = self.splitter.split(head);
        pair.question = match (pair.question.is_empty(), tail.is_empty()) {
            (_, true) => pair.question,
            (true, false) => tail,
            (false, false) => format!("{}, {}", pair.question, tail),
        };
        Ok(pair)
    }

    /// Renders `template` for `pair` and returns the trimmed reply.
    pub fn answer(
        &self,
        pair: &EquationQuestionPair,
        raw: &str,
        template: &PromptTemplate,
    ) -> OcrResult<String> {
        let reply = self.completion.complete(&template.render(pair, raw))?;
        Ok(reply.trim().to_string())
    }
}
