//! Suggestion feeder: canned example questions.
//!
//! A selected suggestion is submitted exactly like typed input. When both
//! are present, typed text wins and the suggestion is dropped.

/// Built-in example questions.
pub const DEFAULT_SUGGESTIONS: [&str; 6] = [
    "What is your area of expertise?",
    "How many years of experience do you have as an engineering leader or manager?",
    "What are your strengths?",
    "What are your most important qualifications?",
    "Which role did you enjoy the most in your career?",
    "What type of leader are you?",
];

/// Fixed, ordered catalog of example questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionCatalog {
    questions: Vec<String>,
}

impl Default for SuggestionCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_SUGGESTIONS.iter().map(|q| (*q).to_owned()).collect())
    }
}

impl SuggestionCatalog {
    /// Build a catalog from explicit questions.
    pub fn new(questions: Vec<String>) -> Self {
        Self { questions }
    }

    /// Questions in display order.
    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    /// Look a question up by its 1-based display number.
    pub fn get(&self, number: usize) -> Option<&str> {
        let index = number.checked_sub(1)?;
        self.questions.get(index).map(String::as_str)
    }

    /// Number of questions.
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Choose the text to submit: non-blank typed text, else the suggestion.
pub fn select(typed: Option<&str>, suggestion: Option<&str>) -> Option<String> {
    let typed = typed.map(str::trim).filter(|t| !t.is_empty());
    let suggestion = suggestion.map(str::trim).filter(|s| !s.is_empty());
    typed.or(suggestion).map(str::to_owned)
}
