use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{LocalMatch, MatchMode};
use crate::responder::RESPONSE_RULES;

pub const GREETING_TOKENS: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "hola",
    "good morning",
    "good evening",
];

pub const CLOSING_TOKENS: &[&str] = &["thank", "thanks", "bye", "goodbye"];

pub const APP_PHRASES: &[&str] = &[
    "raksha",
    "rakshasetu",
    "sos button",
    "sos feature",
    "emergency alert",
    "panic button",
    "emergency contact",
    "trusted contact",
    "save contact",
    "app feature",
    "app work",
    "how to use app",
    "use this app",
    "this app",
    "your app",
    "safety app",
    "about you",
    "who are you",
    "what are you",
    "your name",
    "yourself",
    "tell me about yourself",
    "what can you do",
    "your features",
    "your capabilities",
    "nearby hospital",
    "nearby police",
    "nearby pharmacy",
    "nearby medical",
    "find hospital",
    "find police",
    "find pharmacy",
];

/// Terms that only count as app questions next to a [`CONTEXT_TOKENS`] hit.
pub const CONTEXTUAL_KEYWORDS: &[&str] = &[
    "sos",
    "emergency",
    "location sharing",
    "gps tracking",
    "app setting",
    "configure app",
    "app permission",
];

pub const CONTEXT_TOKENS: &[&str] = &["app", "this", "here", "how", "what"];

/// Keyword predicate over a normalized message.
#[derive(Debug, Clone, Copy)]
pub enum Matcher {
    AnyOf(&'static [&'static str]),
    AllOf(&'static [Matcher]),
    EitherOf(&'static [Matcher]),
}

impl Matcher {
    pub fn matches(&self, text: &str, mode: MatchMode) -> bool {
        match self {
            Self::AnyOf(needles) => needles.iter().any(|needle| contains(text, needle, mode)),
            Self::AllOf(parts) => parts.iter().all(|part| part.matches(text, mode)),
            Self::EitherOf(parts) => parts.iter().any(|part| part.matches(text, mode)),
        }
    }

    fn collect_needles(&self, out: &mut Vec<&'static str>) {
        match self {
            Self::AnyOf(needles) => out.extend_from_slice(needles),
            Self::AllOf(parts) | Self::EitherOf(parts) => {
                parts.iter().for_each(|part| part.collect_needles(out))
            }
        }
    }
}

pub const LOCAL_RULES: &[(LocalMatch, Matcher)] = &[
    (LocalMatch::Greeting, Matcher::AnyOf(GREETING_TOKENS)),
    (LocalMatch::Closing, Matcher::AnyOf(CLOSING_TOKENS)),
    (LocalMatch::AppPhrase, Matcher::AnyOf(APP_PHRASES)),
    (
        LocalMatch::ContextualKeyword,
        Matcher::AllOf(&[
            Matcher::AnyOf(CONTEXTUAL_KEYWORDS),
            Matcher::AnyOf(CONTEXT_TOKENS),
        ]),
    ),
    (
        LocalMatch::FeatureQuestion,
        Matcher::AllOf(&[
            Matcher::AnyOf(&["what", "how"]),
            Matcher::AnyOf(&["feature", "work", "use", "does"]),
        ]),
    ),
];

pub fn normalize_message(input: &str) -> String {
    input.trim().to_lowercase()
}

/// Decides whether a message can be answered from the built-in knowledge base.
#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier {
    mode: MatchMode,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: MatchMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn classify(&self, message: &str) -> Option<LocalMatch> {
        let normalized = normalize_message(message);
        LOCAL_RULES
            .iter()
            .find(|(_, matcher)| matcher.matches(&normalized, self.mode))
            .map(|(stage, _)| *stage)
    }

    pub fn is_locally_answerable(&self, message: &str) -> bool {
        self.classify(message).is_some()
    }
}

pub fn is_locally_answerable(message: &str) -> bool {
    Classifier::default().is_locally_answerable(message)
}

pub fn classify_local(message: &str) -> Option<LocalMatch> {
    Classifier::default().classify(message)
}

/// Word-boundary patterns for every keyword in the classifier and responder tables.
static WORD_PATTERNS: Lazy<HashMap<&'static str, Regex>> = Lazy::new(|| {
    let mut needles = Vec::new();
    LOCAL_RULES
        .iter()
        .map(|(_, matcher)| matcher)
        .chain(RESPONSE_RULES.iter().map(|rule| &rule.matcher))
        .for_each(|matcher| matcher.collect_needles(&mut needles));

    needles
        .into_iter()
        .filter_map(|needle| word_pattern(needle).map(|pattern| (needle, pattern)))
        .collect()
});

fn word_pattern(needle: &str) -> Option<Regex> {
    Regex::new(&format!(r"\b{}\b", regex::escape(needle))).ok()
}

pub(crate) fn contains(text: &str, needle: &str, mode: MatchMode) -> bool {
    match mode {
        MatchMode::Substring => text.contains(needle),
        MatchMode::WholeWord => match WORD_PATTERNS.get(needle) {
            Some(pattern) => pattern.is_match(text),
            None => word_pattern(needle)
                .map(|pattern| pattern.is_match(text))
                .unwrap_or_else(|| text.contains(needle)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greetings_are_local_regardless_of_case_and_padding() {
        for greeting in GREETING_TOKENS {
            assert!(is_locally_answerable(greeting));
            assert!(is_locally_answerable(&greeting.to_uppercase()));
            assert!(is_locally_answerable(&format!("  {greeting}\t\n")));
        }
    }

    #[test]
    fn weather_question_goes_remote() {
        assert!(!is_locally_answerable("What is the weather today?"));
    }

    #[test]
    fn sos_button_question_is_an_app_phrase() {
        assert_eq!(
            classify_local("how do I use the SOS button"),
            Some(LocalMatch::AppPhrase)
        );
    }

    #[test]
    fn contextual_keyword_needs_context_token() {
        assert!(!is_locally_answerable("emergency numbers in spain"));
        assert_eq!(
            classify_local("emergency numbers in this country"),
            Some(LocalMatch::Greeting)
        );
        assert_eq!(
            classify_local("sos here?"),
            Some(LocalMatch::ContextualKeyword)
        );
    }

    #[test]
    fn feature_questions_are_local() {
        assert_eq!(
            classify_local("How does GPS work"),
            Some(LocalMatch::FeatureQuestion)
        );
    }

    #[test]
    fn closings_are_local() {
        assert_eq!(classify_local("Goodbye!"), Some(LocalMatch::Closing));
    }

    #[test]
    fn substring_mode_keeps_embedded_matches() {
        assert_eq!(
            classify_local("what is a sospect"),
            Some(LocalMatch::ContextualKeyword)
        );
        assert_eq!(classify_local("is it real"), None);
        assert_eq!(classify_local("is this real"), Some(LocalMatch::Greeting));
    }

    #[test]
    fn whole_word_mode_drops_embedded_matches() {
        let classifier = Classifier::with_mode(MatchMode::WholeWord);
        assert!(!classifier.is_locally_answerable("what is a sospect"));
        assert!(!classifier.is_locally_answerable("is this real"));
        assert!(classifier.is_locally_answerable("hi there"));
        assert!(classifier.is_locally_answerable("what does sos do"));
    }

    #[test]
    fn word_patterns_cover_every_table_keyword() {
        for needle in GREETING_TOKENS
            .iter()
            .chain(APP_PHRASES)
            .chain(CONTEXTUAL_KEYWORDS)
            .chain(["privacy", "battery", "see you", "map"].iter())
        {
            assert!(WORD_PATTERNS.contains_key(needle), "{needle}");
        }
        assert!(contains("call the police now", "police", MatchMode::WholeWord));
        assert!(!contains("policeman", "police", MatchMode::WholeWord));
    }
}
