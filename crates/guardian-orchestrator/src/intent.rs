//! Request intent classification.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What a request asks the orchestrator to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// Health and anomaly check.
    Monitor,
    /// Reliability score and SLA compliance.
    Report,
    /// Run the recovery pipeline.
    Recover,
    /// Trace pattern analysis.
    Analyze,
    /// List capabilities.
    Help,
}

impl Intent {
    /// Returns the string representation of this intent.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Monitor => "monitor",
            Self::Report => "report",
            Self::Recover => "recover",
            Self::Analyze => "analyze",
            Self::Help => "help",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keywords that select an intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentRule {
    /// Intent selected by the rule.
    pub intent: Intent,
    /// Lowercase substrings, any of which selects the intent.
    pub keywords: Vec<String>,
}

/// Ordered rule list; the first rule with a matching keyword wins.
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    rules: Vec<IntentRule>,
}

impl Default for IntentClassifier {
    fn default() -> Self {
        let rule = |intent, keywords: &[&str]| IntentRule {
            intent,
            keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
        };
        Self {
            rules: vec![
                rule(Intent::Monitor, &["monitor"]),
                rule(Intent::Report, &["report", "sla"]),
                rule(Intent::Recover, &["recover"]),
                rule(Intent::Analyze, &["analyze", "trace"]),
            ],
        }
    }
}

impl IntentClassifier {
    /// Creates the default classifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the rules in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[IntentRule] {
        &self.rules
    }

    /// Classifies `text`; anything unmatched is [`Intent::Help`].
    #[must_use]
    pub fn classify(&self, text: &str) -> Intent {
        let lower = text.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| lower.contains(k.as_str())))
            .map_or(Intent::Help, |rule| rule.intent)
    }
}
