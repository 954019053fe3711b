//! Target name extraction from free-form requests.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Name used when a request names no target.
pub const UNKNOWN_TARGET: &str = "UnknownAgent";

/// How target names are found in request text.
///
/// Tokens are scanned in order. A token equal to a keyword names the token after
/// it. Otherwise a token ending in a name suffix names itself. The first hit wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionPolicy {
    /// Lowercase words that introduce a target name.
    pub keywords: Vec<String>,
    /// Lowercase suffixes that mark a token as a target name.
    pub name_suffixes: Vec<String>,
    /// Name used when nothing matches.
    pub fallback: String,
}

impl Default for ExtractionPolicy {
    fn default() -> Self {
        Self {
            keywords: ["agent", "for", "productionagent", "processor"]
                .into_iter()
                .map(String::from)
                .collect(),
            name_suffixes: vec!["agent".to_string()],
            fallback: UNKNOWN_TARGET.to_string(),
        }
    }
}

impl ExtractionPolicy {
    /// Checks that the fallback is set and every keyword and suffix is a
    /// non-empty lowercase word.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPolicy`] describing the problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fallback.trim().is_empty() {
            return Err(ConfigError::invalid_policy("extraction fallback must not be empty"));
        }
        for word in self.keywords.iter().chain(&self.name_suffixes) {
            if word.is_empty() || word.chars().any(char::is_whitespace) {
                return Err(ConfigError::invalid_policy(format!(
                    "extraction word {word:?} must be a single non-empty word"
                )));
            }
            if word.to_lowercase() != *word {
                return Err(ConfigError::invalid_policy(format!(
                    "extraction word {word:?} must be lowercase"
                )));
            }
        }
        Ok(())
    }
}

/// Target of a request, and whether the request actually named it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedTarget {
    /// Found in the request text.
    Named(String),
    /// Nothing matched; carries the policy fallback.
    Fallback(String),
}

impl ResolvedTarget {
    /// Returns true if no name was found.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }

    /// Returns the target name.
    #[must_use]
    pub fn into_name(self) -> String {
        match self {
            Self::Named(name) | Self::Fallback(name) => name,
        }
    }
}

/// Finds target names in request text.
#[derive(Debug, Clone, Default)]
pub struct TargetExtractor {
    policy: ExtractionPolicy,
}

impl TargetExtractor {
    /// Creates an extractor for `policy`.
    #[must_use]
    pub const fn new(policy: ExtractionPolicy) -> Self {
        Self { policy }
    }

    /// Returns the policy.
    #[must_use]
    pub const fn policy(&self) -> &ExtractionPolicy {
        &self.policy
    }

    /// Returns the capitalized target name in `text`, if any.
    #[must_use]
    pub fn extract(&self, text: &str) -> Option<String> {
        let tokens: Vec<&str> = text
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|t| !t.is_empty())
            .collect();

        for (i, token) in tokens.iter().enumerate() {
            let lower = token.to_lowercase();
            if self.policy.keywords.contains(&lower) {
                if let Some(next) = tokens.get(i + 1) {
                    return Some(capitalize(next));
                }
            }
            if self
                .policy
                .name_suffixes
                .iter()
                .any(|suffix| lower.len() > suffix.len() && lower.ends_with(suffix.as_str()))
            {
                return Some(capitalize(token));
            }
        }
        None
    }

    /// Returns the target name in `text`, or the policy fallback.
    #[must_use]
    pub fn resolve(&self, text: &str) -> ResolvedTarget {
        self.extract(text).map_or_else(
            || ResolvedTarget::Fallback(self.policy.fallback.clone()),
            ResolvedTarget::Named,
        )
    }
}

/// First character uppercase, the rest lowercase.
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("Monitor PaymentAgent for reliability issues", Some("Paymentagent") ; "suffix before keyword")]
    #[test_case("Generate SLA report for checkout", Some("Checkout") ; "keyword names next token")]
    #[test_case("recover agent billing now", Some("Billing") ; "bare keyword agent")]
    #[test_case("Analyze traces for InventoryAgent.", Some("Inventoryagent") ; "trailing punctuation")]
    #[test_case("check processor 'orders'", Some("Orders") ; "quoted name")]
    #[test_case("monitor everything", None ; "no hit")]
    #[test_case("gibberish", None ; "single word")]
    #[test_case("", None ; "empty")]
    #[test_case("status for", None ; "keyword at end")]
    fn default_policy(text: &str, expected: Option<&str>) {
        assert_eq!(TargetExtractor::default().extract(text).as_deref(), expected);
    }

    #[test]
    fn fallback_name() {
        let extractor = TargetExtractor::default();
        let resolved = extractor.resolve("gibberish");
        assert!(resolved.is_fallback());
        assert_eq!(resolved.into_name(), UNKNOWN_TARGET);
    }

    #[test]
    fn named_target_matching_fallback_is_still_named() {
        let extractor = TargetExtractor::new(ExtractionPolicy {
            fallback: "Billing".to_string(),
            ..ExtractionPolicy::default()
        });
        let resolved = extractor.resolve("recover agent billing");
        assert_eq!(resolved, ResolvedTarget::Named("Billing".to_string()));
        assert!(!resolved.is_fallback());
    }

    #[test]
    fn custom_policy() {
        let policy = ExtractionPolicy {
            keywords: vec!["service".to_string()],
            name_suffixes: vec!["bot".to_string()],
            fallback: "Unnamed".to_string(),
        };
        assert!(policy.validate().is_ok());
        let extractor = TargetExtractor::new(policy);
        assert_eq!(extractor.extract("restart service LEDGER").as_deref(), Some("Ledger"));
        assert_eq!(extractor.extract("ping SupportBot").as_deref(), Some("Supportbot"));
        assert_eq!(
            extractor.resolve("Monitor PaymentAgent"),
            ResolvedTarget::Fallback("Unnamed".to_string())
        );
    }

    #[test]
    fn capitalization() {
        assert_eq!(capitalize("pAYMENT"), "Payment");
        assert_eq!(capitalize("x"), "X");
        assert_eq!(capitalize(""), "");
    }

    #[test_case(ExtractionPolicy { fallback: " ".into(), ..ExtractionPolicy::default() } ; "blank fallback")]
    #[test_case(ExtractionPolicy { keywords: vec!["For".into()], ..ExtractionPolicy::default() } ; "uppercase keyword")]
    #[test_case(ExtractionPolicy { name_suffixes: vec![String::new()], ..ExtractionPolicy::default() } ; "empty suffix")]
    fn invalid_policies(policy: ExtractionPolicy) {
        assert!(matches!(policy.validate(), Err(ConfigError::InvalidPolicy { .. })));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn extracted_names_are_capitalized(text in "[A-Za-z ,.!]{0,64}") {
                if let Some(name) = TargetExtractor::default().extract(&text) {
                    let mut chars = name.chars();
                    let first = chars.next();
                    prop_assert!(first.is_some_and(|c| !c.is_lowercase()));
                    prop_assert!(chars.all(|c| !c.is_uppercase()));
                }
            }
        }
    }
}
