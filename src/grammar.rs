use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::prune::prune_spans;
use crate::utils::{GrammarError, Result};

/// Name of the category that generation starts from
pub const ROOTS: &str = "roots";

static TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();

/// Matches `#name#` expansion tokens, capturing the category name.
pub(crate) fn token_regex() -> &'static Regex {
    TOKEN_REGEX.get_or_init(|| Regex::new(r"#([A-Za-z0-9_]*)#").unwrap())
}

/// A mapping from category names to candidate fragments.
///
/// Serialises as a plain JSON object, e.g.
/// `{"roots": ["Hello #name#!"], "name": ["Sam", "Alex"]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grammar {
    rules: BTreeMap<String, Vec<String>>,
}

impl Grammar {
    /// Create a new empty grammar
    pub fn new() -> Self {
        Grammar {
            rules: BTreeMap::new(),
        }
    }

    /// Parse and validate a grammar from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("loading grammar from {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Parse and validate a grammar from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let grammar: Grammar = serde_json::from_str(json)?;
        grammar.validate()?;
        debug!("loaded grammar with {} categories", grammar.rules.len());
        Ok(grammar)
    }

    /// Append candidates to a category, creating it if needed
    pub fn add_rule(&mut self, category: &str, candidates: &[&str]) -> &mut Self {
        self.rules
            .entry(category.to_string())
            .or_default()
            .extend(candidates.iter().map(|c| c.to_string()));
        self
    }

    /// Category names referenced by expansion tokens in `fragment`, left to right
    pub fn tokens(fragment: &str) -> impl Iterator<Item = &str> {
        token_regex()
            .captures_iter(fragment)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    /// Check the grammar once, before any generation.
    ///
    /// Fails on empty category names, a missing `roots` category, categories
    /// without candidates, tokens naming unknown categories, and categories
    /// reachable from `roots` that can never finish expanding. Categories are
    /// visited in sorted order so the reported error is stable.
    pub fn validate(&self) -> Result<()> {
        if self.rules.contains_key("") {
            return Err(GrammarError::InvalidGrammar(
                "category names must not be empty".to_string(),
            ));
        }

        if !self.rules.contains_key(ROOTS) {
            return Err(GrammarError::UnknownCategory(ROOTS.to_string()));
        }

        for (name, candidates) in &self.rules {
            if candidates.is_empty() {
                return Err(GrammarError::EmptyCategory(name.clone()));
            }
        }

        for candidates in self.rules.values() {
            for candidate in candidates {
                for token in Self::tokens(candidate) {
                    if !self.rules.contains_key(token) {
                        return Err(GrammarError::UnknownCategory(token.to_string()));
                    }
                }
            }
        }

        let productive = self.productive_categories();
        if let Some(stuck) = self
            .reachable_from(ROOTS)
            .into_iter()
            .find(|name| !productive.contains(name))
        {
            return Err(GrammarError::CyclicGrammar(stuck.to_string()));
        }

        Ok(())
    }

    /// Non-fatal findings about the grammar, one message per finding
    pub fn lint(&self) -> Vec<String> {
        let mut findings = Vec::new();

        let reachable = self.reachable_from(ROOTS);
        for name in self.rules.keys() {
            if name != ROOTS && !reachable.contains(name.as_str()) {
                findings.push(format!("category '{}' is never reached from roots", name));
            }
        }

        for (name, candidates) in &self.rules {
            if candidates
                .iter()
                .any(|c| Self::tokens(c).any(|t| t == name.as_str()))
            {
                findings.push(format!("category '{}' references itself", name));
            }

            for (idx, candidate) in candidates.iter().enumerate() {
                let mut rest = candidate.clone();
                for span in prune_spans(candidate).into_iter().rev() {
                    rest.replace_range(span, "");
                }
                if rest.contains('<') {
                    findings.push(format!(
                        "'{}' candidate {} has a '<' that never closes: {:?}",
                        name, idx, candidate
                    ));
                }
                if rest.contains('>') {
                    findings.push(format!(
                        "'{}' candidate {} has a stray '>': {:?}",
                        name, idx, candidate
                    ));
                }
            }
        }

        findings
    }

    /// Categories that have at least one candidate whose tokens can all
    /// finish expanding.
    fn productive_categories(&self) -> BTreeSet<&str> {
        let mut productive = BTreeSet::new();
        loop {
            let mut changed = false;
            for (name, candidates) in &self.rules {
                if productive.contains(name.as_str()) {
                    continue;
                }
                if candidates
                    .iter()
                    .any(|c| Self::tokens(c).all(|t| productive.contains(t)))
                {
                    productive.insert(name.as_str());
                    changed = true;
                }
            }
            if !changed {
                return productive;
            }
        }
    }

    /// Every known category reachable from `start`, including `start` itself
    fn reachable_from<'a>(&'a self, start: &'a str) -> BTreeSet<&'a str> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::new();
        if self.rules.contains_key(start) {
            seen.insert(start);
            queue.push_back(start);
        }

        while let Some(name) = queue.pop_front() {
            for candidate in &self.rules[name] {
                for token in Self::tokens(candidate) {
                    if self.rules.contains_key(token) && seen.insert(token) {
                        queue.push_back(token);
                    }
                }
            }
        }

        seen
    }

    /// Generate one capitalised text within `max_len` characters, using the
    /// thread-local random source and the default generator settings
    pub fn generate(&self, max_len: usize) -> Result<String> {
        crate::generate::generate(self, max_len, &mut rand::thread_rng())
    }

    /// Candidates of a category
    pub fn candidates(&self, category: &str) -> Option<&[String]> {
        self.rules.get(category).map(|c| c.as_slice())
    }

    /// Candidates of the `roots` category
    pub fn roots(&self) -> Option<&[String]> {
        self.candidates(ROOTS)
    }

    /// Check if the grammar contains a specific category
    pub fn has_category(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Category names in sorted order
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(|k| k.as_str())
    }

    /// Get a reference to the grammar's rules
    pub fn rules(&self) -> &BTreeMap<String, Vec<String>> {
        &self.rules
    }
}

/// Builder for constructing Grammar instances
#[derive(Debug, Default)]
pub struct GrammarBuilder {
    grammar: Grammar,
}

impl GrammarBuilder {
    /// Create a new grammar builder
    pub fn new() -> Self {
        GrammarBuilder {
            grammar: Grammar::new(),
        }
    }

    /// Add candidates to a category
    pub fn add_rule(mut self, category: &str, candidates: &[&str]) -> Self {
        self.grammar.add_rule(category, candidates);
        self
    }

    /// Add candidates to the `roots` category
    pub fn add_root(self, candidates: &[&str]) -> Self {
        self.add_rule(ROOTS, candidates)
    }

    /// Build the grammar without validating it
    pub fn build(self) -> Grammar {
        self.grammar
    }

    /// Build the grammar, running the same checks as the loaders
    pub fn build_validated(self) -> Result<Grammar> {
        self.grammar.validate()?;
        Ok(self.grammar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tokens_in_order() {
        let tokens: Vec<&str> =
            Grammar::tokens("#greeting#, #name#! Have a #drink# #name#.").collect();
        assert_eq!(tokens, vec!["greeting", "name", "drink", "name"]);
    }

    #[test]
    fn test_tokens_skip_non_word_names() {
        // "#a b#" is not a token, and the scan resumes at the second '#'
        let tokens: Vec<&str> = Grammar::tokens("#a b# #c#").collect();
        assert_eq!(tokens, vec!["c"]);

        let tokens: Vec<&str> = Grammar::tokens("##").collect();
        assert_eq!(tokens, vec![""]);
    }

    #[test]
    fn test_from_json_str() {
        let grammar = Grammar::from_json_str(
            r#"{"roots": ["Hello #name#<, friend>!"], "name": ["Sam", "Alex"]}"#,
        )
        .unwrap();

        assert!(grammar.has_category("name"));
        assert_eq!(grammar.roots().unwrap(), ["Hello #name#<, friend>!"]);
        assert_eq!(grammar.candidates("name").unwrap().len(), 2);
        assert_eq!(grammar.categories().collect::<Vec<_>>(), vec!["name", "roots"]);
    }

    #[test]
    fn test_invalid_json() {
        let err = Grammar::from_json_str(r#"{"roots": "not a list"}"#).unwrap_err();
        assert!(matches!(err, GrammarError::Json(_)));
    }

    #[test]
    fn test_missing_roots() {
        let err = Grammar::from_json_str(r#"{"name": ["Sam"]}"#).unwrap_err();
        assert!(matches!(err, GrammarError::UnknownCategory(ref n) if n == "roots"));
    }

    #[test]
    fn test_unknown_category() {
        let grammar = GrammarBuilder::new()
            .add_root(&["Hi #missing#"])
            .build();
        let err = grammar.validate().unwrap_err();
        assert!(matches!(err, GrammarError::UnknownCategory(ref n) if n == "missing"));
    }

    #[test]
    fn test_empty_category() {
        let err =
            Grammar::from_json_str(r##"{"roots": ["#drink#"], "drink": []}"##).unwrap_err();
        assert!(matches!(err, GrammarError::EmptyCategory(ref n) if n == "drink"));
    }

    #[test]
    fn test_empty_category_name() {
        let err = Grammar::from_json_str(r###"{"roots": ["##"], "": ["x"]}"###).unwrap_err();
        assert!(matches!(err, GrammarError::InvalidGrammar(_)));
    }

    #[test]
    fn test_terminating_recursion_is_valid() {
        let grammar = GrammarBuilder::new()
            .add_root(&["#list#"])
            .add_rule("list", &["tea", "tea and #list#"])
            .build_validated();
        assert!(grammar.is_ok());
    }

    #[test]
    fn test_unproductive_cycle_is_rejected() {
        let grammar = GrammarBuilder::new()
            .add_root(&["#a#"])
            .add_rule("a", &["<#b#>"])
            .add_rule("b", &["#a# again"])
            .build();

        let err = grammar.validate().unwrap_err();
        assert!(matches!(err, GrammarError::CyclicGrammar(ref n) if n == "a"));
    }

    #[test]
    fn test_unreachable_cycle_is_not_an_error() {
        let grammar = GrammarBuilder::new()
            .add_root(&["plain"])
            .add_rule("loop", &["#loop#"])
            .build();

        assert!(grammar.validate().is_ok());
        assert!(
            grammar
                .lint()
                .contains(&"category 'loop' is never reached from roots".to_string())
        );
    }

    #[test]
    fn test_lint_findings() {
        let grammar = GrammarBuilder::new()
            .add_root(&["#item#<, please>", "a <broken span", "done> twice"])
            .add_rule("item", &["scone", "#item# and scone"])
            .add_rule("spare", &["unused"])
            .build();

        let findings = grammar.lint();
        assert_eq!(
            findings,
            vec![
                "category 'spare' is never reached from roots".to_string(),
                "category 'item' references itself".to_string(),
                "'roots' candidate 1 has a '<' that never closes: \"a <broken span\"".to_string(),
                "'roots' candidate 2 has a stray '>': \"done> twice\"".to_string(),
            ]
        );
    }

    #[test]
    fn test_add_rule_appends() {
        let mut grammar = Grammar::new();
        grammar.add_rule("drink", &["tea"]).add_rule("drink", &["coffee"]);
        assert_eq!(grammar.candidates("drink").unwrap(), ["tea", "coffee"]);
    }

    #[test]
    fn test_serialises_as_plain_object() {
        let grammar = GrammarBuilder::new()
            .add_root(&["#drink#"])
            .add_rule("drink", &["tea"])
            .build();
        let json = serde_json::to_string(&grammar).unwrap();
        assert_eq!(json, r##"{"drink":["tea"],"roots":["#drink#"]}"##);
    }
}
