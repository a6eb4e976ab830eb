use log::debug;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::expand::{DEFAULT_MAX_EXPANSION_PASSES, expand_with_limit};
use crate::grammar::{Grammar, ROOTS};
use crate::prune::prune;
use crate::utils::{GrammarError, GrammarValidator, PossessiveValidator, Result};

/// Configuration options for generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Maximum output length in characters
    pub max_len: usize,
    /// Number of root draws before giving up with `GenerationFailure`
    pub max_attempts: usize,
    /// Maximum expansion passes per attempt (guards against cyclic grammars)
    pub max_expansion_passes: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            max_len: 140,
            max_attempts: 100,
            max_expansion_passes: DEFAULT_MAX_EXPANSION_PASSES,
        }
    }
}

/// A finished text together with the number of attempts it took
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    pub attempts: usize,
}

/// Produces length-bounded texts from a grammar
#[derive(Debug, Clone)]
pub struct Generator {
    grammar: Grammar,
    config: GeneratorConfig,
    validator: Box<dyn GrammarValidator>,
}

impl Generator {
    /// Create a generator with the default configuration and the
    /// possessive-plural fix as post-processor
    pub fn new(grammar: Grammar) -> Self {
        Self::with_config(grammar, GeneratorConfig::default())
    }

    /// Create a generator with a custom configuration
    pub fn with_config(grammar: Grammar, config: GeneratorConfig) -> Self {
        Generator {
            grammar,
            config,
            validator: Box::new(PossessiveValidator),
        }
    }

    /// Replace the post-processor applied to expanded text before pruning
    pub fn with_validator(mut self, validator: Box<dyn GrammarValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Generate one text within the configured `max_len`
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<String> {
        self.generate_with_len(rng, self.config.max_len)
    }

    /// Generate one text within `max_len` characters
    pub fn generate_with_len<R: Rng + ?Sized>(&self, rng: &mut R, max_len: usize) -> Result<String> {
        Ok(self.generate_detailed(rng, max_len)?.text)
    }

    /// Generate one text, also reporting how many attempts were needed
    pub fn generate_detailed<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        max_len: usize,
    ) -> Result<Generation> {
        run(&self.grammar, &self.config, self.validator.as_ref(), max_len, rng)
    }

    /// Get a reference to the grammar
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Get a reference to the generator's configuration
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Set a new configuration
    pub fn set_config(&mut self, config: GeneratorConfig) {
        self.config = config;
    }

    /// Name of the active post-processor
    pub fn validator_name(&self) -> &str {
        self.validator.name()
    }
}

/// Generate one text within `max_len` characters using the default settings
pub fn generate<R: Rng + ?Sized>(grammar: &Grammar, max_len: usize, rng: &mut R) -> Result<String> {
    let config = GeneratorConfig {
        max_len,
        ..GeneratorConfig::default()
    };
    Ok(run(grammar, &config, &PossessiveValidator, max_len, rng)?.text)
}

fn run<R: Rng + ?Sized>(
    grammar: &Grammar,
    config: &GeneratorConfig,
    validator: &dyn GrammarValidator,
    max_len: usize,
    rng: &mut R,
) -> Result<Generation> {
    if max_len == 0 {
        return Err(GrammarError::InvalidLength(max_len));
    }
    if config.max_attempts == 0 {
        return Err(GrammarError::InvalidConfig(
            "max_attempts must be at least 1".to_string(),
        ));
    }

    let roots = grammar
        .roots()
        .ok_or_else(|| GrammarError::UnknownCategory(ROOTS.to_string()))?;

    for attempt in 1..=config.max_attempts {
        let root = roots
            .choose(rng)
            .ok_or_else(|| GrammarError::EmptyCategory(ROOTS.to_string()))?;

        let expanded = match expand_with_limit(root, grammar, rng, config.max_expansion_passes) {
            Ok(expanded) => expanded,
            Err(GrammarError::ExpansionLimit(passes)) => {
                debug!("attempt {} still had tokens after {} passes", attempt, passes);
                continue;
            }
            Err(e) => return Err(e),
        };
        let fixed = if validator.applies_to(&expanded) {
            validator.validate(&expanded)
        } else {
            expanded
        };

        let pruned = prune(&fixed, max_len, rng);
        let len = pruned.chars().count();
        if len <= max_len {
            debug!("generated {} characters on attempt {}", len, attempt);
            return Ok(Generation {
                text: capitalize_first(&pruned),
                attempts: attempt,
            });
        }

        debug!(
            "attempt {} left {} characters, over the {} character budget",
            attempt, len, max_len
        );
    }

    Err(GrammarError::GenerationFailure {
        attempts: config.max_attempts,
        max_len,
    })
}

/// Uppercase the first character, leaving the rest untouched
pub fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarBuilder;
    use crate::utils::NoopValidator;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn greeting(name: &str) -> Grammar {
        GrammarBuilder::new()
            .add_root(&["Hello #name#<, friend>!"])
            .add_rule("name", &[name])
            .build()
    }

    #[test]
    fn test_short_name_keeps_span() {
        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(
            generate(&greeting("Sam"), 20, &mut rng).unwrap(),
            "Hello Sam, friend!"
        );
    }

    #[test]
    fn test_long_name_drops_span() {
        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(
            generate(&greeting("Alexandria"), 20, &mut rng).unwrap(),
            "Hello Alexandria!"
        );
    }

    #[test]
    fn test_capitalizes_first_character() {
        let grammar = GrammarBuilder::new()
            .add_root(&["#who# <quietly >sips tea"])
            .add_rule("who", &["the otter", "élodie"])
            .build();
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let text = generate(&grammar, 140, &mut rng).unwrap();
            assert!(
                text == "The otter quietly sips tea" || text == "Élodie quietly sips tea",
                "unexpected {:?}",
                text
            );
        }
    }

    #[test]
    fn test_capitalize_first() {
        assert_eq!(capitalize_first(""), "");
        assert_eq!(capitalize_first("a"), "A");
        assert_eq!(capitalize_first("already Upper"), "Already Upper");
        assert_eq!(capitalize_first("ñandu"), "Ñandu");
    }

    #[test]
    fn test_possessive_fix_applied_by_default() {
        let grammar = GrammarBuilder::new()
            .add_root(&["the #group#'s table"])
            .add_rule("group", &["regulars"])
            .build();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            Generator::new(grammar.clone()).generate(&mut rng).unwrap(),
            "The regulars' table"
        );

        let plain = Generator::new(grammar).with_validator(Box::new(NoopValidator));
        assert_eq!(plain.generate(&mut rng).unwrap(), "The regulars's table");
    }

    #[test]
    fn test_retries_until_a_root_fits() {
        let grammar = GrammarBuilder::new()
            .add_root(&["this root can never fit in the budget", "fits"])
            .build();
        let generator = Generator::new(grammar);

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let generation = generator.generate_detailed(&mut rng, 10).unwrap();
            assert_eq!(generation.text, "Fits");
            assert!(generation.attempts >= 1);
        }
    }

    #[test]
    fn test_generation_failure_after_max_attempts() {
        let grammar = GrammarBuilder::new()
            .add_root(&["far too long for the budget<, even pruned>"])
            .build();
        let config = GeneratorConfig {
            max_attempts: 3,
            ..GeneratorConfig::default()
        };
        let generator = Generator::with_config(grammar, config);
        let mut rng = StdRng::seed_from_u64(9);

        let err = generator.generate_with_len(&mut rng, 10).unwrap_err();
        assert!(matches!(
            err,
            GrammarError::GenerationFailure {
                attempts: 3,
                max_len: 10
            }
        ));
    }

    #[test]
    fn test_expansion_limit_counts_as_failed_attempt() {
        // valid grammar, but it needs two passes and only one is allowed
        let grammar = GrammarBuilder::new()
            .add_root(&["#a#"])
            .add_rule("a", &["#b#"])
            .add_rule("b", &["x"])
            .build_validated()
            .unwrap();
        let config = GeneratorConfig {
            max_attempts: 3,
            max_expansion_passes: 1,
            ..GeneratorConfig::default()
        };
        let generator = Generator::with_config(grammar, config);
        let mut rng = StdRng::seed_from_u64(0);

        let err = generator.generate(&mut rng).unwrap_err();
        assert!(matches!(
            err,
            GrammarError::GenerationFailure {
                attempts: 3,
                max_len: 140
            }
        ));
    }

    #[test]
    fn test_unlucky_recursion_never_fails_hard() {
        let grammar = GrammarBuilder::new()
            .add_root(&["#a#"])
            .add_rule("a", &["x", "#a# #a#"])
            .build_validated()
            .unwrap();
        let config = GeneratorConfig {
            max_attempts: 5,
            max_expansion_passes: 2,
            ..GeneratorConfig::default()
        };
        let generator = Generator::with_config(grammar, config);

        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            match generator.generate(&mut rng) {
                Ok(text) => assert!(text.starts_with('X'), "{:?}", text),
                Err(GrammarError::GenerationFailure { .. }) => {}
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
    }

    #[test]
    fn test_zero_attempts_is_rejected() {
        let config = GeneratorConfig {
            max_attempts: 0,
            ..GeneratorConfig::default()
        };
        let generator = Generator::with_config(greeting("Sam"), config);
        let mut rng = StdRng::seed_from_u64(0);

        let err = generator.generate(&mut rng).unwrap_err();
        assert!(matches!(err, GrammarError::InvalidConfig(_)));
    }

    #[test]
    fn test_zero_length_budget_is_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = generate(&greeting("Sam"), 0, &mut rng).unwrap_err();
        assert!(matches!(err, GrammarError::InvalidLength(0)));
    }

    #[test]
    fn test_missing_roots() {
        let grammar = GrammarBuilder::new().add_rule("name", &["Sam"]).build();
        let mut rng = StdRng::seed_from_u64(0);
        let err = generate(&grammar, 140, &mut rng).unwrap_err();
        assert!(matches!(err, GrammarError::UnknownCategory(ref n) if n == "roots"));
    }

    #[test]
    fn test_unknown_category_surfaces() {
        let grammar = GrammarBuilder::new().add_root(&["Hi #missing#"]).build();
        let mut rng = StdRng::seed_from_u64(0);
        let err = generate(&grammar, 140, &mut rng).unwrap_err();
        assert!(matches!(err, GrammarError::UnknownCategory(ref n) if n == "missing"));
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: GeneratorConfig = serde_json::from_str(r#"{"max_len": 280}"#).unwrap();
        assert_eq!(
            config,
            GeneratorConfig {
                max_len: 280,
                ..GeneratorConfig::default()
            }
        );
    }
}
