use std::fmt;
use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Custom error types for the text generator
#[derive(Error, Debug)]
pub enum GrammarError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid grammar: {0}")]
    InvalidGrammar(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Empty category: {0}")]
    EmptyCategory(String),

    #[error("Cyclic grammar: category '{0}' can never finish expanding")]
    CyclicGrammar(String),

    #[error("Expansion did not finish within {0} passes")]
    ExpansionLimit(usize),

    #[error("Generation failed: no output within {max_len} characters after {attempts} attempts")]
    GenerationFailure { attempts: usize, max_len: usize },

    #[error("Invalid length budget: {0}")]
    InvalidLength(usize),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for grammar operations
pub type Result<T> = std::result::Result<T, GrammarError>;

/// Trait for post-processing generated text
pub trait GrammarValidator: Send + Sync + fmt::Debug {
    /// Validate and potentially transform generated text
    fn validate(&self, text: &str) -> String;

    /// Get the name of this validator
    fn name(&self) -> &str;

    /// Check if this validator applies to a given text
    fn applies_to(&self, _text: &str) -> bool {
        true
    }

    /// Clone this validator as a box
    fn clone_box(&self) -> Box<dyn GrammarValidator>;
}

impl Clone for Box<dyn GrammarValidator> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Trait for creating validator chains
pub trait ValidatorExt: GrammarValidator + Sized {
    /// Chain this validator with another one
    fn chain<V: GrammarValidator + 'static>(self, other: V) -> ValidatorChain
    where
        Self: 'static,
    {
        ValidatorChain::new(Box::new(self), Box::new(other))
    }
}

impl<T: GrammarValidator + 'static> ValidatorExt for T {}

/// A chain of validators that are applied in sequence
#[derive(Debug)]
pub struct ValidatorChain {
    validators: Vec<Box<dyn GrammarValidator>>,
    name: String,
}

impl ValidatorChain {
    /// Create a new validator chain from two validators
    pub fn new(first: Box<dyn GrammarValidator>, second: Box<dyn GrammarValidator>) -> Self {
        let name = format!("{}+{}", first.name(), second.name());
        let validators = vec![first, second];
        ValidatorChain { validators, name }
    }

    /// Build a chain from any number of boxed validators.
    ///
    /// An empty list yields a chain named `noop` that leaves text untouched.
    pub fn from_boxed(validators: Vec<Box<dyn GrammarValidator>>) -> Self {
        let name = if validators.is_empty() {
            "noop".to_string()
        } else {
            validators
                .iter()
                .map(|v| v.name())
                .collect::<Vec<_>>()
                .join("+")
        };
        ValidatorChain { validators, name }
    }

    /// Add another validator to the chain
    pub fn add<V: GrammarValidator + 'static>(mut self, validator: V) -> Self {
        self.name = format!("{}+{}", self.name, validator.name());
        self.validators.push(Box::new(validator));
        self
    }
}

impl GrammarValidator for ValidatorChain {
    fn validate(&self, text: &str) -> String {
        let mut result = text.to_string();
        for validator in &self.validators {
            if validator.applies_to(&result) {
                result = validator.validate(&result);
            }
        }
        result
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn clone_box(&self) -> Box<dyn GrammarValidator> {
        let cloned = self.validators.iter().map(|v| v.clone_box()).collect();
        Box::new(ValidatorChain {
            validators: cloned,
            name: self.name.clone(),
        })
    }
}

/// A no-op validator that performs no changes
#[derive(Debug, Clone)]
pub struct NoopValidator;

impl GrammarValidator for NoopValidator {
    fn validate(&self, text: &str) -> String {
        text.to_string()
    }

    fn name(&self) -> &str {
        "noop"
    }

    fn clone_box(&self) -> Box<dyn GrammarValidator> {
        Box::new(self.clone())
    }
}

/// Collapses the possessive-plural artifact `s's` into `s'`.
///
/// Grammars often append `'s` to a category whose candidates may already be
/// plural ("the cats" + "'s"), so the fix runs on the fully expanded text.
#[derive(Debug, Clone)]
pub struct PossessiveValidator;

impl GrammarValidator for PossessiveValidator {
    fn validate(&self, text: &str) -> String {
        text.replace("s's", "s'")
    }

    fn name(&self) -> &str {
        "possessive"
    }

    fn applies_to(&self, text: &str) -> bool {
        text.contains("s's")
    }

    fn clone_box(&self) -> Box<dyn GrammarValidator> {
        Box::new(self.clone())
    }
}

/// Collapses runs of spaces and trims the ends.
///
/// Handy for grammars whose candidates carry their own padding, where a
/// token next to a space-prefixed candidate yields a double space.
#[derive(Debug, Clone)]
pub struct WhitespaceValidator;

impl GrammarValidator for WhitespaceValidator {
    fn validate(&self, text: &str) -> String {
        let mut result = String::with_capacity(text.len());
        let mut last_was_space = false;
        for c in text.trim().chars() {
            if c == ' ' {
                if !last_was_space {
                    result.push(c);
                }
                last_was_space = true;
            } else {
                result.push(c);
                last_was_space = false;
            }
        }
        result
    }

    fn name(&self) -> &str {
        "whitespace"
    }

    fn clone_box(&self) -> Box<dyn GrammarValidator> {
        Box::new(self.clone())
    }
}

/// Create the possessive-plural fix applied by default
pub fn possessive_validator() -> Box<dyn GrammarValidator> {
    Box::new(PossessiveValidator)
}

/// Create a whitespace-collapsing validator
pub fn whitespace_validator() -> Box<dyn GrammarValidator> {
    Box::new(WhitespaceValidator)
}

/// Create a no-op validator that doesn't change the input
pub fn noop_validator() -> Box<dyn GrammarValidator> {
    Box::new(NoopValidator)
}

/// Registry for managing and retrieving validators
#[derive(Debug, Clone, Default)]
pub struct ValidatorRegistry {
    validators: Vec<(String, Arc<Box<dyn GrammarValidator>>)>,
}

impl ValidatorRegistry {
    /// Create a new empty validator registry
    pub fn new() -> Self {
        ValidatorRegistry {
            validators: Vec::new(),
        }
    }

    /// Register a validator with a name
    pub fn register<V: GrammarValidator + 'static>(
        &mut self,
        name: &str,
        validator: V,
    ) -> &mut Self {
        self.validators
            .push((name.to_string(), Arc::new(Box::new(validator))));
        self
    }

    /// Get a validator by name
    pub fn get(&self, name: &str) -> Option<Arc<Box<dyn GrammarValidator>>> {
        self.validators
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| Arc::clone(v))
    }

    /// Build a chain out of registered validators, in the order given.
    pub fn chain_of(&self, names: &[String]) -> Result<ValidatorChain> {
        let mut boxed = Vec::with_capacity(names.len());
        for name in names {
            let validator = self.get(name).ok_or_else(|| {
                GrammarError::InvalidGrammar(format!(
                    "unknown fixer '{}', expected one of: {}",
                    name,
                    self.list_validators().join(", ")
                ))
            })?;
            boxed.push(validator.clone_box());
        }
        Ok(ValidatorChain::from_boxed(boxed))
    }

    /// Get a list of all registered validator names
    pub fn list_validators(&self) -> Vec<String> {
        self.validators
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Register common built-in validators
    pub fn register_defaults(&mut self) -> &mut Self {
        self.register("noop", NoopValidator)
            .register("possessive", PossessiveValidator)
            .register("whitespace", WhitespaceValidator)
    }
}

/// Create a default validator registry with common validators
pub fn default_validator_registry() -> ValidatorRegistry {
    let mut registry = ValidatorRegistry::new();
    registry.register_defaults();
    registry
}
