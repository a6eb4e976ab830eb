//! Pulp Cafe is a grammar-based generator for short texts.
//!
//! A grammar maps category names to candidate fragments. Fragments may hold
//! `#name#` expansion tokens, replaced by a random candidate of that
//! category, and `<...>` prune spans, optional text that is dropped at random
//! until the result fits a length budget.
//!
//! # Example
//!
//! ```rust
//! use pulp_cafe::{Grammar, Generator};
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! let grammar = Grammar::from_json_str(
//!     r#"{"roots": ["Hello #name#<, friend>!"], "name": ["Alexandria"]}"#,
//! )?;
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let generator = Generator::new(grammar);
//! let text = generator.generate_with_len(&mut rng, 20)?;
//! assert_eq!(text, "Hello Alexandria!");
//! # Ok::<(), pulp_cafe::GrammarError>(())
//! ```

pub mod expand;
pub mod generate;
pub mod grammar;
pub mod prune;
pub mod utils;

pub use expand::{expand, expand_with_limit};
pub use generate::{Generation, Generator, GeneratorConfig, capitalize_first, generate};
pub use grammar::{Grammar, GrammarBuilder, ROOTS};
pub use prune::{effective_len, prune, prune_spans, strip_delimiters};
pub use utils::{GrammarError, GrammarValidator, PossessiveValidator, Result};
