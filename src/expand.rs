use log::trace;
use rand::Rng;
use rand::seq::SliceRandom;

use crate::grammar::Grammar;
use crate::utils::{GrammarError, Result};

/// Number of expansion passes allowed before a fragment is considered cyclic
pub const DEFAULT_MAX_EXPANSION_PASSES: usize = 64;

/// Resolve every `#name#` token in `fragment` with random candidates.
///
/// Each pass collects the tokens present at the start of the pass and, for
/// each one, replaces the first remaining occurrence of that token text with
/// an independent uniform draw from the category. Candidates may introduce
/// new tokens, which the next pass picks up.
pub fn expand<R: Rng + ?Sized>(fragment: &str, grammar: &Grammar, rng: &mut R) -> Result<String> {
    expand_with_limit(fragment, grammar, rng, DEFAULT_MAX_EXPANSION_PASSES)
}

/// Like [`expand`], failing with [`GrammarError::ExpansionLimit`] when tokens
/// remain after `max_passes` passes.
pub fn expand_with_limit<R: Rng + ?Sized>(
    fragment: &str,
    grammar: &Grammar,
    rng: &mut R,
    max_passes: usize,
) -> Result<String> {
    let mut out = fragment.to_string();
    let mut passes = 0;

    loop {
        let names: Vec<String> = Grammar::tokens(&out).map(str::to_string).collect();
        if names.is_empty() {
            trace!("expansion finished after {} passes", passes);
            return Ok(out);
        }
        if passes >= max_passes {
            return Err(GrammarError::ExpansionLimit(max_passes));
        }
        passes += 1;

        for name in &names {
            let replacement = pick(grammar, name, rng)?;
            let token = format!("#{}#", name);
            if let Some(pos) = out.find(&token) {
                out.replace_range(pos..pos + token.len(), replacement);
            }
        }
        trace!("pass {}: resolved {} tokens", passes, names.len());
    }
}

/// Draw one candidate of `category` uniformly at random
fn pick<'g, R: Rng + ?Sized>(grammar: &'g Grammar, category: &str, rng: &mut R) -> Result<&'g str> {
    let candidates = grammar
        .candidates(category)
        .ok_or_else(|| GrammarError::UnknownCategory(category.to_string()))?;
    candidates
        .choose(rng)
        .map(|c| c.as_str())
        .ok_or_else(|| GrammarError::EmptyCategory(category.to_string()))
}
