use pulp_cafe::{Generator, Grammar, GrammarError};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::error::Error;

/// Generate a few texts from the bundled cafe grammar under shrinking budgets
fn main() -> Result<(), Box<dyn Error>> {
    let grammar = Grammar::from_file("grammars/cafe.json")?;

    for warning in grammar.lint() {
        println!("lint: {}", warning);
    }

    let generator = Generator::new(grammar);
    let mut rng = StdRng::seed_from_u64(140);

    for max_len in [140, 80, 50, 30] {
        println!("\n=== Up to {} characters ===", max_len);
        for i in 1..=3 {
            match generator.generate_with_len(&mut rng, max_len) {
                Ok(text) => println!("{}. {}", i, text),
                Err(e @ GrammarError::GenerationFailure { .. }) => println!("{}. ({})", i, e),
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(())
}
