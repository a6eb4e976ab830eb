use pulp_cafe::utils::{GrammarValidator, PossessiveValidator, ValidatorExt};
use pulp_cafe::{Generator, GrammarBuilder};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::error::Error;

/// Example of creating and using custom post-processors
fn main() -> Result<(), Box<dyn Error>> {
    let grammar = GrammarBuilder::new()
        .add_root(&["#who# waves at #who#'s table<, #mood#>"])
        .add_rule("who", &["the twins", "the cook", "Marguerite"])
        .add_rule("mood", &["cheerfully", "grimly", "for some reason"])
        .build_validated()?;

    let mut rng = StdRng::seed_from_u64(5);

    println!("=== Default Output ===");
    let generator = Generator::new(grammar.clone());
    for i in 1..=5 {
        println!("{}. {}", i, generator.generate(&mut rng)?);
    }

    // Chain the possessive fix with a custom validator
    let chained = PossessiveValidator.chain(ExclaimValidator);
    let excited = Generator::new(grammar.clone()).with_validator(Box::new(chained));

    println!("\n=== With Custom Validators ===");
    for i in 1..=5 {
        println!("{}. {}", i, excited.generate(&mut rng)?);
    }

    let shouting = Generator::new(grammar).with_validator(Box::new(ShoutValidator));

    println!("\n=== Shouting ===");
    for i in 1..=5 {
        println!("{}. {}", i, shouting.generate(&mut rng)?);
    }

    Ok(())
}

/// Custom validator that ends every text with an exclamation mark
#[derive(Debug, Clone)]
struct ExclaimValidator;

impl GrammarValidator for ExclaimValidator {
    fn validate(&self, text: &str) -> String {
        format!("{}!", text.trim_end_matches(['.', '!']))
    }

    fn name(&self) -> &str {
        "exclaim"
    }

    fn applies_to(&self, text: &str) -> bool {
        !text.ends_with('!')
    }

    fn clone_box(&self) -> Box<dyn GrammarValidator> {
        Box::new(self.clone())
    }
}

/// Custom validator that uppercases everything outside the prune spans
#[derive(Debug, Clone)]
struct ShoutValidator;

impl GrammarValidator for ShoutValidator {
    fn validate(&self, text: &str) -> String {
        let mut inside = false;
        text.chars()
            .map(|c| {
                match c {
                    '<' => inside = true,
                    '>' => inside = false,
                    _ => {}
                }
                if inside { c } else { c.to_ascii_uppercase() }
            })
            .collect()
    }

    fn name(&self) -> &str {
        "shout"
    }

    fn clone_box(&self) -> Box<dyn GrammarValidator> {
        Box::new(self.clone())
    }
}
