use pulp_cafe::{Generator, GeneratorConfig, GrammarBuilder};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::error::Error;

/// Example of creating a grammar programmatically
fn main() -> Result<(), Box<dyn Error>> {
    // Example 1: a small recursive grammar built in code
    let grammar = GrammarBuilder::new()
        .add_root(&["#subject# #verb# #object#<, #coda#>."])
        .add_rule("subject", &["the #adjective# #noun#", "a #adjective# #noun#"])
        .add_rule("adjective", &["quick", "lazy", "clever", "#adjective# and #adjective#"])
        .add_rule("noun", &["fox", "dog", "programmer"])
        .add_rule("verb", &["jumps over", "runs around", "observes"])
        .add_rule("object", &["the #adjective# #noun#"])
        .add_rule("coda", &["again", "for no reason at all", "while nobody watches"])
        .build_validated()?;

    let mut rng = StdRng::seed_from_u64(42);
    let generator = Generator::new(grammar.clone());

    println!("Generated sentences (140 characters):");
    for i in 1..=5 {
        println!("{}. {}", i, generator.generate(&mut rng)?);
    }

    // Example 2: the same grammar under a tight budget, where the optional
    // coda is usually pruned away
    let config = GeneratorConfig {
        max_len: 45,
        max_attempts: 500,
        ..GeneratorConfig::default()
    };
    let tight = Generator::with_config(grammar, config);

    println!("\nGenerated sentences (45 characters):");
    for i in 1..=5 {
        let generation = tight.generate_detailed(&mut rng, 45)?;
        println!(
            "{}. {} ({} attempts)",
            i, generation.text, generation.attempts
        );
    }

    Ok(())
}
